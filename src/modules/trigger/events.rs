use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unresolvable identifier: {0}")]
    UnresolvableIdentifier(String),
}

/// The part of an object-finalized notification the trigger needs. Any other
/// fields in the payload are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct StorageObject {
    /// Bucket holding the raw upload, e.g. `raw-uploads`.
    #[serde(default)]
    #[validate(length(min = 1, message = "bucket is required"))]
    pub bucket: String,
    /// Object path, conventionally `raw/<video-id>.<ext>`.
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
}

impl StorageObject {
    /// The video ID is the object's base name with its final extension
    /// stripped. The same name always yields the same ID, which is what makes
    /// redelivered notifications safe to act on.
    pub fn video_id(&self) -> Result<String, EventError> {
        let base = base_name(&self.name);
        if base.is_empty() || base == "." || base == "/" {
            return Err(EventError::UnresolvableIdentifier(format!(
                "object name {:?} has no base component",
                self.name
            )));
        }

        let stem = match base.rfind('.') {
            Some(idx) => &base[..idx],
            None => base,
        };
        // A stem of only dots (from `..` or `...`) would escape `videos/<id>/`.
        if stem.chars().all(|c| c == '.') {
            return Err(EventError::UnresolvableIdentifier(format!(
                "could not derive video ID from object name {:?}",
                self.name
            )));
        }

        Ok(stem.to_string())
    }
}

/// Decodes and validates a JSON notification body.
pub fn parse(body: &[u8]) -> Result<StorageObject, EventError> {
    let object: StorageObject = serde_json::from_slice(body)
        .map_err(|e| EventError::MalformedPayload(format!("decode storage object: {e}")))?;

    object
        .validate()
        .map_err(|e| EventError::MalformedPayload(e.to_string()))?;

    Ok(object)
}

// Trailing separators are dropped first; a path made only of separators has
// the root as its base.
fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { "" } else { "/" };
    }
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
