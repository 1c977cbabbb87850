use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("at least one rendition is required")]
    EmptyRenditionList,

    #[error("{program} failed ({}): {output}", exit_label(.exit_code))]
    TranscodeFailed {
        program: String,
        exit_code: Option<i32>,
        /// Combined stdout and stderr, or the spawn error when the process
        /// never started.
        output: String,
    },
}

impl MediaError {
    pub fn transcode_failed(
        program: impl Into<String>,
        exit_code: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        Self::TranscodeFailed {
            program: program.into(),
            exit_code,
            output: output.into(),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code".to_string(),
    }
}
