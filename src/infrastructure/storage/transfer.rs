//! Moves bytes between the local workspace and object storage.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Backend that can stream objects in and out of a bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn open_reader(&self, bucket: &str, key: &str) -> anyhow::Result<ObjectReader>;

    async fn open_writer(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> anyhow::Result<Box<dyn ObjectWriter>>;
}

/// A remote write stream. Nothing is visible remotely until `finish` succeeds,
/// and some backends only validate the object at that point.
#[async_trait]
pub trait ObjectWriter: Send {
    async fn write_chunk(&mut self, chunk: Bytes) -> anyhow::Result<()>;

    async fn finish(self: Box<Self>) -> anyhow::Result<()>;

    async fn abort(self: Box<Self>) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("open remote object {uri}: {message}")]
    RemoteRead { uri: String, message: String },

    #[error("write remote object {uri}: {message}")]
    RemoteWrite { uri: String, message: String },

    #[error("create local file {}: {source}", path.display())]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read local file {}: {source}", path.display())]
    LocalRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copy {from} to {to}: {message}")]
    Copy {
        from: String,
        to: String,
        message: String,
    },
}

#[async_trait]
pub trait ObjectTransfer: Send + Sync {
    /// Creates missing parent directories of `dest`.
    async fn download(&self, bucket: &str, object_path: &str, dest: &Path)
        -> Result<(), TransferError>;

    async fn upload_file(&self, bucket: &str, object_path: &str, src: &Path)
        -> Result<(), TransferError>;

    /// Uploads every regular file below `src_dir` to `<prefix>/<relative path>`
    /// and returns how many were uploaded. An empty directory uploads nothing.
    async fn upload_dir(&self, bucket: &str, prefix: &str, src_dir: &Path)
        -> Result<usize, TransferError>;
}

#[derive(Clone)]
pub struct TransferClient {
    store: Arc<dyn ObjectStore>,
}

impl TransferClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ObjectTransfer for TransferClient {
    async fn download(
        &self,
        bucket: &str,
        object_path: &str,
        dest: &Path,
    ) -> Result<(), TransferError> {
        let uri = object_uri(bucket, object_path);

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| TransferError::LocalWrite {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut reader = self
            .store
            .open_reader(bucket, object_path)
            .await
            .map_err(|e| TransferError::RemoteRead {
                uri: uri.clone(),
                message: format!("{e:#}"),
            })?;

        let mut file = fs::File::create(dest)
            .await
            .map_err(|source| TransferError::LocalWrite {
                path: dest.to_path_buf(),
                source,
            })?;

        let copy_err = |e: io::Error| TransferError::Copy {
            from: uri.clone(),
            to: dest.display().to_string(),
            message: e.to_string(),
        };
        let bytes = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(copy_err)?;
        file.flush().await.map_err(copy_err)?;

        info!("⬇️ Downloaded {} ({} bytes) to {}", uri, bytes, dest.display());
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        object_path: &str,
        src: &Path,
    ) -> Result<(), TransferError> {
        let uri = object_uri(bucket, object_path);

        let file = fs::File::open(src)
            .await
            .map_err(|source| TransferError::LocalRead {
                path: src.to_path_buf(),
                source,
            })?;

        let mut writer = self
            .store
            .open_writer(bucket, object_path, &content_type_for(src))
            .await
            .map_err(|e| TransferError::RemoteWrite {
                uri: uri.clone(),
                message: format!("{e:#}"),
            })?;

        let mut stream = ReaderStream::new(file);
        while let Some(chunk) = stream.next().await {
            let written = match chunk {
                Ok(chunk) => writer.write_chunk(chunk).await.map_err(|e| format!("{e:#}")),
                Err(e) => Err(e.to_string()),
            };

            if let Err(message) = written {
                if let Err(abort_err) = writer.abort().await {
                    warn!("Failed to abort upload of {}: {:#}", uri, abort_err);
                }
                return Err(TransferError::Copy {
                    from: src.display().to_string(),
                    to: uri,
                    message,
                });
            }
        }

        writer
            .finish()
            .await
            .map_err(|e| TransferError::RemoteWrite {
                uri: uri.clone(),
                message: format!("finalise upload: {e:#}"),
            })?;

        debug!("Uploaded {} to {}", src.display(), uri);
        Ok(())
    }

    async fn upload_dir(
        &self,
        bucket: &str,
        prefix: &str,
        src_dir: &Path,
    ) -> Result<usize, TransferError> {
        let files = collect_files(src_dir).await?;
        let prefix = prefix.trim_end_matches('/');

        for path in &files {
            let key = format!("{}/{}", prefix, relative_key(src_dir, path));
            self.upload_file(bucket, &key, path).await?;
        }

        info!(
            "⬆️ Uploaded {} files to {}/",
            files.len(),
            object_uri(bucket, prefix)
        );
        Ok(files.len())
    }
}

fn object_uri(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

/// HLS types first; `mime_guess` does not know them reliably.
pub fn content_type_for(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl".to_string(),
        Some("ts") => "video/mp2t".to_string(),
        _ => mime_guess::from_path(path)
            .first()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
            .to_string(),
    }
}

// Sorted so uploads happen in a stable order.
async fn collect_files(root: &Path) -> Result<Vec<PathBuf>, TransferError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let read_err = |source| TransferError::LocalRead {
            path: dir.clone(),
            source,
        };
        let mut entries = fs::read_dir(&dir).await.map_err(read_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let file_type = entry.file_type().await.map_err(read_err)?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
