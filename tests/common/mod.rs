#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::io::StreamReader;

use video_pipeline::infrastructure::media::error::{MediaError, MediaResult};
use video_pipeline::infrastructure::media::ffmpeg::{MASTER_PLAYLIST, Rendition, Transcoder};
use video_pipeline::infrastructure::storage::transfer::{ObjectReader, ObjectStore, ObjectWriter};
use video_pipeline::modules::video::model::VideoUpdate;
use video_pipeline::modules::video::repository::{RecordError, VideoRepository};

pub const VIDEO_ID: &str = "550e8400-e29b-41d4-a716-446655440000";
pub const RAW_BUCKET: &str = "raw-uploads";
pub const HLS_BUCKET: &str = "hls-output";

pub fn raw_object_path() -> String {
    format!("raw/{VIDEO_ID}.mp4")
}

type Objects = Arc<Mutex<BTreeMap<String, (String, Vec<u8>)>>>;

/// In-memory bucket store keyed by `bucket/key`, with switches for each way
/// a backend can fail.
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Objects,
    pub aborted: Arc<Mutex<Vec<String>>>,
    /// Reader yields a few bytes, then an I/O error.
    pub broken_read: bool,
    pub fail_open_writer: bool,
    pub fail_write: bool,
    pub fail_finish: bool,
    /// `finish` fails only for keys ending with this.
    pub fail_finish_suffix: Option<String>,
}

impl MemoryStore {
    pub fn put(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects.lock().unwrap().insert(
            format!("{bucket}/{key}"),
            ("application/octet-stream".to_string(), data.to_vec()),
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{key}"))
            .map(|(_, data)| data.clone())
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{key}"))
            .map(|(ct, _)| ct.clone())
    }

    /// Every stored `bucket/key`, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn keys_in(&self, bucket: &str) -> Vec<String> {
        let prefix = format!("{bucket}/");
        self.keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn aborted(&self) -> Vec<String> {
        self.aborted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn open_reader(&self, bucket: &str, key: &str) -> anyhow::Result<ObjectReader> {
        let Some(data) = self.get(bucket, key) else {
            anyhow::bail!("storage: object doesn't exist: {bucket}/{key}");
        };

        if self.broken_read {
            let head = Bytes::copy_from_slice(&data[..data.len().min(4)]);
            let chunks: Vec<io::Result<Bytes>> = vec![
                Ok(head),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            ];
            return Ok(Box::pin(StreamReader::new(futures_util::stream::iter(chunks))));
        }

        Ok(Box::pin(io::Cursor::new(data)))
    }

    async fn open_writer(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> anyhow::Result<Box<dyn ObjectWriter>> {
        if self.fail_open_writer {
            anyhow::bail!("permission denied");
        }

        let fail_finish = self.fail_finish
            || self
                .fail_finish_suffix
                .as_deref()
                .is_some_and(|suffix| key.ends_with(suffix));

        Ok(Box::new(MemoryWriter {
            objects: self.objects.clone(),
            aborted: self.aborted.clone(),
            key: format!("{bucket}/{key}"),
            content_type: content_type.to_string(),
            buffer: Vec::new(),
            fail_write: self.fail_write,
            fail_finish,
        }))
    }
}

struct MemoryWriter {
    objects: Objects,
    aborted: Arc<Mutex<Vec<String>>>,
    key: String,
    content_type: String,
    buffer: Vec<u8>,
    fail_write: bool,
    fail_finish: bool,
}

#[async_trait]
impl ObjectWriter for MemoryWriter {
    async fn write_chunk(&mut self, chunk: Bytes) -> anyhow::Result<()> {
        if self.fail_write {
            anyhow::bail!("write interrupted");
        }
        self.buffer.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> anyhow::Result<()> {
        if self.fail_finish {
            anyhow::bail!("precondition failed on close");
        }
        self.objects
            .lock()
            .unwrap()
            .insert(self.key, (self.content_type, self.buffer));
        Ok(())
    }

    async fn abort(self: Box<Self>) -> anyhow::Result<()> {
        self.aborted.lock().unwrap().push(self.key);
        Ok(())
    }
}

/// Writes a plausible HLS package and thumbnail without running ffmpeg.
#[derive(Default)]
pub struct FakeTranscoder {
    pub calls: Mutex<Vec<&'static str>>,
    pub inputs: Mutex<Vec<PathBuf>>,
    pub fail_package: bool,
    pub fail_thumbnail: bool,
}

impl FakeTranscoder {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Input paths seen, which all live inside the run's workspace.
    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str, input: &Path) {
        self.calls.lock().unwrap().push(call);
        self.inputs.lock().unwrap().push(input.to_path_buf());
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode_hls(
        &self,
        input: &Path,
        output_dir: &Path,
        renditions: &[Rendition],
    ) -> MediaResult<()> {
        self.record("transcode_hls", input);

        if renditions.is_empty() {
            return Err(MediaError::EmptyRenditionList);
        }
        if self.fail_package {
            return Err(MediaError::transcode_failed(
                "ffmpeg",
                Some(1),
                "Invalid data found when processing input",
            ));
        }

        let mut master = String::from("#EXTM3U\n");
        for r in renditions {
            master.push_str(&format!("{}.m3u8\n", r.name));
            std::fs::write(output_dir.join(format!("{}.m3u8", r.name)), "#EXTM3U\n").unwrap();
            std::fs::write(output_dir.join(format!("{}_000.ts", r.name)), b"segment").unwrap();
        }
        std::fs::write(output_dir.join(MASTER_PLAYLIST), master).unwrap();
        Ok(())
    }

    async fn extract_thumbnail(
        &self,
        input: &Path,
        dest: &Path,
        _offset_secs: u32,
    ) -> MediaResult<()> {
        self.record("extract_thumbnail", input);

        if self.fail_thumbnail {
            return Err(MediaError::transcode_failed("ffmpeg", Some(1), "no frame"));
        }
        std::fs::write(dest, b"\xFF\xD8\xFFjpeg").unwrap();
        Ok(())
    }
}

/// Captures record writes in memory.
#[derive(Default)]
pub struct RecordingRepo {
    pub updates: Mutex<Vec<(String, VideoUpdate)>>,
    pub failed: Mutex<Vec<String>>,
    pub fail_update: bool,
    pub fail_mark: bool,
}

impl RecordingRepo {
    pub fn updates(&self) -> Vec<(String, VideoUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<String> {
        self.failed.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoRepository for RecordingRepo {
    async fn update_video(&self, video_id: &str, update: &VideoUpdate) -> Result<(), RecordError> {
        if self.fail_update {
            return Err(RecordError::NotFound(video_id.to_string()));
        }
        self.updates
            .lock()
            .unwrap()
            .push((video_id.to_string(), update.clone()));
        Ok(())
    }

    async fn mark_failed(&self, video_id: &str) -> Result<(), RecordError> {
        self.failed.lock().unwrap().push(video_id.to_string());
        if self.fail_mark {
            return Err(RecordError::Write {
                id: video_id.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}
