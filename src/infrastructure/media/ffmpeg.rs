//! FFmpeg invocations for HLS packaging and thumbnail extraction.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::command::{CommandRunner, ExecCommandRunner};
use super::error::{MediaError, MediaResult};

/// Master playlist written into the package directory.
pub const MASTER_PLAYLIST: &str = "index.m3u8";

const SEGMENT_SECONDS: u32 = 6;

/// One output quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendition {
    /// Advertised in the master playlist and used as the variant playlist
    /// file name.
    pub name: &'static str,
    /// Output height in pixels; width follows the source aspect ratio.
    pub height: u32,
    pub video_bitrate: &'static str,
    pub audio_bitrate: &'static str,
}

/// Order matters: index `i` becomes output stream `v:i`/`a:i`.
pub const DEFAULT_RENDITIONS: [Rendition; 3] = [
    Rendition {
        name: "360p",
        height: 360,
        video_bitrate: "500k",
        audio_bitrate: "64k",
    },
    Rendition {
        name: "720p",
        height: 720,
        video_bitrate: "1500k",
        audio_bitrate: "128k",
    },
    Rendition {
        name: "1080p",
        height: 1080,
        video_bitrate: "3000k",
        audio_bitrate: "192k",
    },
];

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Writes `index.m3u8`, one variant playlist per rendition and their
    /// segments into `output_dir`, which must already exist.
    async fn transcode_hls(
        &self,
        input: &Path,
        output_dir: &Path,
        renditions: &[Rendition],
    ) -> MediaResult<()>;

    /// Writes a single frame taken `offset_secs` into the input.
    async fn extract_thumbnail(&self, input: &Path, dest: &Path, offset_secs: u32)
        -> MediaResult<()>;
}

pub struct FfmpegTranscoder {
    cmd: Arc<dyn CommandRunner>,
    binary: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(ExecCommandRunner))
    }

    pub fn with_runner(cmd: Arc<dyn CommandRunner>) -> Self {
        Self {
            cmd,
            binary: "ffmpeg".to_string(),
        }
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode_hls(
        &self,
        input: &Path,
        output_dir: &Path,
        renditions: &[Rendition],
    ) -> MediaResult<()> {
        if renditions.is_empty() {
            return Err(MediaError::EmptyRenditionList);
        }

        let args = hls_args(input, output_dir, renditions);
        self.cmd.run(&self.binary, &args).await?;

        info!(
            "🎞️ Packaged {} renditions into {}",
            renditions.len(),
            output_dir.display()
        );
        Ok(())
    }

    async fn extract_thumbnail(
        &self,
        input: &Path,
        dest: &Path,
        offset_secs: u32,
    ) -> MediaResult<()> {
        let args = thumbnail_args(input, dest, offset_secs);
        self.cmd.run(&self.binary, &args).await?;
        Ok(())
    }
}

/// Arguments for a single-pass multi-rendition HLS encode.
pub fn hls_args(input: &Path, output_dir: &Path, renditions: &[Rendition]) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-i".into(), path_arg(input)];

    for (i, rend) in renditions.iter().enumerate() {
        args.extend([
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "0:a:0".to_string(),
            format!("-c:v:{i}"),
            "libx264".to_string(),
            format!("-b:v:{i}"),
            rend.video_bitrate.to_string(),
            format!("-filter:v:{i}"),
            format!("scale=-2:{}", rend.height),
            format!("-c:a:{i}"),
            "aac".to_string(),
            format!("-b:a:{i}"),
            rend.audio_bitrate.to_string(),
        ]);
    }

    args.extend([
        "-f".to_string(),
        "hls".to_string(),
        "-hls_time".to_string(),
        SEGMENT_SECONDS.to_string(),
        "-hls_playlist_type".to_string(),
        "vod".to_string(),
        "-hls_flags".to_string(),
        "independent_segments".to_string(),
        "-hls_segment_type".to_string(),
        "mpegts".to_string(),
        "-hls_segment_filename".to_string(),
        path_arg(&output_dir.join("%v_%03d.ts")),
        "-master_pl_name".to_string(),
        MASTER_PLAYLIST.to_string(),
        "-var_stream_map".to_string(),
        stream_map(renditions),
        path_arg(&output_dir.join("%v.m3u8")),
    ]);

    args
}

pub fn thumbnail_args(input: &Path, dest: &Path, offset_secs: u32) -> Vec<String> {
    vec![
        "-y".into(),
        "-ss".into(),
        offset_secs.to_string(),
        "-i".into(),
        path_arg(input),
        "-frames:v".into(),
        "1".into(),
        "-q:v".into(),
        "2".into(),
        path_arg(dest),
    ]
}

/// `v:0,a:0,name:360p v:1,a:1,name:720p ...`
fn stream_map(renditions: &[Rendition]) -> String {
    renditions
        .iter()
        .enumerate()
        .map(|(i, r)| format!("v:{i},a:{i},name:{}", r.name))
        .collect::<Vec<_>>()
        .join(" ")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
