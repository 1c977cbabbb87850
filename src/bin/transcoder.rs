use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::error;

use video_pipeline::config::settings::TranscoderConfig;
use video_pipeline::infrastructure::db::pool::connect_to_db;
use video_pipeline::infrastructure::media::ffmpeg::FfmpegTranscoder;
use video_pipeline::infrastructure::storage::s3::StorageService;
use video_pipeline::infrastructure::storage::transfer::TransferClient;
use video_pipeline::modules::video::repository::PgVideoRepository;
use video_pipeline::workers::transcoder::{PipelineConfig, TranscodePipeline};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    video_pipeline::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Transcoder failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = TranscoderConfig::new().context("load transcoder config")?;

    let storage = StorageService::new(
        &config.storage_endpoint,
        &config.storage_region,
        &config.storage_access_key,
        &config.storage_secret_key,
    );
    let pool = connect_to_db(&config.database_url, 2)
        .await
        .context("connect to database")?;

    let pipeline = TranscodePipeline::new(
        Arc::new(TransferClient::new(Arc::new(storage))),
        Arc::new(FfmpegTranscoder::new().binary(config.ffmpeg_bin.clone())),
        Arc::new(PgVideoRepository::new(pool)),
        PipelineConfig::from(&config),
    );

    pipeline.run(&config.params).await?;
    Ok(())
}
