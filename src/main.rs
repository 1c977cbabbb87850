use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use video_pipeline::app;
use video_pipeline::config::settings::TriggerConfig;
use video_pipeline::infrastructure::jobs::cloud_run::CloudRunJobRunner;
use video_pipeline::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    video_pipeline::init_tracing();

    info!("Starting transcoder trigger...");

    let config = TriggerConfig::new().context("load trigger config")?;
    let runner = CloudRunJobRunner::new(&config.gcp_project, &config.gcp_region, &config.job_name);
    info!("🚀 Dispatching to job {}", runner.run_job_url());

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState::new(config, Arc::new(runner));
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
