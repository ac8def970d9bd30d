use intake_server::{
    config::AppConfig,
    routes::{self, UploadTarget},
    upload::UploadProcessor,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        max_total_size = config.policy.max_total_size,
        allowed = ?config.policy.allowed_mime_types,
        rename = config.policy.rename_on_store,
        "Upload policy loaded"
    );

    let app = routes::router(UploadTarget {
        processor: UploadProcessor::new(),
        directory: config.upload_dir,
        policy: config.policy,
    });

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, "Failed to bind: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Server running on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
