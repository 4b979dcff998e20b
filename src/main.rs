use anyhow::Result;
use procview::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(name = version::NAME, version = version::VERSION, "starting");

    let analysis_repo = Arc::new(analysis_repo::AnalysisRepo::connect(&app_config.database.path).await?);
    analysis_repo.init().await?;
    let analyzer = Arc::new(analysis::GeminiBackend::from_config(&app_config.analysis)?);

    let session = session::Session::new(
        session::SessionSettings::from_config(&app_config),
        analyzer,
        analysis_repo,
    );

    if let Some(path) = &app_config.ingest.preload_path {
        match std::fs::read_to_string(path) {
            Ok(text) => match session.load_text(&text).await {
                Ok(count) => tracing::info!(path = %path, count, "preloaded samples"),
                Err(e) => tracing::warn!(path = %path, error = %e, "preload failed"),
            },
            Err(e) => tracing::warn!(path = %path, error = %e, "preload file unreadable"),
        }
    }
    if let Err(e) = session.load_saved_analysis().await {
        tracing::warn!(error = %e, "could not restore saved analysis");
    }

    let ws_stream_connections = Arc::new(AtomicUsize::new(0));
    let app = routes::app(session.clone(), ws_stream_connections);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    session.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
