#![forbid(unsafe_code)]

use log::{error, info};
use pairwrite_core::db::open_db;
use pairwrite_core::{init_logging, tx_behavior_name, AppConfig, PairWriter};
use pairwrite_server::{load_env_file, router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = load_env_file()?;
    let config = AppConfig::from_env()?;
    init_logging(&config.log_level, config.log_dir.as_deref())?;
    match &env_file {
        Some(path) => info!(
            "event=env_file module=server status=loaded path={}",
            path.display()
        ),
        None => info!("event=env_file module=server status=absent"),
    }

    // Schema bootstrap only; writes open their own connections.
    drop(open_db(&config.db)?);

    let app = router(AppState::new(PairWriter::new(config.db.clone())));

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    info!(
        "event=server_start module=server status=ok addr={} db={} tx_behavior={} missing_pair={:?}",
        config.server.bind,
        config.db.path.display(),
        tx_behavior_name(config.db.tx_behavior),
        config.db.missing_pair
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            "event=shutdown_signal module=server status=error error={}",
            err
        );
    }
}
