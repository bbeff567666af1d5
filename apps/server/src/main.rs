use allfi_server::{
    api::app_router, build_state, config::Config, init_tracing,
    scheduler::start_health_refresh_scheduler,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::from_env()?;

    let shutdown = CancellationToken::new();
    let state = build_state(&config, shutdown.clone())?;

    let scheduler = start_health_refresh_scheduler(state.clone(), config.health_refresh_interval);

    let router = app_router(state, &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    let signal_token = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    scheduler.await?;
    Ok(())
}
