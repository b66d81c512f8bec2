use portfolio_tracker_server::{api::app_router, build_state, config::Config, init_tracing};
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    let state = build_state(&config);
    let router = app_router(state, &config).fallback_service(ServeDir::new(&config.static_dir));
    tracing::info!(addr = %config.listen_addr, static_dir = %config.static_dir, "Listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
