use std::sync::Arc;

use dotenvy::dotenv;
use log::info;

use bundlros::api_router::build_router;
use bundlros::config::{AppConfig, BackendMode};
use bundlros::shared::state::AppState;
use bundlros::shared::utils::create_conn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();

    let state = match config.backend {
        BackendMode::Hosted => {
            // Hosted mode refuses to start without a database; a silent fall
            // back to fixtures would mask a misconfigured deployment.
            let pool = create_conn(&config.database_url())?;
            info!("backend: hosted ({})", config.database.server);
            Arc::new(AppState::hosted(config, pool))
        }
        BackendMode::Mock => {
            info!("backend: mock (fixture data, process-local)");
            Arc::new(AppState::mock(config))
        }
    };

    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
