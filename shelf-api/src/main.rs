use std::net::SocketAddr;

use shelf_api::{app, AppState};
use shelf_core::Catalog;
use shelf_store::{open_repository, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelf_api=debug,shelf_core=info,shelf_store=info,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Shelf API on port {}", config.server.port);
    if config.server.testing {
        tracing::warn!("Testing mode enabled: DELETE /products clears all data");
    }

    let repository = open_repository(&config).await?;

    let app_state = AppState {
        catalog: Catalog::new(repository),
        testing: config.server.testing,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
