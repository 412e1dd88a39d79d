use anyhow::{Context, Result};
use clap::Parser;
use ras_oauth_gateway::{CodeExchangeGateway, GatewayConfig, GatewayState, auth_router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before clap reads SERVER_HOST/SERVER_PORT
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ras_oauth_server=debug,ras_oauth_gateway=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = GatewayConfig::from_env().context("Failed to load gateway configuration")?;
    if let Err(issue) = config.credentials.resolve() {
        // Requests will fail with a server misconfiguration until this is fixed
        warn!("Provider credentials incomplete: {}", issue);
    }

    let gateway =
        CodeExchangeGateway::from_config(&config).context("Failed to build code exchange gateway")?;

    let mut app = auth_router(GatewayState::new(gateway)).layer(TraceLayer::new_for_http());
    if args.permissive_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let bind_addr = args.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("OAuth server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
