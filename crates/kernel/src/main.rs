//! Pergola CMS Kernel
//!
//! HTTP server, page routing middleware, and page processors.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pergola_kernel::config::Config;
use pergola_kernel::processors::ProcessorRegistry;
use pergola_kernel::state::AppState;
use pergola_kernel::{middleware, routes, session};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    info!("Starting Pergola CMS kernel");

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, "Configuration loaded");

    // Page processors are registered here before the state freezes the
    // registry. The kernel ships none of its own; embedding deployments
    // add theirs.
    let processors = ProcessorRegistry::new();

    // Initialize application state (database connections, etc.)
    let state = AppState::new(config.clone(), processors)
        .await
        .context("failed to initialize application state")?;

    info!("Database connection established");

    // Create session layer
    let same_site = match config.cookie_same_site.as_str() {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    };
    let session_layer = session::create_session_layer(same_site);

    // Build the router
    let mut app = Router::new()
        .merge(routes::health::router())
        .merge(routes::page::router());

    // Middleware layers (last added = first executed in request flow):
    // TraceLayer → session → viewer → render → page resolver → routes.
    // The render layer sits outside the page resolver so processors can
    // merge template context before rendering happens.
    if config.page_middleware_enabled() {
        app = app.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_page,
        ));
    } else {
        warn!("page middleware disabled; pages will not resolve");
    }

    let app = app
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::render_template,
        ))
        .layer(axum::middleware::from_fn(middleware::resolve_viewer))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
