use axum::Router;
use axum::http::{HeaderValue, Method, header};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::category::CategoryState;
use crate::config::Config;
use crate::task::TaskState;
use middleware::with_security_headers;

pub mod api;
pub mod middleware;

/// Builds the CORS layer for the configured origin. `*` allows any origin.
pub fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.cors_origin == "*" {
        Ok(cors.allow_origin(Any))
    } else {
        let origin = HeaderValue::from_str(&config.cors_origin)?;
        Ok(cors.allow_origin(origin))
    }
}

/// Assembles the application router with its middleware stack.
pub fn create_app(
    config: Arc<Config>,
    task_state: TaskState,
    category_state: CategoryState,
) -> anyhow::Result<Router> {
    let cors = cors_layer(&config)?;

    let app = with_security_headers(api::create_api_router(config, task_state, category_state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    Ok(app)
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!(
        environment = %config.environment,
        "Web server running on http://{}",
        server_address
    );

    let app = create_app(
        Arc::new(config),
        TaskState::default(),
        CategoryState::default(),
    )?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Web server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to listen for SIGTERM: {}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
