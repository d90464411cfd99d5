mod bootstrap;
mod health;
mod messages;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use orderbot_core::config::{AppConfig, LoadOptions};
use tokio::sync::oneshot;

use crate::bootstrap::Application;
use crate::health::HealthState;
use crate::messages::MessagesState;

fn init_logging(config: &AppConfig) {
    use orderbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn app_router(app: &Application) -> Router {
    Router::new()
        .merge(messages::router(MessagesState::new(
            app.processor.clone(),
            app.config.replies.apology.clone(),
        )))
        .merge(health::router(HealthState::new(
            app.processor.classifier_name(),
            app.catalog_size,
            app.config.storage.backend,
            app.db_pool.clone(),
        )))
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app_router(&app)).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let server = tokio::spawn(async move { server.await });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "orderbot-server listening"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "orderbot-server stopping"
    );

    let _ = stop_tx.send(());
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "in-flight turns did not finish before the shutdown deadline"
        ),
    }

    if let Some(pool) = &app.db_pool {
        pool.close().await;
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use orderbot_core::catalog::MenuCatalog;
    use orderbot_core::config::AppConfig;
    use orderbot_core::domain::menu::MenuItem;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{app_router, bootstrap::assemble};

    #[tokio::test]
    async fn app_router_serves_health_and_rejects_unknown_routes() {
        let catalog = MenuCatalog::new(vec![MenuItem::new("Margherita")]).expect("catalog");
        let app = assemble(AppConfig::default(), catalog).await.expect("assemble");
        let router = app_router(&app);

        let health = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health response");
        assert_eq!(health.status(), StatusCode::OK);
        let body = to_bytes(health.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["classifier"], "keyword");
        assert_eq!(payload["catalog_items"], 1);

        let unknown = router
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).expect("request"))
            .await
            .expect("404 response");
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
