//! HTTP surface: one public route and the configured role-protected routes

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::axum_integration::CurrentProfile;
use crate::cache::ProfileCache;
use crate::config::{GatewayConfig, RouteRule, PUBLIC_PATH};
use crate::gateway::{role_label, Gateway, RequireRole};

pub const PUBLIC_GREETING: &str =
    "Hello from a public endpoint! You don't need to be authenticated to see this.";

async fn public() -> Json<Value> {
    Json(json!({ "message": PUBLIC_GREETING }))
}

/// Build the router for a gateway and its protected route table
pub fn router(gateway: Arc<Gateway>, routes: &[RouteRule]) -> Router {
    let mut app = Router::new().route(PUBLIC_PATH, get(public));

    for rule in routes {
        tracing::info!("Protecting {} with role {}", rule.path, rule.required_role);
        let message = format!("{} access granted via authenticated endpoint.", role_label(&rule.required_role));
        let granted = move |profile: CurrentProfile| async move {
            Json(json!({ "message": message, "subject": profile.subject_id }))
        };
        let protected = Router::new()
            .route(&rule.path, get(granted))
            .route_layer(RequireRole::new(gateway.clone(), rule.required_role.as_str()));
        app = app.merge(protected);
    }

    app
}

/// Drop expired profiles from `cache` every `every`, until the task is aborted
pub fn spawn_pruner(cache: Arc<ProfileCache>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.prune_expired().await;
        }
    })
}

/// Build the gateway from configuration and serve until the process is stopped
pub async fn serve(config: GatewayConfig) -> crate::Result<()> {
    let gateway = Arc::new(Gateway::from_config(&config)?);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    let pruner = spawn_pruner(
        gateway.cache().clone(),
        Duration::from_secs(config.cache.prune_interval_secs),
    );
    let app = router(gateway, &config.routes);
    let served = axum::serve(listener, app).await;
    pruner.abort();
    served?;
    Ok(())
}
