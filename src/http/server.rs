//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with health and admin handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Apply configuration reloads that can take effect live
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::schema::AppConfig;
use crate::http::handlers;
use crate::lifecycle::startup::AppContext;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<AppContext>,
    /// Most recently accepted configuration.
    pub config: Arc<ArcSwap<AppConfig>>,
}

/// HTTP server for health and admin endpoints.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(context: Arc<AppContext>) -> Self {
        let state = AppState {
            config: Arc::new(ArcSwap::from_pointee(context.config.clone())),
            context,
        };
        let router = Self::build_router(&state);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: &AppState) -> Router {
        let config = state.config.load();

        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/health/ready", get(handlers::ready))
            .route("/health/live", get(handlers::live));

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .with_state(state.clone())
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                apply_config(&state, new_config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal, draining");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap in a reloaded configuration. Only cache TTLs and the admin key apply live.
pub fn apply_config(state: &AppState, new_config: AppConfig) {
    let current = state.config.load_full();

    if current.cache.ttl != new_config.cache.ttl {
        state.context.cache.set_policy(new_config.cache.ttl);
    }
    if current.dependencies != new_config.dependencies {
        tracing::warn!("Dependency or circuit breaker settings changed; restart to apply");
    }
    if current.server != new_config.server || current.admin.enabled != new_config.admin.enabled {
        tracing::warn!("Listener or admin route settings changed; restart to apply");
    }

    state.config.store(Arc::new(new_config));
    tracing::info!("Configuration reloaded");
}
