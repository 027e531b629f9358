//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all dispatch handler
//! - Wire up middleware (timeout, request ID, tracing)
//! - Serve until shutdown, applying route reloads as they arrive

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::TokenValidator;
use crate::config::GatewayConfig;
use crate::http::dispatch::dispatch;
use crate::http::forward::Forwarder;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::ErrorResponses;
use crate::plugins::PluginRegistry;
use crate::routing::RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub validator: Option<Arc<TokenValidator>>,
    pub plugins: Arc<PluginRegistry>,
    pub forwarder: Forwarder,
    pub errors: Arc<ErrorResponses>,
}

/// The gateway's HTTP front end.
pub struct GatewayServer {
    router: Router,
    state: AppState,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Assemble a server from already-initialized subsystems.
    pub fn new(
        config: GatewayConfig,
        routes: RouteTable,
        validator: Option<TokenValidator>,
        plugins: PluginRegistry,
    ) -> Self {
        let forwarder = Forwarder::new(
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.backend_secs),
        );

        let state = AppState {
            routes: Arc::new(ArcSwap::from_pointee(routes)),
            validator: validator.map(Arc::new),
            plugins: Arc::new(plugins),
            forwarder,
            errors: Arc::new(ErrorResponses::from_config(&config.errors)),
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// A clone of the router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Configurations received on `config_updates` replace the route table.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let routes = self.state.routes.clone();
        let mut current = self.config.clone();
        tokio::spawn(async move {
            while let Some(next) = config_updates.recv().await {
                if apply_reload(&routes, &current, &next) {
                    current = next;
                }
            }
        });

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap in the routes and services of `next`. Returns false (and keeps the
/// current table) when the new table cannot be built.
pub fn apply_reload(
    routes: &ArcSwap<RouteTable>,
    current: &GatewayConfig,
    next: &GatewayConfig,
) -> bool {
    let table = match RouteTable::from_config(next) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!(error = %e, "Reloaded configuration rejected, keeping current routes");
            return false;
        }
    };

    let pending = restart_required(current, next);
    if !pending.is_empty() {
        tracing::warn!(
            sections = ?pending,
            "Changes to these sections take effect only after a restart"
        );
    }

    tracing::info!(
        routes = table.route_count(),
        services = table.service_count(),
        "Route table reloaded"
    );
    routes.store(Arc::new(table));
    true
}

/// Sections that differ between `current` and `next` but are fixed for the
/// process lifetime.
pub fn restart_required(current: &GatewayConfig, next: &GatewayConfig) -> Vec<&'static str> {
    let mut pending = Vec::new();
    if next.listener != current.listener {
        pending.push("listener");
    }
    if next.auth != current.auth {
        pending.push("auth");
    }
    if next.plugins != current.plugins {
        pending.push("plugins");
    }
    if next.timeouts != current.timeouts {
        pending.push("timeouts");
    }
    if next.errors != current.errors {
        pending.push("errors");
    }
    if next.observability != current.observability {
        pending.push("observability");
    }
    pending
}
