//! API server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every `/resources` handler
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Serve plain HTTP on a tokio listener, or HTTPS through axum-server
//! - Swap the manager when a reloaded configuration arrives
//! - Stop accepting and drain on the shutdown broadcast

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{delete, get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::TlsConfig;
use crate::config::{ControlPlaneConfig, ListenerConfig};
use crate::http::handlers::{self, AppState};
use crate::http::request::{make_span, track_requests, MakeRequestUuidV4, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::manager::Manager;

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP front end of the control plane.
pub struct ApiServer {
    state: AppState,
    listener: ListenerConfig,
}

impl ApiServer {
    pub fn new(manager: Manager, listener: ListenerConfig) -> Self {
        Self {
            state: AppState::new(manager),
            listener,
        }
    }

    /// Handler state, shared with the reload task.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(handlers::healthz))
            .route("/resources", post(handlers::create_instance))
            .route("/resources/plans", get(handlers::list_plans))
            .route("/resources/flavors", get(handlers::list_flavors))
            .route(
                "/resources/{instance}",
                get(handlers::service_info)
                    .put(handlers::update_instance)
                    .delete(handlers::delete_instance),
            )
            .route("/resources/{instance}/info", get(handlers::instance_info))
            .route("/resources/{instance}/status", get(handlers::instance_status))
            .route(
                "/resources/{instance}/bind-app",
                post(handlers::bind_app).delete(handlers::unbind_app),
            )
            .route("/resources/{instance}/scale", post(handlers::scale))
            .route(
                "/resources/{instance}/block",
                get(handlers::list_blocks).post(handlers::update_block),
            )
            .route("/resources/{instance}/block/{block}", delete(handlers::delete_block))
            .route(
                "/resources/{instance}/route",
                get(handlers::list_routes)
                    .post(handlers::update_route)
                    .delete(handlers::delete_route),
            )
            .route(
                "/resources/{instance}/certificate",
                get(handlers::list_certificates).post(handlers::update_certificate),
            )
            .route(
                "/resources/{instance}/certificate/{name}",
                delete(handlers::delete_certificate),
            )
            .route(
                "/resources/{instance}/files",
                get(handlers::list_files)
                    .post(handlers::create_files)
                    .put(handlers::update_files)
                    .delete(handlers::delete_files),
            )
            .route("/resources/{instance}/purge", post(handlers::purge_cache))
            .with_state(self.state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| make_span(request)))
                    .layer(middleware::from_fn(track_requests))
                    .layer(RequestBodyLimitLayer::new(self.listener.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(self.listener.request_timeout_secs))),
            )
    }

    /// Rebuild the manager for every configuration received on `updates`.
    pub fn watch_config(&self, mut updates: mpsc::UnboundedReceiver<ControlPlaneConfig>) -> JoinHandle<()> {
        let state = self.state.clone();
        let bind_address = self.listener.bind_address.clone();

        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                let next = state.manager.load().reconfigured(&config);
                state.manager.store(Arc::new(next));

                if config.listener.bind_address != bind_address {
                    tracing::warn!(
                        current = %bind_address,
                        configured = %config.listener.bind_address,
                        "Listener changes take effect on restart"
                    );
                }
                tracing::info!(flavors = config.rpaas.flavors.len(), "Configuration reloaded");
            }
        })
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "API server starting");

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("API server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(self, addr: SocketAddr, tls: &TlsConfig, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
        let handle = axum_server::Handle::new();

        let mut stop = shutdown.subscribe();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = stop.recv().await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        tracing::info!(address = %addr, "API server starting with TLS");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router().into_make_service())
            .await?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}
