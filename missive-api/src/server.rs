//! Notification API HTTP server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use missive_common::{Signal, internal};
use missive_delivery::NotificationService;
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::timeout::TimeoutLayer;

use crate::{ApiConfig, ApiError, handlers};

const BASE: &str = "/api/notifications";

/// Build the API router around a notification service
pub fn router(service: Arc<NotificationService>, request_timeout: Duration) -> Router {
    let mut router = Router::new();

    for suffix in ["", "/"] {
        router = router
            .route(&format!("{BASE}{suffix}"), get(handlers::list))
            .route(&format!("{BASE}/send{suffix}"), post(handlers::send))
            .route(&format!("{BASE}/statistics{suffix}"), get(handlers::statistics))
            .route(
                &format!("{BASE}/{{id}}{suffix}"),
                get(handlers::detail).delete(handlers::delete),
            );
    }

    router
        .route("/health/live", get(handlers::liveness))
        .with_state(service)
        .layer(TimeoutLayer::new(request_timeout))
}

/// Notification API HTTP server
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// Bind the API server
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn new(
        config: &ApiConfig,
        service: Arc<NotificationService>,
    ) -> Result<Self, ApiError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| ApiError::BindError {
                address: config.listen_address.clone(),
                source: e,
            })?;

        tracing::info!(
            address = %config.listen_address,
            "Notification API server bound successfully"
        );

        let router = router(service, Duration::from_secs(config.request_timeout_secs));

        Ok(Self { listener, router })
    }

    /// The address actually bound, useful when listening on port 0
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, ApiError> {
        self.listener
            .local_addr()
            .map_err(|e| ApiError::ServerError(e.to_string()))
    }

    /// Run the API server until a shutdown signal is received
    ///
    /// In-flight requests are allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<Signal>) -> Result<(), ApiError> {
        internal!(level = INFO, "Notification API server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                internal!(level = INFO, "Notification API server received shutdown signal");
            })
            .await
            .map_err(|e| ApiError::ServerError(e.to_string()))?;

        internal!(level = INFO, "Notification API server stopped");
        Ok(())
    }
}
