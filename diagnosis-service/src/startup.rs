//! Application startup and lifecycle management.

use crate::config::DiagnosisConfig;
use crate::handlers;
use crate::services::providers::gemini::GeminiProvider;
use crate::services::providers::InferenceProvider;
use crate::services::{DiagnosisDb, InferenceGateway, RecordStore};
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, propagate_request_id_layer, set_request_id_layer, REQUEST_ID_HEADER,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: DiagnosisConfig,
    pub gateway: InferenceGateway,
    /// `None` when record history is disabled.
    pub store: Option<Arc<dyn RecordStore>>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    /// Build the application with the Gemini provider and, when configured,
    /// the MongoDB record store.
    pub async fn build(config: DiagnosisConfig) -> Result<Self, AppError> {
        let report_provider: Arc<dyn InferenceProvider> = Arc::new(
            GeminiProvider::new(config.report_provider_config())
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e.to_string())))?,
        );
        let followup_provider: Arc<dyn InferenceProvider> = Arc::new(
            GeminiProvider::new(config.followup_provider_config())
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e.to_string())))?,
        );

        tracing::info!(
            vision_model = %config.gemini.vision_model,
            text_model = %config.gemini.text_model,
            "Initialized Gemini providers"
        );

        let gateway = InferenceGateway::new(report_provider, followup_provider);

        let store: Option<Arc<dyn RecordStore>> = match &config.mongodb {
            Some(mongo) => {
                let db = DiagnosisDb::connect(&mongo.uri, &mongo.database)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to configure MongoDB: {}", e);
                        e
                    })?;
                Some(Arc::new(db))
            }
            None => {
                tracing::info!("Record history disabled");
                None
            }
        };

        Self::build_with(config, gateway, store).await
    }

    /// Build the application around an already constructed gateway and store.
    pub async fn build_with(
        config: DiagnosisConfig,
        gateway: InferenceGateway,
        store: Option<Arc<dyn RecordStore>>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            config: config.clone(),
            gateway,
            store,
        };

        let app = router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

/// All routes with the ambient middleware stack applied.
pub fn router(state: AppState) -> Router {
    let diagnosis_routes = Router::new()
        .route("/report", post(handlers::generate_report))
        .route("/followup", post(handlers::answer_followup))
        .route("/history", get(handlers::list_history))
        .route("/history/:id", get(handlers::get_history_record));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/api/diagnosis", diagnosis_routes)
        .layer(DefaultBodyLimit::max(state.config.uploads.max_upload_bytes))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
