//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with both routes
//! - Wire up middleware (access log, request ID, CORS header, server span, timeout)
//! - Bind the server to a listener and drain on shutdown

use std::time::Duration;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::handlers::{get_hello_world_cat, index};
use crate::http::middleware::request_span;
use crate::http::request::MakeRequestUuidV4;
use crate::observability::Tracer;
use crate::pipeline::{AnnotationEngine, FontAsset, PhotoApi, PipelineResult};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub photo_api: PhotoApi,
    pub engine: AnnotationEngine,
    pub tracer: Tracer,
    pub fallback_text: String,
}

/// HTTP server for the annotation service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig, font: FontAsset, tracer: Tracer) -> PipelineResult<Self> {
        let photo_api = PhotoApi::new(&config.photo_api, &config.timeouts, tracer.clone())?;
        let engine = AnnotationEngine::new(font, &config.annotation, tracer.clone());

        let state = AppState {
            photo_api,
            engine,
            tracer,
            fallback_text: config.annotation.fallback_text.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers run outermost first: access log, request ID, CORS header,
    /// server span, then the request deadline.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let tracer = state.tracer.clone();
        Router::new()
            .route("/getHelloWorldCat", get(get_hello_world_cat))
            .route("/", get(index))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(axum::middleware::from_fn_with_state(tracer, request_span))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    #[cfg(test)]
    fn router(&self) -> Router {
        self.router.clone()
    }
}
