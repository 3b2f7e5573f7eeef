use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use blog_core::BlogConfig;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::attach_error_stack;

pub struct AxumApp {
    pub config: Arc<BlogConfig>,
    pub router: Router<()>,
}

impl Clone for AxumApp {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            router: self.router.clone(),
        }
    }
}

impl AxumApp {
    pub fn new(config: BlogConfig) -> Self {
        Self {
            config: Arc::new(config),
            router: Router::new(),
        }
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub fn merge(mut self, router: Router<()>) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Mount a plain GET handler at `path`.
    pub fn service<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    /// Serve files from `dir` under `path`.
    pub fn serve_dir(mut self, path: &str, dir: impl AsRef<Path>) -> Self {
        self.router = self.router.nest_service(path, ServeDir::new(dir));
        self
    }

    /// Request ids, tracing, CORS and error-stack exposure. Call after every
    /// route is mounted: layers only wrap routes that already exist.
    pub fn with_http_layers(mut self) -> anyhow::Result<Self> {
        let origin = self
            .config
            .get("http.cors.origin")
            .unwrap_or("http://localhost:3000");
        let origin = HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin '{origin}'"))?;

        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

        let expose_stack = !self.config.is_production();

        self.router = self
            .router
            .layer(axum::middleware::map_response_with_state(expose_stack, attach_error_stack))
            .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
            .layer(cors)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            );
        Ok(self)
    }

    /// Serve until Ctrl-C or SIGTERM, then let in-flight requests finish.
    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("server stopped");
        Ok(())
    }
}

pub fn axum(config: BlogConfig) -> AxumApp {
    AxumApp::new(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received");
}
