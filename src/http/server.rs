//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (CORS, tracing, timeout, body limit, request ID)
//! - Rate limit the chat relay when configured
//! - Run background sweepers for idle sessions
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::context::DocumentContext;
use crate::http::{chat, cors, registration, request};
use crate::registration::SessionStore;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};
use crate::upstream::LlmClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub llm: LlmClient,
    pub context: Arc<DocumentContext>,
    pub sessions: Arc<SessionStore>,
}

/// HTTP server for the clinic assistant gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
    sessions: Arc<SessionStore>,
    limiter: Option<Arc<RateLimiterState>>,
}

impl HttpServer {
    /// Create a server, loading the document context from the configured directory.
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let context = Arc::new(DocumentContext::load(
            &config.context.documents_dir,
            config.context.max_chars,
        ));
        Self::with_context(config, context)
    }

    /// Create a server around an existing context holder.
    pub fn with_context(
        config: AppConfig,
        context: Arc<DocumentContext>,
    ) -> Result<Self, reqwest::Error> {
        let llm = LlmClient::new(&config.upstream, &config.timeouts, &config.retries)?;
        let sessions = Arc::new(SessionStore::new(config.registration.max_sessions));
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiterState::new(&config.rate_limit)));
        let config = Arc::new(config);

        let state = AppState {
            config: config.clone(),
            llm,
            context,
            sessions: sessions.clone(),
        };

        let router = Self::build_router(&config, state, limiter.clone());
        Ok(Self {
            router,
            config,
            sessions,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &AppConfig,
        state: AppState,
        limiter: Option<Arc<RateLimiterState>>,
    ) -> Router {
        // Chat turns and new registrations share one per-client budget.
        let mut limited = Router::new()
            .route("/chat", post(chat::chat))
            .route("/registration", post(registration::create_session));
        if let Some(limiter) = limiter {
            limited =
                limited.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let api = Router::new()
            .route("/health", get(chat::health))
            .merge(limited)
            .route(
                "/registration/{id}",
                get(registration::get_session).delete(registration::delete_session),
            )
            .route("/registration/{id}/messages", post(registration::post_message))
            .route("/registration/{id}/document", post(registration::post_document))
            .layer(cors::cors_layer(&config.cors));

        Router::new()
            .nest("/api", api)
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(request::propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request::make_request_span))
            .layer(request::set_request_id_layer())
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = tokio::spawn(sweep_idle(
            self.sessions.clone(),
            self.limiter.clone(),
            Duration::from_secs(self.config.registration.session_ttl_secs),
            Duration::from_secs(self.config.registration.sweep_interval_secs),
        ));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        sweeper.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn sweep_idle(
    sessions: Arc<SessionStore>,
    limiter: Option<Arc<RateLimiterState>>,
    ttl: Duration,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        sessions.purge_idle(ttl);
        if let Some(limiter) = &limiter {
            limiter.prune(Duration::from_secs(600));
            tracing::debug!(clients = limiter.tracked_clients(), "Pruned idle rate limit buckets");
        }
    }
}
