//! Embedbatch server assembly and lifecycle
//!
//! `AppState` wires the embedding pipeline, the job registry and the worker pool
//! together; `run` serves the API until a shutdown signal arrives and then
//! drains the workers.

use std::net::SocketAddr;
use std::sync::Arc;

use embedbatch_core::{
    create_embedding_generator, ChunkSettings, DefaultTextExtractor, EmbeddingPipeline,
    TextExtractor,
};
use embedbatch_jobs::{
    CallbackDispatcher, DefaultFileAcquirer, FileAcquirer, JobProcessor, JobRegistry, WorkerPool,
    WorkerPoolConfig,
};
use embedbatch_monitoring::logging::LogExt;
use embedbatch_store::{create_result_store, ResultStore};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::resilience::{RateLimiter, RateLimiterConfig};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: JobRegistry,
    pub pool: Arc<WorkerPool>,
    pub pipeline: EmbeddingPipeline,
    pub extractor: Arc<dyn TextExtractor>,
    pub store: Arc<dyn ResultStore>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Manual Debug implementation that doesn't try to debug the trait objects
impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("workers", &self.pool.worker_count())
            .field("dimension", &self.pipeline.dimension())
            .finish()
    }
}

impl AppState {
    /// Builds every component from configuration and starts the worker pool.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(config: ServerConfig) -> ServerResult<Self> {
        let generator =
            create_embedding_generator(&config.embedding).log_err("Failed to create embedding generator")?;
        let pipeline = EmbeddingPipeline::new(generator, ChunkSettings::from(&config.embedding));
        let store = create_result_store(&config.store);
        let acquirer: Arc<dyn FileAcquirer> =
            Arc::new(DefaultFileAcquirer::new(config.jobs.download_timeout_secs)?);

        Self::with_components(config, pipeline, store, acquirer)
    }

    /// Assembles the state around caller-supplied pipeline, store and acquirer.
    pub fn with_components(
        config: ServerConfig,
        pipeline: EmbeddingPipeline,
        store: Arc<dyn ResultStore>,
        acquirer: Arc<dyn FileAcquirer>,
    ) -> ServerResult<Self> {
        config.validate()?;

        let registry = JobRegistry::new();
        let extractor: Arc<dyn TextExtractor> = Arc::new(DefaultTextExtractor::new());
        let callbacks = CallbackDispatcher::new(config.jobs.callback_timeout_secs)?;

        let processor = JobProcessor::new(
            registry.clone(),
            pipeline.clone(),
            acquirer,
            Arc::clone(&extractor),
            Arc::clone(&store),
            callbacks,
        );
        let pool = WorkerPool::start(WorkerPoolConfig::from(&config.jobs), Arc::new(processor));
        let rate_limiter = RateLimiter::new(RateLimiterConfig::from(&config));

        Ok(Self {
            config: Arc::new(config),
            registry,
            pool: Arc::new(pool),
            pipeline,
            extractor,
            store,
            rate_limiter: Arc::new(rate_limiter),
        })
    }
}

/// Serves the API until Ctrl-C or SIGTERM, then waits for running jobs.
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    info!("Starting Embedbatch server");

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .map_err(|e| {
            ServerError::ConfigurationError(format!(
                "Invalid bind address {}:{}: {}",
                config.bind_address, config.port, e
            ))
        })?;

    let state = AppState::build(config)?;
    let app = crate::api::build_router(state.clone());

    let listener = TcpListener::bind(addr)
        .await
        .log_err("Failed to bind listener")?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("HTTP server stopped, draining workers");
    state.pool.shutdown().await;
    info!("Embedbatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
