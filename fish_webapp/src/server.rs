use crate::{
    config::Config, routes::app_routes, session::SessionStore, storage::UploadStore,
    telemetry::Metrics,
};
use axum::{extract::DefaultBodyLimit, Router};
use axum_otel_metrics::HttpMetricsLayerBuilder;
use fish_quality::QualityPipeline;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

#[derive(Clone)]
pub struct SharedState {
    pub pipeline: QualityPipeline,
    pub uploads: UploadStore,
    pub sessions: Arc<SessionStore>,
    pub metrics: Arc<Metrics>,
}

impl SharedState {
    pub fn new(pipeline: QualityPipeline, uploads: UploadStore) -> anyhow::Result<Self> {
        Ok(Self {
            pipeline,
            uploads,
            sessions: Arc::new(SessionStore::new()),
            metrics: Arc::new(Metrics::new()?),
        })
    }
}

pub fn router(app_state: SharedState, max_body_bytes: usize) -> Router {
    let metrics_layer = HttpMetricsLayerBuilder::new().build();

    Router::new()
        .merge(app_routes())
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(metrics_layer)
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(app_state: SharedState, config: &Config) -> anyhow::Result<Self> {
        let addr = config.server.get_address();
        let router = router(app_state, config.uploads.max_body_bytes);
        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
