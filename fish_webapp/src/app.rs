use crate::config::Config;
use crate::server::{HttpServer, SharedState};
use crate::storage::UploadStore;

use fish_quality::{Classifier, CnnClassifier, QualityPipeline};
use std::error::Error;
use tokio::{signal, sync::broadcast};

/// Builds both classifiers up front; any configuration error stops start-up.
pub fn build_pipeline(config: &Config) -> Result<QualityPipeline, Box<dyn Error>> {
    let species = match CnnClassifier::from_config("species", &config.models.species) {
        Ok(classifier) => classifier,
        Err(e) => {
            tracing::error!("Failed to initialize species classifier: {}", e);
            return Err(Box::new(e));
        }
    };

    let freshness = match CnnClassifier::from_config("freshness", &config.models.freshness) {
        Ok(classifier) => classifier,
        Err(e) => {
            tracing::error!("Failed to initialize freshness classifier: {}", e);
            return Err(Box::new(e));
        }
    };
    if freshness.catalog().len() != 3 {
        tracing::warn!(
            "Freshness dataset has {} classes, expected C1/C2/C3",
            freshness.catalog().len()
        );
    }

    Ok(QualityPipeline::new(species, freshness))
}

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let pipeline = build_pipeline(&config)?;
    let uploads = UploadStore::new(&config.uploads.dir)?;
    let app_state = SharedState::new(pipeline, uploads)?;

    let server = HttpServer::new(app_state, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    if let Ok(Err(e)) = server_handle.await {
        tracing::error!("Server stopped with an error: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

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

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
