//! Writes freshly initialised parameters for every configured weights file
//! that does not exist yet. Nothing is trained; the files only give both
//! classifiers a stable identity across restarts.

use fish_quality::{CnnClassifier, ModelConfig};
use fish_webapp::config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_weights(name: &str, model_config: &ModelConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(weights_file) = &model_config.weights_file else {
        tracing::info!("No weights file configured for {}, skipping", name);
        return Ok(());
    };
    model_config.check_weights_location()?;
    if weights_file.exists() {
        tracing::info!("{:?} already exists, leaving it untouched", weights_file);
        return Ok(());
    }

    let random_config = ModelConfig {
        weights_file: None,
        ..model_config.clone()
    };
    let classifier = CnnClassifier::from_config(name, &random_config)?;
    classifier.save(weights_file)?;
    tracing::info!("Wrote {} parameters to {:?}", name, weights_file);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::get_configuration()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_level(true))
        .init();

    init_weights("species", &config.models.species)?;
    init_weights("freshness", &config.models.freshness)?;

    Ok(())
}
