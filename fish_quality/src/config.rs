use crate::error::ConfigurationError;
use serde::Deserialize;
use std::path::PathBuf;

pub trait Validatable {
    fn validate(&self) -> Result<(), ConfigurationError>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Labeled image folder, one subfolder per class.
    pub dataset_dir: PathBuf,
    /// Saved parameters; without it the model starts from random weights.
    /// Must not be placed under `dataset_dir`, where its folder would be
    /// read as one more label.
    #[serde(default)]
    pub weights_file: Option<PathBuf>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ModelConfig {
    pub fn check_weights_location(&self) -> Result<(), ConfigurationError> {
        match &self.weights_file {
            Some(weights_file) if weights_file.starts_with(&self.dataset_dir) => {
                Err(ConfigurationError::WeightsInsideDataset {
                    weights_file: weights_file.clone(),
                    dataset_dir: self.dataset_dir.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl Validatable for ModelConfig {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.dataset_dir.is_dir() {
            return Err(ConfigurationError::DatasetNotFound(self.dataset_dir.clone()));
        }
        self.check_weights_location()?;
        if let Some(weights_file) = &self.weights_file {
            if !weights_file.is_file() {
                return Err(ConfigurationError::WeightsNotFound(weights_file.clone()));
            }
        }
        Ok(())
    }
}
