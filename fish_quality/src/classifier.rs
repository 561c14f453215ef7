use crate::{
    catalog::LabelCatalog,
    config::{ModelConfig, Validatable},
    error::{ClassifierError, ConfigurationError, ShapeMismatchError},
    network::ConvNet,
    preprocess::{PreprocessedTensor, INPUT_CHANNELS, INPUT_SIZE},
    weights::SavedClassifier,
};
use ndarray::ArrayView1;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferenceResult {
    pub predicted_label_index: usize,
    pub label: String,
}

pub trait Classifier: Send + Sync + 'static {
    fn predict(&self, input: &PreprocessedTensor) -> Result<InferenceResult, ClassifierError>;
    fn catalog(&self) -> &LabelCatalog;
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: ArrayView1<f32>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| (index, *value))
        .reduce(|accum, item| if item.1 > accum.1 { item } else { accum })
        .map(|(index, _)| index)
}

/// Convolutional classifier; parameters are never mutated after construction.
#[derive(Debug, Clone)]
pub struct CnnClassifier {
    name: String,
    catalog: LabelCatalog,
    network: ConvNet,
}

impl CnnClassifier {
    pub fn with_parameters(
        name: impl Into<String>,
        catalog: LabelCatalog,
        network: ConvNet,
    ) -> Result<Self, ConfigurationError> {
        if network.num_classes() != catalog.len() {
            return Err(ConfigurationError::HeadSizeMismatch {
                outputs: network.num_classes(),
                labels: catalog.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            catalog,
            network,
        })
    }

    pub fn random<R: Rng + ?Sized>(
        name: impl Into<String>,
        catalog: LabelCatalog,
        rng: &mut R,
    ) -> Self {
        let network = ConvNet::random(catalog.len(), rng);
        Self {
            name: name.into(),
            catalog,
            network,
        }
    }

    /// Builds the label catalog from the dataset folder, then loads saved
    /// weights or falls back to random initialisation.
    pub fn from_config(
        name: impl Into<String>,
        model_config: &ModelConfig,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        model_config.validate()?;
        let catalog = LabelCatalog::build(&model_config.dataset_dir)?;

        let classifier = match &model_config.weights_file {
            Some(weights_file) => Self::load(name, catalog, weights_file)?,
            None => {
                tracing::warn!(
                    "No weights file for the {} classifier, using untrained random parameters",
                    name
                );
                let mut rng = match model_config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                Self::random(name, catalog, &mut rng)
            }
        };

        tracing::info!(
            "Loaded {} classifier with {} labels",
            classifier.name,
            classifier.catalog.len()
        );
        Ok(classifier)
    }

    pub fn load(
        name: impl Into<String>,
        catalog: LabelCatalog,
        weights_file: impl AsRef<Path>,
    ) -> Result<Self, ConfigurationError> {
        let saved = SavedClassifier::load(weights_file)?;
        if saved.labels.as_slice() != catalog.labels() {
            return Err(ConfigurationError::LabelMismatch {
                saved: saved.labels,
                catalog: catalog.labels().to_vec(),
            });
        }
        let network = saved.into_network()?;
        Self::with_parameters(name, catalog, network)
    }

    pub fn save(&self, weights_file: impl AsRef<Path>) -> Result<(), ConfigurationError> {
        SavedClassifier::new(self.catalog.labels(), &self.network).save(weights_file)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logits(
        &self,
        input: &PreprocessedTensor,
    ) -> Result<ndarray::Array1<f32>, ShapeMismatchError> {
        let expected = [INPUT_CHANNELS, INPUT_SIZE, INPUT_SIZE];
        if input.shape() != expected {
            return Err(ShapeMismatchError {
                expected: expected.to_vec(),
                actual: input.shape().to_vec(),
            });
        }
        self.network.forward(input.view())
    }
}

impl Classifier for CnnClassifier {
    fn predict(&self, input: &PreprocessedTensor) -> Result<InferenceResult, ClassifierError> {
        let logits = self.logits(input)?;
        let size = self.catalog.len();
        let index = argmax(logits.view())
            .ok_or(ConfigurationError::IndexOutOfCatalog { index: 0, size })?;
        let label = self
            .catalog
            .get(index)
            .ok_or(ConfigurationError::IndexOutOfCatalog { index, size })?;

        tracing::debug!("{} classifier predicted {} ({})", self.name, label, index);
        Ok(InferenceResult {
            predicted_label_index: index,
            label: label.to_string(),
        })
    }

    fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }
}
