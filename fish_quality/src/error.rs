use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read image {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to guess image format: {0}")]
    Format(std::io::Error),
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum WeightsError {
    #[error("Weights file not accessible {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed weights file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Unsupported weights format version {found}, expected {expected}")]
    Version { expected: u32, found: u32 },
    #[error("Layer `{layer}` has shape {actual:?}, expected {expected:?}")]
    LayerShape {
        layer: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Dataset folder not found: {0:?}")]
    DatasetNotFound(PathBuf),
    #[error("Dataset folder {0:?} contains no label folders")]
    EmptyDataset(PathBuf),
    #[error("Failed to scan dataset folder {path:?}: {source}")]
    DatasetUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Label folder name is not valid UTF-8: {0:?}")]
    InvalidLabel(std::ffi::OsString),
    #[error("Label catalog must not be empty")]
    EmptyCatalog,
    #[error("Weights file not found: {0:?}")]
    WeightsNotFound(PathBuf),
    #[error("Weights file {weights_file:?} must live outside the dataset folder {dataset_dir:?}")]
    WeightsInsideDataset {
        weights_file: PathBuf,
        dataset_dir: PathBuf,
    },
    #[error("Weights were saved for labels {saved:?}, dataset provides {catalog:?}")]
    LabelMismatch {
        saved: Vec<String>,
        catalog: Vec<String>,
    },
    #[error("Model head has {outputs} outputs for a catalog of {labels} labels")]
    HeadSizeMismatch { outputs: usize, labels: usize },
    #[error("Model produced index {index} for a catalog of {size} labels")]
    IndexOutOfCatalog { index: usize, size: usize },
    #[error(transparent)]
    Weights(#[from] WeightsError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Input shape mismatch: expected {expected:?}, got {actual:?}")]
pub struct ShapeMismatchError {
    pub expected: Vec<usize>,
    pub actual: Vec<usize>,
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Image decoding failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("Classifier `{classifier}` rejected its input: {source}")]
    ShapeMismatch {
        classifier: String,
        source: ShapeMismatchError,
    },
    #[error("Classifier `{classifier}` is misconfigured: {source}")]
    Configuration {
        classifier: String,
        source: ConfigurationError,
    },
}

impl PipelineError {
    pub(crate) fn from_classifier(classifier: &str, err: ClassifierError) -> Self {
        match err {
            ClassifierError::ShapeMismatch(source) => PipelineError::ShapeMismatch {
                classifier: classifier.to_string(),
                source,
            },
            ClassifierError::Configuration(source) => PipelineError::Configuration {
                classifier: classifier.to_string(),
                source,
            },
        }
    }
}
