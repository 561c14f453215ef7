//! Fish species and freshness classification with a composite quality verdict.

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod generators;
pub mod network;
pub mod pipeline;
pub mod preprocess;
pub mod scorer;
pub mod weights;

pub use catalog::LabelCatalog;
pub use classifier::{Classifier, CnnClassifier, InferenceResult};
pub use config::ModelConfig;
pub use error::{
    ClassifierError, ConfigurationError, DecodeError, PipelineError, ShapeMismatchError,
    WeightsError,
};
pub use pipeline::{QualityPipeline, QualityReport};
pub use preprocess::{preprocess, PreprocessedTensor, RawImage};
pub use scorer::{score, Freshness, QualityVerdict};
