use crate::error::ConfigurationError;
use std::path::Path;

/// Ordered class names a classifier can output.
///
/// Index `i` of a model's output corresponds to `labels()[i]`, so the order
/// must match the one used when the model was trained: byte-wise sorted
/// folder names, one folder per class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<String>,
}

impl LabelCatalog {
    pub fn build(root: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ConfigurationError::DatasetNotFound(root.to_path_buf()));
        }

        let unreadable = |source| ConfigurationError::DatasetUnreadable {
            path: root.to_path_buf(),
            source,
        };

        let mut labels = Vec::new();
        for entry in std::fs::read_dir(root).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            if !entry.path().is_dir() {
                continue;
            }
            let label = entry
                .file_name()
                .into_string()
                .map_err(ConfigurationError::InvalidLabel)?;
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(ConfigurationError::EmptyDataset(root.to_path_buf()));
        }
        labels.sort();

        tracing::debug!("Found {} labels in {:?}: {:?}", labels.len(), root, labels);
        Ok(Self { labels })
    }

    pub fn from_labels(mut labels: Vec<String>) -> Result<Self, ConfigurationError> {
        if labels.is_empty() {
            return Err(ConfigurationError::EmptyCatalog);
        }
        labels.sort();
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
