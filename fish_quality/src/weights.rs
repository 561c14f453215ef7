use crate::error::WeightsError;
use crate::network::{
    Conv2d, ConvNet, Dropout, Linear, CONV_CHANNELS, DROPOUT, FEATURES, HIDDEN, KERNEL_SIZE,
};
use ndarray::{Array1, Array2, Array4};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ConvParams {
    weight: Array4<f32>,
    bias: Array1<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinearParams {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedClassifier {
    version: u32,
    pub labels: Vec<String>,
    conv: Vec<ConvParams>,
    fc1: LinearParams,
    fc2: LinearParams,
}

impl SavedClassifier {
    pub fn new(labels: &[String], network: &ConvNet) -> Self {
        Self {
            version: FORMAT_VERSION,
            labels: labels.to_vec(),
            conv: network
                .conv
                .iter()
                .map(|layer| ConvParams {
                    weight: layer.weight.clone(),
                    bias: layer.bias.clone(),
                })
                .collect(),
            fc1: LinearParams {
                weight: network.fc1.weight.clone(),
                bias: network.fc1.bias.clone(),
            },
            fc2: LinearParams {
                weight: network.fc2.weight.clone(),
                bias: network.fc2.bias.clone(),
            },
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WeightsError> {
        let path = path.as_ref();
        let io_error = |source| WeightsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| {
            if e.is_io() {
                io_error(e.into())
            } else {
                WeightsError::Format(e)
            }
        })?;
        writer.flush().map_err(io_error)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeightsError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| WeightsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let saved: SavedClassifier = serde_json::from_reader(BufReader::new(file))?;
        if saved.version != FORMAT_VERSION {
            return Err(WeightsError::Version {
                expected: FORMAT_VERSION,
                found: saved.version,
            });
        }
        Ok(saved)
    }

    /// Checks every layer against the fixed architecture and builds the network.
    pub fn into_network(self) -> Result<ConvNet, WeightsError> {
        const CONV_NAMES: [&str; 3] = ["conv1", "conv2", "conv3"];

        if self.conv.len() != CONV_NAMES.len() {
            return Err(WeightsError::LayerShape {
                layer: "conv",
                expected: vec![CONV_NAMES.len()],
                actual: vec![self.conv.len()],
            });
        }

        let num_classes = self.labels.len();
        let mut conv = Vec::with_capacity(CONV_NAMES.len());
        for (i, params) in self.conv.into_iter().enumerate() {
            let (in_c, out_c) = (CONV_CHANNELS[i], CONV_CHANNELS[i + 1]);
            check_shape(
                CONV_NAMES[i],
                &[out_c, in_c, KERNEL_SIZE, KERNEL_SIZE],
                params.weight.shape(),
            )?;
            check_shape(CONV_NAMES[i], &[out_c], params.bias.shape())?;
            conv.push(Conv2d {
                weight: params.weight,
                bias: params.bias,
            });
        }

        check_shape("fc1", &[HIDDEN, FEATURES], self.fc1.weight.shape())?;
        check_shape("fc1", &[HIDDEN], self.fc1.bias.shape())?;
        check_shape("fc2", &[num_classes, HIDDEN], self.fc2.weight.shape())?;
        check_shape("fc2", &[num_classes], self.fc2.bias.shape())?;

        let conv: [Conv2d; 3] = conv.try_into().map_err(|_| WeightsError::LayerShape {
            layer: "conv",
            expected: vec![CONV_NAMES.len()],
            actual: vec![],
        })?;

        Ok(ConvNet {
            conv,
            fc1: Linear {
                weight: self.fc1.weight,
                bias: self.fc1.bias,
            },
            dropout: Dropout { p: DROPOUT },
            fc2: Linear {
                weight: self.fc2.weight,
                bias: self.fc2.bias,
            },
        })
    }
}

fn check_shape(
    layer: &'static str,
    expected: &[usize],
    actual: &[usize],
) -> Result<(), WeightsError> {
    if expected != actual {
        return Err(WeightsError::LayerShape {
            layer,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
