//! Small convolutional classifier evaluated with `ndarray`.
//!
//! Layout mirrors the reference network:
//!
//! ```text
//! conv(1->32)  relu maxpool
//! conv(32->64) relu maxpool
//! conv(64->128) relu global-avg-pool
//! linear(128->128) relu dropout linear(128->N)
//! ```
//!
//! Tensors are (channels, height, width); weights use PyTorch layouts so that
//! exported parameters map one-to-one.

use crate::error::ShapeMismatchError;
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView3, Axis};
use rand::Rng;

pub const CONV_CHANNELS: [usize; 4] = [1, 32, 64, 128];
pub const KERNEL_SIZE: usize = 3;
pub const FEATURES: usize = 128;
pub const HIDDEN: usize = 128;
pub const DROPOUT: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Conv2d {
    /// (out_channels, in_channels, kernel, kernel)
    pub weight: Array4<f32>,
    pub bias: Array1<f32>,
}

impl Conv2d {
    pub fn random<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        rng: &mut R,
    ) -> Self {
        let bound = 1.0 / ((in_channels * kernel * kernel) as f32).sqrt();
        Self {
            weight: Array4::from_shape_simple_fn(
                (out_channels, in_channels, kernel, kernel),
                || rng.random_range(-bound..bound),
            ),
            bias: Array1::from_shape_simple_fn(out_channels, || rng.random_range(-bound..bound)),
        }
    }

    /// Stride 1 with zero padding of `kernel / 2`, so spatial size is preserved.
    pub fn forward(&self, input: ArrayView3<f32>) -> Result<Array3<f32>, ShapeMismatchError> {
        let (out_channels, in_channels, kh, kw) = self.weight.dim();
        let (channels, height, width) = input.dim();
        if channels != in_channels {
            return Err(ShapeMismatchError {
                expected: vec![in_channels, height, width],
                actual: input.shape().to_vec(),
            });
        }

        let (ph, pw) = (kh / 2, kw / 2);
        let mut padded = Array3::<f32>::zeros((channels, height + 2 * ph, width + 2 * pw));
        padded
            .slice_mut(s![.., ph..ph + height, pw..pw + width])
            .assign(&input);

        // im2col: one row per (channel, ky, kx), one column per output pixel.
        let mut columns = Array2::<f32>::zeros((channels * kh * kw, height * width));
        for c in 0..channels {
            for ky in 0..kh {
                for kx in 0..kw {
                    let window = padded.slice(s![c, ky..ky + height, kx..kx + width]);
                    let mut row = columns.row_mut((c * kh + ky) * kw + kx);
                    row.iter_mut()
                        .zip(window.iter())
                        .for_each(|(dst, src)| *dst = *src);
                }
            }
        }

        let kernel = Array2::from_shape_vec(
            (out_channels, in_channels * kh * kw),
            self.weight.iter().copied().collect(),
        )
        .map_err(|_| ShapeMismatchError {
            expected: vec![out_channels, in_channels, kh, kw],
            actual: self.weight.shape().to_vec(),
        })?;

        let mut output = kernel.dot(&columns);
        output += &self.bias.view().insert_axis(Axis(1));

        Array3::from_shape_vec((out_channels, height, width), output.into_iter().collect())
            .map_err(|_| ShapeMismatchError {
                expected: vec![out_channels, height, width],
                actual: vec![out_channels, height * width],
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    /// (out_features, in_features)
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Linear {
    pub fn random<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features as f32).sqrt();
        Self {
            weight: Array2::from_shape_simple_fn((out_features, in_features), || {
                rng.random_range(-bound..bound)
            }),
            bias: Array1::from_shape_simple_fn(out_features, || rng.random_range(-bound..bound)),
        }
    }

    pub fn forward(&self, input: &Array1<f32>) -> Result<Array1<f32>, ShapeMismatchError> {
        let (out_features, in_features) = self.weight.dim();
        if input.len() != in_features {
            return Err(ShapeMismatchError {
                expected: vec![in_features],
                actual: vec![input.len()],
            });
        }
        debug_assert_eq!(self.bias.len(), out_features);
        Ok(self.weight.dot(input) + &self.bias)
    }
}

/// Inverted dropout; the identity outside training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    pub p: f32,
}

impl Dropout {
    pub fn forward_t<R: Rng + ?Sized>(
        &self,
        mut input: Array1<f32>,
        train: bool,
        rng: &mut R,
    ) -> Array1<f32> {
        if !train || self.p <= 0.0 {
            return input;
        }
        let scale = 1.0 / (1.0 - self.p);
        input.mapv_inplace(|v| {
            if rng.random::<f32>() < self.p {
                0.0
            } else {
                v * scale
            }
        });
        input
    }
}

pub fn relu<D: ndarray::Dimension>(mut input: ndarray::Array<f32, D>) -> ndarray::Array<f32, D> {
    input.mapv_inplace(|v| v.max(0.0));
    input
}

/// 2x2 max pooling with stride 2; odd trailing rows and columns are dropped.
pub fn max_pool2(input: ArrayView3<f32>) -> Array3<f32> {
    let (channels, height, width) = input.dim();
    let (oh, ow) = (height / 2, width / 2);
    Array3::from_shape_fn((channels, oh, ow), |(c, y, x)| {
        input
            .slice(s![c, 2 * y..2 * y + 2, 2 * x..2 * x + 2])
            .fold(f32::NEG_INFINITY, |acc, &v| acc.max(v))
    })
}

pub fn global_avg_pool(input: ArrayView3<f32>) -> Array1<f32> {
    input
        .axis_iter(Axis(0))
        .map(|channel| channel.mean().unwrap_or(0.0))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvNet {
    pub conv: [Conv2d; 3],
    pub fc1: Linear,
    pub dropout: Dropout,
    pub fc2: Linear,
}

impl ConvNet {
    /// PyTorch-style default initialisation: U(-1/sqrt(fan_in), 1/sqrt(fan_in)).
    pub fn random<R: Rng + ?Sized>(num_classes: usize, rng: &mut R) -> Self {
        let conv = [0, 1, 2].map(|i| {
            Conv2d::random(CONV_CHANNELS[i], CONV_CHANNELS[i + 1], KERNEL_SIZE, rng)
        });
        Self {
            conv,
            fc1: Linear::random(FEATURES, HIDDEN, rng),
            dropout: Dropout { p: DROPOUT },
            fc2: Linear::random(HIDDEN, num_classes, rng),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.fc2.bias.len()
    }

    /// Feature extractor output: one value per final convolution channel.
    pub fn features(&self, input: ArrayView3<f32>) -> Result<Array1<f32>, ShapeMismatchError> {
        let [conv1, conv2, conv3] = &self.conv;
        let x = max_pool2(relu(conv1.forward(input)?).view());
        let x = max_pool2(relu(conv2.forward(x.view())?).view());
        let x = relu(conv3.forward(x.view())?);
        Ok(global_avg_pool(x.view()))
    }

    /// Returns the raw logits. Dropout only runs when `train` is set.
    pub fn forward_t<R: Rng + ?Sized>(
        &self,
        input: ArrayView3<f32>,
        train: bool,
        rng: &mut R,
    ) -> Result<Array1<f32>, ShapeMismatchError> {
        let features = self.features(input)?;
        let hidden = relu(self.fc1.forward(&features)?);
        let hidden = self.dropout.forward_t(hidden, train, rng);
        self.fc2.forward(&hidden)
    }

    pub fn forward(&self, input: ArrayView3<f32>) -> Result<Array1<f32>, ShapeMismatchError> {
        let features = self.features(input)?;
        let hidden = relu(self.fc1.forward(&features)?);
        self.fc2.forward(&hidden)
    }
}
