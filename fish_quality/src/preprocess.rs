use crate::error::DecodeError;
use image::{imageops::FilterType, GrayImage, Luma, RgbImage};
use ndarray::{Array3, ArrayView3};
use std::path::Path;

pub const INPUT_CHANNELS: usize = 1;
pub const INPUT_SIZE: usize = 128;

/// Encoded image bytes plus the name the caller stored them under.
///
/// Consumed by the pipeline: the bytes are decoded once and dropped.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub reference: String,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, reference: impl Into<String>) -> Self {
        Self {
            bytes,
            reference: reference.into(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| DecodeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(bytes, path.display().to_string()))
    }
}

/// Grayscale image tensor laid out as (channels, height, width).
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedTensor {
    data: Array3<f32>,
}

impl PreprocessedTensor {
    /// Wraps an existing array without checking its shape; classifiers do that.
    pub fn from_array(data: Array3<f32>) -> Self {
        Self { data }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }
}

/// ITU-R 601-2 luma, `L = R * 299/1000 + G * 587/1000 + B * 114/1000`.
fn luma_rec601(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let l = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000;
        Luma([l as u8])
    })
}

pub fn preprocess(image_data: &[u8]) -> Result<PreprocessedTensor, DecodeError> {
    let image_reader = image::ImageReader::new(std::io::Cursor::new(image_data))
        .with_guessed_format()
        .map_err(DecodeError::Format)?;

    let original_img = image_reader.decode()?;
    let gray = luma_rec601(&original_img.to_rgb8());
    let resized = image::imageops::resize(
        &gray,
        INPUT_SIZE as u32,
        INPUT_SIZE as u32,
        FilterType::Triangle,
    );

    let mut input = Array3::zeros((INPUT_CHANNELS, INPUT_SIZE, INPUT_SIZE));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, y as usize, x as usize]] = pixel.0[0] as f32 / 255.;
    }

    Ok(PreprocessedTensor::from_array(input))
}
