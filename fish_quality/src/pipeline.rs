use crate::{
    classifier::{Classifier, CnnClassifier},
    error::PipelineError,
    generators::{CountWeightEstimator, GeoLocator, RandomCountWeight, RandomGeoLocator},
    preprocess::{preprocess, RawImage},
    scorer::{score, Freshness, QualityVerdict},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub species: String,
    pub freshness: Freshness,
    pub count: u32,
    pub total_weight: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    pub quality_verdict: QualityVerdict,
    pub image_reference: String,
}

/// Image in, quality report out.
///
/// Cloning is cheap; clones share the same read-only classifiers.
pub struct QualityPipeline<C: Classifier = CnnClassifier> {
    species: Arc<C>,
    freshness: Arc<C>,
    count_weight: Arc<dyn CountWeightEstimator>,
    geo_locator: Arc<dyn GeoLocator>,
}

impl<C: Classifier> Clone for QualityPipeline<C> {
    fn clone(&self) -> Self {
        Self {
            species: self.species.clone(),
            freshness: self.freshness.clone(),
            count_weight: self.count_weight.clone(),
            geo_locator: self.geo_locator.clone(),
        }
    }
}

impl<C: Classifier> QualityPipeline<C> {
    pub fn new(species: C, freshness: C) -> Self {
        Self {
            species: Arc::new(species),
            freshness: Arc::new(freshness),
            count_weight: Arc::new(RandomCountWeight::new()),
            geo_locator: Arc::new(RandomGeoLocator::new()),
        }
    }

    pub fn with_count_weight(mut self, estimator: impl CountWeightEstimator) -> Self {
        self.count_weight = Arc::new(estimator);
        self
    }

    pub fn with_geo_locator(mut self, locator: impl GeoLocator) -> Self {
        self.geo_locator = Arc::new(locator);
        self
    }

    pub fn species_classifier(&self) -> &C {
        &self.species
    }

    pub fn freshness_classifier(&self) -> &C {
        &self.freshness
    }

    /// Runs both classifiers on one preprocessed tensor and scores the result.
    ///
    /// Any failure aborts the whole call; no partial report is built.
    #[instrument(skip(self, image), fields(image = %image.reference))]
    pub fn analyze(&self, image: RawImage) -> Result<QualityReport, PipelineError> {
        let RawImage { bytes, reference } = image;
        let tensor = preprocess(&bytes)?;
        drop(bytes);

        let species = self
            .species
            .predict(&tensor)
            .map_err(|e| PipelineError::from_classifier("species", e))?;
        let freshness_class = self
            .freshness
            .predict(&tensor)
            .map_err(|e| PipelineError::from_classifier("freshness", e))?;
        let freshness = Freshness::from_label(&freshness_class.label);

        let (count, total_weight) = self.count_weight.estimate();
        let (latitude, longitude) = self.geo_locator.locate();
        let quality_verdict = score(freshness, count, total_weight);
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

        tracing::debug!(
            "species={} freshness={} ({}) count={} total_weight={} verdict={}",
            species.label,
            freshness,
            freshness_class.label,
            count,
            total_weight,
            quality_verdict
        );

        Ok(QualityReport {
            species: species.label,
            freshness,
            count,
            total_weight,
            latitude,
            longitude,
            timestamp,
            quality_verdict,
            image_reference: reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::LabelCatalog,
        classifier::InferenceResult,
        error::{ClassifierError, ShapeMismatchError},
        generators::{FixedCountWeight, FixedGeoLocator},
        network::{ConvNet, HIDDEN},
        preprocess::PreprocessedTensor,
    };
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use ndarray::{Array1, Array2};
    use rand::{rngs::StdRng, SeedableRng};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png(width: u32, height: u32, seed: u8) -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_fn(width, height, |x, y| {
            Rgb([
                (x as u8).wrapping_mul(seed),
                (y as u8).wrapping_add(seed),
                ((x + y) as u8) ^ seed,
            ])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::from(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn catalog(labels: &[&str]) -> LabelCatalog {
        LabelCatalog::from_labels(labels.iter().map(|l| l.to_string()).collect()).unwrap()
    }

    /// Classifier whose prediction is fixed by its output biases.
    fn biased(labels: &[&str], winner: usize) -> CnnClassifier {
        let mut network = ConvNet::random(labels.len(), &mut StdRng::seed_from_u64(1));
        network.fc2.weight = Array2::zeros((labels.len(), HIDDEN));
        let mut bias = Array1::zeros(labels.len());
        bias[winner] = 1.0;
        network.fc2.bias = bias;
        CnnClassifier::with_parameters("biased", catalog(labels), network).unwrap()
    }

    fn fixed_pipeline(species: CnnClassifier, freshness: CnnClassifier) -> QualityPipeline {
        QualityPipeline::new(species, freshness)
            .with_count_weight(FixedCountWeight {
                count: 6,
                total_weight: 6.0,
            })
            .with_geo_locator(FixedGeoLocator {
                latitude: 12.5,
                longitude: -45.25,
            })
    }

    #[test]
    fn test_analyze_assembles_report() {
        let pipeline = fixed_pipeline(
            biased(&["Catla", "Rohu", "Tilapia"], 2),
            biased(&["C1", "C2", "C3"], 0),
        );

        let report = pipeline
            .analyze(RawImage::new(png(200, 150, 3), "uploads/img_1.png"))
            .unwrap();

        assert_eq!(report.species, "Tilapia");
        assert_eq!(report.freshness, Freshness::Fresh);
        assert_eq!(report.count, 6);
        assert_eq!(report.total_weight, 6.0);
        assert_eq!(report.latitude, 12.5);
        assert_eq!(report.longitude, -45.25);
        assert_eq!(report.quality_verdict, QualityVerdict::Good);
        assert_eq!(report.image_reference, "uploads/img_1.png");
        assert!(chrono::NaiveDateTime::parse_from_str(&report.timestamp, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_analyze_maps_freshness_labels() {
        for (winner, expected, verdict) in [
            (1, Freshness::Stale, QualityVerdict::Good),
            (2, Freshness::Spoiled, QualityVerdict::Average),
        ] {
            let pipeline = fixed_pipeline(biased(&["Cod"], 0), biased(&["C1", "C2", "C3"], winner));
            let report = pipeline.analyze(RawImage::new(png(40, 40, 9), "x")).unwrap();
            assert_eq!(report.freshness, expected);
            assert_eq!(report.quality_verdict, verdict);
        }
    }

    #[test]
    fn test_analyze_rejects_malformed_bytes() {
        let pipeline = fixed_pipeline(biased(&["Cod"], 0), biased(&["C1"], 0));
        let result = pipeline.analyze(RawImage::new(b"<html>".to_vec(), "broken.png"));
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    struct CountingClassifier {
        catalog: LabelCatalog,
        calls: AtomicUsize,
        fail: bool,
    }

    impl Classifier for CountingClassifier {
        fn predict(&self, _input: &PreprocessedTensor) -> Result<InferenceResult, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ShapeMismatchError {
                    expected: vec![1, 128, 128],
                    actual: vec![1, 1, 1],
                }
                .into());
            }
            Ok(InferenceResult {
                predicted_label_index: 0,
                label: self.catalog.get(0).unwrap_or_default().to_string(),
            })
        }

        fn catalog(&self) -> &LabelCatalog {
            &self.catalog
        }
    }

    #[test]
    fn test_first_classifier_failure_aborts() {
        let pipeline = QualityPipeline::new(
            CountingClassifier {
                catalog: catalog(&["Cod"]),
                calls: AtomicUsize::new(0),
                fail: true,
            },
            CountingClassifier {
                catalog: catalog(&["C1"]),
                calls: AtomicUsize::new(0),
                fail: false,
            },
        );

        let result = pipeline.analyze(RawImage::new(png(16, 16, 1), "x"));

        match result {
            Err(PipelineError::ShapeMismatch { classifier, .. }) => {
                assert_eq!(classifier, "species")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(pipeline.species_classifier().calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.freshness_classifier().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_decode_failure_skips_classifiers() {
        let pipeline = QualityPipeline::new(
            CountingClassifier {
                catalog: catalog(&["Cod"]),
                calls: AtomicUsize::new(0),
                fail: false,
            },
            CountingClassifier {
                catalog: catalog(&["C1"]),
                calls: AtomicUsize::new(0),
                fail: false,
            },
        );

        assert!(pipeline.analyze(RawImage::new(vec![0xFF; 32], "x")).is_err());
        assert_eq!(pipeline.species_classifier().calls.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.freshness_classifier().calls.load(Ordering::SeqCst), 0);
    }

    #[derive(Debug, PartialEq)]
    struct Outcome {
        image_reference: String,
        species: String,
        freshness: Freshness,
        quality_verdict: QualityVerdict,
        species_logits: Vec<f32>,
        freshness_logits: Vec<f32>,
    }

    fn outcome(pipeline: &QualityPipeline, index: usize, bytes: &[u8]) -> Outcome {
        let reference = format!("uploads/img_{}.png", index);
        let report = pipeline
            .analyze(RawImage::new(bytes.to_vec(), reference))
            .unwrap();
        let tensor = preprocess(bytes).unwrap();
        Outcome {
            image_reference: report.image_reference,
            species: report.species,
            freshness: report.freshness,
            quality_verdict: report.quality_verdict,
            species_logits: pipeline.species_classifier().logits(&tensor).unwrap().to_vec(),
            freshness_logits: pipeline.freshness_classifier().logits(&tensor).unwrap().to_vec(),
        }
    }

    #[test]
    fn test_concurrent_analyze_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(2024);
        let species = catalog(&["Bass", "Carp", "Pike", "Trout"]);
        let pipeline = fixed_pipeline(
            CnnClassifier::random("species", species, &mut rng),
            CnnClassifier::random("freshness", catalog(&["C1", "C2", "C3"]), &mut rng),
        );
        let images: Vec<Vec<u8>> = (0..3)
            .map(|i| png(64 + i * 40, 80, i as u8 * 50 + 7))
            .collect();

        let sequential: Vec<Outcome> = images
            .iter()
            .enumerate()
            .map(|(i, bytes)| outcome(&pipeline, i, bytes))
            .collect();
        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            assert_ne!(sequential[a].species_logits, sequential[b].species_logits);
            assert_ne!(sequential[a].freshness_logits, sequential[b].freshness_logits);
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|worker| {
                    let pipeline = pipeline.clone();
                    let images = &images;
                    scope.spawn(move || {
                        (0..images.len() * 2)
                            .map(|offset| {
                                let i = (worker + offset) % images.len();
                                (i, outcome(&pipeline, i, &images[i]))
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            for handle in handles {
                for (i, result) in handle.join().unwrap() {
                    assert_eq!(result, sequential[i]);
                }
            }
        });
    }
}
