//! Stand-ins for the counting, weighing and positioning hardware.
//!
//! The pipeline only depends on the two traits, so a real counter or GPS
//! receiver can replace the random implementations.

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

pub trait CountWeightEstimator: Send + Sync + 'static {
    /// Returns (fish count, total weight in kg).
    fn estimate(&self) -> (u32, f64);
}

pub trait GeoLocator: Send + Sync + 'static {
    /// Returns (latitude, longitude) in degrees.
    fn locate(&self) -> (f64, f64);
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Either the thread-local generator or a seeded one shared behind a lock.
#[derive(Debug, Default)]
struct SharedRng {
    seeded: Option<Mutex<StdRng>>,
}

impl SharedRng {
    fn seeded(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut dyn RngCore) -> T) -> T {
        match &self.seeded {
            Some(rng) => f(&mut *rng.lock()),
            None => f(&mut rand::rng()),
        }
    }
}

#[derive(Debug, Default)]
pub struct RandomCountWeight {
    rng: SharedRng,
}

impl RandomCountWeight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SharedRng::seeded(seed),
        }
    }
}

impl CountWeightEstimator for RandomCountWeight {
    fn estimate(&self) -> (u32, f64) {
        self.rng.with(|rng| {
            let count = rng.random_range(1..=10u32);
            let avg_weight = rng.random_range(0.2..2.0f64);
            (count, round_to(count as f64 * avg_weight, 2))
        })
    }
}

#[derive(Debug, Default)]
pub struct RandomGeoLocator {
    rng: SharedRng,
}

impl RandomGeoLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SharedRng::seeded(seed),
        }
    }
}

impl GeoLocator for RandomGeoLocator {
    fn locate(&self) -> (f64, f64) {
        self.rng.with(|rng| {
            let lat = rng.random_range(-90.0..90.0f64);
            let lon = rng.random_range(-180.0..180.0f64);
            (round_to(lat, 5), round_to(lon, 5))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedCountWeight {
    pub count: u32,
    pub total_weight: f64,
}

impl CountWeightEstimator for FixedCountWeight {
    fn estimate(&self) -> (u32, f64) {
        (self.count, self.total_weight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedGeoLocator {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocator for FixedGeoLocator {
    fn locate(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimals_at_most(value: f64, decimals: i32) -> bool {
        (round_to(value, decimals) - value).abs() < 1e-9
    }

    #[test]
    fn test_random_count_weight_ranges() {
        let estimator = RandomCountWeight::new();
        for _ in 0..500 {
            let (count, total_weight) = estimator.estimate();
            assert!((1..=10).contains(&count));
            assert!(total_weight >= 0.2 * count as f64 - 0.005);
            assert!(total_weight <= 2.0 * count as f64 + 0.005);
            assert!(decimals_at_most(total_weight, 2));
        }
    }

    #[test]
    fn test_random_geotag_ranges() {
        let locator = RandomGeoLocator::new();
        for _ in 0..500 {
            let (lat, lon) = locator.locate();
            assert!((-90.0..=90.0).contains(&lat));
            assert!((-180.0..=180.0).contains(&lon));
            assert!(decimals_at_most(lat, 5));
            assert!(decimals_at_most(lon, 5));
        }
    }

    #[test]
    fn test_seeded_generators_repeat() {
        let a = RandomCountWeight::seeded(99);
        let b = RandomCountWeight::seeded(99);
        let first: Vec<_> = (0..10).map(|_| a.estimate()).collect();
        let second: Vec<_> = (0..10).map(|_| b.estimate()).collect();
        assert_eq!(first, second);

        let a = RandomGeoLocator::seeded(5);
        let b = RandomGeoLocator::seeded(5);
        assert_eq!(a.locate(), b.locate());
    }

    #[test]
    fn test_fixed_generators() {
        let estimator = FixedCountWeight {
            count: 7,
            total_weight: 8.25,
        };
        assert_eq!(estimator.estimate(), (7, 8.25));

        let locator = FixedGeoLocator {
            latitude: 59.91,
            longitude: 10.75,
        };
        assert_eq!(locator.locate(), (59.91, 10.75));
    }
}
