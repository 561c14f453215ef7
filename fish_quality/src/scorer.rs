use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale,
    Spoiled,
}

impl Freshness {
    /// Maps a raw freshness-dataset label: `C1` is fresh, `C2` stale, anything else spoiled.
    pub fn from_label(label: &str) -> Self {
        match label {
            "C1" => Freshness::Fresh,
            "C2" => Freshness::Stale,
            _ => Freshness::Spoiled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::Fresh => "fresh",
            Freshness::Stale => "stale",
            Freshness::Spoiled => "spoiled",
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityVerdict {
    Good,
    Average,
    Poor,
}

impl QualityVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityVerdict::Good => "GOOD",
            QualityVerdict::Average => "AVERAGE",
            QualityVerdict::Poor => "POOR",
        }
    }

    pub fn from_points(points: u32) -> Self {
        if points >= GOOD_THRESHOLD {
            QualityVerdict::Good
        } else if points >= AVERAGE_THRESHOLD {
            QualityVerdict::Average
        } else {
            QualityVerdict::Poor
        }
    }
}

impl fmt::Display for QualityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const GOOD_THRESHOLD: u32 = 70;
pub const AVERAGE_THRESHOLD: u32 = 40;

const COUNT_THRESHOLD: u32 = 5;
const WEIGHT_THRESHOLD: f64 = 5.0;

pub fn points(freshness: Freshness, count: u32, total_weight: f64) -> u32 {
    let freshness_points = match freshness {
        Freshness::Fresh => 50,
        Freshness::Stale => 25,
        Freshness::Spoiled => 0,
    };
    let count_points = if count > COUNT_THRESHOLD { 20 } else { 10 };
    let weight_points = if total_weight > WEIGHT_THRESHOLD { 30 } else { 15 };

    freshness_points + count_points + weight_points
}

pub fn score(freshness: Freshness, count: u32, total_weight: f64) -> QualityVerdict {
    QualityVerdict::from_points(points(freshness, count, total_weight))
}
