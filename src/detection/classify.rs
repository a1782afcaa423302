//! Radius-to-denomination matching.
//!
//! Rules are evaluated in declared order. An exact range hit always beats a
//! tolerance hit, and among hits of the same kind the first declared rule
//! wins, so overlapping ranges resolve deterministically.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoinError, Result};
use crate::models::{Amount, Classification, CoinMatch, DetectedCircle};

/// Default tolerance window, in pixels.
pub const DEFAULT_TOLERANCE: i32 = 5;

/// Inclusive radius range mapped to a coin value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenominationRule {
    pub radius_min: i32,
    pub radius_max: i32,
    pub value: Amount,
}

impl DenominationRule {
    pub fn new(radius_min: i32, radius_max: i32, value: Amount) -> Self {
        Self {
            radius_min,
            radius_max,
            value,
        }
    }

    pub fn contains(&self, radius: i32) -> bool {
        radius >= self.radius_min && radius <= self.radius_max
    }

    /// Pixels between `radius` and the nearest edge of the range; 0 inside it.
    pub fn distance_to(&self, radius: i32) -> i32 {
        if radius < self.radius_min {
            self.radius_min - radius
        } else if radius > self.radius_max {
            radius - self.radius_max
        } else {
            0
        }
    }

    pub fn overlaps(&self, other: &DenominationRule) -> bool {
        self.radius_min <= other.radius_max && other.radius_min <= self.radius_max
    }
}

/// Ordered denomination rules plus the tolerance window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenominationTable {
    pub rules: Vec<DenominationRule>,
    pub tolerance: i32,
}

impl Default for DenominationTable {
    /// The reference peso table. The 5.00 and 10.00 ranges overlap on
    /// 48-55; the 5.00 rule is declared first and wins there.
    fn default() -> Self {
        let rule =
            |min, max, cents| DenominationRule::new(min, max, Amount::from_minor_units(cents));
        Self {
            rules: vec![
                rule(20, 28, 5),
                rule(29, 34, 10),
                rule(35, 40, 25),
                rule(41, 47, 100),
                rule(48, 55, 500),
                rule(46, 60, 1000),
                rule(61, 70, 2000),
            ],
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl DenominationTable {
    pub fn new(rules: Vec<DenominationRule>) -> Self {
        Self {
            rules,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: i32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tolerance < 0 {
            return Err(CoinError::config(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.radius_min < 0 {
                return Err(CoinError::config(format!(
                    "rule {}: radius_min {} is negative",
                    i, rule.radius_min
                )));
            }
            if rule.radius_min > rule.radius_max {
                return Err(CoinError::config(format!(
                    "rule {}: radius_min {} exceeds radius_max {}",
                    i, rule.radius_min, rule.radius_max
                )));
            }
        }
        Ok(())
    }

    /// Index pairs `(earlier, later)` of rules whose ranges overlap.
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.rules.iter().enumerate() {
            for (j, b) in self.rules.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    pub fn classify(&self, radius: i32) -> Classification {
        if let Some(i) = self.rules.iter().position(|r| r.contains(radius)) {
            return Classification::Exact(i);
        }
        if let Some(i) = self
            .rules
            .iter()
            .position(|r| r.distance_to(radius) <= self.tolerance)
        {
            return Classification::Tolerance(i);
        }
        Classification::Unmatched
    }

    pub fn value_of(&self, classification: Classification) -> Option<Amount> {
        classification
            .rule_index()
            .and_then(|i| self.rules.get(i))
            .map(|r| r.value)
    }
}

/// Per-coin matches and their aggregate for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub coins: Vec<CoinMatch>,
    pub total_value: Amount,
    pub matched_count: usize,
    pub unmatched_count: usize,
}

/// Classify every circle and total the matched values.
pub fn classify_circles(circles: &[DetectedCircle], table: &DenominationTable) -> Classified {
    let mut coins = Vec::with_capacity(circles.len());
    let mut total_value = Amount::ZERO;
    let mut matched_count = 0;
    let mut unmatched_count = 0;

    for circle in circles {
        let classification = table.classify(circle.radius);
        let value = table.value_of(classification);
        match value {
            Some(v) => {
                total_value += v;
                matched_count += 1;
            }
            None => unmatched_count += 1,
        }
        debug!(
            x = circle.x,
            y = circle.y,
            radius = circle.radius,
            ?classification,
            "classified circle"
        );
        coins.push(CoinMatch {
            circle: *circle,
            value,
            classification,
        });
    }

    Classified {
        coins,
        total_value,
        matched_count,
        unmatched_count,
    }
}
