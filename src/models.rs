use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use image::RgbImage;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoinError;

/// Exact money value held as a count of minor units (hundredths).
///
/// Totals are summed as integers so adding many coins never drifts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    minor_units: i64,
}

/// Accepted JSON forms for an amount: `"0.05"` or `0.05`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Text(String),
    Number(f64),
}

impl Amount {
    pub const ZERO: Amount = Amount { minor_units: 0 };

    pub const fn from_minor_units(minor_units: i64) -> Self {
        Self { minor_units }
    }

    pub const fn minor_units(&self) -> i64 {
        self.minor_units
    }

    /// Convert a float carrying at most two decimals.
    pub fn from_f64(value: f64) -> Result<Self, CoinError> {
        if !value.is_finite() {
            return Err(CoinError::config(format!("amount {} is not finite", value)));
        }
        let scaled = value * 100.0;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 {
            return Err(CoinError::config(format!(
                "amount {} has more than two decimal places",
                value
            )));
        }
        if rounded.abs() > i64::MAX as f64 {
            return Err(CoinError::config(format!("amount {} is out of range", value)));
        }
        Ok(Self::from_minor_units(rounded as i64))
    }
}

impl FromStr for Amount {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoinError::config(format!("invalid amount '{}'", s));

        let text = s.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        // Digits past the hundredths are only tolerated as trailing zeros.
        if fraction.len() > 2 && fraction[2..].bytes().any(|b| b != b'0') {
            return Err(CoinError::config(format!(
                "amount '{}' has more than two decimal places",
                s
            )));
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let mut cents = 0i64;
        for (i, b) in fraction.bytes().take(2).enumerate() {
            let digit = (b - b'0') as i64;
            cents += if i == 0 { digit * 10 } else { digit };
        }
        let minor_units = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(invalid)?;

        Ok(Self::from_minor_units(if negative { -minor_units } else { minor_units }))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match AmountRepr::deserialize(deserializer)? {
            AmountRepr::Text(text) => text.parse(),
            AmountRepr::Number(value) => Amount::from_f64(value),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// Serialized as a two-decimal string so JSON readers never see a float.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let abs = self.minor_units.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount::from_minor_units(self.minor_units + rhs.minor_units)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.minor_units += rhs.minor_units;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

/// A circle reported by the detector, in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectedCircle {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    /// Edge pixels supporting the chosen radius.
    pub votes: u32,
}

impl DetectedCircle {
    pub fn new(x: i32, y: i32, radius: i32) -> Self {
        Self {
            x,
            y,
            radius,
            votes: 0,
        }
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// How a circle's radius resolved against the denomination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rule", rename_all = "snake_case")]
pub enum Classification {
    /// Radius lies inside the rule's range (index into the table).
    Exact(usize),
    /// Radius lies within the tolerance window of the rule's range.
    Tolerance(usize),
    Unmatched,
}

impl Classification {
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            Classification::Exact(i) | Classification::Tolerance(i) => Some(*i),
            Classification::Unmatched => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.rule_index().is_some()
    }
}

/// One detected circle with the value credited for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoinMatch {
    pub circle: DetectedCircle,
    pub value: Option<Amount>,
    pub classification: Classification,
}

/// Outcome of a single analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub total_value: Amount,
    pub annotated_image: RgbImage,
    pub matched_count: usize,
    pub unmatched_count: usize,
    pub coins: Vec<CoinMatch>,
}

impl AnalysisResult {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            total_value: self.total_value,
            matched_count: self.matched_count,
            unmatched_count: self.unmatched_count,
            coins: self.coins.clone(),
        }
    }
}

/// Serializable view of an [`AnalysisResult`] without the image.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub total_value: Amount,
    pub matched_count: usize,
    pub unmatched_count: usize,
    pub coins: Vec<CoinMatch>,
}
