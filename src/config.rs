use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::detection::annotate::AnnotationStyle;
use crate::detection::circles::DetectorParams;
use crate::detection::classify::DenominationTable;
use crate::detection::preprocessing::BlurParams;
use crate::error::{CoinError, Result};

/// Everything one analysis run reads. Fixed for the lifetime of a run.
///
/// Every section may be omitted from JSON and falls back to its default:
///
/// ```json
/// {
///   "detector": { "max_radius": 80 },
///   "denominations": {
///     "tolerance": 3,
///     "rules": [
///       { "radius_min": 20, "radius_max": 28, "value": "0.05" },
///       { "radius_min": 29, "radius_max": 34, "value": 0.10 }
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub blur: BlurParams,
    pub detector: DetectorParams,
    pub denominations: DenominationTable,
    pub annotation: AnnotationStyle,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CoinError::config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CoinError::io(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| CoinError::config(format!("{}: {}", path.display(), e)))
    }

    /// Read, validate and report ambiguous denomination ranges.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::from_json_file(path)?;
        config.validate()?;
        config.warn_overlaps();
        Ok(config)
    }

    /// [`load`](Self::load) the file if one is given, else the reference
    /// configuration. Overlaps are reported either way.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                config.warn_overlaps();
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.blur.validate()?;
        self.detector.validate()?;
        self.denominations.validate()?;
        Ok(())
    }

    /// Log each pair of overlapping ranges. Matching is unaffected: the
    /// earlier rule keeps winning.
    pub fn warn_overlaps(&self) -> usize {
        let overlaps = self.denominations.overlaps();
        for &(first, second) in &overlaps {
            let a = &self.denominations.rules[first];
            let b = &self.denominations.rules[second];
            warn!(
                "denomination rules {} [{}-{}] -> {} and {} [{}-{}] -> {} overlap; rule {} wins",
                first,
                a.radius_min,
                a.radius_max,
                a.value,
                second,
                b.radius_min,
                b.radius_max,
                b.value,
                first
            );
        }
        overlaps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Amount;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[test]
    fn default_matches_reference_setup() {
        let config = AnalysisConfig::default();
        assert_eq!(config.blur.kernel_size, 15);
        assert_eq!(config.detector.accumulator_resolution, 1.2);
        assert_eq!(config.detector.max_radius, 50);
        assert_eq!(config.denominations.rules.len(), 7);
        assert_eq!(config.denominations.tolerance, 5);
        assert!(config.validate().is_ok());
        assert_eq!(config.warn_overlaps(), 2);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn default_configuration_reports_its_overlaps() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let config =
            tracing::subscriber::with_default(subscriber, || AnalysisConfig::load_or_default(None))
                .unwrap();
        assert_eq!(config, AnalysisConfig::default());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("overlap").count(), 2, "{}", output);
        assert!(output.contains("WARN"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json_str(
            r#"{
                "detector": { "max_radius": 100 },
                "denominations": {
                    "rules": [
                        { "radius_min": 20, "radius_max": 28, "value": "0.05" },
                        { "radius_min": 29, "radius_max": 34, "value": 0.10 }
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.detector.max_radius, 100);
        assert_eq!(config.detector.min_radius, 5);
        assert_eq!(config.denominations.tolerance, 5);
        assert_eq!(config.denominations.rules[1].value, Amount::from_minor_units(10));
        assert_eq!(config.blur, BlurParams::default());
    }

    #[test]
    fn rejects_bad_values() {
        let err = AnalysisConfig::from_json_str(
            r#"{ "denominations": { "rules": [ { "radius_min": 1, "radius_max": 2, "value": "1.005" } ] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoinError::Config(_)));

        let config = AnalysisConfig::from_json_str(r#"{ "blur": { "kernel_size": 4 } }"#).unwrap();
        assert!(matches!(config.validate(), Err(CoinError::InvalidKernel { .. })));
    }
}
