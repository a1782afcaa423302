mod common;

use common::*;

#[test]
fn loads_custom_table_from_file() -> anyhow::Result<()> {
    let file = tempfile::Builder::new().suffix(".json").tempfile()?;
    std::fs::write(
        file.path(),
        r#"{
            "detector": { "min_center_distance": 40 },
            "denominations": {
                "tolerance": 2,
                "rules": [
                    { "radius_min": 20, "radius_max": 28, "value": "0.05" },
                    { "radius_min": 29, "radius_max": 34, "value": "0.10" },
                    { "radius_min": 35, "radius_max": 40, "value": "0.25" },
                    { "radius_min": 41, "radius_max": 47, "value": "1.00" }
                ]
            },
            "annotation": { "label_prefix": "$" }
        }"#,
    )?;

    let config = AnalysisConfig::load(file.path())?;
    assert_eq!(config.detector.min_center_distance, 40.0);
    assert_eq!(config.denominations.tolerance, 2);
    assert_eq!(config.denominations.rules, four_rule_table().rules);
    assert_eq!(config.annotation.label_prefix, "$");
    assert_eq!(config.warn_overlaps(), 0);

    let result = coincount::analyze(&three_coin_image(), &config)?;
    assert_eq!(result.total_value.to_string(), "1.15");
    Ok(())
}

#[test]
fn invalid_rules_fail_to_load() -> anyhow::Result<()> {
    let file = tempfile::Builder::new().suffix(".json").tempfile()?;
    std::fs::write(
        file.path(),
        r#"{ "denominations": { "rules": [ { "radius_min": 40, "radius_max": 30, "value": "1.00" } ] } }"#,
    )?;

    let err = AnalysisConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, CoinError::Config(_)));
    Ok(())
}

#[test]
fn malformed_json_is_a_config_error() -> anyhow::Result<()> {
    let file = tempfile::Builder::new().suffix(".json").tempfile()?;
    std::fs::write(file.path(), "{ not json")?;

    let err = AnalysisConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, CoinError::Config(_)));
    assert!(err.to_string().contains(&file.path().display().to_string()));
    Ok(())
}

#[test]
fn detector_bounds_are_validated() {
    let config = AnalysisConfig {
        detector: DetectorParams {
            min_radius: 60,
            max_radius: 10,
            ..DetectorParams::default()
        },
        ..AnalysisConfig::default()
    };
    assert!(matches!(config.validate(), Err(CoinError::Config(_))));
}
