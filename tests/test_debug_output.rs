mod common;

use common::*;
use coincount::detection::ingest;

const STAGES: [&str; 5] = [
    "00_input",
    "01_grayscale",
    "02_gaussian_blur",
    "03_edge_detection",
    "04_annotation",
];

#[test]
fn writes_one_image_per_stage() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");

    let pipeline = CoinPipeline::new(four_rule_config()).with_debug(debug_dir.clone())?;
    assert_eq!(pipeline.debug_dir(), Some(debug_dir.as_path()));
    let result = pipeline.run(ingest::from_dynamic(three_coin_image()))?;
    assert_eq!(result.matched_count, 3);

    for stage in STAGES {
        let path = debug_dir.join(stage).join("01.png");
        assert!(path.is_file(), "missing {}", path.display());
    }

    let annotated = image::open(debug_dir.join("04_annotation").join("01.png"))?.to_rgb8();
    assert_eq!(annotated, result.annotated_image);
    Ok(())
}

#[test]
fn refuses_non_empty_debug_directory() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    let err = CoinPipeline::new(AnalysisConfig::default())
        .with_debug(dir.path().to_path_buf())
        .err()
        .expect("non-empty directory must be rejected");
    assert!(matches!(err, CoinError::Config(_)));
    Ok(())
}
