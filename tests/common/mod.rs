mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from coincount for tests
pub use coincount::{
    AnalysisConfig, AnalysisResult, Amount, Classification, CoinError, CoinPipeline,
    DetectorParams,
};
