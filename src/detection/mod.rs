//! Coin detection stages, in pipeline order.

pub mod ingest;
pub mod preprocessing;
pub mod circles;
pub mod classify;
pub mod annotate;
pub mod glyphs;

pub use annotate::AnnotationStyle;
pub use circles::DetectorParams;
pub use classify::{DenominationRule, DenominationTable};
pub use ingest::LoadedImage;
pub use preprocessing::BlurParams;
