//! Ground-truth labeling: score engine seam, label extraction, run statistics,
//! and the generator that ties them to the loaded pools.

pub mod engine;
pub mod generator;
pub mod label;
pub mod stats;

pub use engine::{AtsResult, KeywordScoreEngine, ScoreEngine, ScoreError};
pub use generator::{
    AtsGroundTruthGenerator, DataLoadOptions, GenerationOptions, GroundTruthDataset, LoadSummary,
    PoolOrigin,
};
pub use stats::GenerationStats;
