//! Offline ATS ground-truth labeling pipeline.
//!
//! Pulls résumés and job descriptions from a dataset registry, structures résumé
//! text, pairs résumés with candidate jobs, scores each pair through a pluggable
//! `ScoreEngine`, and persists the labeled dataset with run statistics.

pub mod config;
pub mod errors;
pub mod ground_truth;
pub mod loaders;
pub mod matching;
pub mod models;
pub mod registry;
pub mod storage;
pub mod transform;

pub use errors::PipelineError;
