use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobDescription;
use crate::models::resume::TrainingResume;

/// Score at or above which a pair counts as a good match.
pub const GOOD_MATCH_THRESHOLD: f64 = 70.0;

/// A (résumé, job description) tuple. Created unscored by the pair builder and
/// enriched once with ground truth by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPair {
    pub id: String,
    pub resume: TrainingResume,
    pub job_description: JobDescription,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_ats_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_good_match: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TrainingPair {
    pub fn new(resume: TrainingResume, job_description: JobDescription) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resume,
            job_description,
            expected_ats_score: None,
            human_rating: None,
            matched_keywords: None,
            missing_keywords: None,
            is_good_match: None,
            notes: None,
        }
    }

    /// Copies the label's headline fields onto the pair.
    pub fn with_ground_truth(mut self, label: &GroundTruth) -> Self {
        self.expected_ats_score = Some(label.ats_score);
        self.matched_keywords = Some(label.matched_keywords.clone());
        self.missing_keywords = Some(label.missing_keywords.clone());
        self.is_good_match = Some(label.is_good_match);
        self
    }
}

/// Derived label for a pair. Recomputable from (résumé, job description, ATS result).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundTruth {
    pub pair_id: String,
    pub resume_category: Option<String>,
    pub jd_domain: Option<String>,
    pub ats_score: f64,
    pub keyword_coverage: f64,
    pub critical_matched: u32,
    pub critical_total: u32,
    pub important_matched: u32,
    pub important_total: u32,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub is_good_match: bool,
    pub score_interpretation: String,
}

/// A pair together with its ground-truth label, as written to the dataset artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundTruthPair {
    #[serde(flatten)]
    pub pair: TrainingPair,
    pub ground_truth: GroundTruth,
}
