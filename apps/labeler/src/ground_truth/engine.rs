//! ATS score engine seam.
//!
//! The generator treats the engine as an opaque, deterministic-per-version black box.
//! `KeywordScoreEngine` is the bundled default so the pipeline runs end-to-end
//! without an external scorer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transform::keywords::{DomainKeyword, DOMAIN_KEYWORDS};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("score engine failed: {0}")]
    Engine(String),

    #[error("score engine returned out-of-range score {0}")]
    InvalidScore(f64),
}

// ────────────────────────────────────────────────────────────────────────────
// Engine output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordTally {
    pub matched_count: u32,
    pub total_keywords: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub critical: KeywordTally,
    pub important: KeywordTally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsResult {
    pub final_score: f64, // 0 – 100
    pub category_breakdown: CategoryBreakdown,
    pub strengths: Vec<String>, // matched keywords
    pub gaps: Vec<String>,      // missing keywords
    pub score_interpretation: String,
}

impl AtsResult {
    /// Rejects a non-finite score or one outside 0..=100.
    pub fn validated(self) -> Result<Self, ScoreError> {
        if self.final_score.is_finite() && (0.0..=100.0).contains(&self.final_score) {
            Ok(self)
        } else {
            Err(ScoreError::InvalidScore(self.final_score))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Scores a résumé against a job description. Implement this to plug in an
/// external scorer; the generator holds it as `Arc<dyn ScoreEngine>`.
#[async_trait]
pub trait ScoreEngine: Send + Sync {
    async fn score(
        &self,
        job_description_text: &str,
        resume_text: &str,
        resume_skills: &[String],
    ) -> Result<AtsResult, ScoreError>;

    /// Recorded in the dataset metadata so labels can be traced to an engine version.
    fn name(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordScoreEngine: bundled default
// ────────────────────────────────────────────────────────────────────────────

const CRITICAL_WEIGHT: f64 = 0.7;
const IMPORTANT_WEIGHT: f64 = 0.3;

/// Deterministic keyword-coverage engine.
///
/// Algorithm:
/// 1. Every domain keyword found in the JD text is a requirement. Languages and
///    tools are critical; methodology and soft-skill terms are important.
/// 2. A requirement is matched when the résumé text mentions it or a listed
///    résumé skill names it.
/// 3. final_score = 100 × (0.7 × critical coverage + 0.3 × important coverage),
///    with the full weight moving to whichever category is non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScoreEngine;

impl KeywordScoreEngine {
    pub const NAME: &'static str = "keyword-v1";

    fn covers(keyword: &DomainKeyword, resume_text: &str, resume_skills: &[String]) -> bool {
        keyword.find_in(resume_text).is_some()
            || resume_skills
                .iter()
                .any(|s| s.eq_ignore_ascii_case(keyword.name) || keyword.find_in(s).is_some())
    }

    pub fn score_sync(
        &self,
        job_description_text: &str,
        resume_text: &str,
        resume_skills: &[String],
    ) -> AtsResult {
        let mut breakdown = CategoryBreakdown::default();
        let mut matched_critical = Vec::new();
        let mut matched_important = Vec::new();
        let mut missing_critical = Vec::new();
        let mut missing_important = Vec::new();

        for keyword in DOMAIN_KEYWORDS
            .iter()
            .filter(|k| k.find_in(job_description_text).is_some())
        {
            let covered = Self::covers(keyword, resume_text, resume_skills);
            let name = keyword.name.to_string();
            if keyword.kind.is_technical() {
                breakdown.critical.total_keywords += 1;
                if covered {
                    breakdown.critical.matched_count += 1;
                    matched_critical.push(name);
                } else {
                    missing_critical.push(name);
                }
            } else {
                breakdown.important.total_keywords += 1;
                if covered {
                    breakdown.important.matched_count += 1;
                    matched_important.push(name);
                } else {
                    missing_important.push(name);
                }
            }
        }

        let final_score = weighted_score(&breakdown);
        matched_critical.extend(matched_important);
        missing_critical.extend(missing_important);

        AtsResult {
            final_score,
            category_breakdown: breakdown,
            strengths: matched_critical,
            gaps: missing_critical,
            score_interpretation: interpret(final_score, breakdown).to_string(),
        }
    }
}

#[async_trait]
impl ScoreEngine for KeywordScoreEngine {
    async fn score(
        &self,
        job_description_text: &str,
        resume_text: &str,
        resume_skills: &[String],
    ) -> Result<AtsResult, ScoreError> {
        Ok(self.score_sync(job_description_text, resume_text, resume_skills))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

fn coverage(tally: KeywordTally) -> Option<f64> {
    (tally.total_keywords > 0).then(|| tally.matched_count as f64 / tally.total_keywords as f64)
}

fn weighted_score(breakdown: &CategoryBreakdown) -> f64 {
    let raw = match (coverage(breakdown.critical), coverage(breakdown.important)) {
        (Some(c), Some(i)) => CRITICAL_WEIGHT * c + IMPORTANT_WEIGHT * i,
        (Some(c), None) => c,
        (None, Some(i)) => i,
        (None, None) => 0.0,
    };
    (raw * 1000.0).round() / 10.0
}

fn interpret(score: f64, breakdown: CategoryBreakdown) -> &'static str {
    if breakdown.critical.total_keywords + breakdown.important.total_keywords == 0 {
        return "No recognizable keywords in the job description.";
    }
    if score >= 80.0 {
        "Excellent match. The résumé covers nearly all job keywords."
    } else if score >= 70.0 {
        "Good match. Most critical keywords are present."
    } else if score >= 50.0 {
        "Fair match. Several important keywords are missing."
    } else if score >= 30.0 {
        "Weak match. Many critical keywords are missing."
    } else {
        "Poor match. The résumé shares few keywords with the job."
    }
}
