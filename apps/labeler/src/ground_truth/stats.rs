use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::GroundTruthPair;

/// Counts per score range. Boundaries are inclusive at the top: 20.0 lands in
/// `0-20`, 20.5 in `21-40`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    #[serde(rename = "0-20")]
    pub very_low: usize,
    #[serde(rename = "21-40")]
    pub low: usize,
    #[serde(rename = "41-60")]
    pub medium: usize,
    #[serde(rename = "61-80")]
    pub high: usize,
    #[serde(rename = "81-100")]
    pub very_high: usize,
}

impl ScoreDistribution {
    pub fn record(&mut self, score: f64) {
        let bucket = if score <= 20.0 {
            &mut self.very_low
        } else if score <= 40.0 {
            &mut self.low
        } else if score <= 60.0 {
            &mut self.medium
        } else if score <= 80.0 {
            &mut self.high
        } else {
            &mut self.very_high
        };
        *bucket += 1;
    }

    pub fn total(&self) -> usize {
        self.very_low + self.low + self.medium + self.high + self.very_high
    }
}

/// Summary of one generation run, written into the dataset metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    /// Labeled pairs written to the dataset.
    pub total_pairs: usize,
    /// Pairs sent to the score engine.
    pub candidate_pairs: usize,
    pub scoring_failures: usize,
    /// Scored pairs outside `[min_score, max_score]`.
    pub filtered_out: usize,
    /// Résumés with neither experience nor skills.
    pub resumes_skipped: usize,
    pub mean_score: f64,
    pub score_distribution: ScoreDistribution,
    pub good_matches: usize,
    pub elapsed_ms: u64,
    pub by_category: BTreeMap<String, usize>,
    pub by_domain: BTreeMap<String, usize>,
}

const UNLABELED: &str = "unknown";

#[derive(Debug, Default)]
pub(crate) struct StatsAccumulator {
    stats: GenerationStats,
    score_sum: f64,
}

impl StatsAccumulator {
    pub(crate) fn record_labeled(&mut self, pair: &GroundTruthPair) {
        let label = &pair.ground_truth;
        let stats = &mut self.stats;
        stats.candidate_pairs += 1;
        stats.total_pairs += 1;
        self.score_sum += label.ats_score;
        stats.score_distribution.record(label.ats_score);
        if label.is_good_match {
            stats.good_matches += 1;
        }
        let category = label.resume_category.as_deref().unwrap_or(UNLABELED);
        *stats.by_category.entry(category.to_string()).or_default() += 1;
        let domain = label.jd_domain.as_deref().unwrap_or(UNLABELED);
        *stats.by_domain.entry(domain.to_string()).or_default() += 1;
    }

    pub(crate) fn record_filtered(&mut self) {
        self.stats.candidate_pairs += 1;
        self.stats.filtered_out += 1;
    }

    pub(crate) fn record_scoring_failure(&mut self) {
        self.stats.candidate_pairs += 1;
        self.stats.scoring_failures += 1;
    }

    pub(crate) fn record_skipped_resume(&mut self) {
        self.stats.resumes_skipped += 1;
    }

    pub(crate) fn finish(mut self, elapsed: Duration) -> GenerationStats {
        if self.stats.total_pairs > 0 {
            let mean = self.score_sum / self.stats.total_pairs as f64;
            self.stats.mean_score = (mean * 100.0).round() / 100.0;
        }
        self.stats.elapsed_ms = elapsed.as_millis() as u64;
        self.stats
    }
}
