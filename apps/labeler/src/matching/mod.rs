//! Matcher: greedy résumé → job-description candidate selection.
//!
//! Not a globally optimal assignment; pairs are sampled for training data, so a
//! cheap per-résumé ranking is enough.

use std::collections::HashSet;

use crate::models::{JobDescription, TrainingResume};

pub mod pairs;

pub use pairs::{write_pairs_jsonl, PairOptions, TrainingPairBuilder, DEFAULT_PAIRS_PER_RESUME};

/// Awarded when the job's domain or title contains the résumé category.
pub const CATEGORY_MATCH_POINTS: u32 = 10;
/// Awarded per skill shared by the résumé and the job (required ∪ preferred).
pub const SHARED_SKILL_POINTS: u32 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher;

impl Matcher {
    /// Heuristic affinity between a résumé and a job description.
    pub fn score(&self, resume: &TrainingResume, job: &JobDescription) -> u32 {
        let mut score = 0;

        if let Some(category) = resume
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            let category = category.to_lowercase();
            let in_domain = job
                .domain
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&category));
            if in_domain || job.title.to_lowercase().contains(&category) {
                score += CATEGORY_MATCH_POINTS;
            }
        }

        let resume_skills: HashSet<String> =
            resume.skills.iter().map(|s| s.to_lowercase()).collect();
        let job_skills: HashSet<String> = job.all_skills().map(|s| s.to_lowercase()).collect();
        score += SHARED_SKILL_POINTS * resume_skills.intersection(&job_skills).count() as u32;

        score
    }

    /// Indices into `jobs`, best-first, at most `limit`. Ties keep input order.
    pub fn rank(&self, resume: &TrainingResume, jobs: &[JobDescription], limit: usize) -> Vec<usize> {
        let mut scored: Vec<(usize, u32)> = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| (i, self.score(resume, job)))
            .collect();
        // `sort_by` is stable.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.into_iter().take(limit).map(|(i, _)| i).collect()
    }

    pub fn select_matches<'a>(
        &self,
        resume: &TrainingResume,
        jobs: &'a [JobDescription],
        limit: usize,
    ) -> Vec<&'a JobDescription> {
        self.rank(resume, jobs, limit)
            .into_iter()
            .map(|i| &jobs[i])
            .collect()
    }
}
