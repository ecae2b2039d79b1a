//! Training-pair construction: résumés matched against a job-description pool.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::info;

use crate::loaders::{JobDescriptionLoader, LoadError, LoadOptions, ResumeLoader};
use crate::matching::Matcher;
use crate::models::{JobDescription, TrainingPair, TrainingResume};
use crate::storage::{write_jsonl_atomic, StorageError};

pub const DEFAULT_PAIRS_PER_RESUME: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOptions {
    pub resumes: LoadOptions,
    pub jobs: LoadOptions,
    pub pairs_per_resume: usize,
}

impl Default for PairOptions {
    fn default() -> Self {
        Self {
            resumes: LoadOptions::new(100),
            jobs: LoadOptions::new(100),
            pairs_per_resume: DEFAULT_PAIRS_PER_RESUME,
        }
    }
}

/// Builds unscored (résumé, job description) pairs.
#[derive(Clone)]
pub struct TrainingPairBuilder {
    resumes: ResumeLoader,
    jobs: JobDescriptionLoader,
    matcher: Matcher,
}

impl TrainingPairBuilder {
    pub fn new(resumes: ResumeLoader, jobs: JobDescriptionLoader) -> Self {
        Self {
            resumes,
            jobs,
            matcher: Matcher,
        }
    }

    /// Up to `limit` fresh pairs for one résumé, best match first. Résumés with
    /// neither experience nor skills get none.
    pub fn pairs_for_resume(
        matcher: &Matcher,
        resume: &TrainingResume,
        jobs: &[JobDescription],
        limit: usize,
    ) -> Vec<TrainingPair> {
        if !resume.has_content() {
            return Vec::new();
        }
        matcher
            .rank(resume, jobs, limit)
            .into_iter()
            .map(|i| TrainingPair::new(resume.clone(), jobs[i].clone()))
            .collect()
    }

    /// Streams pairs straight from the loaders. The job-description pool is pulled
    /// in full on first poll; résumés are then pulled one page at a time.
    pub fn build_pairs(
        &self,
        options: PairOptions,
    ) -> BoxStream<'static, Result<TrainingPair, LoadError>> {
        let jobs = self.jobs.load_job_descriptions(options.jobs.clone());
        let resumes = self.resumes.clone();
        let matcher = self.matcher;
        let per_resume = options.pairs_per_resume;
        let resume_options = options.resumes;

        stream::once(async move { jobs.try_collect::<Vec<_>>().await })
            .map_ok(move |jobs| {
                let jobs = Arc::new(jobs);
                info!(jobs = jobs.len(), "job-description pool loaded for pairing");
                resumes
                    .load_resumes(resume_options.clone())
                    .map_ok(move |resume| {
                        let pairs = Self::pairs_for_resume(&matcher, &resume, &jobs, per_resume);
                        stream::iter(pairs.into_iter().map(Ok::<_, LoadError>))
                    })
                    .try_flatten()
            })
            .try_flatten()
            .boxed()
    }
}

/// Persists unscored pairs as JSON Lines, replacing `path` atomically.
pub fn write_pairs_jsonl(path: &Path, pairs: &[TrainingPair]) -> Result<(), StorageError> {
    write_jsonl_atomic(path, pairs)?;
    info!(path = %path.display(), pairs = pairs.len(), "training pairs written");
    Ok(())
}
