//! AtsGroundTruthGenerator: pools, scoring loop, and the persisted dataset.
//!
//! One instance per run. `load_data` fills the résumé and job-description pools
//! from the disk cache or the registry; `generate_ground_truth_pairs` lazily scores
//! matched pairs; `generate_dataset` drains that sequence and writes the artifact.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::PipelineError;
use crate::ground_truth::engine::{AtsResult, ScoreEngine};
use crate::ground_truth::label::{extract_ground_truth, format_jd_text, format_resume_text};
use crate::ground_truth::stats::{GenerationStats, StatsAccumulator};
use crate::loaders::{JobDescriptionLoader, LoadOptions, ResumeLoader};
use crate::matching::{Matcher, TrainingPairBuilder, DEFAULT_PAIRS_PER_RESUME};
use crate::models::{GroundTruthPair, JobDescription, TrainingPair, TrainingResume};
use crate::storage::{read_cache, write_json_atomic, CacheRead};

pub const RESUME_CACHE_FILE: &str = "resumes.json";
pub const JOB_CACHE_FILE: &str = "job-descriptions.json";

// ────────────────────────────────────────────────────────────────────────────
// Options and artifact
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLoadOptions {
    pub resume_limit: usize,
    pub jd_limit: usize,
    pub resume_categories: Vec<String>,
    pub jd_categories: Vec<String>,
}

impl Default for DataLoadOptions {
    fn default() -> Self {
        Self {
            resume_limit: 200,
            jd_limit: 200,
            resume_categories: Vec::new(),
            jd_categories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub pairs_per_resume: usize,
    /// Labeled pairs scoring outside `[min_score, max_score]` are dropped.
    pub min_score: f64,
    pub max_score: f64,
    /// Pause between consecutive score-engine calls.
    pub pair_delay: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            pairs_per_resume: DEFAULT_PAIRS_PER_RESUME,
            min_score: 0.0,
            max_score: 100.0,
            pair_delay: Duration::ZERO,
        }
    }
}

impl GenerationOptions {
    fn validate(&self) -> Result<(), PipelineError> {
        let in_range = |s: f64| (0.0..=100.0).contains(&s);
        if !in_range(self.min_score) || !in_range(self.max_score) || self.min_score > self.max_score
        {
            return Err(PipelineError::InvalidOptions(format!(
                "score range [{}, {}] must lie within [0, 100] with min ≤ max",
                self.min_score, self.max_score
            )));
        }
        Ok(())
    }

    fn accepts(&self, score: f64) -> bool {
        (self.min_score..=self.max_score).contains(&score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolOrigin {
    Cache,
    Registry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub resumes: usize,
    pub resume_origin: PoolOrigin,
    pub job_descriptions: usize,
    pub job_origin: PoolOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub generated_at: DateTime<Utc>,
    pub score_engine: String,
    pub stats: GenerationStats,
}

/// The persisted artifact: `{ metadata: { generatedAt, stats }, pairs }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthDataset {
    pub metadata: DatasetMetadata,
    pub pairs: Vec<GroundTruthPair>,
}

/// What happened to one unit of work in the scoring loop.
#[derive(Debug)]
enum PairOutcome {
    Labeled(Box<GroundTruthPair>),
    OutOfRange,
    ScoringFailed,
    ResumeSkipped,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

pub struct AtsGroundTruthGenerator {
    resume_loader: ResumeLoader,
    job_loader: JobDescriptionLoader,
    engine: Arc<dyn ScoreEngine>,
    cache_dir: PathBuf,
    resumes: Arc<Vec<TrainingResume>>,
    jobs: Arc<Vec<JobDescription>>,
}

impl AtsGroundTruthGenerator {
    pub fn new(
        resume_loader: ResumeLoader,
        job_loader: JobDescriptionLoader,
        engine: Arc<dyn ScoreEngine>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resume_loader,
            job_loader,
            engine,
            cache_dir: cache_dir.into(),
            resumes: Arc::new(Vec::new()),
            jobs: Arc::new(Vec::new()),
        }
    }

    pub fn resumes(&self) -> &[TrainingResume] {
        &self.resumes
    }

    pub fn job_descriptions(&self) -> &[JobDescription] {
        &self.jobs
    }

    /// Populates both pools, cache first. A corrupt cache file is deleted and the
    /// pool refetched; a fresh fetch never writes the cache (see `save_cache`).
    pub async fn load_data(
        &mut self,
        options: &DataLoadOptions,
    ) -> Result<LoadSummary, PipelineError> {
        let resume_options =
            LoadOptions::new(options.resume_limit).with_categories(options.resume_categories.clone());
        let job_options =
            LoadOptions::new(options.jd_limit).with_categories(options.jd_categories.clone());

        let cached_resumes = self.cached(RESUME_CACHE_FILE, &resume_options, |r: &TrainingResume| {
            r.category.as_deref()
        })?;
        let (resumes, resume_origin) = match cached_resumes {
            Some(resumes) => (resumes, PoolOrigin::Cache),
            None => {
                let fetched: Vec<TrainingResume> = self
                    .resume_loader
                    .load_resumes(resume_options)
                    .try_collect()
                    .await?;
                (fetched, PoolOrigin::Registry)
            }
        };

        let cached_jobs =
            self.cached(JOB_CACHE_FILE, &job_options, |j: &JobDescription| j.domain.as_deref())?;
        let (jobs, job_origin) = match cached_jobs {
            Some(jobs) => (jobs, PoolOrigin::Cache),
            None => {
                let fetched: Vec<JobDescription> = self
                    .job_loader
                    .load_job_descriptions(job_options)
                    .try_collect()
                    .await?;
                (fetched, PoolOrigin::Registry)
            }
        };

        let summary = LoadSummary {
            resumes: resumes.len(),
            resume_origin,
            job_descriptions: jobs.len(),
            job_origin,
        };
        info!(?summary, "pools loaded");

        self.resumes = Arc::new(resumes);
        self.jobs = Arc::new(jobs);
        Ok(summary)
    }

    /// Reads a cached pool, applying the same category filter and limit the
    /// registry path would.
    fn cached<T, C>(
        &self,
        file: &str,
        options: &LoadOptions,
        category: C,
    ) -> Result<Option<Vec<T>>, PipelineError>
    where
        T: serde::de::DeserializeOwned,
        C: Fn(&T) -> Option<&str>,
    {
        let path = self.cache_dir.join(file);
        match read_cache::<Vec<T>>(&path)? {
            CacheRead::Hit(mut records) => {
                records.retain(|record| options.matches_category(category(record)));
                records.truncate(options.limit);
                debug!(path = %path.display(), records = records.len(), "cache hit");
                Ok(Some(records))
            }
            CacheRead::Missing => Ok(None),
            CacheRead::Corrupt { reason } => {
                warn!(path = %path.display(), %reason, "corrupt cache deleted, refetching");
                Ok(None)
            }
        }
    }

    /// Writes both pools to the cache directory.
    pub fn save_cache(&self) -> Result<(), PipelineError> {
        write_json_atomic(&self.cache_dir.join(RESUME_CACHE_FILE), self.resumes.as_slice())?;
        write_json_atomic(&self.cache_dir.join(JOB_CACHE_FILE), self.jobs.as_slice())?;
        info!(
            dir = %self.cache_dir.display(),
            resumes = self.resumes.len(),
            job_descriptions = self.jobs.len(),
            "cache saved"
        );
        Ok(())
    }

    /// Lazily scores matched pairs from the loaded pools, yielding only labeled
    /// pairs inside the score range. Failed pairs are logged and skipped.
    pub fn generate_ground_truth_pairs(
        &self,
        options: &GenerationOptions,
    ) -> Result<BoxStream<'static, GroundTruthPair>, PipelineError> {
        options.validate()?;
        Ok(self
            .outcomes(options.clone())
            .filter_map(|outcome| async move {
                match outcome {
                    PairOutcome::Labeled(pair) => Some(*pair),
                    _ => None,
                }
            })
            .boxed())
    }

    /// Drains the scoring loop and writes the dataset to `output_path` in one
    /// whole-file write. Returns the run statistics.
    pub async fn generate_dataset(
        &self,
        output_path: &Path,
        options: &GenerationOptions,
    ) -> Result<GenerationStats, PipelineError> {
        options.validate()?;
        if self.resumes.is_empty() || self.jobs.is_empty() {
            warn!(
                resumes = self.resumes.len(),
                job_descriptions = self.jobs.len(),
                "a pool is empty; the dataset will have no pairs"
            );
        }

        let started = Instant::now();
        let mut stats = StatsAccumulator::default();
        let mut pairs = Vec::new();

        let mut outcomes = self.outcomes(options.clone());
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                PairOutcome::Labeled(pair) => {
                    stats.record_labeled(&pair);
                    pairs.push(*pair);
                }
                PairOutcome::OutOfRange => stats.record_filtered(),
                PairOutcome::ScoringFailed => stats.record_scoring_failure(),
                PairOutcome::ResumeSkipped => stats.record_skipped_resume(),
            }
        }
        let stats = stats.finish(started.elapsed());

        let dataset = GroundTruthDataset {
            metadata: DatasetMetadata {
                generated_at: Utc::now(),
                score_engine: self.engine.name().to_string(),
                stats: stats.clone(),
            },
            pairs,
        };
        write_json_atomic(output_path, &dataset)?;

        info!(
            path = %output_path.display(),
            pairs = stats.total_pairs,
            candidates = stats.candidate_pairs,
            failures = stats.scoring_failures,
            filtered = stats.filtered_out,
            mean_score = stats.mean_score,
            good_matches = stats.good_matches,
            elapsed_ms = stats.elapsed_ms,
            "ground-truth dataset written"
        );
        Ok(stats)
    }

    fn outcomes(&self, options: GenerationOptions) -> BoxStream<'static, PairOutcome> {
        let state = LoopState {
            resumes: self.resumes.clone(),
            jobs: self.jobs.clone(),
            engine: self.engine.clone(),
            matcher: Matcher,
            options,
            next_resume: 0,
            pending: VecDeque::new(),
            scored_any: false,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(pair) = state.pending.pop_front() {
                    if state.scored_any && !state.options.pair_delay.is_zero() {
                        tokio::time::sleep(state.options.pair_delay).await;
                    }
                    state.scored_any = true;
                    let outcome = label_pair(state.engine.as_ref(), pair, &state.options).await;
                    return Some((outcome, state));
                }

                let resumes = state.resumes.clone();
                let resume = resumes.get(state.next_resume)?;
                state.next_resume += 1;

                if !resume.has_content() {
                    debug!(index = state.next_resume - 1, "résumé has no experience or skills, skipping");
                    return Some((PairOutcome::ResumeSkipped, state));
                }
                state.pending.extend(TrainingPairBuilder::pairs_for_resume(
                    &state.matcher,
                    resume,
                    &state.jobs,
                    state.options.pairs_per_resume,
                ));
            }
        })
        .boxed()
    }
}

struct LoopState {
    resumes: Arc<Vec<TrainingResume>>,
    jobs: Arc<Vec<JobDescription>>,
    engine: Arc<dyn ScoreEngine>,
    matcher: Matcher,
    options: GenerationOptions,
    next_resume: usize,
    pending: VecDeque<TrainingPair>,
    scored_any: bool,
}

async fn label_pair(
    engine: &dyn ScoreEngine,
    pair: TrainingPair,
    options: &GenerationOptions,
) -> PairOutcome {
    let resume_text = format_resume_text(&pair.resume);
    let jd_text = format_jd_text(&pair.job_description);

    let result = match engine
        .score(&jd_text, &resume_text, &pair.resume.skills)
        .await
        .and_then(AtsResult::validated)
    {
        Ok(result) => result,
        Err(e) => {
            warn!(pair_id = %pair.id, error = %e, "scoring failed, skipping pair");
            return PairOutcome::ScoringFailed;
        }
    };

    let label = extract_ground_truth(&pair, &result);
    if !options.accepts(label.ats_score) {
        debug!(pair_id = %pair.id, score = label.ats_score, "score outside range, dropping pair");
        return PairOutcome::OutOfRange;
    }

    let pair = pair.with_ground_truth(&label);
    PairOutcome::Labeled(Box::new(GroundTruthPair {
        pair,
        ground_truth: label,
    }))
}
