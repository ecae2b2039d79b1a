use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::registry::FetchOptions;

pub const DEFAULT_REGISTRY_BASE_URL: &str = "https://datasets-server.huggingface.co";

/// Row layout of the job-description dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchema {
    Postings,
    Classification,
}

impl FromStr for JobSchema {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postings" => Ok(JobSchema::Postings),
            "classification" => Ok(JobSchema::Classification),
            other => bail!("unknown job schema '{other}' (expected 'postings' or 'classification')"),
        }
    }
}

/// Pipeline configuration loaded from environment variables.
/// Fails at startup if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub registry_base_url: String,
    pub registry_token: Option<String>,
    pub resume_dataset: String,
    pub resume_subset: String,
    pub resume_split: String,
    pub jd_dataset: String,
    pub jd_subset: String,
    pub jd_split: String,
    pub jd_schema: JobSchema,
    pub cache_dir: PathBuf,
    pub output_path: PathBuf,
    pub fetch_timeout: Duration,
    pub fetch_max_attempts: u32,
    pub fetch_retry_on_429: bool,
    pub resume_limit: usize,
    pub jd_limit: usize,
    pub pairs_per_resume: usize,
    pub min_score: f64,
    pub max_score: f64,
    pub pair_delay: Duration,
    pub save_cache: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            registry_base_url: env_or("REGISTRY_BASE_URL", DEFAULT_REGISTRY_BASE_URL),
            registry_token: std::env::var("REGISTRY_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            resume_dataset: require_env("RESUME_DATASET")?,
            resume_subset: env_or("RESUME_SUBSET", "default"),
            resume_split: env_or("RESUME_SPLIT", "train"),
            jd_dataset: require_env("JD_DATASET")?,
            jd_subset: env_or("JD_SUBSET", "default"),
            jd_split: env_or("JD_SPLIT", "train"),
            jd_schema: parse_env("JD_SCHEMA", JobSchema::Postings)?,
            cache_dir: PathBuf::from(env_or("CACHE_DIR", "data/cache")),
            output_path: PathBuf::from(env_or("OUTPUT_PATH", "data/ats-ground-truth.json")),
            fetch_timeout: Duration::from_millis(parse_env("FETCH_TIMEOUT_MS", 30_000u64)?),
            fetch_max_attempts: parse_env("FETCH_MAX_ATTEMPTS", 3u32)?,
            fetch_retry_on_429: parse_env("FETCH_RETRY_ON_429", true)?,
            resume_limit: parse_env("RESUME_LIMIT", 200usize)?,
            jd_limit: parse_env("JD_LIMIT", 200usize)?,
            pairs_per_resume: parse_env("PAIRS_PER_RESUME", 3usize)?,
            min_score: parse_env("MIN_SCORE", 0.0f64)?,
            max_score: parse_env("MAX_SCORE", 100.0f64)?,
            pair_delay: Duration::from_millis(parse_env("PAIR_DELAY_MS", 0u64)?),
            save_cache: parse_env("SAVE_CACHE", false)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.fetch_timeout,
            max_attempts: self.fetch_max_attempts.max(1),
            retry_on_429: self.fetch_retry_on_429,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}
