//! Job-description loader and the row mappings for the supported dataset schemas.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::BoxStream;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::loaders::{first_text, paged_records, DatasetSource, LoadError, LoadOptions};
use crate::models::JobDescription;
use crate::registry::DatasetRegistry;
use crate::transform::keywords::extract_skills;

/// Titles longer than this are treated as description text, not titles.
const MAX_TITLE_CHARS: usize = 120;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static HTML_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(?:nbsp|amp|lt|gt|quot|#39);").unwrap());
static INLINE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Start of the "nice to have" part of a posting.
static PREFERRED_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:preferred|nice[\s-]to[\s-]have|bonus(?:\s+points)?|a\s+plus)\b").unwrap()
});

static EXPERIENCE_YEARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:(?:-|to)\s*\d{1,2}\s*)?(?:years?|yrs?)\b").unwrap()
});

static EDUCATION_LEVELS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("PhD", r"(?i)\b(?:ph\.?d|doctorate|doctoral)\b"),
        ("Master's", r"(?i)\b(?:master'?s?|mba|m\.s\b|msc)\b"),
        ("Bachelor's", r"(?i)\b(?:bachelor'?s?|b\.s\b|b\.a\b|bsc|undergraduate degree|4-year degree)\b"),
        ("High School", r"(?i)\b(?:high school|ged|secondary school)\b"),
    ]
    .into_iter()
    .map(|(level, pattern)| (level, Regex::new(pattern).unwrap()))
    .collect()
});

static SENIORITY: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("Executive", r"(?i)\b(?:director|vp|vice president|head of|chief|c[eto]o)\b"),
        ("Senior", r"(?i)\b(?:senior|sr\.?|lead|principal|staff)\b"),
        ("Entry", r"(?i)\b(?:junior|jr\.?|entry[\s-]level|graduate|intern|trainee|apprentice)\b"),
    ]
    .into_iter()
    .map(|(level, pattern)| (level, Regex::new(pattern).unwrap()))
    .collect()
});

/// Which row columns carry each job-description field, with ordered fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowMapping {
    pub title_fields: Vec<&'static str>,
    pub company_fields: Vec<&'static str>,
    pub description_fields: Vec<&'static str>,
    pub category_fields: Vec<&'static str>,
    pub skills_fields: Vec<&'static str>,
    pub date_fields: Vec<&'static str>,
}

impl JobRowMapping {
    /// Scraped job postings: explicit title/company columns, free-text description.
    pub fn postings() -> Self {
        Self {
            title_fields: vec!["title", "job_title", "Job Title", "position"],
            company_fields: vec!["company_name", "company", "Company"],
            description_fields: vec!["description", "job_description", "Job Description"],
            category_fields: vec!["category", "industry", "job_category", "domain"],
            skills_fields: vec!["skills", "required_skills", "skills_desc"],
            date_fields: vec!["listed_time", "published_date", "date_posted"],
        }
    }

    /// Text-classification style datasets: a text column and a label column.
    pub fn classification() -> Self {
        Self {
            title_fields: vec!["title", "job_title", "Title"],
            company_fields: vec!["company"],
            description_fields: vec!["text", "description", "job_description"],
            category_fields: vec!["label", "category", "Category"],
            skills_fields: vec![],
            date_fields: vec![],
        }
    }

    /// Maps one registry row. Returns `None` when the row lacks a description or
    /// the result fails `JobDescription::is_valid`.
    pub fn map_row(&self, row: &Value, dataset: &str) -> Option<JobDescription> {
        let description = first_text(row, &self.description_fields).map(|d| clean_text(&d))?;
        let category = first_text(row, &self.category_fields);
        let title = first_text(row, &self.title_fields)
            .filter(|t| t.chars().count() <= MAX_TITLE_CHARS)
            .or_else(|| category.clone())
            .unwrap_or_default();

        let (required_skills, preferred_skills) = match self.explicit_skills(row) {
            Some(listed) => {
                let preferred = preferred_section(&description)
                    .map(extract_skills)
                    .unwrap_or_default();
                let preferred = without(preferred, &listed);
                (listed, preferred)
            }
            None => split_skills(&description),
        };

        let experience_years = extract_experience_years(&description);
        let level = extract_level(&title, experience_years);

        let job = JobDescription {
            title,
            company: first_text(row, &self.company_fields),
            education_level: extract_education_level(&description),
            description,
            required_skills,
            preferred_skills,
            experience_years,
            domain: category,
            level,
            source: Some(dataset.to_string()),
            published_date: self.published_date(row),
        };
        job.is_valid().then_some(job)
    }

    fn explicit_skills(&self, row: &Value) -> Option<Vec<String>> {
        let value = self.skills_fields.iter().find_map(|f| row.get(*f))?;
        let skills: Vec<String> = match value {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .collect(),
            Value::String(s) => s
                .split(&[',', ';', '\n', '|'][..])
                .map(|s| s.trim().to_string())
                .collect(),
            _ => return None,
        };
        let mut deduped: Vec<String> = Vec::new();
        for skill in skills.into_iter().filter(|s| !s.is_empty()) {
            if !deduped.iter().any(|d| d.eq_ignore_ascii_case(&skill)) {
                deduped.push(skill);
            }
        }
        (!deduped.is_empty()).then_some(deduped)
    }

    fn published_date(&self, row: &Value) -> Option<NaiveDate> {
        let value = self.date_fields.iter().find_map(|f| row.get(*f))?;
        match value {
            Value::Number(n) => {
                let millis = n.as_f64()? as i64;
                DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
            }
            Value::String(s) => s
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            _ => None,
        }
    }
}

/// Strips markup and collapses inline whitespace, keeping line structure.
fn clean_text(raw: &str) -> String {
    let text = HTML_TAG.replace_all(raw, " ");
    let text = HTML_ENTITY.replace_all(&text, " ");
    text.lines()
        .map(|l| INLINE_SPACES.replace_all(l, " ").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn preferred_section(description: &str) -> Option<&str> {
    PREFERRED_MARKER
        .find(description)
        .map(|m| &description[m.start()..])
}

fn without(skills: Vec<String>, exclude: &[String]) -> Vec<String> {
    skills
        .into_iter()
        .filter(|s| !exclude.iter().any(|e| e.eq_ignore_ascii_case(s)))
        .collect()
}

/// Splits description-derived skills at the first "preferred" marker.
pub fn split_skills(description: &str) -> (Vec<String>, Vec<String>) {
    match PREFERRED_MARKER.find(description) {
        Some(m) => {
            let required = extract_skills(&description[..m.start()]);
            let preferred = without(extract_skills(&description[m.start()..]), &required);
            (required, preferred)
        }
        None => (extract_skills(description), Vec::new()),
    }
}

/// First "N years" / "N+ yrs" / "N-M years" mention.
pub fn extract_experience_years(text: &str) -> Option<u32> {
    EXPERIENCE_YEARS
        .captures(text)
        .and_then(|c| c[1].parse().ok())
}

/// The education level mentioned earliest in the text, which is usually the minimum.
pub fn extract_education_level(text: &str) -> Option<String> {
    EDUCATION_LEVELS
        .iter()
        .filter_map(|(level, re)| re.find(text).map(|m| (m.start(), *level)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, level)| level.to_string())
}

/// Seniority from title keywords, falling back to required years.
pub fn extract_level(title: &str, experience_years: Option<u32>) -> Option<String> {
    if let Some((level, _)) = SENIORITY.iter().find(|(_, re)| re.is_match(title)) {
        return Some(level.to_string());
    }
    experience_years.map(|years| match years {
        0..=1 => "Entry",
        2..=4 => "Mid",
        _ => "Senior",
    }
    .to_string())
}

/// Loads job-description datasets through a `JobRowMapping`.
#[derive(Clone)]
pub struct JobDescriptionLoader {
    registry: Arc<dyn DatasetRegistry>,
    source: DatasetSource,
    mapping: JobRowMapping,
}

impl JobDescriptionLoader {
    pub fn new(
        registry: Arc<dyn DatasetRegistry>,
        source: DatasetSource,
        mapping: JobRowMapping,
    ) -> Self {
        Self {
            registry,
            source,
            mapping,
        }
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    /// Lazily pulls valid job descriptions in registry order. The category filter
    /// matches against the row's classification column.
    pub fn load_job_descriptions(
        &self,
        options: LoadOptions,
    ) -> BoxStream<'static, Result<JobDescription, LoadError>> {
        let mapping = self.mapping.clone();
        let dataset = self.source.dataset.clone();
        let filter = options.clone();

        paged_records(
            self.registry.clone(),
            self.source.clone(),
            &options,
            move |row| {
                let category = first_text(&row, &mapping.category_fields);
                if !filter.matches_category(category.as_deref()) {
                    return None;
                }
                let job = mapping.map_row(&row, &dataset);
                if job.is_none() {
                    debug!(dataset = %dataset, "job description row invalid, skipping");
                }
                job
            },
        )
    }
}
