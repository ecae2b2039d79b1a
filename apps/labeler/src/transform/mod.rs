//! Résumé text transformer: unstructured résumé text to a canonical `TrainingResume`.
//!
//! Flow: normalize → segment into sections → parse each section → loose fallback
//! pass when experience/skills sections are missing → quality score.
//! Output quality is measured by `quality::compute_quality_score`, not asserted.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::TrainingResume;

pub mod details;
pub mod experience;
pub mod keywords;
pub mod quality;
pub mod sections;

use details::{parse_certifications, parse_education, parse_skills};
use experience::parse_experience;
use quality::compute_quality_score;
use sections::{normalize, segment, Section};

/// Inputs shorter than this are rejected outright.
pub const MIN_RESUME_CHARS: usize = 100;

/// Skills listed inline in prose when no skills section exists.
static INLINE_SKILLS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\b(?:skills?|technologies|tools|tech\s+stack)(?:\s+(?:include|used))?\s*:\s*(.+)$")
        .unwrap()
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformRejection {
    #[error("résumé text too short ({chars} chars, need {MIN_RESUME_CHARS})")]
    TooShort { chars: usize },

    #[error("no experience entries or skills could be extracted")]
    NoContent,
}

#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    pub category: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeTextTransformer;

impl ResumeTextTransformer {
    pub fn transform(
        &self,
        raw_text: &str,
        options: &TransformOptions,
    ) -> Result<TrainingResume, TransformRejection> {
        let chars = raw_text.trim().chars().count();
        if chars < MIN_RESUME_CHARS {
            return Err(TransformRejection::TooShort { chars });
        }

        let text = normalize(raw_text);
        let sections = segment(&text);

        let summary = sections
            .lines(Section::Summary)
            .iter()
            .filter(|l| !l.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");

        let mut experience = parse_experience(sections.lines(Section::Experience), false);
        if !sections.has(Section::Experience) {
            let all_lines: Vec<String> = text.lines().map(String::from).collect();
            experience = parse_experience(&all_lines, true);
        }

        let mut skills = parse_skills(sections.lines(Section::Skills));
        if !sections.has(Section::Skills) {
            let inline: Vec<String> = INLINE_SKILLS
                .captures_iter(&text)
                .map(|c| c[1].to_string())
                .collect();
            skills = parse_skills(&inline);
        }

        if experience.is_empty() && skills.is_empty() {
            return Err(TransformRejection::NoContent);
        }

        let mut resume = TrainingResume {
            summary: (!summary.is_empty()).then_some(summary),
            experience,
            skills,
            education: parse_education(sections.lines(Section::Education)),
            certifications: parse_certifications(sections.lines(Section::Certifications)),
            source: options.source.clone(),
            category: options.category.clone(),
            quality_score: None,
        };
        resume.quality_score = Some(compute_quality_score(&resume));
        Ok(resume)
    }
}
