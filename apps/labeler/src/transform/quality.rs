//! Quality score: a 0..1 measure of how much usable structure the transformer recovered.
//!
//! Weighted sum out of 100:
//! - experience: entries + bullet density (≤30) and quantified bullets (≤10)
//! - skills: count (≤15) and variety across keyword kinds (≤10)
//! - education: presence (≤10) and degree specificity (≤5)
//! - summary: length (≤10) and a years-of-experience mention (≤10)

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::TrainingResume;
use crate::transform::keywords::classify_skill;

const POINTS_PER_ENTRY: f64 = 5.0;
const MAX_ENTRY_POINTS: f64 = 15.0;
const POINTS_PER_AVG_BULLET: f64 = 3.0;
const MAX_DENSITY_POINTS: f64 = 15.0;
const POINTS_PER_QUANTIFIED_BULLET: f64 = 2.5;
const MAX_QUANTIFIED_POINTS: f64 = 10.0;
const MAX_SKILL_COUNT_POINTS: f64 = 15.0;
const POINTS_PER_SKILL_KIND: f64 = 2.5;
const EDUCATION_PRESENT_POINTS: f64 = 10.0;
const DEGREE_POINTS: f64 = 5.0;
const DURATION_POINTS: f64 = 10.0;

/// Numbers, percentages and currency amounts mark a bullet as quantified.
static QUANTIFIED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d|%|\$|€|£").unwrap());

static DURATION_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+\+?\s*(?:years?|yrs?)\b").unwrap());

fn summary_length_points(summary: &str) -> f64 {
    match summary.chars().count() {
        0 => 0.0,
        1..=29 => 3.0,
        30..=99 => 6.0,
        _ => 10.0,
    }
}

pub fn compute_quality_score(resume: &TrainingResume) -> f64 {
    let entries = resume.experience.len();
    let bullets = resume.bullet_count();

    let mut points = (entries as f64 * POINTS_PER_ENTRY).min(MAX_ENTRY_POINTS);
    if entries > 0 {
        let density = bullets as f64 / entries as f64;
        points += (density * POINTS_PER_AVG_BULLET).min(MAX_DENSITY_POINTS);
    }

    let quantified = resume
        .experience
        .iter()
        .flat_map(|e| e.bullets.iter())
        .filter(|b| QUANTIFIED.is_match(b))
        .count();
    points += (quantified as f64 * POINTS_PER_QUANTIFIED_BULLET).min(MAX_QUANTIFIED_POINTS);

    points += (resume.skills.len() as f64).min(MAX_SKILL_COUNT_POINTS);
    let kinds: HashSet<_> = resume
        .skills
        .iter()
        .filter_map(|s| classify_skill(s).map(|k| k.kind))
        .collect();
    points += kinds.len() as f64 * POINTS_PER_SKILL_KIND;

    if !resume.education.is_empty() {
        points += EDUCATION_PRESENT_POINTS;
        if resume.education.iter().any(|e| e.degree.is_some()) {
            points += DEGREE_POINTS;
        }
    }

    if let Some(summary) = resume.summary.as_deref() {
        points += summary_length_points(summary);
        if DURATION_MENTION.is_match(summary) {
            points += DURATION_POINTS;
        }
    }

    ((points / 100.0).clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}
