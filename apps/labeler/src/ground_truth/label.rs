//! Plain-text rendering of pairs for the score engine, and ground-truth extraction.

use std::fmt::Write;

use crate::ground_truth::engine::AtsResult;
use crate::models::pair::GOOD_MATCH_THRESHOLD;
use crate::models::{GroundTruth, JobDescription, TrainingPair, TrainingResume};

/// Flattens a résumé into text: summary, experience with bullets, skills,
/// education, certifications. Empty sections are omitted.
pub fn format_resume_text(resume: &TrainingResume) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if let Some(summary) = resume.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        blocks.push(format!("SUMMARY\n{summary}"));
    }

    if !resume.experience.is_empty() {
        let mut block = String::from("EXPERIENCE");
        for entry in &resume.experience {
            let _ = write!(block, "\n{} at {}", entry.title, entry.company);
            match (&entry.start_date, &entry.end_date) {
                (Some(start), Some(end)) => {
                    let _ = write!(block, " ({start} - {end})");
                }
                (Some(start), None) => {
                    let _ = write!(block, " ({start})");
                }
                _ => {}
            }
            if let Some(location) = &entry.location {
                let _ = write!(block, ", {location}");
            }
            for bullet in &entry.bullets {
                let _ = write!(block, "\n- {bullet}");
            }
        }
        blocks.push(block);
    }

    if !resume.skills.is_empty() {
        blocks.push(format!("SKILLS\n{}", resume.skills.join(", ")));
    }

    if !resume.education.is_empty() {
        let lines: Vec<String> = resume
            .education
            .iter()
            .map(|e| {
                let degree = [e.degree.as_deref(), e.field.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" in ");
                let mut line = if degree.is_empty() {
                    e.institution.clone()
                } else {
                    format!("{degree}, {}", e.institution)
                };
                if let Some(year) = &e.end_date {
                    let _ = write!(line, " ({year})");
                }
                line
            })
            .collect();
        blocks.push(format!("EDUCATION\n{}", lines.join("\n")));
    }

    if !resume.certifications.is_empty() {
        let lines: Vec<String> = resume
            .certifications
            .iter()
            .map(|c| match &c.issuer {
                Some(issuer) => format!("{} - {issuer}", c.name),
                None => c.name.clone(),
            })
            .collect();
        blocks.push(format!("CERTIFICATIONS\n{}", lines.join("\n")));
    }

    blocks.join("\n\n")
}

pub fn format_jd_text(job: &JobDescription) -> String {
    let mut text = job.title.clone();
    if let Some(company) = &job.company {
        let _ = write!(text, " at {company}");
    }
    let _ = write!(text, "\n\n{}", job.description);
    if !job.required_skills.is_empty() {
        let _ = write!(text, "\n\nRequired skills: {}", job.required_skills.join(", "));
    }
    if !job.preferred_skills.is_empty() {
        let _ = write!(text, "\nPreferred skills: {}", job.preferred_skills.join(", "));
    }
    if let Some(years) = job.experience_years {
        let _ = write!(text, "\nExperience: {years}+ years");
    }
    if let Some(level) = &job.education_level {
        let _ = write!(text, "\nEducation: {level}");
    }
    text
}

/// Derives the label for a scored pair. Pure: the same inputs always give the same label.
pub fn extract_ground_truth(pair: &TrainingPair, result: &AtsResult) -> GroundTruth {
    let breakdown = result.category_breakdown;
    let matched = breakdown.critical.matched_count + breakdown.important.matched_count;
    let total = breakdown.critical.total_keywords + breakdown.important.total_keywords;
    let keyword_coverage = if total == 0 {
        0.0
    } else {
        (matched as f64 / total as f64 * 1000.0).round() / 1000.0
    };
    let ats_score = result.final_score.clamp(0.0, 100.0);

    GroundTruth {
        pair_id: pair.id.clone(),
        resume_category: pair.resume.category.clone(),
        jd_domain: pair.job_description.domain.clone(),
        ats_score,
        keyword_coverage,
        critical_matched: breakdown.critical.matched_count,
        critical_total: breakdown.critical.total_keywords,
        important_matched: breakdown.important.matched_count,
        important_total: breakdown.important.total_keywords,
        matched_keywords: result.strengths.clone(),
        missing_keywords: result.gaps.clone(),
        is_good_match: ats_score >= GOOD_MATCH_THRESHOLD,
        score_interpretation: result.score_interpretation.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground_truth::engine::{CategoryBreakdown, KeywordTally};
    use crate::models::{Certification, Education, Experience};

    fn resume() -> TrainingResume {
        TrainingResume {
            summary: Some("Backend engineer.".to_string()),
            experience: vec![Experience {
                company: "Acme".to_string(),
                title: "Engineer".to_string(),
                location: Some("Austin, TX".to_string()),
                start_date: Some("2019".to_string()),
                end_date: Some("Present".to_string()),
                bullets: vec!["Built the billing pipeline in Rust".to_string()],
            }],
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            education: vec![Education {
                institution: "Ohio State University".to_string(),
                degree: Some("B.S.".to_string()),
                field: Some("Computer Science".to_string()),
                end_date: Some("2015".to_string()),
                gpa: None,
            }],
            certifications: vec![Certification {
                name: "CKA".to_string(),
                issuer: Some("CNCF".to_string()),
                date: None,
            }],
            source: None,
            category: Some("Engineering".to_string()),
            quality_score: None,
        }
    }

    fn job() -> JobDescription {
        JobDescription {
            title: "Backend Engineer".to_string(),
            company: Some("Globex".to_string()),
            description: "Build services in Rust with a small team of engineers.".to_string(),
            required_skills: vec!["Rust".to_string()],
            preferred_skills: vec!["Kafka".to_string()],
            experience_years: Some(3),
            education_level: Some("Bachelor's".to_string()),
            domain: Some("Software".to_string()),
            level: None,
            source: None,
            published_date: None,
        }
    }

    fn result(score: f64) -> AtsResult {
        AtsResult {
            final_score: score,
            category_breakdown: CategoryBreakdown {
                critical: KeywordTally {
                    matched_count: 2,
                    total_keywords: 3,
                },
                important: KeywordTally {
                    matched_count: 1,
                    total_keywords: 3,
                },
            },
            strengths: vec!["Rust".to_string()],
            gaps: vec!["Kafka".to_string()],
            score_interpretation: "Fair match.".to_string(),
        }
    }

    #[test]
    fn test_resume_text_sections_in_order() {
        let text = format_resume_text(&resume());
        let order: Vec<usize> = ["SUMMARY", "EXPERIENCE", "SKILLS", "EDUCATION", "CERTIFICATIONS"]
            .iter()
            .map(|h| text.find(h).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("Engineer at Acme (2019 - Present), Austin, TX\n- Built the billing pipeline in Rust"));
        assert!(text.contains("B.S. in Computer Science, Ohio State University (2015)"));
        assert!(text.contains("CKA - CNCF"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut r = resume();
        r.summary = None;
        r.education.clear();
        r.certifications.clear();
        let text = format_resume_text(&r);
        assert!(text.starts_with("EXPERIENCE"));
        assert!(!text.contains("EDUCATION"));
    }

    #[test]
    fn test_jd_text_lists_skills_and_requirements() {
        let text = format_jd_text(&job());
        assert!(text.starts_with("Backend Engineer at Globex\n\nBuild services"));
        assert!(text.contains("Required skills: Rust"));
        assert!(text.contains("Preferred skills: Kafka"));
        assert!(text.contains("Experience: 3+ years"));
    }

    #[test]
    fn test_ground_truth_fields() {
        let pair = TrainingPair::new(resume(), job());
        let label = extract_ground_truth(&pair, &result(72.5));

        assert_eq!(label.pair_id, pair.id);
        assert_eq!(label.resume_category.as_deref(), Some("Engineering"));
        assert_eq!(label.jd_domain.as_deref(), Some("Software"));
        assert_eq!(label.keyword_coverage, 0.5);
        assert_eq!((label.critical_matched, label.critical_total), (2, 3));
        assert!(label.is_good_match);
        assert_eq!(label.matched_keywords, vec!["Rust"]);
    }

    #[test]
    fn test_good_match_threshold_and_clamping() {
        let pair = TrainingPair::new(resume(), job());
        assert!(!extract_ground_truth(&pair, &result(69.9)).is_good_match);
        assert!(extract_ground_truth(&pair, &result(70.0)).is_good_match);
        assert_eq!(extract_ground_truth(&pair, &result(130.0)).ats_score, 100.0);
    }

    #[test]
    fn test_extraction_is_pure() {
        let pair = TrainingPair::new(resume(), job());
        let r = result(55.0);
        assert_eq!(extract_ground_truth(&pair, &r), extract_ground_truth(&pair, &r));
    }
}
