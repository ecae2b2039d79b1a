//! Skills, education and certification parsing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Certification, Education};
use crate::transform::experience::{strip_bullet, DATE_POINT};

pub const MIN_SKILL_CHARS: usize = 2;
pub const MAX_SKILL_CHARS: usize = 50;
pub const MAX_SKILLS: usize = 60;
/// Delimited items with more words than this are prose, not skills.
const MAX_SKILL_WORDS: usize = 5;
pub const MAX_CERTIFICATIONS: usize = 10;
const MAX_CERTIFICATION_CHARS: usize = 120;
pub const MAX_EDUCATION_ENTRIES: usize = 5;
/// A `Label:` prefix on a skills line is dropped when the label is at most this long.
const MAX_SKILL_LABEL_CHARS: usize = 30;

pub const UNKNOWN_INSTITUTION: &str = "Unknown";

const SKILL_STOP_WORDS: &[&str] = &[
    "and", "or", "etc", "etc.", "others", "other", "various", "skills", "including", "with",
    "the", "a", "an", "in", "of", "n/a",
];

static SKILL_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;|•·▪\t]|\s{2,}|\s+-\s+").unwrap());

static DEGREE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:(?:bachelor|master)(?:'s)?(?:\s+of\s+(?:science|arts|engineering|business administration|technology|commerce|fine arts|education))?|doctorate|associate(?:'s)?\s+degree|mba|bsc|msc|bs|ms|btech|mtech|bcom|high school diploma|diploma|ged)\b|\bph\.?d\b\.?|\b[bm]\.(?:sc|s|a|tech|e|com)\b\.?").unwrap()
});

static FIELD_OF_STUDY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*,?\s*(?:in|of)\s+([A-Z][A-Za-z&]*(?:\s+(?:[A-Z][A-Za-z&]*|and|&))*)").unwrap()
});

static INSTITUTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[A-Z][\w.&'-]*\s+){0,5}(?:University|College|Institute|School|Academy|Polytechnic)(?:\s+of\s+[A-Z][\w.&'-]*(?:\s+[A-Z][\w.&'-]*){0,3})?").unwrap()
});

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

static GPA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bgpa\s*[:\-]?\s*(\d\.\d{1,2})|\b(\d\.\d{1,2})\s*/\s*4\.0\b").unwrap()
});

static CERT_ISSUER_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+[-–—|]\s+|\s*,\s*|\s+(?:by|from|issued by)\s+").unwrap());

fn is_stop_word(item: &str) -> bool {
    SKILL_STOP_WORDS
        .iter()
        .any(|w| w.eq_ignore_ascii_case(item))
}

/// Splits skills lines on common delimiters, filtering stop words and out-of-range
/// lengths; case-insensitive dedup, capped at `MAX_SKILLS`.
pub fn parse_skills(lines: &[String]) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();

    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        let line = strip_bullet(line).unwrap_or(line);
        let line = match line.split_once(':') {
            Some((label, rest)) if label.chars().count() <= MAX_SKILL_LABEL_CHARS => rest,
            _ => line,
        };

        for item in SKILL_DELIMITER.split(line) {
            let item = item
                .trim()
                .trim_end_matches('.')
                .trim_start_matches(|c: char| "-*•".contains(c))
                .trim();
            let chars = item.chars().count();
            if !(MIN_SKILL_CHARS..=MAX_SKILL_CHARS).contains(&chars)
                || item.split_whitespace().count() > MAX_SKILL_WORDS
                || is_stop_word(item)
            {
                continue;
            }
            if !skills.iter().any(|s| s.eq_ignore_ascii_case(item)) {
                skills.push(item.to_string());
            }
            if skills.len() >= MAX_SKILLS {
                return skills;
            }
        }
    }

    skills
}

#[derive(Debug, Default)]
struct EducationDraft {
    institution: Option<String>,
    degree: Option<String>,
    field: Option<String>,
    end_date: Option<String>,
    gpa: Option<String>,
}

impl EducationDraft {
    fn is_empty(&self) -> bool {
        self.institution.is_none() && self.degree.is_none()
    }

    fn finish(self) -> Option<Education> {
        if self.is_empty() {
            return None;
        }
        Some(Education {
            institution: self
                .institution
                .unwrap_or_else(|| UNKNOWN_INSTITUTION.to_string()),
            degree: self.degree,
            field: self.field,
            end_date: self.end_date,
            gpa: self.gpa,
        })
    }
}

/// Groups education lines into entries; a repeated degree or institution starts a new one.
pub fn parse_education(lines: &[String]) -> Vec<Education> {
    let mut entries = Vec::new();
    let mut draft = EducationDraft::default();

    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        let line = strip_bullet(line).unwrap_or(line);
        let degree = DEGREE.find(line);
        let institution = INSTITUTION.find(line).map(|m| m.as_str().trim().to_string());

        if (degree.is_some() && draft.degree.is_some())
            || (institution.is_some() && draft.institution.is_some())
        {
            entries.extend(std::mem::take(&mut draft).finish());
        }

        if let Some(m) = degree {
            draft.degree = Some(m.as_str().trim().to_string());
            if draft.field.is_none() {
                draft.field = FIELD_OF_STUDY
                    .captures(&line[m.end()..])
                    .map(|c| c[1].trim().to_string());
            }
        }
        if institution.is_some() {
            draft.institution = institution;
        }
        if let Some(year) = YEAR.find_iter(line).last() {
            draft.end_date = Some(year.as_str().to_string());
        }
        if let Some(caps) = GPA.captures(line) {
            draft.gpa = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string());
        }
    }

    entries.extend(draft.finish());
    entries.truncate(MAX_EDUCATION_ENTRIES);
    entries
}

/// One certification per line; the last date on the line becomes the certification date.
pub fn parse_certifications(lines: &[String]) -> Vec<Certification> {
    let mut certifications = Vec::new();

    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        let line = strip_bullet(line).unwrap_or(line);
        if line.chars().count() > MAX_CERTIFICATION_CHARS {
            continue;
        }

        let date = DATE_POINT.find_iter(line).last();
        let without_date = match date {
            Some(m) => format!("{}{}", &line[..m.start()], &line[m.end()..]),
            None => line.to_string(),
        };
        let without_date = without_date
            .trim()
            .trim_matches(|c: char| c.is_whitespace() || "-–—|,()".contains(c))
            .to_string();

        let mut parts = CERT_ISSUER_SPLIT.splitn(&without_date, 2);
        let name = parts.next().unwrap_or_default().trim().to_string();
        let issuer = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if name.chars().count() < 3 {
            continue;
        }
        certifications.push(Certification {
            name,
            issuer,
            date: date.map(|m| m.as_str().to_string()),
        });
        if certifications.len() >= MAX_CERTIFICATIONS {
            break;
        }
    }

    certifications
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn test_skills_split_on_delimiters() {
        assert_eq!(
            parse_skills(&lines("Python, SQL, Leadership")),
            vec!["Python", "SQL", "Leadership"]
        );
    }

    #[test]
    fn test_skills_drop_labels_stop_words_and_duplicates() {
        let skills = parse_skills(&lines(
            "Languages: Rust; Go | python\n- Python, etc.\nTools: Docker, and, Kubernetes",
        ));
        assert_eq!(skills, vec!["Rust", "Go", "python", "Docker", "Kubernetes"]);
    }

    #[test]
    fn test_skills_length_bounds_and_prose() {
        let long = "x".repeat(MAX_SKILL_CHARS + 1);
        let text = format!("R, {long}, I have worked with many different teams over years, Excel");
        assert_eq!(parse_skills(&lines(&text)), vec!["Excel"]);
    }

    #[test]
    fn test_skills_capped() {
        let text = (0..100).map(|i| format!("skill{i}")).collect::<Vec<_>>().join(", ");
        assert_eq!(parse_skills(&lines(&text)).len(), MAX_SKILLS);
    }

    #[test]
    fn test_education_degree_field_institution_year() {
        let entries = parse_education(&lines(
            "Bachelor of Science in Computer Science, Stanford University, 2018\nGPA: 3.8",
        ));
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.institution, "Stanford University");
        assert_eq!(e.degree.as_deref(), Some("Bachelor of Science"));
        assert_eq!(e.field.as_deref(), Some("Computer Science"));
        assert_eq!(e.end_date.as_deref(), Some("2018"));
        assert_eq!(e.gpa.as_deref(), Some("3.8"));
    }

    #[test]
    fn test_education_multiple_entries() {
        let entries = parse_education(&lines(
            "University of Texas\nMBA, 2015\nTexas State University\nB.S. in Finance 2010",
        ));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].institution, "University of Texas");
        assert_eq!(entries[0].degree.as_deref(), Some("MBA"));
        assert_eq!(entries[1].institution, "Texas State University");
        assert_eq!(entries[1].field.as_deref(), Some("Finance"));
    }

    #[test]
    fn test_education_degree_without_institution() {
        let entries = parse_education(&lines("Master's in Data Analytics"));
        assert_eq!(entries[0].institution, UNKNOWN_INSTITUTION);
        assert_eq!(entries[0].field.as_deref(), Some("Data Analytics"));
    }

    #[test]
    fn test_certifications_with_issuer_and_date() {
        let certs = parse_certifications(&lines(
            "• AWS Certified Solutions Architect - Amazon Web Services, 2021\nPMP\nCPR",
        ));
        assert_eq!(certs.len(), 3);
        assert_eq!(certs[0].name, "AWS Certified Solutions Architect");
        assert_eq!(certs[0].issuer.as_deref(), Some("Amazon Web Services"));
        assert_eq!(certs[0].date.as_deref(), Some("2021"));
        assert_eq!(certs[1].name, "PMP");
        assert!(certs[1].date.is_none());
    }

    #[test]
    fn test_certifications_capped() {
        let text = (0..15)
            .map(|i| format!("Certificate {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_certifications(&lines(&text)).len(), MAX_CERTIFICATIONS);
    }
}
