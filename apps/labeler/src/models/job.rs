use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minimum description length for a job description to be kept.
pub const MIN_DESCRIPTION_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescription {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<NaiveDate>,
}

impl JobDescription {
    /// Records failing this check are dropped by the loaders, never yielded.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
            && self.description.trim().chars().count() >= MIN_DESCRIPTION_CHARS
    }

    /// Required and preferred skills, in that order.
    pub fn all_skills(&self) -> impl Iterator<Item = &String> {
        self.required_skills.iter().chain(self.preferred_skills.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, description: &str) -> JobDescription {
        JobDescription {
            title: title.to_string(),
            company: None,
            description: description.to_string(),
            required_skills: vec!["python".to_string()],
            preferred_skills: vec!["docker".to_string()],
            experience_years: None,
            education_level: None,
            domain: None,
            level: None,
            source: None,
            published_date: None,
        }
    }

    #[test]
    fn test_short_description_is_invalid() {
        assert!(!job("Engineer", "Write code.").is_valid());
    }

    #[test]
    fn test_blank_title_is_invalid() {
        let description = "We are hiring someone to build and operate our data platform at scale.";
        assert!(!job("  ", description).is_valid());
        assert!(job("Data Engineer", description).is_valid());
    }

    #[test]
    fn test_all_skills_chains_required_then_preferred() {
        let j = job("Engineer", "");
        let skills: Vec<&String> = j.all_skills().collect();
        assert_eq!(skills, vec!["python", "docker"]);
    }
}
