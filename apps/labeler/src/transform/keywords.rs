//! Domain keyword patterns: the fixed vocabulary used to pull skills out of free text.
//!
//! Shared by the job-description loaders (skill extraction), the quality score
//! (skill variety) and the keyword score engine (critical vs important terms).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Upper bound on skills extracted from a single free-text field.
pub const MAX_EXTRACTED_SKILLS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Language,
    Tool,
    Methodology,
    Soft,
}

impl SkillKind {
    /// Languages and tools are hard requirements; methodology and soft skills are not.
    pub fn is_technical(self) -> bool {
        matches!(self, SkillKind::Language | SkillKind::Tool)
    }
}

pub struct DomainKeyword {
    pub name: &'static str,
    pub kind: SkillKind,
    pattern: Regex,
}

impl DomainKeyword {
    pub fn find_in(&self, text: &str) -> Option<usize> {
        self.pattern.find(text).map(|m| m.start())
    }
}

const KEYWORD_TABLE: &[(&str, SkillKind, &str)] = &[
    // Languages
    ("Python", SkillKind::Language, r"\bpython\b"),
    ("Java", SkillKind::Language, r"\bjava\b"),
    ("JavaScript", SkillKind::Language, r"\bjavascript\b"),
    ("TypeScript", SkillKind::Language, r"\btypescript\b"),
    ("C++", SkillKind::Language, r"\bc\+\+"),
    ("C#", SkillKind::Language, r"\bc#"),
    ("Go", SkillKind::Language, r"\bgolang\b"),
    ("Rust", SkillKind::Language, r"\brust\b"),
    ("Ruby", SkillKind::Language, r"\bruby\b"),
    ("PHP", SkillKind::Language, r"\bphp\b"),
    ("Swift", SkillKind::Language, r"\bswift\b"),
    ("Kotlin", SkillKind::Language, r"\bkotlin\b"),
    ("Scala", SkillKind::Language, r"\bscala\b"),
    ("SQL", SkillKind::Language, r"\bsql\b"),
    ("HTML", SkillKind::Language, r"\bhtml5?\b"),
    ("CSS", SkillKind::Language, r"\bcss3?\b"),
    ("MATLAB", SkillKind::Language, r"\bmatlab\b"),
    ("Bash", SkillKind::Language, r"\bbash\b|\bshell scripting\b"),
    // Tools and platforms
    ("AWS", SkillKind::Tool, r"\baws\b|\bamazon web services\b"),
    ("Azure", SkillKind::Tool, r"\bazure\b"),
    ("GCP", SkillKind::Tool, r"\bgcp\b|\bgoogle cloud\b"),
    ("Docker", SkillKind::Tool, r"\bdocker\b"),
    ("Kubernetes", SkillKind::Tool, r"\bkubernetes\b|\bk8s\b"),
    ("Git", SkillKind::Tool, r"\bgit\b|\bgithub\b|\bgitlab\b"),
    ("Jenkins", SkillKind::Tool, r"\bjenkins\b"),
    ("Terraform", SkillKind::Tool, r"\bterraform\b"),
    ("React", SkillKind::Tool, r"\breact(?:\.js|js)?\b"),
    ("Angular", SkillKind::Tool, r"\bangular(?:js)?\b"),
    ("Vue", SkillKind::Tool, r"\bvue(?:\.js)?\b"),
    ("Node.js", SkillKind::Tool, r"\bnode(?:\.js|js)\b"),
    ("Django", SkillKind::Tool, r"\bdjango\b"),
    ("Flask", SkillKind::Tool, r"\bflask\b"),
    ("Spring", SkillKind::Tool, r"\bspring boot\b|\bspring framework\b"),
    ("TensorFlow", SkillKind::Tool, r"\btensorflow\b"),
    ("PyTorch", SkillKind::Tool, r"\bpytorch\b"),
    ("Pandas", SkillKind::Tool, r"\bpandas\b"),
    ("Spark", SkillKind::Tool, r"\b(?:apache )?spark\b"),
    ("Hadoop", SkillKind::Tool, r"\bhadoop\b"),
    ("Kafka", SkillKind::Tool, r"\bkafka\b"),
    ("PostgreSQL", SkillKind::Tool, r"\bpostgres(?:ql)?\b"),
    ("MySQL", SkillKind::Tool, r"\bmysql\b"),
    ("MongoDB", SkillKind::Tool, r"\bmongo(?:db)?\b"),
    ("Redis", SkillKind::Tool, r"\bredis\b"),
    ("Linux", SkillKind::Tool, r"\blinux\b"),
    ("Excel", SkillKind::Tool, r"\b(?:ms |microsoft )?excel\b"),
    ("Tableau", SkillKind::Tool, r"\btableau\b"),
    ("Power BI", SkillKind::Tool, r"\bpower ?bi\b"),
    ("Salesforce", SkillKind::Tool, r"\bsalesforce\b"),
    ("Jira", SkillKind::Tool, r"\bjira\b"),
    ("SAP", SkillKind::Tool, r"\bsap\b"),
    ("QuickBooks", SkillKind::Tool, r"\bquickbooks\b"),
    ("Photoshop", SkillKind::Tool, r"\bphotoshop\b"),
    // Methodology
    ("Agile", SkillKind::Methodology, r"\bagile\b"),
    ("Scrum", SkillKind::Methodology, r"\bscrum\b"),
    ("Kanban", SkillKind::Methodology, r"\bkanban\b"),
    ("DevOps", SkillKind::Methodology, r"\bdevops\b"),
    ("CI/CD", SkillKind::Methodology, r"\bci\s*/\s*cd\b"),
    ("TDD", SkillKind::Methodology, r"\btdd\b|\btest[- ]driven\b"),
    ("Machine Learning", SkillKind::Methodology, r"\bmachine learning\b"),
    ("Deep Learning", SkillKind::Methodology, r"\bdeep learning\b"),
    ("Data Analysis", SkillKind::Methodology, r"\bdata analy(?:sis|tics)\b"),
    ("Project Management", SkillKind::Methodology, r"\bproject management\b"),
    ("Six Sigma", SkillKind::Methodology, r"\bsix sigma\b"),
    ("Microservices", SkillKind::Methodology, r"\bmicro-?services\b"),
    ("REST APIs", SkillKind::Methodology, r"\brestful\b|\brest apis?\b"),
    ("Budgeting", SkillKind::Methodology, r"\bbudgeting\b"),
    ("Forecasting", SkillKind::Methodology, r"\bforecasting\b"),
    // Soft skills
    ("Leadership", SkillKind::Soft, r"\bleadership\b"),
    ("Communication", SkillKind::Soft, r"\bcommunication\b"),
    ("Teamwork", SkillKind::Soft, r"\bteam ?work\b"),
    ("Problem Solving", SkillKind::Soft, r"\bproblem[- ]solving\b"),
    ("Time Management", SkillKind::Soft, r"\btime management\b"),
    ("Negotiation", SkillKind::Soft, r"\bnegotiat(?:ion|ing)\b"),
    ("Customer Service", SkillKind::Soft, r"\bcustomer service\b"),
    ("Collaboration", SkillKind::Soft, r"\bcollaborat(?:ion|ive)\b"),
    ("Mentoring", SkillKind::Soft, r"\bmentor(?:ing|ship)?\b"),
    ("Critical Thinking", SkillKind::Soft, r"\bcritical thinking\b"),
];

pub static DOMAIN_KEYWORDS: Lazy<Vec<DomainKeyword>> = Lazy::new(|| {
    KEYWORD_TABLE
        .iter()
        .map(|(name, kind, pattern)| DomainKeyword {
            name: *name,
            kind: *kind,
            pattern: Regex::new(&format!("(?i){pattern}")).unwrap(),
        })
        .collect()
});

/// Extracts known skills from free text, in order of first appearance,
/// deduplicated case-insensitively and capped at `MAX_EXTRACTED_SKILLS`.
pub fn extract_skills(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &'static str)> = DOMAIN_KEYWORDS
        .iter()
        .filter_map(|k| k.find_in(text).map(|pos| (pos, k.name)))
        .collect();
    found.sort_by_key(|(pos, _)| *pos);

    let mut skills: Vec<String> = Vec::new();
    for (_, name) in found {
        if !skills.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            skills.push(name.to_string());
        }
        if skills.len() >= MAX_EXTRACTED_SKILLS {
            break;
        }
    }
    skills
}

/// Returns the first domain keyword mentioned in `skill`, if any.
pub fn classify_skill(skill: &str) -> Option<&'static DomainKeyword> {
    DOMAIN_KEYWORDS.iter().find(|k| k.find_in(skill).is_some())
}
