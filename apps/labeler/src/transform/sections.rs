//! Section segmentation: a pure function from normalized text to tagged line groups.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Header lines longer than this are treated as prose, never as section headers.
pub const MAX_HEADER_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Summary,
    Experience,
    Education,
    Skills,
    Certifications,
    Other,
}

static HEADER_PATTERNS: Lazy<Vec<(Section, Regex)>> = Lazy::new(|| {
    [
        (
            Section::Other,
            r"^(?:projects?|awards?|honou?rs(?:\s*(?:&|and)\s*awards)?|publications?|languages?|interests|hobbies|volunteer(?:ing)?(?:\s+(?:experience|work))?|references|activities|accomplishments|achievements|additional\s+information)$",
        ),
        (
            Section::Summary,
            r"^(?:(?:professional|career|executive|personal)\s+)?(?:summary|profile|objective|overview)(?:\s+of\s+qualifications)?$|^about\s+me$",
        ),
        (
            Section::Experience,
            r"^(?:(?:professional|work|relevant|industry)\s+)?experience$|^(?:work|employment|career|professional)\s+history$|^employment$",
        ),
        (
            Section::Education,
            r"^(?:education(?:al)?(?:\s+(?:background|history|details)|\s*(?:&|and)\s*training)?|academic\s+(?:background|qualifications|history)|qualifications)$",
        ),
        (
            Section::Skills,
            r"^(?:(?:technical|core|key|professional|relevant|computer)\s+)?(?:skills?|competencies|expertise|proficiencies)(?:\s*(?:&|and)\s*(?:abilities|tools|technologies|expertise|competencies))?$|^technologies$|^skills?\s+highlights$|^highlights$",
        ),
        (
            Section::Certifications,
            r"^(?:(?:professional\s+)?certifications?|certificates?|licenses?)(?:\s*(?:&|and)\s*(?:certifications?|licenses?))?$",
        ),
    ]
    .into_iter()
    .map(|(section, pattern)| (section, Regex::new(&format!("(?i){pattern}")).unwrap()))
    .collect()
});

static INLINE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Lines grouped by the section they appeared under, in document order.
/// Lines before the first header land in `Section::Other`.
#[derive(Debug, Default, Clone)]
pub struct SectionMap {
    lines: HashMap<Section, Vec<String>>,
}

impl SectionMap {
    pub fn lines(&self, section: Section) -> &[String] {
        self.lines.get(&section).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the section was found and holds at least one non-blank line.
    pub fn has(&self, section: Section) -> bool {
        self.lines(section).iter().any(|l| !l.is_empty())
    }

    fn push(&mut self, section: Section, line: String) {
        self.lines.entry(section).or_default().push(line);
    }
}

/// Unifies line endings, collapses inline whitespace and squeezes blank-line runs to one.
pub fn normalize(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in unified.lines() {
        let line = INLINE_SPACES.replace_all(line, " ").trim().to_string();
        if line.is_empty() {
            if !previous_blank {
                out.push(String::new());
            }
            previous_blank = true;
        } else {
            out.push(line);
            previous_blank = false;
        }
    }

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Classifies a line as a section header. Returns inline content that followed
/// a `Header:` prefix, e.g. `Skills: Python, SQL`.
pub fn detect_header(line: &str) -> Option<(Section, Option<String>)> {
    let (head, rest) = match line.split_once(':') {
        Some((head, rest)) if !rest.trim().is_empty() => (head, Some(rest.trim().to_string())),
        _ => (line, None),
    };

    let head = head.trim_matches(|c: char| c.is_whitespace() || "#*=_-:|•".contains(c));
    if head.is_empty() || head.chars().count() > MAX_HEADER_CHARS {
        return None;
    }

    HEADER_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(head))
        .map(|(section, _)| (*section, rest))
}

/// Splits normalized text into sections by scanning for header lines.
pub fn segment(text: &str) -> SectionMap {
    let mut map = SectionMap::default();
    let mut current = Section::Other;

    for line in text.lines() {
        if let Some((section, inline)) = detect_header(line) {
            current = section;
            if let Some(content) = inline {
                map.push(current, content);
            }
            continue;
        }
        map.push(current, line.to_string());
    }

    map
}
