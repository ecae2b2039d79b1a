//! Experience parsing: groups section lines into entries of header lines + bullets.
//!
//! A line opens (or extends) an entry header when it carries a date, a job-title
//! or company token, or reads as Title Case. Marker lines are bullets; long unmarked
//! lines are treated as bullet continuations.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Experience;

pub const MAX_BULLETS_PER_ENTRY: usize = 8;
pub const MIN_BULLET_CHARS: usize = 20;
/// Unmarked lines longer than this are read as bullets rather than headers.
pub const CONTINUATION_MIN_CHARS: usize = 30;
pub const MAX_ENTRY_HEADER_CHARS: usize = 100;
pub const MAX_HEADER_LINES: usize = 3;
/// Title Case detection: share of capitalized words required.
const TITLE_CASE_RATIO: f64 = 0.7;
const TITLE_CASE_MAX_WORDS: usize = 10;

pub const UNKNOWN_COMPANY: &str = "Unknown";
pub const UNKNOWN_TITLE: &str = "Unknown";

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

pub static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•·▪◦●■►‣–—>]+|\d{1,2}[.)])\s*").unwrap());

static DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    let date = format!(r"(?:{MONTH}\s*,?\s*\d{{4}}|\d{{1,2}}/\d{{2,4}}|\d{{4}})");
    Regex::new(&format!(
        r"(?i)\b({date})\s*(?:-|–|—|\bto\b|\buntil\b)\s*({date}|present|current|now|today)"
    ))
    .unwrap()
});

pub static DATE_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{MONTH}\s*,?\s*\d{{4}}|\d{{1,2}}/\d{{4}}|(?:19|20)\d{{2}})\b"
    ))
    .unwrap()
});

pub static TITLE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:engineer|developer|manager|director|analyst|consultant|specialist|coordinator|assistant|associate|administrator|architect|designer|scientist|officer|lead|head|intern|supervisor|representative|accountant|technician|executive|president|vp|chef|teacher|nurse|advocate|clerk|agent|programmer|trainee|owner|founder|instructor|editor|writer|recruiter)s?\b").unwrap()
});

static COMPANY_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:inc|llc|ltd|corp|corporation|company|co|group|technologies|solutions|systems|labs|bank|hospital|gmbh|plc|partners|associates|consulting|services)\b\.?").unwrap()
});

static LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s[A-Z][a-z]+)?,\s*[A-Z]{2})\b|\b(Remote)\b").unwrap()
});

static TITLE_AT_COMPANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+(?:at|@)\s+(.+)$").unwrap());

static FIELD_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[|,]\s*|\s+[-–—]\s+").unwrap());

/// Returns the bullet text when `line` starts with a bullet marker.
pub fn strip_bullet(line: &str) -> Option<&str> {
    BULLET.find(line).map(|m| line[m.end()..].trim())
}

fn is_title_case(line: &str) -> bool {
    let words: Vec<&str> = line
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
        .collect();
    if words.len() < 2 || words.len() > TITLE_CASE_MAX_WORDS || line.ends_with('.') {
        return false;
    }
    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    capitalized as f64 / words.len() as f64 >= TITLE_CASE_RATIO
}

/// Whether an unmarked line reads as an entry header.
/// With `require_date`, only dated lines qualify (used by the loose fallback pass).
pub fn is_entry_header(line: &str, require_date: bool) -> bool {
    if line.chars().count() > MAX_ENTRY_HEADER_CHARS || BULLET.is_match(line) {
        return false;
    }
    let has_date = DATE_POINT.is_match(line);
    if require_date {
        return has_date;
    }
    has_date
        || (line.chars().count() <= CONTINUATION_MIN_CHARS
            && (TITLE_KEYWORDS.is_match(line) || COMPANY_HINT.is_match(line)))
        || is_title_case(line)
}

#[derive(Debug, Default)]
struct EntryDraft {
    header_lines: Vec<String>,
    bullets: Vec<String>,
}

impl EntryDraft {
    fn accepts_header_line(&self) -> bool {
        self.bullets.is_empty() && self.header_lines.len() < MAX_HEADER_LINES
    }

    fn push_bullet(&mut self, text: &str) {
        self.bullets.push(text.to_string());
    }

    fn finish(self) -> Option<Experience> {
        let bullets: Vec<String> = self
            .bullets
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| b.chars().count() >= MIN_BULLET_CHARS)
            .take(MAX_BULLETS_PER_ENTRY)
            .collect();
        if bullets.is_empty() {
            return None;
        }

        let header = parse_header(&self.header_lines);
        Some(Experience {
            company: header.company.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            title: header.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            location: header.location,
            start_date: header.start_date,
            end_date: header.end_date,
            bullets,
        })
    }
}

/// Parses experience entries out of section lines, in document order.
pub fn parse_experience(lines: &[String], require_date: bool) -> Vec<Experience> {
    let mut entries = Vec::new();
    let mut current: Option<EntryDraft> = None;

    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if let Some(text) = strip_bullet(line) {
            // The loose pass only trusts bullets that follow a dated header.
            if current.is_none() && require_date {
                continue;
            }
            current.get_or_insert_with(EntryDraft::default).push_bullet(text);
            continue;
        }

        if is_entry_header(line, require_date) {
            match current.as_mut() {
                Some(draft) if draft.accepts_header_line() => {
                    draft.header_lines.push(line.to_string())
                }
                _ => {
                    entries.extend(current.take().and_then(EntryDraft::finish));
                    current = Some(EntryDraft {
                        header_lines: vec![line.to_string()],
                        bullets: Vec::new(),
                    });
                }
            }
            continue;
        }

        let Some(draft) = current.as_mut() else {
            continue;
        };

        // Wrapped bullet text continues the previous bullet.
        let starts_lowercase = line.chars().next().is_some_and(char::is_lowercase);
        if starts_lowercase {
            if let Some(last) = draft.bullets.last_mut() {
                last.push(' ');
                last.push_str(line);
                continue;
            }
        }

        if line.chars().count() > CONTINUATION_MIN_CHARS {
            draft.push_bullet(line);
        } else if draft.accepts_header_line() {
            draft.header_lines.push(line.to_string());
        }
    }

    entries.extend(current.and_then(EntryDraft::finish));
    entries
}

#[derive(Debug, Default, PartialEq)]
struct EntryHeader {
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

fn parse_header(lines: &[String]) -> EntryHeader {
    let mut header = EntryHeader::default();
    let mut parts: Vec<String> = Vec::new();

    for line in lines {
        let mut rest = line.clone();

        if header.start_date.is_none() {
            if let Some(caps) = DATE_RANGE.captures(line) {
                header.start_date = caps.get(1).map(|m| m.as_str().to_string());
                header.end_date = caps.get(2).map(|m| m.as_str().to_string());
                rest = rest.replace(&caps[0], " ");
            } else if let Some(m) = DATE_POINT.find(line) {
                header.start_date = Some(m.as_str().to_string());
                rest = rest.replace(m.as_str(), " ");
            }
        }

        if header.location.is_none() {
            let found = LOCATION
                .find_iter(&rest)
                .map(|m| m.as_str().to_string())
                .find(|loc| !COMPANY_HINT.is_match(loc));
            if let Some(loc) = found {
                rest = rest.replace(&loc, " ");
                header.location = Some(loc);
            }
        }

        let cleaned = clean_fragment(&rest);
        if !cleaned.is_empty() {
            parts.push(cleaned);
        }
    }

    let mut parts = parts.into_iter();
    if let Some(first) = parts.next() {
        let (title, company) = split_title_company(&first);
        header.title = title;
        header.company = company;
    }
    // The next header line fills whichever of title/company is still missing.
    if let Some(next) = parts.next() {
        if header.title.is_none() {
            header.title = Some(next);
        } else if header.company.is_none() {
            header.company = Some(next);
        }
    }
    header
}

fn clean_fragment(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || ",|-–—()@".contains(c))
        .to_string()
}

fn split_title_company(s: &str) -> (Option<String>, Option<String>) {
    if let Some(caps) = TITLE_AT_COMPANY.captures(s) {
        return (
            Some(clean_fragment(&caps[1])),
            Some(clean_fragment(&caps[2])),
        );
    }

    let pieces: Vec<String> = FIELD_SEPARATOR
        .split(s)
        .map(clean_fragment)
        .filter(|p| !p.is_empty())
        .collect();

    match pieces.as_slice() {
        [] => (None, None),
        [only] => {
            if TITLE_KEYWORDS.is_match(only) {
                (Some(only.clone()), None)
            } else {
                (None, Some(only.clone()))
            }
        }
        [a, b, ..] => {
            let a_title = TITLE_KEYWORDS.is_match(a);
            let b_title = TITLE_KEYWORDS.is_match(b);
            if (b_title && !a_title) || (!a_title && !b_title && COMPANY_HINT.is_match(a)) {
                (Some(b.clone()), Some(a.clone()))
            } else {
                (Some(a.clone()), Some(b.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn test_title_company_and_dates_across_header_lines() {
        let entries = parse_experience(
            &lines(
                "Senior Engineer, Acme Corp\nJan 2020 - Present\n- Led a team of 5 engineers\n- Reduced latency by 30%",
            ),
            false,
        );
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.title, "Senior Engineer");
        assert_eq!(e.company, "Acme Corp");
        assert_eq!(e.start_date.as_deref(), Some("Jan 2020"));
        assert_eq!(e.end_date.as_deref(), Some("Present"));
        assert_eq!(e.bullets.len(), 2);
    }

    #[test]
    fn test_multiple_entries_in_document_order() {
        let text = "Data Analyst at Globex | 2019 - 2021\n• Built 40 dashboards used by the finance team\nJunior Analyst at Initech | 2017 - 2019\n• Cleaned monthly sales data for 12 regions";
        let entries = parse_experience(&lines(text), false);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].company, "Globex");
        assert_eq!(entries[0].title, "Data Analyst");
        assert_eq!(entries[1].title, "Junior Analyst");
        assert_eq!(entries[1].start_date.as_deref(), Some("2017"));
    }

    #[test]
    fn test_company_first_ordering_is_swapped() {
        let (title, company) = split_title_company("Globex Corporation - Marketing Manager");
        assert_eq!(title.as_deref(), Some("Marketing Manager"));
        assert_eq!(company.as_deref(), Some("Globex Corporation"));
    }

    #[test]
    fn test_next_line_fills_missing_title() {
        let entries = parse_experience(
            &lines("Globex Corporation\nOperations Lead\n- Coordinated vendor contracts across three sites"),
            false,
        );
        assert_eq!(entries[0].company, "Globex Corporation");
        assert_eq!(entries[0].title, "Operations Lead");
    }

    #[test]
    fn test_location_extracted_from_header() {
        let entries = parse_experience(
            &lines("Nurse, Mercy Hospital, Austin, TX\n- Managed patient intake for a 30-bed ward"),
            false,
        );
        assert_eq!(entries[0].location.as_deref(), Some("Austin, TX"));
        assert_eq!(entries[0].company, "Mercy Hospital");
    }

    #[test]
    fn test_short_bullets_dropped_and_entry_without_bullets_rejected() {
        let entries = parse_experience(
            &lines("Engineer, Acme\n- Did stuff\nAnalyst, Globex\n- Automated the weekly revenue report"),
            false,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company, "Globex");
    }

    #[test]
    fn test_bullets_capped_per_entry() {
        let mut text = String::from("Engineer, Acme\n");
        for i in 0..12 {
            text.push_str(&format!("- Delivered feature number {i} to production\n"));
        }
        let entries = parse_experience(&lines(&text), false);
        assert_eq!(entries[0].bullets.len(), MAX_BULLETS_PER_ENTRY);
    }

    #[test]
    fn test_long_unmarked_lines_are_bullets_and_wraps_are_joined() {
        let text = "Engineer, Acme\nMaintained the deployment pipeline for all services\nand its\n- Wrote the incident runbook for the platform\nteam on call";
        let entries = parse_experience(&lines(text), false);
        let bullets = &entries[0].bullets;
        assert_eq!(bullets.len(), 2);
        assert!(bullets[0].ends_with("and its"));
        assert!(bullets[1].ends_with("platform team on call"));
    }

    #[test]
    fn test_require_date_ignores_undated_headers() {
        assert!(!is_entry_header("Senior Engineer, Acme Corp", true));
        assert!(is_entry_header("Acme Corp 2018 - 2020", true));
        assert!(!is_entry_header("- 2018 launch of the product", false));
    }
}
