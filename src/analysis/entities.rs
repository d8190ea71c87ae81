use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub(crate) const DATE_PATTERN: &str = concat!(
    r"(?i)\b(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}",
    r"|\d{4}-\d{2}-\d{2}",
    r"|(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}",
    r"|\d{1,2}(?:st|nd|rd|th)?\s+(?:January|February|March|April|May|June|July|August|September|October|November|December),?\s+\d{4})\b",
);
pub(crate) const AMOUNT_PATTERN: &str =
    r"(?i)\$\s?\d+(?:,\d{3})*(?:\.\d{2})?|\b\d+(?:,\d{3})*(?:\.\d+)?\s?(?:USD|EUR|GBP|dollars|euros)\b";
const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
const PHONE_PATTERN: &str = r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]\d{4}\b";

static DATES: Lazy<Regex> = Lazy::new(|| Regex::new(DATE_PATTERN).expect("valid date pattern"));
static AMOUNTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(AMOUNT_PATTERN).expect("valid amount pattern"));
static EMAILS: Lazy<Regex> = Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("valid email pattern"));
static PHONES: Lazy<Regex> = Lazy::new(|| Regex::new(PHONE_PATTERN).expect("valid phone pattern"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    pub dates: Vec<String>,
    pub amounts: Vec<String>,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
            && self.amounts.is_empty()
            && self.emails.is_empty()
            && self.phone_numbers.is_empty()
    }
}

fn unique_matches(pattern: &Regex, content: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for hit in pattern.find_iter(content) {
        let value = hit.as_str().trim().to_string();
        if !found.contains(&value) {
            found.push(value);
        }
    }
    found
}

pub fn extract(content: &str) -> Entities {
    Entities {
        dates: unique_matches(&DATES, content),
        amounts: unique_matches(&AMOUNTS, content),
        emails: unique_matches(&EMAILS, content),
        phone_numbers: unique_matches(&PHONES, content),
    }
}
