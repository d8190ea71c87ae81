use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::text;

static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:\d+(?:\.\d+)*[.)]|\([a-z0-9]+\)|[ivx]+\.)\s+\S")
        .expect("valid numbered pattern")
});
static BULLET_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-*\u{2022}]\s+\S").expect("valid bullet pattern"));
static HEADER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:#{1,6}\s+\S.*|(?i:article|section)\s+[0-9ivx]+\b.*|[A-Z][A-Z0-9 ,&'-]{3,}:?\s*)$")
        .expect("valid header pattern")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSignals {
    pub has_numbered_sections: bool,
    pub has_bullet_points: bool,
    pub has_headers: bool,
    pub section_count: usize,
    pub paragraph_count: usize,
    pub structure_score: u8,
}

pub fn detect(content: &str) -> StructureSignals {
    let numbered = NUMBERED_LINE.find_iter(content).count();
    let bullets = BULLET_LINE.find_iter(content).count();
    let headers = HEADER_LINE.find_iter(content).count();
    let paragraph_count = text::paragraph_count(content);

    let checks = [
        (numbered > 0, 25u8),
        (bullets > 0, 20),
        (headers > 0, 25),
        (paragraph_count >= 3, 15),
        (numbered + headers >= 3, 15),
    ];
    let structure_score = checks
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, weight)| weight)
        .sum();

    StructureSignals {
        has_numbered_sections: numbered > 0,
        has_bullet_points: bullets > 0,
        has_headers: headers > 0,
        section_count: numbered.max(headers),
        paragraph_count,
        structure_score,
    }
}
