use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::text;

const MAX_KEY_POINTS: usize = 10;
const IMPORTANCE_PER_MATCH: usize = 25;

struct Category {
    name: &'static str,
    patterns: &'static [&'static str],
}

const CATEGORIES: &[Category] = &[
    Category {
        name: "Legal Obligations",
        patterns: &[
            r"(?i)\bshall\b",
            r"(?i)\bmust\b",
            r"(?i)\brequired\s+to\b",
            r"(?i)\bobligat(?:e|ed|es|ion|ions)\b",
            r"(?i)\bagree(?:s|d)?\b",
            r"(?i)\bundertakes?\b",
            r"(?i)\bcovenants?\b",
        ],
    },
    Category {
        name: "Financial Terms",
        patterns: &[
            r"(?i)\bpayments?\b",
            r"(?i)\bpay(?:able|s)?\b",
            r"(?i)\bfees?\b",
            r"(?i)\bcosts?\b",
            r"(?i)\bprice\b",
            r"(?i)\bcompensation\b",
            r"(?i)\binvoices?\b",
            r"\$\s?\d",
        ],
    },
    Category {
        name: "Timelines",
        patterns: &[
            r"(?i)\bwithin\s+\d+\s+(?:business\s+)?(?:days?|weeks?|months?|years?)\b",
            r"(?i)\bdeadlines?\b",
            r"(?i)\bdue\s+date\b",
            r"(?i)\bno\s+later\s+than\b",
            r"(?i)\beffective\s+date\b",
            r"(?i)\bexpir(?:e|es|ed|ation|y)\b",
        ],
    },
    Category {
        name: "Parties",
        patterns: &[
            r"(?i)\bpart(?:y|ies)\b",
            r"(?i)\blicens(?:or|ee)\b",
            r"(?i)\blandlord\b",
            r"(?i)\btenant\b",
            r"(?i)\bemploy(?:er|ee)\b",
            r"(?i)\b(?:buyer|seller|vendor|contractor)\b",
        ],
    },
    Category {
        name: "Liability",
        patterns: &[
            r"(?i)\bliab(?:le|ility)\b",
            r"(?i)\bindemnif(?:y|ies|ied|ication)\b",
            r"(?i)\bdamages\b",
            r"(?i)\bwarrant(?:y|ies)?\b",
            r"(?i)\bbreach(?:es|ed)?\b",
            r"(?i)\bnegligen(?:ce|t)\b",
        ],
    },
];

static COMPILED: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    CATEGORIES
        .iter()
        .map(|category| {
            let patterns = category
                .patterns
                .iter()
                .map(|pattern| Regex::new(pattern).expect("valid key point pattern"))
                .collect();
            (category.name, patterns)
        })
        .collect()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub category: String,
    pub text: String,
    pub importance: u8,
    pub matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPointsFindings {
    pub key_points: Vec<KeyPoint>,
    pub summary: String,
}

pub fn extract(content: &str) -> KeyPointsFindings {
    let mut points = Vec::new();
    for sentence in text::sentences(content) {
        for (category, patterns) in COMPILED.iter() {
            let matches: usize = patterns
                .iter()
                .map(|pattern| pattern.find_iter(sentence).count())
                .sum();
            if matches == 0 {
                continue;
            }
            points.push(KeyPoint {
                category: (*category).to_string(),
                text: sentence.to_string(),
                importance: (matches * IMPORTANCE_PER_MATCH).min(100) as u8,
                matches,
            });
        }
    }

    // stable: equal importance keeps document order
    points.sort_by(|a, b| b.importance.cmp(&a.importance));
    points.truncate(MAX_KEY_POINTS);

    let mut categories: Vec<&str> = points.iter().map(|point| point.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();
    let summary = if points.is_empty() {
        "Found 0 key points in the document.".to_string()
    } else {
        format!(
            "Found {} key points across {} categories.",
            points.len(),
            categories.len()
        )
    };

    KeyPointsFindings {
        key_points: points,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_obligation_and_payment_terms() {
        let findings = extract(
            "Payment shall be made within 30 days. The parties agree to confidentiality.",
        );
        let categories: Vec<&str> = findings
            .key_points
            .iter()
            .map(|point| point.category.as_str())
            .collect();
        assert!(categories.contains(&"Legal Obligations"));
        assert!(categories.contains(&"Financial Terms"));
        assert!(categories.contains(&"Timelines"));
        assert!(categories.contains(&"Parties"));
        assert!(findings.key_points.len() >= 2);
    }

    #[test]
    fn importance_scales_with_matches_and_caps() {
        let findings = extract(
            "The tenant shall pay and must pay and is required to pay and shall agree and must comply.",
        );
        let obligations = findings
            .key_points
            .iter()
            .find(|point| point.category == "Legal Obligations")
            .expect("obligation point");
        assert_eq!(obligations.importance, 100);
        assert!(findings.key_points[0].importance >= findings.key_points[1].importance);
    }

    #[test]
    fn keeps_at_most_ten_points() {
        let content = "The party shall pay the fee. ".repeat(8);
        let findings = extract(&content);
        assert_eq!(findings.key_points.len(), MAX_KEY_POINTS);
    }

    #[test]
    fn no_matches_yields_empty_list() {
        let findings = extract("The weather was pleasant on the hill.");
        assert!(findings.key_points.is_empty());
        assert!(findings.summary.contains("0 key points"));
    }
}
