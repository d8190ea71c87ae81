use serde::{Deserialize, Serialize};

use super::text;

const POSITIVE_WORDS: &[&str] = &[
    "agree", "agreed", "benefit", "benefits", "cooperate", "cooperation", "good", "mutual",
    "pleased", "protect", "protection", "reasonable", "success", "successful", "support",
    "welcome",
];
const NEGATIVE_WORDS: &[&str] = &[
    "breach", "claim", "claims", "damages", "default", "dispute", "failure", "fine",
    "liability", "loss", "penalty", "terminate", "termination", "violation", "void", "withhold",
];
const FORMAL_WORDS: &[&str] = &[
    "herein", "hereby", "hereinafter", "hereto", "heretofore", "notwithstanding", "pursuant",
    "shall", "thereof", "therein", "thereto", "whereas", "whereby", "witnesseth",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Positive,
    Negative,
    Formal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentFindings {
    pub tone: Tone,
    pub positive_count: usize,
    pub negative_count: usize,
    pub formal_count: usize,
}

pub fn classify(content: &str) -> SentimentFindings {
    let mut positive_count = 0;
    let mut negative_count = 0;
    let mut formal_count = 0;
    for word in text::words(content) {
        let word = word.to_lowercase();
        let word = word.as_str();
        if POSITIVE_WORDS.contains(&word) {
            positive_count += 1;
        }
        if NEGATIVE_WORDS.contains(&word) {
            negative_count += 1;
        }
        if FORMAL_WORDS.contains(&word) {
            formal_count += 1;
        }
    }

    // formal wins every tie for the top count
    let top = positive_count.max(negative_count).max(formal_count);
    let tone = if formal_count == top || (positive_count == top && negative_count == top) {
        Tone::Formal
    } else if positive_count == top {
        Tone::Positive
    } else {
        Tone::Negative
    };

    SentimentFindings {
        tone,
        positive_count,
        negative_count,
        formal_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_dominant_tone() {
        assert_eq!(
            classify("Both sides agree to mutual support and cooperation.").tone,
            Tone::Positive
        );
        assert_eq!(
            classify("Any breach or default results in penalty and damages.").tone,
            Tone::Negative
        );
        assert_eq!(
            classify("Whereas the parties hereby covenant pursuant thereto.").tone,
            Tone::Formal
        );
    }

    #[test]
    fn formal_wins_ties() {
        let findings = classify("The tenant shall pay or face a penalty.");
        assert_eq!(findings.negative_count, 1);
        assert_eq!(findings.formal_count, 1);
        assert_eq!(findings.tone, Tone::Formal);
        assert_eq!(classify("").tone, Tone::Formal);
    }
}
