use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("valid sentence pattern"));
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph pattern"));

/// Non-empty, trimmed fragments between sentence-ending punctuation.
pub fn sentences(content: &str) -> Vec<&str> {
    SENTENCE_BREAK
        .split(content)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Whitespace-separated tokens with surrounding punctuation stripped.
pub fn words(content: &str) -> Vec<&str> {
    content
        .split_whitespace()
        .map(|token| token.trim_matches(|ch: char| !ch.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .collect()
}

pub fn paragraph_count(content: &str) -> usize {
    PARAGRAPH_BREAK
        .split(content)
        .filter(|block| !block.trim().is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_decimal_amounts_inside_a_sentence() {
        let parts = sentences("The fee is $1,000.50 per month. Late fees apply!");
        assert_eq!(parts, vec!["The fee is $1,000.50 per month", "Late fees apply"]);
    }

    #[test]
    fn strips_punctuation_from_words() {
        assert_eq!(
            words("(a) Tenant's rent, due -- monthly."),
            vec!["a", "Tenant's", "rent", "due", "monthly"]
        );
    }

    #[test]
    fn counts_blank_line_separated_paragraphs() {
        assert_eq!(paragraph_count("one\n\n  \n two\nstill two\n\nthree"), 3);
        assert_eq!(paragraph_count("   "), 0);
    }
}
