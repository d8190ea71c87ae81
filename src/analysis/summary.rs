use serde::{Deserialize, Serialize};

use super::text;

const MIN_SENTENCE_CHARS: usize = 10;
const SUMMARY_SENTENCES: usize = 3;
const WORDS_PER_MINUTE: usize = 250;

pub const EMPTY_SUMMARY: &str = "No content available for analysis.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStatistics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub character_count: usize,
    pub reading_time_minutes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFindings {
    pub summary: String,
    pub key_sentences: Vec<String>,
    pub statistics: TextStatistics,
}

pub fn statistics(content: &str) -> TextStatistics {
    let word_count = text::words(content).len();
    TextStatistics {
        word_count,
        sentence_count: text::sentences(content).len(),
        paragraph_count: text::paragraph_count(content),
        character_count: content.chars().count(),
        reading_time_minutes: word_count.div_ceil(WORDS_PER_MINUTE),
    }
}

pub fn summarize(content: &str) -> SummaryFindings {
    let statistics = statistics(content);
    if content.trim().is_empty() {
        return SummaryFindings {
            summary: EMPTY_SUMMARY.to_string(),
            key_sentences: Vec::new(),
            statistics,
        };
    }

    let key_sentences: Vec<String> = text::sentences(content)
        .into_iter()
        .filter(|sentence| sentence.chars().count() >= MIN_SENTENCE_CHARS)
        .take(SUMMARY_SENTENCES)
        .map(str::to_string)
        .collect();

    let summary = if key_sentences.is_empty() {
        content.trim().to_string()
    } else {
        format!("{}.", key_sentences.join(". "))
    };

    SummaryFindings {
        summary,
        key_sentences,
        statistics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_three_substantial_sentences() {
        let content = "Short. This agreement starts today. The tenant pays rent monthly. \
                       Repairs are shared equally. Pets are not allowed here.";
        let findings = summarize(content);
        assert_eq!(
            findings.key_sentences,
            vec![
                "This agreement starts today",
                "The tenant pays rent monthly",
                "Repairs are shared equally",
            ]
        );
        assert!(findings.summary.ends_with("Repairs are shared equally."));
        assert_eq!(findings.statistics.sentence_count, 5);
    }

    #[test]
    fn reading_time_rounds_up() {
        let content = "word ".repeat(251);
        assert_eq!(statistics(&content).reading_time_minutes, 2);
        assert_eq!(statistics("one two").reading_time_minutes, 1);
    }

    #[test]
    fn empty_content_degrades_gracefully() {
        let findings = summarize("   \n ");
        assert_eq!(findings.summary, EMPTY_SUMMARY);
        assert!(findings.key_sentences.is_empty());
        assert_eq!(findings.statistics.word_count, 0);
        assert_eq!(findings.statistics.reading_time_minutes, 0);
    }
}
