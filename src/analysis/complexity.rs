use serde::{Deserialize, Serialize};

use super::text;

const LONG_WORD_CHARS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityFindings {
    pub average_words_per_sentence: f64,
    pub long_word_ratio: f64,
    pub score: u8,
    pub level: ComplexityLevel,
}

pub fn measure(content: &str) -> ComplexityFindings {
    let words = text::words(content);
    let sentence_count = text::sentences(content).len().max(1);
    if words.is_empty() {
        return ComplexityFindings {
            average_words_per_sentence: 0.0,
            long_word_ratio: 0.0,
            score: 0,
            level: ComplexityLevel::Low,
        };
    }

    let average_words_per_sentence = words.len() as f64 / sentence_count as f64;
    let long_words = words
        .iter()
        .filter(|word| word.chars().count() > LONG_WORD_CHARS)
        .count();
    let long_word_ratio = long_words as f64 / words.len() as f64;

    // 25 words per sentence or an all-long-word vocabulary each saturate half the scale
    let sentence_part = (average_words_per_sentence / 25.0).min(1.0) * 50.0;
    let vocabulary_part = long_word_ratio * 50.0;
    let score = (sentence_part + vocabulary_part).round().clamp(0.0, 100.0) as u8;
    let level = match score {
        0..=39 => ComplexityLevel::Low,
        40..=69 => ComplexityLevel::Moderate,
        _ => ComplexityLevel::High,
    };

    ComplexityFindings {
        average_words_per_sentence,
        long_word_ratio,
        score,
        level,
    }
}
