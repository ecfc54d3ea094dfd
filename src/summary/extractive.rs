//! Extractive summarization by term-frequency sentence ranking.
//!
//! Scores each sentence by the summed frequency of its content words, keeps
//! the top N, and re-emits them in their original order. Fast enough to run
//! on interval ticks without mattering to the pipeline.

use crate::defaults;
use crate::error::{Result, StenogramError};
use crate::summary::Summarizer;
use std::collections::HashMap;

/// Common English function words excluded from sentence scoring.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "had", "has", "have",
    "he", "her", "his", "i", "if", "in", "is", "it", "its", "like", "me", "my", "no", "not", "of",
    "on", "or", "our", "she", "so", "that", "the", "their", "them", "then", "there", "they",
    "this", "to", "was", "we", "were", "what", "when", "which", "who", "will", "with", "would",
    "you", "your",
];

/// Ranking-based extractive summarizer.
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    /// Number of sentences to keep.
    sentences: usize,
}

impl ExtractiveSummarizer {
    pub fn new(sentences: usize) -> Self {
        Self {
            sentences: sentences.max(1),
        }
    }
}

impl Summarizer for ExtractiveSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.len() < defaults::MIN_SUMMARY_INPUT_CHARS {
            return Err(StenogramError::InsufficientInput {
                message: format!(
                    "transcript has {} characters, need at least {}",
                    text.len(),
                    defaults::MIN_SUMMARY_INPUT_CHARS
                ),
            });
        }

        let sentences = split_sentences(text);
        if sentences.len() <= self.sentences {
            return Ok(text.to_string());
        }

        let frequencies = word_frequencies(&sentences);

        // Score each sentence by its content words, then keep the top N in
        // their original positions.
        let mut ranked: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| (i, sentence_score(s, &frequencies)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut keep: Vec<usize> = ranked.iter().take(self.sentences).map(|(i, _)| *i).collect();
        keep.sort_unstable();

        Ok(keep
            .into_iter()
            .map(|i| sentences[i].as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn mode(&self) -> &'static str {
        "extractive"
    }
}

/// Splits text into sentences on terminal punctuation.
///
/// Speech transcripts rarely contain abbreviations, so a punctuation split
/// is good enough here.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

/// Lowercased content-word frequencies across all sentences.
fn word_frequencies(sentences: &[String]) -> HashMap<String, usize> {
    let mut frequencies = HashMap::new();
    for sentence in sentences {
        for word in content_words(sentence) {
            *frequencies.entry(word).or_insert(0) += 1;
        }
    }
    frequencies
}

/// Average content-word frequency, so long sentences don't win by length
/// alone.
fn sentence_score(sentence: &str, frequencies: &HashMap<String, usize>) -> f64 {
    let words: Vec<String> = content_words(sentence).collect();
    if words.is_empty() {
        return 0.0;
    }
    let total: usize = words
        .iter()
        .map(|w| frequencies.get(w).copied().unwrap_or(0))
        .sum();
    total as f64 / words.len() as f64
}

fn content_words(sentence: &str) -> impl Iterator<Item = String> + '_ {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}
