//! Frequency-ranked bigram/trigram extraction.

use crate::model::Topic;
use ahash::AHashMap;

pub struct TopicExtractor {
    top_n: usize,
}

impl TopicExtractor {
    pub fn new(top_n: usize) -> Self {
        TopicExtractor { top_n }
    }

    /// Rank the 2- and 3-word phrases of `text` by `frequency * ln(words + 1)`.
    ///
    /// Equal scores keep first-occurrence order.
    pub fn extract(&self, text: &str) -> Vec<Topic> {
        let words = tokenize(text);

        // (phrase, word count, frequency) in first-occurrence order
        let mut phrases: Vec<(String, usize, usize)> = Vec::new();
        let mut positions: AHashMap<String, usize> = AHashMap::new();

        let mut count = |phrase: String, n: usize| match positions.get(&phrase) {
            Some(&idx) => phrases[idx].2 += 1,
            None => {
                positions.insert(phrase.clone(), phrases.len());
                phrases.push((phrase, n, 1));
            }
        };

        for i in 0..words.len().saturating_sub(1) {
            count(format!("{} {}", words[i], words[i + 1]), 2);
            if i + 2 < words.len() {
                count(format!("{} {} {}", words[i], words[i + 1], words[i + 2]), 3);
            }
        }

        let mut topics: Vec<Topic> = phrases
            .into_iter()
            .map(|(phrase, n, freq)| Topic {
                phrase,
                score: freq as f64 * ((n + 1) as f64).ln(),
            })
            .collect();

        // sort_by is stable
        topics.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        topics.truncate(self.top_n);
        topics
    }
}

/// Lower-case, turn punctuation into spaces, and drop tokens of 3 chars or less.
fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(|w| w.to_string())
        .collect()
}
