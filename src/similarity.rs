//! Bounded relevance score between two enriched items.

use crate::model::ContentItem;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Similarity {
    /// Always within [0, 1].
    pub score: f64,
    pub reason: String,
    /// First shared theme in `a`'s theme order.
    pub primary_theme: Option<String>,
}

/// Elements of `a` that also occur in `b`, in `a`'s order.
pub fn shared<'a>(a: &'a [String], b: &[String]) -> Vec<&'a str> {
    a.iter()
        .filter(|x| b.contains(x))
        .map(|x| x.as_str())
        .collect()
}

/// Number of topic phrases the two items have in common.
pub fn shared_topic_count(a: &ContentItem, b: &ContentItem) -> usize {
    let topics_a: HashSet<&str> = a.topics().iter().map(|t| t.phrase.as_str()).collect();
    let topics_b: HashSet<&str> = b.topics().iter().map(|t| t.phrase.as_str()).collect();
    topics_a.intersection(&topics_b).count()
}

/// Sum of three capped signals: theme overlap (max 0.4), topic overlap
/// (max 0.3) and tag overlap (max 0.3, only when both carry tags).
pub fn similarity(a: &ContentItem, b: &ContentItem) -> Similarity {
    let mut score = 0.0;
    let mut reasons = Vec::new();
    let mut primary_theme = None;

    let shared_themes = shared(a.themes(), b.themes());
    if !shared_themes.is_empty() {
        score += (shared_themes.len() as f64 * 0.3).min(0.4);
        primary_theme = Some(shared_themes[0].to_string());
        reasons.push(format!("{} shared themes", shared_themes.len()));
    }

    let topics_a: HashSet<&str> = a.topics().iter().map(|t| t.phrase.as_str()).collect();
    let topics_b: HashSet<&str> = b.topics().iter().map(|t| t.phrase.as_str()).collect();
    let shared_topics = topics_a.intersection(&topics_b).count();
    if shared_topics > 0 {
        let largest = topics_a.len().max(topics_b.len()) as f64;
        score += (shared_topics as f64 / largest * 0.3).min(0.3);
        reasons.push(format!("{} shared topics", shared_topics));
    }

    if !a.tags().is_empty() && !b.tags().is_empty() {
        let shared_tags = shared(a.tags(), b.tags()).len();
        if shared_tags > 0 {
            score += (shared_tags as f64 * 0.15).min(0.3);
            reasons.push(format!("{} shared tags", shared_tags));
        }
    }

    Similarity {
        score: f64::min(score, 1.0),
        reason: reasons.join(" | "),
        primary_theme,
    }
}
