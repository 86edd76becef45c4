//! Cross-site link opportunities between blog posts of different sites.

use crate::config::Config;
use crate::model::{ContentItem, LinkOpportunity, Priority};
use crate::similarity::similarity;
use regex::Regex;
use std::collections::HashSet;

const SNIPPET_CHARS: usize = 150;

pub struct CrossSiteRanker<'c> {
    config: &'c Config,
    min_confidence: f64,
    max_per_source: usize,
}

impl<'c> CrossSiteRanker<'c> {
    pub fn new(config: &'c Config) -> Self {
        CrossSiteRanker {
            config,
            min_confidence: config.scoring.cross_site_min_confidence,
            max_per_source: config.scoring.max_outbound_per_source,
        }
    }

    /// Score every ordered blog pair across sites, then dedupe, cap and sort.
    pub fn rank<'a>(&self, items: &'a [ContentItem]) -> Vec<LinkOpportunity<'a>> {
        let blogs: Vec<&ContentItem> = items.iter().filter(|i| i.is_blog()).collect();

        let mut candidates = Vec::new();
        for &source in &blogs {
            for &target in blogs.iter().filter(|t| t.site() != source.site()) {
                let sim = similarity(source, target);
                if sim.score < self.min_confidence {
                    continue;
                }
                candidates.push(LinkOpportunity {
                    source,
                    target,
                    confidence: sim.score,
                    anchor_text: self.anchor_text(source, target),
                    context_snippet: context_snippet(source, target),
                    theme: sim.primary_theme.unwrap_or_else(|| "General".to_string()),
                    reason: sim.reason,
                    priority: Priority::from_confidence(sim.score),
                });
            }
        }

        let mut ranked = cap_per_source(drop_reciprocals(candidates), self.max_per_source);
        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    /// Target title if the source already mentions it, else the first of the
    /// target's top topics found as a whole word, else an industry phrase.
    pub fn anchor_text(&self, source: &ContentItem, target: &ContentItem) -> String {
        let body = source.body_text();
        if body.to_lowercase().contains(&target.title().to_lowercase()) {
            return target.title().to_string();
        }

        for topic in target.topics().iter().take(5) {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(&topic.phrase));
            if Regex::new(&pattern).map(|re| re.is_match(body)).unwrap_or(false) {
                return topic.phrase.clone();
            }
        }

        let industry = self.config.industry_for(target.site());
        let topic = target.topics().first().map(|t| t.phrase.as_str()).unwrap_or("guide");
        format!("{} {}", industry, topic)
    }
}

fn sentences(body: &str) -> impl Iterator<Item = &str> {
    body.split(|c| matches!(c, '.' | '!' | '?'))
        .filter(|s| !s.is_empty())
}

fn truncate(sentence: &str) -> String {
    let trimmed: String = sentence.trim().chars().take(SNIPPET_CHARS).collect();
    format!("{}...", trimmed)
}

/// First source sentence mentioning one of the target's top 3 topics,
/// falling back to the source's first sentence.
pub fn context_snippet(source: &ContentItem, target: &ContentItem) -> String {
    let keywords: Vec<&str> = target.topics().iter().take(3).map(|t| t.phrase.as_str()).collect();

    for sentence in sentences(source.body_text()) {
        let lower = sentence.to_lowercase();
        if keywords.iter().any(|k| lower.contains(k)) {
            return truncate(sentence);
        }
    }

    match sentences(source.body_text()).next() {
        Some(first) => truncate(first),
        None => "N/A".to_string(),
    }
}

/// When both A->B and B->A exist keep only the more confident direction
/// (the earlier one on a tie).
fn drop_reciprocals(opportunities: Vec<LinkOpportunity<'_>>) -> Vec<LinkOpportunity<'_>> {
    let kept: Vec<usize> = {
        let mut kept_pairs: HashSet<(&str, &str)> = HashSet::new();
        let mut kept = Vec::with_capacity(opportunities.len());

        for (idx, opp) in opportunities.iter().enumerate() {
            let (s, t) = (opp.source.id(), opp.target.id());
            let key = if s <= t { (s, t) } else { (t, s) };
            if kept_pairs.contains(&key) {
                continue;
            }

            let reciprocal = opportunities
                .iter()
                .find(|o| o.source.id() == t && o.target.id() == s);

            match reciprocal {
                Some(other) if opp.confidence < other.confidence => continue,
                Some(_) => {
                    kept_pairs.insert(key);
                }
                None => {}
            }
            kept.push(idx);
        }
        kept
    };

    let mut slots: Vec<Option<LinkOpportunity<'_>>> = opportunities.into_iter().map(Some).collect();
    kept.into_iter().filter_map(|idx| slots[idx].take()).collect()
}

/// Keep at most `max` opportunities per source, in input order.
fn cap_per_source(opportunities: Vec<LinkOpportunity<'_>>, max: usize) -> Vec<LinkOpportunity<'_>> {
    let mut result: Vec<LinkOpportunity<'_>> = Vec::new();
    for opp in opportunities {
        let count = result.iter().filter(|o| o.source.id() == opp.source.id()).count();
        if count < max {
            result.push(opp);
        }
    }
    result
}
