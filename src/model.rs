use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Pillar,
    Blog,
    Homepage,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Pillar => "pillar",
            ContentType::Blog => "blog",
            ContentType::Homepage => "homepage",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InternalLink {
    pub anchor_text: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Topic {
    pub phrase: String,
    pub score: f64,
}

/// A scanned page or post, before topic and theme enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    pub id: String,
    pub site: String,
    pub content_type: ContentType,
    pub url: String,
    pub file_path: String,
    pub title: String,
    pub description: String,
    pub body_text: String,
    pub word_count: usize,
    pub tags: Vec<String>,
    pub internal_links: Vec<InternalLink>,
}

/// An enriched content record. Topics and themes are computed once in
/// [`ContentItem::new`] and the item is read-only from then on.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    record: ContentRecord,
    topics: Vec<Topic>,
    themes: Vec<String>,
}

impl ContentItem {
    pub fn new(record: ContentRecord, topics: Vec<Topic>, themes: Vec<String>) -> Self {
        ContentItem { record, topics, themes }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn site(&self) -> &str {
        &self.record.site
    }

    pub fn content_type(&self) -> ContentType {
        self.record.content_type
    }

    pub fn url(&self) -> &str {
        &self.record.url
    }

    pub fn file_path(&self) -> &str {
        &self.record.file_path
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    pub fn description(&self) -> &str {
        &self.record.description
    }

    pub fn body_text(&self) -> &str {
        &self.record.body_text
    }

    pub fn word_count(&self) -> usize {
        self.record.word_count
    }

    pub fn tags(&self) -> &[String] {
        &self.record.tags
    }

    pub fn internal_links(&self) -> &[InternalLink] {
        &self.record.internal_links
    }

    /// Ranked, highest score first.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// In taxonomy order.
    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    pub fn is_blog(&self) -> bool {
        self.record.content_type == ContentType::Blog
    }

    pub fn links_to(&self, url: &str) -> bool {
        self.record.internal_links.iter().any(|l| l.url == url)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn from_confidence(confidence: f64) -> Priority {
        if confidence > 0.8 {
            Priority::High
        } else if confidence > 0.7 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// A candidate directed link between two enriched items.
#[derive(Debug, Clone)]
pub struct LinkOpportunity<'a> {
    pub source: &'a ContentItem,
    pub target: &'a ContentItem,
    pub confidence: f64,
    pub anchor_text: String,
    pub context_snippet: String,
    pub theme: String,
    pub reason: String,
    pub priority: Priority,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_thresholds() {
        assert_eq!(Priority::from_confidence(0.95), Priority::High);
        assert_eq!(Priority::from_confidence(0.81), Priority::High);
        assert_eq!(Priority::from_confidence(0.8), Priority::Medium);
        assert_eq!(Priority::from_confidence(0.71), Priority::Medium);
        assert_eq!(Priority::from_confidence(0.7), Priority::Low);
        assert_eq!(Priority::from_confidence(0.6), Priority::Low);
    }

    #[test]
    fn test_links_to_exact_url() {
        let mut record = fixtures::blog("a.test", "post");
        record.internal_links.push(fixtures::link("https://a.test/tool/"));
        let item = ContentItem::new(record, vec![], vec![]);

        assert!(item.links_to("https://a.test/tool/"));
        assert!(!item.links_to("https://a.test/tool"));
        assert!(item.is_blog());
    }

    #[test]
    fn test_content_type_serializes_lowercase() {
        let json = serde_json::to_string(&ContentType::Homepage).unwrap();
        assert_eq!(json, "\"homepage\"");
    }
}
