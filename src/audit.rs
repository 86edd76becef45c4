//! Enrichment and the analysis passes that need the full enriched set.

use crate::config::Config;
use crate::coverage::{analyze_pillar_coverage, find_content_gaps, find_orphans, ContentGap, PillarCoverage};
use crate::crosssite::CrossSiteRanker;
use crate::error::Result;
use crate::model::{ContentItem, ContentRecord, LinkOpportunity};
use crate::themes::ThemeClassifier;
use crate::topics::TopicExtractor;
use tracing::debug;

pub struct Enricher {
    extractor: TopicExtractor,
    classifier: ThemeClassifier,
}

impl Enricher {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Enricher {
            extractor: TopicExtractor::new(config.scoring.top_topics),
            classifier: ThemeClassifier::new(&config.themes, config.scoring.theme_min_score)?,
        })
    }

    /// Topics first, then themes (which read the topics).
    pub fn enrich(&self, record: ContentRecord) -> ContentItem {
        let topics = self.extractor.extract(&record.body_text);
        let themes = self.classifier.classify(&record.body_text, &topics);
        debug!(id = %record.id, topics = topics.len(), themes = ?themes, "enriched");
        ContentItem::new(record, topics, themes)
    }

    pub fn enrich_all(&self, records: Vec<ContentRecord>) -> Vec<ContentItem> {
        records.into_iter().map(|r| self.enrich(r)).collect()
    }
}

pub struct Analysis<'a> {
    pub pillar_coverage: Vec<PillarCoverage<'a>>,
    pub content_gaps: Vec<ContentGap<'a>>,
    pub orphans: Vec<&'a ContentItem>,
    pub cross_site: Vec<LinkOpportunity<'a>>,
}

impl Analysis<'_> {
    pub fn orphaned_blog_total(&self) -> usize {
        self.pillar_coverage.iter().map(|p| p.orphaned_blogs.len()).sum()
    }

    /// Missing pillar links plus unlinked related pairs.
    pub fn internal_opportunities(&self) -> usize {
        self.content_gaps.len() + self.orphaned_blog_total()
    }
}

pub fn run_audit<'a>(items: &'a [ContentItem], config: &Config) -> Analysis<'a> {
    Analysis {
        pillar_coverage: analyze_pillar_coverage(items),
        content_gaps: find_content_gaps(items, config.scoring.min_shared_tags),
        orphans: find_orphans(items),
        cross_site: CrossSiteRanker::new(config).rank(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{blog, pillar};
    use crate::model::ContentType;

    fn post(site: &str, slug: &str, body: &str, tags: &[&str]) -> ContentRecord {
        let mut r = blog(site, slug);
        r.body_text = body.to_string();
        r.tags = tags.iter().map(|s| s.to_string()).collect();
        r
    }

    const BOOKING_BODY: &str = "Online booking keeps appointments simple. Online booking means \
        fewer missed appointments, and a shared calendar shows availability for every booking. \
        Reminders cut no-shows and improve client retention.";

    fn corpus() -> Vec<ContentRecord> {
        let mut tool = pillar("mydojo.software", "booking-tool");
        tool.body_text = BOOKING_BODY.to_string();
        vec![
            tool,
            post("mydojo.software", "dojo-booking", BOOKING_BODY, &["booking", "retention"]),
            post("mydojo.software", "dojo-belts", "Belt testing day. Belt testing rules.", &["belts"]),
            post("petcare.software", "pet-booking", BOOKING_BODY, &["booking", "retention"]),
            post("mytattoo.software", "ink-booking", BOOKING_BODY, &["booking", "retention"]),
        ]
    }

    #[test]
    fn test_enrich_populates_topics_and_themes() {
        let enricher = Enricher::new(&Config::default()).unwrap();
        let item = enricher.enrich(post("a.test", "x", BOOKING_BODY, &[]));
        assert_eq!(item.topics()[0].phrase, "online booking");
        assert!(item.topics().len() <= 10);
        assert_eq!(item.themes()[0], "Business operations");
    }

    #[test]
    fn test_run_audit_end_to_end() {
        let config = Config::default();
        let items = Enricher::new(&config).unwrap().enrich_all(corpus());
        let analysis = run_audit(&items, &config);

        assert_eq!(analysis.pillar_coverage.len(), 1);
        let orphaned: Vec<&str> = analysis.pillar_coverage[0].orphaned_blogs.iter().map(|b| b.id()).collect();
        assert_eq!(orphaned, vec!["mydojo-blog-dojo-booking"]);

        // Nothing links anywhere, so every non-homepage item is an orphan
        assert_eq!(analysis.orphans.len(), items.len());

        for opp in &analysis.cross_site {
            assert_ne!(opp.source.site(), opp.target.site());
            assert_ne!(opp.source.content_type(), ContentType::Pillar);
        }
        assert!(!analysis.cross_site.is_empty());
        assert_eq!(analysis.internal_opportunities(), 1);
    }

    #[test]
    fn test_run_audit_is_idempotent() {
        let config = Config::default();
        let first_items = Enricher::new(&config).unwrap().enrich_all(corpus());
        let second_items = Enricher::new(&config).unwrap().enrich_all(corpus());
        assert_eq!(first_items, second_items);

        let first = run_audit(&first_items, &config);
        let second = run_audit(&second_items, &config);

        let ids = |items: &[&ContentItem]| -> Vec<String> { items.iter().map(|i| i.id().to_string()).collect() };
        for (a, b) in first.pillar_coverage.iter().zip(&second.pillar_coverage) {
            assert_eq!(a.pillar.id(), b.pillar.id());
            assert_eq!(ids(&a.linking_blogs), ids(&b.linking_blogs));
            assert_eq!(ids(&a.orphaned_blogs), ids(&b.orphaned_blogs));
            assert_eq!(a.coverage_percent, b.coverage_percent);
        }
        assert_eq!(first.pillar_coverage.len(), second.pillar_coverage.len());

        let gaps = |a: &Analysis| -> Vec<(String, String, Vec<String>)> {
            a.content_gaps
                .iter()
                .map(|g| (g.item_a.id().to_string(), g.item_b.id().to_string(), g.shared_tags.clone()))
                .collect()
        };
        assert_eq!(gaps(&first), gaps(&second));
        assert_eq!(ids(&first.orphans), ids(&second.orphans));

        let opportunities = |a: &Analysis| -> Vec<(String, String, f64, String, String, String)> {
            a.cross_site
                .iter()
                .map(|o| {
                    (
                        o.source.id().to_string(),
                        o.target.id().to_string(),
                        o.confidence,
                        o.anchor_text.clone(),
                        o.context_snippet.clone(),
                        o.reason.clone(),
                    )
                })
                .collect()
        };
        assert_eq!(opportunities(&first), opportunities(&second));
    }
}
