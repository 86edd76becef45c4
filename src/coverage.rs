//! Same-site link analysis: pillar coverage, content gaps and orphans.

use crate::model::{ContentItem, ContentType};
use crate::similarity::{shared, shared_topic_count};

#[derive(Debug, Clone)]
pub struct PillarCoverage<'a> {
    pub pillar: &'a ContentItem,
    pub linking_blogs: Vec<&'a ContentItem>,
    /// Relevant same-site blogs that do not link to the pillar yet.
    pub orphaned_blogs: Vec<&'a ContentItem>,
    /// `linking / same-site blogs * 100`, rounded; 0 when the site has no blogs.
    pub coverage_percent: u32,
}

#[derive(Debug, Clone)]
pub struct ContentGap<'a> {
    pub item_a: &'a ContentItem,
    pub item_b: &'a ContentItem,
    pub shared_tags: Vec<String>,
    pub reason: String,
}

fn has_theme_or_topic_overlap(a: &ContentItem, b: &ContentItem) -> bool {
    !shared(a.themes(), b.themes()).is_empty() || shared_topic_count(a, b) >= 2
}

fn blogs_on<'a>(items: &'a [ContentItem], site: &'a str) -> impl Iterator<Item = &'a ContentItem> {
    items.iter().filter(move |i| i.is_blog() && i.site() == site)
}

pub fn analyze_pillar_coverage(items: &[ContentItem]) -> Vec<PillarCoverage<'_>> {
    items
        .iter()
        .filter(|i| i.content_type() == ContentType::Pillar)
        .map(|pillar| {
            let mut linking_blogs = Vec::new();
            let mut orphaned_blogs = Vec::new();
            let mut same_site = 0usize;

            for blog in blogs_on(items, pillar.site()) {
                same_site += 1;
                if blog.links_to(pillar.url()) {
                    linking_blogs.push(blog);
                } else if has_theme_or_topic_overlap(blog, pillar) {
                    orphaned_blogs.push(blog);
                }
            }

            let coverage_percent = if same_site > 0 {
                (linking_blogs.len() as f64 / same_site as f64 * 100.0).round() as u32
            } else {
                0
            };

            PillarCoverage {
                pillar,
                linking_blogs,
                orphaned_blogs,
                coverage_percent,
            }
        })
        .collect()
}

/// Same-site blog pairs sharing at least `min_shared_tags` tags where
/// neither links to the other. Sites are visited in first-seen order.
pub fn find_content_gaps(items: &[ContentItem], min_shared_tags: usize) -> Vec<ContentGap<'_>> {
    let mut sites: Vec<&str> = Vec::new();
    for item in items.iter().filter(|i| i.is_blog()) {
        if !sites.contains(&item.site()) {
            sites.push(item.site());
        }
    }

    let mut gaps = Vec::new();
    for site in sites {
        let blogs: Vec<&ContentItem> = blogs_on(items, site).collect();
        for i in 0..blogs.len() {
            for j in (i + 1)..blogs.len() {
                let (a, b) = (blogs[i], blogs[j]);
                let shared_tags = shared(a.tags(), b.tags());
                if shared_tags.len() < min_shared_tags {
                    continue;
                }
                if a.links_to(b.url()) || b.links_to(a.url()) {
                    continue;
                }
                gaps.push(ContentGap {
                    item_a: a,
                    item_b: b,
                    reason: format!("Share {} tags: {}", shared_tags.len(), shared_tags.join(", ")),
                    shared_tags: shared_tags.into_iter().map(String::from).collect(),
                });
            }
        }
    }
    gaps
}

/// Non-homepage items that no other same-site item links to.
pub fn find_orphans(items: &[ContentItem]) -> Vec<&ContentItem> {
    items
        .iter()
        .filter(|item| item.content_type() != ContentType::Homepage)
        .filter(|item| {
            !items.iter().any(|other| {
                other.site() == item.site() && other.id() != item.id() && other.links_to(item.url())
            })
        })
        .collect()
}
