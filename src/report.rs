//! Serializable audit document and the markdown report rendered from it.

use crate::audit::Analysis;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{ContentItem, ContentType, Priority, Topic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const AUDIT_DATA_FILE: &str = "cross-link-audit-data.json";
pub const AUDIT_REPORT_FILE: &str = "cross-link-audit-report.md";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditData {
    pub metadata: Metadata,
    pub inventory: Vec<InventoryEntry>,
    pub internal_analysis: InternalAnalysis,
    pub cross_site_opportunities: Vec<OpportunityEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub generated_at: String,
    /// Directory the sites were scanned from; inventory file paths are relative to it.
    #[serde(default)]
    pub root: String,
    pub total_items: usize,
    pub sites: BTreeMap<String, usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub id: String,
    pub site: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub url: String,
    pub file_path: String,
    pub title: String,
    pub description: String,
    pub word_count: usize,
    pub tags: Vec<String>,
    pub themes: Vec<String>,
    pub internal_links_count: usize,
    pub topics: Vec<Topic>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemRef {
    pub id: String,
    pub title: String,
    pub url: String,
    pub site: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PillarCoverageEntry {
    pub pillar: ItemRef,
    pub linking_count: usize,
    pub orphaned_count: usize,
    pub orphaned_blogs: Vec<ItemRef>,
    pub coverage: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GapEntry {
    pub blog_a: ItemRef,
    pub blog_b: ItemRef,
    pub shared_tags: Vec<String>,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InternalAnalysis {
    pub pillar_coverage: Vec<PillarCoverageEntry>,
    pub content_gaps: Vec<GapEntry>,
    pub orphans: Vec<ItemRef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityEntry {
    pub source: ItemRef,
    pub target: ItemRef,
    pub anchor_text: String,
    pub context_snippet: String,
    pub theme: String,
    pub confidence: f64,
    pub priority: Priority,
    pub reason: String,
}

fn item_ref(item: &ContentItem) -> ItemRef {
    ItemRef {
        id: item.id().to_string(),
        title: item.title().to_string(),
        url: item.url().to_string(),
        site: item.site().to_string(),
    }
}

impl AuditData {
    pub fn build(
        items: &[ContentItem],
        analysis: &Analysis,
        config: &Config,
        root: &Path,
        generated_at: String,
    ) -> Self {
        let mut sites: BTreeMap<String, usize> = config.domains().map(|d| (d.to_string(), 0)).collect();
        for item in items {
            *sites.entry(item.site().to_string()).or_insert(0) += 1;
        }

        let inventory = items
            .iter()
            .map(|c| InventoryEntry {
                id: c.id().to_string(),
                site: c.site().to_string(),
                content_type: c.content_type(),
                url: c.url().to_string(),
                file_path: c.file_path().to_string(),
                title: c.title().to_string(),
                description: c.description().to_string(),
                word_count: c.word_count(),
                tags: c.tags().to_vec(),
                themes: c.themes().to_vec(),
                internal_links_count: c.internal_links().len(),
                topics: c.topics().iter().take(5).cloned().collect(),
            })
            .collect();

        let internal_analysis = InternalAnalysis {
            pillar_coverage: analysis
                .pillar_coverage
                .iter()
                .map(|p| PillarCoverageEntry {
                    pillar: item_ref(p.pillar),
                    linking_count: p.linking_blogs.len(),
                    orphaned_count: p.orphaned_blogs.len(),
                    orphaned_blogs: p.orphaned_blogs.iter().map(|b| item_ref(b)).collect(),
                    coverage: p.coverage_percent,
                })
                .collect(),
            content_gaps: analysis
                .content_gaps
                .iter()
                .map(|g| GapEntry {
                    blog_a: item_ref(g.item_a),
                    blog_b: item_ref(g.item_b),
                    shared_tags: g.shared_tags.clone(),
                    reason: g.reason.clone(),
                })
                .collect(),
            orphans: analysis.orphans.iter().map(|o| item_ref(o)).collect(),
        };

        let cross_site_opportunities = analysis
            .cross_site
            .iter()
            .map(|o| OpportunityEntry {
                source: item_ref(o.source),
                target: item_ref(o.target),
                anchor_text: o.anchor_text.clone(),
                context_snippet: o.context_snippet.clone(),
                theme: o.theme.clone(),
                confidence: o.confidence,
                priority: o.priority,
                reason: o.reason.clone(),
            })
            .collect();

        AuditData {
            metadata: Metadata {
                generated_at,
                root: root.to_string_lossy().to_string(),
                total_items: items.len(),
                sites,
            },
            inventory,
            internal_analysis,
            cross_site_opportunities,
        }
    }

    pub fn load(dir: &Path) -> Result<AuditData> {
        let path = dir.join(AUDIT_DATA_FILE);
        if !path.exists() {
            return Err(Error::MissingAuditData(path));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn orphaned_blog_total(&self) -> usize {
        self.internal_analysis.pillar_coverage.iter().map(|p| p.orphaned_count).sum()
    }

    fn site_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for entry in &self.inventory {
            if !names.contains(&entry.site.as_str()) {
                names.push(&entry.site);
            }
        }
        names
    }

    fn by_priority(&self, priority: Priority) -> Vec<&OpportunityEntry> {
        self.cross_site_opportunities
            .iter()
            .filter(|o| o.priority == priority)
            .collect()
    }
}

/// Write the JSON data file and markdown report into `dir`.
pub fn write_reports(dir: &Path, data: &AuditData, date: &str) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;
    let data_path = dir.join(AUDIT_DATA_FILE);
    let report_path = dir.join(AUDIT_REPORT_FILE);
    fs::write(&data_path, serde_json::to_string_pretty(data)?)?;
    fs::write(&report_path, render_markdown(data, date))?;
    Ok((data_path, report_path))
}

pub fn render_markdown(data: &AuditData, date: &str) -> String {
    let mut report = String::new();
    let ia = &data.internal_analysis;

    report.push_str("# Cross-Link Audit Report\n\n");
    report.push_str(&format!("Generated: {}\n\n", date));

    report.push_str("## Executive Summary\n\n");
    report.push_str(&format!("- Total content items analyzed: {}\n", data.metadata.total_items));
    report.push_str(&format!(
        "- Internal link opportunities: {}\n",
        ia.content_gaps.len() + data.orphaned_blog_total()
    ));
    report.push_str(&format!(
        "- Cross-site link opportunities: {}\n",
        data.cross_site_opportunities.len()
    ));
    report.push_str(&format!("- Orphan pages found: {}\n\n", ia.orphans.len()));

    let sites = data.site_names();

    report.push_str("## 1. Content Inventory by Site\n\n");
    for site in &sites {
        let entries: Vec<&InventoryEntry> = data.inventory.iter().filter(|e| e.site == *site).collect();
        let pages = entries.iter().filter(|e| e.content_type != ContentType::Blog).count();
        let blogs = entries.len() - pages;
        report.push_str(&format!("### {}\n", site));
        report.push_str(&format!("- {} pillar pages\n", pages));
        report.push_str(&format!("- {} blog posts\n", blogs));
        report.push_str(&format!("- Total: {} items\n\n", entries.len()));
    }

    report.push_str("## 2. Internal Link Analysis\n\n");
    for site in &sites {
        report.push_str(&format!("### {}\n\n", site));
        report.push_str("#### Pillar-to-Blog Coverage\n\n");
        for p in ia.pillar_coverage.iter().filter(|p| p.pillar.site == *site) {
            report.push_str(&format!(
                "**{}** ({} linking, {} missing, {}% coverage)\n\n",
                p.pillar.title, p.linking_count, p.orphaned_count, p.coverage
            ));
            if p.orphaned_blogs.is_empty() {
                continue;
            }
            report.push_str("Missing pillar links in:\n");
            for blog in p.orphaned_blogs.iter().take(5) {
                report.push_str(&format!("- [{}]({})\n", blog.title, blog.url));
            }
            if p.orphaned_blogs.len() > 5 {
                report.push_str(&format!("- ...and {} more\n", p.orphaned_blogs.len() - 5));
            }
            report.push('\n');
        }

        let gaps: Vec<&GapEntry> = ia.content_gaps.iter().filter(|g| g.blog_a.site == *site).collect();
        if !gaps.is_empty() {
            report.push_str(&format!("#### Related Content Gaps ({} pairs)\n\n", gaps.len()));
            for gap in gaps.iter().take(5) {
                report.push_str(&format!(
                    "- [{}]({}) <-> [{}]({})\n  - {}\n",
                    gap.blog_a.title, gap.blog_a.url, gap.blog_b.title, gap.blog_b.url, gap.reason
                ));
            }
            if gaps.len() > 5 {
                report.push_str(&format!("- ...and {} more pairs\n", gaps.len() - 5));
            }
            report.push('\n');
        }
    }

    report.push_str("## 3. Cross-Site Link Opportunities\n\n");
    let high = data.by_priority(Priority::High);
    let medium = data.by_priority(Priority::Medium);
    let low = data.by_priority(Priority::Low);

    report.push_str(&format!("### High Priority ({} opportunities)\n\n", high.len()));
    for (idx, opp) in high.iter().take(20).enumerate() {
        report.push_str(&format!("{}. **{}** -> **{}**\n", idx + 1, opp.source.site, opp.target.site));
        report.push_str(&format!("   - Source: [{}]({})\n", opp.source.title, opp.source.url));
        report.push_str(&format!("   - Target: [{}]({})\n", opp.target.title, opp.target.url));
        report.push_str(&format!("   - Anchor: \"{}\"\n", opp.anchor_text));
        report.push_str(&format!("   - Theme: {}\n", opp.theme));
        report.push_str(&format!("   - Confidence: {:.0}%\n", opp.confidence * 100.0));
        report.push_str(&format!("   - Context: {}\n\n", opp.context_snippet));
    }

    if !medium.is_empty() {
        report.push_str(&format!("### Medium Priority ({} opportunities)\n\n", medium.len()));
        report.push_str("[Showing first 10]\n\n");
        for (idx, opp) in medium.iter().take(10).enumerate() {
            report.push_str(&format!(
                "{}. {} -> {}: \"{}\" ({})\n",
                idx + 1,
                opp.source.site,
                opp.target.site,
                opp.anchor_text,
                opp.theme
            ));
        }
        report.push('\n');
    }

    if !low.is_empty() {
        report.push_str(&format!("### Low Priority ({} opportunities)\n\n", low.len()));
        report.push_str("See JSON data file for full list.\n\n");
    }

    if !ia.orphans.is_empty() {
        report.push_str(&format!(
            "## 4. Orphan Pages ({} pages with 0 inbound links)\n\n",
            ia.orphans.len()
        ));
        for orphan in &ia.orphans {
            report.push_str(&format!("- [{}]({}) ({})\n", orphan.title, orphan.url, orphan.site));
        }
        report.push('\n');
    }

    report.push_str("## 5. Implementation Recommendations\n\n");
    report.push_str("### Phase 1: Critical Internal Links\n");
    report.push_str(&format!("- Add {} missing pillar links in blog posts\n", data.orphaned_blog_total()));
    report.push_str(&format!("- Connect {} related blog post pairs\n\n", ia.content_gaps.len()));

    report.push_str("### Phase 2: High-Value Cross-Links\n");
    report.push_str(&format!(
        "- Implement top {} cross-site opportunities (confidence > 80%)\n",
        high.len().min(20)
    ));
    let mut themes: Vec<&str> = Vec::new();
    for opp in &high {
        if opp.theme != "General" && !themes.contains(&opp.theme.as_str()) {
            themes.push(&opp.theme);
        }
    }
    if !themes.is_empty() {
        report.push_str(&format!("- Focus on {} themes\n", themes.join(", ")));
    }
    report.push('\n');

    report.push_str("### Phase 3: Orphan Resolution\n");
    report.push_str(&format!("- Add inbound links to {} orphan pages\n", ia.orphans.len()));

    report
}
