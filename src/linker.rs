//! Applies missing pillar links to blog posts listed in the audit data.
//! Planning never touches the filesystem beyond reads; [`LinkPlan::apply`]
//! backs up each original before writing.

use crate::error::Result;
use crate::insertion::{apply, InsertionDecision, InsertionSelector, LinkCandidate};
use crate::report::{AuditData, ItemRef};
use crate::scan::split_frontmatter;
use ahash::AHashMap;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const BACKUP_DIR_PREFIX: &str = "pillar-links-";
pub const LINKS_REPORT_FILE: &str = "pillar-links-report.md";

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub site: String,
    pub blog_title: String,
    pub pillar_title: String,
    pub file_path: PathBuf,
    pub anchor_text: String,
    /// Tail of the chosen paragraph.
    pub preview: String,
    pub link_sentence: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Added(Modification),
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BlogOutcome {
    pub blog_title: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct PillarOutcome {
    pub pillar: ItemRef,
    pub blogs: Vec<BlogOutcome>,
}

#[derive(Debug)]
struct PendingFile {
    path: PathBuf,
    original: String,
    updated: String,
}

#[derive(Debug, Default)]
pub struct LinkPlan {
    pub pillars: Vec<PillarOutcome>,
    files: Vec<PendingFile>,
}

impl LinkPlan {
    pub fn modifications(&self) -> impl Iterator<Item = &Modification> {
        self.pillars.iter().flat_map(|p| &p.blogs).filter_map(|b| match &b.outcome {
            Outcome::Added(m) => Some(m),
            _ => None,
        })
    }

    pub fn files_affected(&self) -> usize {
        self.files.len()
    }

    /// Copy every affected file into `backup_dir/<site>/` and write the
    /// linked version in place. Returns the number of files written.
    pub fn apply(&self, backup_dir: &Path) -> Result<usize> {
        let mut sites: AHashMap<&Path, &str> = AHashMap::new();
        for m in self.modifications() {
            sites.entry(m.file_path.as_path()).or_insert(&m.site);
        }

        for file in &self.files {
            let site = sites.get(file.path.as_path()).copied().unwrap_or("unknown");
            let dir = backup_dir.join(site);
            fs::create_dir_all(&dir)?;
            let name = file.path.file_name().unwrap_or(file.path.as_os_str());
            fs::write(dir.join(name), &file.original)?;
            fs::write(&file.path, &file.updated)?;
            info!(file = %file.path.display(), "pillar link written");
        }
        Ok(self.files.len())
    }
}

pub struct Linker {
    selector: InsertionSelector,
    max_per_pillar: usize,
    root: PathBuf,
}

impl Linker {
    /// `root` is the scan root the audit's relative file paths hang off.
    pub fn new(selector: InsertionSelector, max_per_pillar: usize, root: PathBuf) -> Self {
        Linker {
            selector,
            max_per_pillar,
            root,
        }
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        self.root.join(file_path)
    }

    /// Decide every insertion. A file touched by several pillars is read once
    /// and each later decision sees the earlier insertions.
    pub fn plan<R: Rng>(&self, data: &AuditData, rng: &mut R) -> LinkPlan {
        let inventory: AHashMap<&str, _> = data.inventory.iter().map(|e| (e.id.as_str(), e)).collect();
        let mut plan = LinkPlan::default();
        let mut pending: AHashMap<PathBuf, usize> = AHashMap::new();

        for coverage in &data.internal_analysis.pillar_coverage {
            let pillar = &coverage.pillar;
            let candidate = LinkCandidate {
                title: &pillar.title,
                url: &pillar.url,
                site: &pillar.site,
            };
            let mut blogs = Vec::new();

            for blog in coverage.orphaned_blogs.iter().take(self.max_per_pillar) {
                let Some(entry) = inventory.get(blog.id.as_str()) else {
                    warn!(id = %blog.id, "orphaned blog missing from inventory");
                    blogs.push(BlogOutcome {
                        blog_title: blog.title.clone(),
                        outcome: Outcome::Failed("not in inventory".to_string()),
                    });
                    continue;
                };
                let path = self.resolve(&entry.file_path);

                let slot = match pending.get(&path) {
                    Some(&slot) => slot,
                    None => match fs::read_to_string(&path) {
                        Ok(content) => {
                            plan.files.push(PendingFile {
                                path: path.clone(),
                                original: content.clone(),
                                updated: content,
                            });
                            pending.insert(path.clone(), plan.files.len() - 1);
                            plan.files.len() - 1
                        }
                        Err(e) => {
                            blogs.push(BlogOutcome {
                                blog_title: blog.title.clone(),
                                outcome: Outcome::Failed(format!("{}: {}", path.display(), e)),
                            });
                            continue;
                        }
                    },
                };

                let content = &plan.files[slot].updated;
                let (_, body_offset) = split_frontmatter(content);
                let decision = self
                    .selector
                    .decide(&content[body_offset..], &candidate, &entry.themes, rng);

                let outcome = match decision {
                    InsertionDecision::Insert(point) => {
                        let updated = apply(content, body_offset, &point);
                        let modification = Modification {
                            site: entry.site.clone(),
                            blog_title: blog.title.clone(),
                            pillar_title: pillar.title.clone(),
                            file_path: path.clone(),
                            anchor_text: point.anchor_text.clone(),
                            preview: tail(&point.paragraph_text, PREVIEW_CHARS).to_string(),
                            link_sentence: point.link_sentence.clone(),
                        };
                        plan.files[slot].updated = updated;
                        Outcome::Added(modification)
                    }
                    InsertionDecision::Skipped { reason } => {
                        debug!(blog = %blog.id, pillar = %pillar.id, %reason, "skipped");
                        Outcome::Skipped(reason)
                    }
                };
                blogs.push(BlogOutcome {
                    blog_title: blog.title.clone(),
                    outcome,
                });
            }

            plan.pillars.push(PillarOutcome {
                pillar: pillar.clone(),
                blogs,
            });
        }

        plan.files.retain(|f| f.updated != f.original);
        plan
    }
}

fn tail(text: &str, chars: usize) -> &str {
    let count = text.chars().count();
    if count <= chars {
        return text;
    }
    let skip = count - chars;
    let start = text.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &text[start..]
}

/// Markdown summary of the added links, grouped by site in first-seen order.
pub fn render_report(plan: &LinkPlan, date: &str) -> String {
    let modifications: Vec<&Modification> = plan.modifications().collect();
    let mut report = String::new();
    report.push_str("# Pillar Links Addition Report\n\n");
    report.push_str(&format!("Generated: {}\n\n", date));
    report.push_str(&format!("Total links added: {}\n\n", modifications.len()));

    let mut sites: Vec<&str> = Vec::new();
    for m in &modifications {
        if !sites.contains(&m.site.as_str()) {
            sites.push(&m.site);
        }
    }

    for site in sites {
        let mods: Vec<&&Modification> = modifications.iter().filter(|m| m.site == site).collect();
        report.push_str(&format!("## {}\n\n", site));
        report.push_str(&format!("Links added: {}\n\n", mods.len()));
        for m in mods {
            report.push_str(&format!("### {}\n\n", m.blog_title));
            report.push_str(&format!("- **Pillar**: [{}]({})\n", m.pillar_title, m.file_path.display()));
            report.push_str(&format!("- **Anchor Text**: \"{}\"\n", m.anchor_text));
            report.push_str(&format!("- **Context**: {}\n\n", m.preview));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::ContentType;
    use crate::report::{InternalAnalysis, InventoryEntry, Metadata, PillarCoverageEntry};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const POST: &str = "---\ntitle: Class Times\ntags: [dojo]\n---\n# Class Times\n\n\
        A short intro that sets the scene for the rest of this article about weekly timetables and mats.\n\n\
        Running a dojo means juggling class times, belt tests and private lessons, and good scheduling keeps every student on the mat.\n\n\
        Plain filler paragraph number three with enough words to pass the length rule easily, nothing more.\n\n\
        Plain filler paragraph number four with enough words to pass the length rule easily, nothing more.\n";

    fn item(id: &str, title: &str, url: &str) -> ItemRef {
        ItemRef {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            site: "mydojo.software".to_string(),
        }
    }

    fn audit(file_path: &str, pillars: &[(&str, &str)]) -> AuditData {
        let blog = item("mydojo-blog-class-times", "Class Times", "https://mydojo.software/blog/class-times/");
        AuditData {
            metadata: Metadata {
                generated_at: "now".to_string(),
                root: String::new(),
                total_items: 1,
                sites: BTreeMap::new(),
            },
            inventory: vec![InventoryEntry {
                id: blog.id.clone(),
                site: blog.site.clone(),
                content_type: ContentType::Blog,
                url: blog.url.clone(),
                file_path: file_path.to_string(),
                title: blog.title.clone(),
                description: String::new(),
                word_count: 0,
                tags: vec!["dojo".to_string()],
                themes: vec!["Business operations".to_string()],
                internal_links_count: 0,
                topics: vec![],
            }],
            internal_analysis: InternalAnalysis {
                pillar_coverage: pillars
                    .iter()
                    .map(|(title, slug)| PillarCoverageEntry {
                        pillar: item(
                            &format!("mydojo-page-{}", slug),
                            title,
                            &format!("https://mydojo.software/{}/", slug),
                        ),
                        linking_count: 0,
                        orphaned_count: 1,
                        orphaned_blogs: vec![blog.clone()],
                        coverage: 0,
                    })
                    .collect(),
                content_gaps: vec![],
                orphans: vec![],
            },
            cross_site_opportunities: vec![],
        }
    }

    fn linker(root: &Path) -> Linker {
        let config = Config::default();
        let selector = InsertionSelector::new(
            &config.insertion_keywords,
            config.scoring.min_paragraph_chars,
            config.scoring.min_insertion_score,
        )
        .unwrap();
        Linker::new(selector, config.scoring.max_insertions_per_pillar, root.to_path_buf())
    }

    fn write_post(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("class-times.md");
        fs::write(&path, POST).unwrap();
        path
    }

    #[test]
    fn test_plan_is_dry_until_applied() {
        let dir = TempDir::new().unwrap();
        let path = write_post(&dir);
        let data = audit(&path.to_string_lossy(), &[("Dojo Scheduling Software", "dojo-scheduling")]);

        let plan = linker(dir.path()).plan(&data, &mut StdRng::seed_from_u64(7));
        let mods: Vec<&Modification> = plan.modifications().collect();
        assert_eq!(mods.len(), 1);
        assert!(mods[0].link_sentence.contains("[Dojo Scheduling Software](/dojo-scheduling/)"));
        assert!(mods[0].preview.ends_with("on the mat."));
        assert_eq!(fs::read_to_string(&path).unwrap(), POST);
    }

    #[test]
    fn test_apply_backs_up_and_preserves_frontmatter() {
        let dir = TempDir::new().unwrap();
        let path = write_post(&dir);
        let data = audit(&path.to_string_lossy(), &[("Dojo Scheduling Software", "dojo-scheduling")]);
        let plan = linker(dir.path()).plan(&data, &mut StdRng::seed_from_u64(7));

        let backups = dir.path().join("backups");
        assert_eq!(plan.apply(&backups).unwrap(), 1);

        let updated = fs::read_to_string(&path).unwrap();
        assert!(updated.starts_with("---\ntitle: Class Times\ntags: [dojo]\n---\n# Class Times\n\n"));
        assert!(updated.contains("on the mat. "));
        assert!(updated.contains("](/dojo-scheduling/)"));
        let backup = fs::read_to_string(backups.join("mydojo.software").join("class-times.md")).unwrap();
        assert_eq!(backup, POST);
    }

    #[test]
    fn test_existing_link_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("class-times.md");
        fs::write(&path, format!("{}\nSee [tool](/dojo-scheduling/).\n", POST)).unwrap();
        let data = audit(&path.to_string_lossy(), &[("Dojo Scheduling Software", "dojo-scheduling")]);

        let plan = linker(dir.path()).plan(&data, &mut StdRng::seed_from_u64(7));
        assert_eq!(
            plan.pillars[0].blogs[0].outcome,
            Outcome::Skipped("Link already exists".to_string())
        );
        assert_eq!(plan.files_affected(), 0);
    }

    #[test]
    fn test_two_pillars_share_one_file() {
        let dir = TempDir::new().unwrap();
        let path = write_post(&dir);
        let data = audit(
            &path.to_string_lossy(),
            &[
                ("Dojo Scheduling Software", "dojo-scheduling"),
                ("Dojo Billing Software", "dojo-billing"),
            ],
        );

        let plan = linker(dir.path()).plan(&data, &mut StdRng::seed_from_u64(1));
        assert_eq!(plan.files_affected(), 1);
        plan.apply(&dir.path().join("backups")).unwrap();

        let updated = fs::read_to_string(&path).unwrap();
        assert!(updated.contains("](/dojo-scheduling/)"));
        assert!(updated.contains("](/dojo-billing/)"));
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let dir = TempDir::new().unwrap();
        write_post(&dir);
        let data = audit("class-times.md", &[("Dojo Scheduling Software", "dojo-scheduling")]);

        let plan = linker(dir.path()).plan(&data, &mut StdRng::seed_from_u64(7));
        assert_eq!(plan.modifications().count(), 1);

        let missing = linker(&dir.path().join("elsewhere")).plan(&data, &mut StdRng::seed_from_u64(7));
        assert!(matches!(missing.pillars[0].blogs[0].outcome, Outcome::Failed(_)));
    }

    #[test]
    fn test_report_groups_by_site() {
        let dir = TempDir::new().unwrap();
        let path = write_post(&dir);
        let data = audit(&path.to_string_lossy(), &[("Dojo Scheduling Software", "dojo-scheduling")]);
        let plan = linker(dir.path()).plan(&data, &mut StdRng::seed_from_u64(7));

        let report = render_report(&plan, "2026-01-01");
        assert!(report.contains("Total links added: 1"));
        assert!(report.contains("## mydojo.software\n\nLinks added: 1"));
        assert!(report.contains("### Class Times"));
        assert!(report.contains("- **Anchor Text**: \"Dojo Scheduling Software\""));
    }

    #[test]
    fn test_tail_is_char_safe() {
        assert_eq!(tail("héllo", 3), "llo");
        assert_eq!(tail("hi", 5), "hi");
    }
}
