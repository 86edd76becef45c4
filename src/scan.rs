//! Reads blog posts and pages from each site's source tree into
//! [`ContentRecord`]s. Files that fail to parse are skipped with a warning.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{ContentRecord, ContentType, InternalLink};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Locate a leading `---` delimited block. Returns the YAML text (if any)
/// and the byte offset where the body starts.
pub fn split_frontmatter(content: &str) -> (Option<&str>, usize) {
    let Some(rest) = content.strip_prefix("---") else {
        return (None, 0);
    };
    let Some(nl) = rest.find('\n') else {
        return (None, 0);
    };
    if !rest[..nl].trim().is_empty() {
        return (None, 0);
    }

    let yaml_start = 3 + nl + 1;
    let mut pos = yaml_start;
    for line in content[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&content[yaml_start..pos]), pos + line.len());
        }
        pos += line.len();
    }
    (None, 0)
}

pub fn parse_frontmatter(yaml: Option<&str>) -> Result<Frontmatter> {
    match yaml {
        Some(y) if !y.trim().is_empty() => Ok(serde_yaml::from_str(y)?),
        _ => Ok(Frontmatter::default()),
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Relative URLs become absolute on `site`; a trailing slash is added unless
/// the URL carries a fragment or query.
pub fn normalize_url(url: &str, site: &str) -> String {
    if url.starts_with('/') {
        return format!("https://{}{}", site, url);
    }
    if !url.ends_with('/') && !url.contains('#') && !url.contains('?') {
        return format!("{}/", url);
    }
    url.to_string()
}

fn site_prefix(site: &str) -> &str {
    site.split('.').next().unwrap_or(site)
}

fn dedupe(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

pub struct Scanner<'c> {
    config: &'c Config,
    excluded: GlobSet,
    md_link: Regex,
    md_image: Regex,
    html_link: Regex,
    title_tag: Regex,
    h1_tag: Regex,
    meta_description: Regex,
    strip_blocks: Vec<Regex>,
    any_tag: Regex,
    whitespace: Regex,
}

impl<'c> Scanner<'c> {
    pub fn new(config: &'c Config) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.excluded_pages {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Scanner {
            config,
            excluded: builder.build()?,
            md_link: Regex::new(r"\[([^\]]+)\]\(([^)]+)\)")?,
            md_image: Regex::new(r"!\[[^\]]*\]\([^)]*\)")?,
            html_link: Regex::new(r#"(?i)<a\s+[^>]*href=["']([^"']+)["'][^>]*>([^<]+)</a>"#)?,
            title_tag: Regex::new(r"<title>([^<]+)</title>")?,
            h1_tag: Regex::new(r"<h1[^>]*>([^<]+)</h1>")?,
            meta_description: Regex::new(r#"<meta\s+name="description"\s+content="([^"]+)""#)?,
            strip_blocks: vec![
                Regex::new(r"(?is)<script[^>]*>.*?</script>")?,
                Regex::new(r"(?is)<style[^>]*>.*?</style>")?,
                // Astro components: self-closing, opening, closing
                Regex::new(r"<[A-Z][a-zA-Z]*[^>]*/>")?,
                Regex::new(r"<[A-Z][a-zA-Z]*[^>]*>")?,
                Regex::new(r"</[A-Z][a-zA-Z]*>")?,
                Regex::new(r"(?is)<nav[^>]*>.*?</nav>")?,
                Regex::new(r"(?is)<footer[^>]*>.*?</footer>")?,
            ],
            any_tag: Regex::new(r"<[^>]+>")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Scan every configured site under `root`. Sites whose directories are
    /// missing contribute nothing.
    pub fn scan_sites(&self, root: &Path) -> Vec<ContentRecord> {
        let mut records = Vec::new();

        for site in &self.config.sites {
            let site_root = root.join(&site.domain);

            let pages_dir = site_root.join(&self.config.layout.pages_dir);
            for path in list_files(&pages_dir, "astro") {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                if self.excluded.is_match(name) {
                    debug!(file = %path.display(), "excluded page");
                    continue;
                }
                match self.parse_astro(&path, &site.domain) {
                    Ok(record) => records.push(relative_to(record, &path, root)),
                    Err(e) => warn!(file = %path.display(), error = %e, "failed to parse page"),
                }
            }

            let blog_dir = site_root.join(&self.config.layout.blog_dir);
            for path in list_files(&blog_dir, "md") {
                match self.parse_markdown(&path, &site.domain) {
                    Ok(record) => records.push(relative_to(record, &path, root)),
                    Err(e) => warn!(file = %path.display(), error = %e, "failed to parse post"),
                }
            }
        }

        records
    }

    /// Parse a single file, inferring its site from a path component that
    /// names a configured domain.
    pub fn scan_file(&self, path: &Path) -> Result<ContentRecord> {
        let site = path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .find(|c| self.config.site(c).is_some())
            .ok_or_else(|| Error::SiteNotConfigured(path.display().to_string()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("astro") => self.parse_astro(path, site),
            _ => self.parse_markdown(path, site),
        }
    }

    pub fn parse_markdown(&self, path: &Path, site: &str) -> Result<ContentRecord> {
        let content = fs::read_to_string(path)?;
        let (yaml, body_offset) = split_frontmatter(&content);
        let frontmatter = parse_frontmatter(yaml)?;
        let body = &content[body_offset..];

        let slug = file_stem(path);
        Ok(ContentRecord {
            id: format!("{}-blog-{}", site_prefix(site), slug),
            site: site.to_string(),
            content_type: ContentType::Blog,
            url: format!("https://{}/blog/{}/", site, slug),
            file_path: path.to_string_lossy().to_string(),
            title: frontmatter.title.unwrap_or_else(|| "Untitled".to_string()),
            description: frontmatter.description.unwrap_or_default(),
            body_text: self.markdown_text(body),
            word_count: count_words(body),
            tags: dedupe(frontmatter.tags),
            internal_links: self.markdown_links(body, site),
        })
    }

    /// Markdown with images dropped, links reduced to their text and inline
    /// HTML tags removed. Line structure is kept.
    fn markdown_text(&self, markdown: &str) -> String {
        let text = self.md_image.replace_all(markdown, "");
        let text = self.md_link.replace_all(&text, "$1");
        self.any_tag.replace_all(&text, " ").into_owned()
    }

    pub fn parse_astro(&self, path: &Path, site: &str) -> Result<ContentRecord> {
        let content = fs::read_to_string(path)?;
        let (_, body_offset) = split_frontmatter(&content);
        let markup = &content[body_offset..];

        let capture = |re: &Regex| {
            re.captures(markup)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        };
        let title = capture(&self.title_tag)
            .or_else(|| capture(&self.h1_tag))
            .unwrap_or_else(|| "Untitled".to_string());
        let description = capture(&self.meta_description).unwrap_or_default();

        let cleaned = self.strip_markup(markup);
        let body = self.plain_text(&cleaned);
        let slug = file_stem(path);
        let (content_type, url) = if slug == "index" {
            (ContentType::Homepage, format!("https://{}/", site))
        } else {
            (ContentType::Pillar, format!("https://{}/{}/", site, slug))
        };

        Ok(ContentRecord {
            id: format!("{}-page-{}", site_prefix(site), slug),
            site: site.to_string(),
            content_type,
            url,
            file_path: path.to_string_lossy().to_string(),
            title,
            description,
            word_count: count_words(&body),
            internal_links: self.html_links(&cleaned, site),
            body_text: body,
            tags: vec![],
        })
    }

    /// Drop scripts, styles, navigation and components. Anchors survive so
    /// links can still be read from the result.
    fn strip_markup(&self, markup: &str) -> String {
        let mut body = markup.to_string();
        for re in &self.strip_blocks {
            body = re.replace_all(&body, "").into_owned();
        }
        body
    }

    fn plain_text(&self, body: &str) -> String {
        let text = self.any_tag.replace_all(body, " ");
        self.whitespace.replace_all(&text, " ").trim().to_string()
    }

    fn markdown_links(&self, body: &str, site: &str) -> Vec<InternalLink> {
        self.md_link
            .captures_iter(body)
            .filter_map(|caps| {
                let anchor_text = caps.get(1)?.as_str().to_string();
                let url = normalize_url(caps.get(2)?.as_str(), site);
                url.contains(site).then_some(InternalLink { anchor_text, url })
            })
            .collect()
    }

    fn html_links(&self, html: &str, site: &str) -> Vec<InternalLink> {
        self.html_link
            .captures_iter(html)
            .filter_map(|caps| {
                let url = normalize_url(caps.get(1)?.as_str(), site);
                let anchor_text = caps.get(2)?.as_str().trim().to_string();
                url.contains(site).then_some(InternalLink { anchor_text, url })
            })
            .collect()
    }
}

/// Record the file path relative to the scan root.
fn relative_to(mut record: ContentRecord, path: &Path, root: &Path) -> ContentRecord {
    record.file_path = path.strip_prefix(root).unwrap_or(path).to_string_lossy().to_string();
    record
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Files directly inside `dir` with the given extension, sorted by name.
fn list_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "directory not found");
        return Vec::new();
    }

    let mut builder = WalkBuilder::new(dir);
    builder
        .max_depth(Some(1))
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    builder
        .build()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_split_frontmatter() {
        let content = "---\ntitle: Hello\ntags: [a, b]\n---\nBody text\n";
        let (yaml, offset) = split_frontmatter(content);
        assert_eq!(yaml, Some("title: Hello\ntags: [a, b]\n"));
        assert_eq!(&content[offset..], "Body text\n");

        let (yaml, offset) = split_frontmatter("No frontmatter here");
        assert_eq!(yaml, None);
        assert_eq!(offset, 0);

        // Unterminated block is treated as body
        let (yaml, offset) = split_frontmatter("---\ntitle: x\nbody");
        assert_eq!(yaml, None);
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/tool", "a.test"), "https://a.test/tool");
        assert_eq!(normalize_url("https://a.test/tool", "a.test"), "https://a.test/tool/");
        assert_eq!(normalize_url("https://a.test/tool/", "a.test"), "https://a.test/tool/");
        assert_eq!(normalize_url("https://a.test/x#faq", "a.test"), "https://a.test/x#faq");
        assert_eq!(normalize_url("https://a.test/x?q=1", "a.test"), "https://a.test/x?q=1");
    }

    #[test]
    fn test_parse_markdown_post() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let scanner = Scanner::new(&config).unwrap();
        let path = dir.path().join("class-scheduling.md");
        write(
            &path,
            "---\ntitle: Class Scheduling\ntags:\n  - scheduling\n  - billing\n  - scheduling\n---\n\
             Read the [scheduler guide](https://mydojo.software/scheduling) and \
             [external](https://example.com/x/) plus [relative](/pricing/).\n",
        );

        let record = scanner.parse_markdown(&path, "mydojo.software").unwrap();
        assert_eq!(record.id, "mydojo-blog-class-scheduling");
        assert_eq!(record.url, "https://mydojo.software/blog/class-scheduling/");
        assert_eq!(record.content_type, ContentType::Blog);
        assert_eq!(record.title, "Class Scheduling");
        assert_eq!(record.tags, vec!["scheduling", "billing"]);

        let urls: Vec<&str> = record.internal_links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://mydojo.software/scheduling/", "https://mydojo.software/pricing/"]);
        assert_eq!(record.internal_links[0].anchor_text, "scheduler guide");

        assert!(record.body_text.starts_with("Read the scheduler guide and external plus relative."));
        assert!(!record.body_text.contains("https://"));
    }

    #[test]
    fn test_parse_markdown_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let scanner = Scanner::new(&config).unwrap();
        let path = dir.path().join("bare.md");
        write(&path, "Just some words here\n");

        let record = scanner.parse_markdown(&path, "petcare.software").unwrap();
        assert_eq!(record.title, "Untitled");
        assert_eq!(record.word_count, 4);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_parse_astro_page() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let scanner = Scanner::new(&config).unwrap();
        let path = dir.path().join("dojo-software.astro");
        write(
            &path,
            "---\nimport Layout from '../layouts/Layout.astro';\n---\n\
             <Layout title=\"x\">\n<title>Dojo Software</title>\n\
             <meta name=\"description\" content=\"Run your dojo\">\n\
             <nav><a href=\"/nav-only/\">Nav</a></nav>\n\
             <script>const x = 1;</script>\n\
             <main><h1>Dojo Software</h1><p>Manage   classes with \
             <a href=\"/scheduling/\">scheduling</a>.</p><Hero /></main>\n</Layout>",
        );

        let record = scanner.parse_astro(&path, "mydojo.software").unwrap();
        assert_eq!(record.id, "mydojo-page-dojo-software");
        assert_eq!(record.content_type, ContentType::Pillar);
        assert_eq!(record.url, "https://mydojo.software/dojo-software/");
        assert_eq!(record.title, "Dojo Software");
        assert_eq!(record.description, "Run your dojo");
        assert!(!record.body_text.contains("const x"));
        assert!(!record.body_text.contains("Nav"));
        assert!(!record.body_text.contains("<Hero"));

        let urls: Vec<&str> = record.internal_links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://mydojo.software/scheduling/"]);
    }

    #[test]
    fn test_scan_sites_layout_and_exclusions() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let site = root.join("petcare.software");
        write(&site.join("src/pages/index.astro"), "<title>Home</title><p>Welcome</p>");
        write(&site.join("src/pages/grooming.astro"), "<title>Grooming</title><p>Groom</p>");
        write(&site.join("src/pages/404.astro"), "<title>Missing</title>");
        write(&site.join("src/content/blog/b-post.md"), "---\ntitle: B\n---\nbody");
        write(&site.join("src/content/blog/a-post.md"), "---\ntitle: A\n---\nbody");
        write(&site.join("src/content/blog/broken.md"), "---\ntitle: [unclosed\n---\nbody");
        write(&site.join("src/content/blog/nested/deep.md"), "---\ntitle: Deep\n---\nbody");

        let config = Config::default();
        let records = Scanner::new(&config).unwrap().scan_sites(root);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "petcare-page-grooming",
                "petcare-page-index",
                "petcare-blog-a-post",
                "petcare-blog-b-post",
            ]
        );
        assert_eq!(records[1].content_type, ContentType::Homepage);
        assert_eq!(records[1].url, "https://petcare.software/");
        assert_eq!(
            Path::new(&records[2].file_path),
            Path::new("petcare.software/src/content/blog/a-post.md")
        );
    }

    #[test]
    fn test_scan_sites_keeps_hidden_and_ignored_posts() {
        let dir = TempDir::new().unwrap();
        let blog = dir.path().join("petcare.software/src/content/blog");
        write(&blog.join(".gitignore"), "ignored.md\n");
        write(&blog.join(".draft.md"), "---\ntitle: Draft\n---\nbody");
        write(&blog.join("ignored.md"), "---\ntitle: Ignored\n---\nbody");

        let config = Config::default();
        let records = Scanner::new(&config).unwrap().scan_sites(dir.path());
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Draft", "Ignored"]);
    }

    #[test]
    fn test_scan_file_infers_site() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mytattoo.software/src/content/blog/ink.md");
        write(&path, "---\ntitle: Ink\n---\nbody");

        let config = Config::default();
        let scanner = Scanner::new(&config).unwrap();
        assert_eq!(scanner.scan_file(&path).unwrap().site, "mytattoo.software");

        let stray = dir.path().join("stray.md");
        write(&stray, "body");
        assert!(matches!(scanner.scan_file(&stray), Err(Error::SiteNotConfigured(_))));
    }
}
