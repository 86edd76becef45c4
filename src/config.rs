//! Static configuration: site table, theme taxonomy, keyword lists and
//! scoring thresholds. Loaded once from `.crosslink.toml` and handed to the
//! scoring components at construction.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sites: Vec<SiteConfig>,
    pub layout: Layout,
    pub excluded_pages: Vec<String>,
    pub themes: Vec<ThemeDef>,
    pub insertion_keywords: Vec<String>,
    pub scoring: Scoring,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub domain: String,
    /// Short industry phrase used for fallback anchor text.
    pub industry: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Layout {
    pub pages_dir: String,
    pub blog_dir: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThemeDef {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Scoring {
    pub top_topics: usize,
    pub theme_min_score: usize,
    pub cross_site_min_confidence: f64,
    pub max_outbound_per_source: usize,
    pub min_shared_tags: usize,
    pub min_paragraph_chars: usize,
    pub min_insertion_score: i32,
    pub max_insertions_per_pillar: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            pages_dir: "src/pages".to_string(),
            blog_dir: "src/content/blog".to_string(),
        }
    }
}

impl Default for Scoring {
    fn default() -> Self {
        Scoring {
            top_topics: 10,
            theme_min_score: 5,
            cross_site_min_confidence: 0.6,
            max_outbound_per_source: 3,
            min_shared_tags: 2,
            min_paragraph_chars: 100,
            min_insertion_score: 10,
            max_insertions_per_pillar: 15,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn theme(name: &str, keywords: &[&str]) -> ThemeDef {
    ThemeDef {
        name: name.to_string(),
        keywords: strings(keywords),
    }
}

fn site(domain: &str, industry: &str) -> SiteConfig {
    SiteConfig {
        domain: domain.to_string(),
        industry: industry.to_string(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sites: vec![
                site("mydojo.software", "martial arts"),
                site("petcare.software", "pet care"),
                site("mydriveschool.software", "driving school"),
                site("mytattoo.software", "tattoo studio"),
            ],
            layout: Layout::default(),
            excluded_pages: strings(&[
                "404.astro",
                "terms.astro",
                "privacy-policy.astro",
                "about.astro",
                "contact.astro",
                "pricing.astro",
            ]),
            themes: default_themes(),
            insertion_keywords: strings(&[
                "manage", "managing", "management",
                "schedule", "scheduling",
                "booking", "book",
                "software", "platform", "tool", "system",
                "automate", "automation",
                "organize", "organization",
                "track", "tracking",
                "streamline",
                "efficient", "efficiency",
                "solution",
            ]),
            scoring: Scoring::default(),
        }
    }
}

fn default_themes() -> Vec<ThemeDef> {
    vec![
        theme("Business operations", &[
            "scheduling", "booking", "appointments", "calendar", "availability",
            "reservation", "online booking", "appointment management", "capacity",
        ]),
        theme("Client management", &[
            "customer", "client", "crm", "communication", "retention",
            "relationship", "engagement", "customer service", "loyalty",
        ]),
        theme("Billing & payments", &[
            "billing", "payment", "invoicing", "subscription", "pricing",
            "revenue", "deposits", "payment processing", "financial",
        ]),
        theme("Marketing & growth", &[
            "marketing", "seo", "social media", "advertising", "lead generation",
            "referrals", "promotion", "growth", "content marketing",
        ]),
        theme("Staff management", &[
            "staff", "employee", "instructor", "team", "scheduling",
            "payroll", "training", "workforce", "hiring",
        ]),
        theme("Software & technology", &[
            "software", "saas", "platform", "integration", "automation",
            "digital", "technology", "app", "system", "migration",
        ]),
        theme("Compliance & admin", &[
            "compliance", "insurance", "licensing", "records", "documentation",
            "legal", "regulation", "certification", "liability",
        ]),
        theme("Small business general", &[
            "business plan", "starting", "startup", "entrepreneur", "scaling",
            "profitability", "operations", "management", "business owner",
        ]),
    ]
}

impl Config {
    /// Load from `path`, falling back to built-in defaults when it is absent.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn site(&self, domain: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.domain == domain)
    }

    pub fn industry_for(&self, domain: &str) -> &str {
        self.site(domain).map(|s| s.industry.as_str()).unwrap_or("business")
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(|s| s.domain.as_str())
    }
}
