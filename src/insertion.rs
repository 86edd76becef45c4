//! Picks the paragraph of a blog post that should carry a new pillar link,
//! and builds the sentence appended to it.

use crate::error::Result;
use rand::Rng;
use regex::Regex;
use serde::Serialize;

/// Title words too generic to identify a pillar.
const GENERIC_TITLE_WORDS: &[&str] = &["software", "guide", "complete", "best", "free"];

/// The page a link should point at.
#[derive(Debug, Clone, Copy)]
pub struct LinkCandidate<'a> {
    pub title: &'a str,
    /// Absolute URL.
    pub url: &'a str,
    pub site: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paragraph<'a> {
    pub text: &'a str,
    /// Byte offset of the paragraph within the body.
    pub start: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertionPoint {
    /// Byte offset in the body where the link sentence goes (end of paragraph).
    pub file_position: usize,
    pub paragraph_text: String,
    pub anchor_text: String,
    pub link_sentence: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertionDecision {
    Insert(InsertionPoint),
    Skipped { reason: String },
}

impl InsertionDecision {
    fn skipped(reason: &str) -> Self {
        InsertionDecision::Skipped {
            reason: reason.to_string(),
        }
    }
}

/// Split on runs of blank (or whitespace-only) lines, keeping byte offsets.
/// Paragraph text never includes its trailing line ending, so `\n` and
/// `\r\n` files split the same way.
pub fn split_paragraphs(body: &str) -> Vec<Paragraph<'_>> {
    let mut paragraphs = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some((start, end)) = current.take() {
                paragraphs.push(Paragraph { text: &body[start..end], start });
            }
        } else {
            let end = offset + line.trim_end_matches(&['\r', '\n'][..]).len();
            current = Some((current.map_or(offset, |(start, _)| start), end));
        }
        offset += line.len();
    }
    if let Some((start, end)) = current {
        paragraphs.push(Paragraph { text: &body[start..end], start });
    }
    paragraphs
}

/// Site-relative form of an absolute URL.
pub fn relative_url(url: &str, site: &str) -> String {
    url.replacen(&format!("https://{}", site), "", 1)
}

/// True when the body already carries the link, absolute or site-relative.
pub fn link_exists(body: &str, candidate: &LinkCandidate) -> bool {
    body.contains(candidate.url) || body.contains(&relative_url(candidate.url, candidate.site))
}

/// Distinct lower-cased title words longer than 3 chars, minus generic ones.
pub fn title_keywords(title: &str) -> Vec<String> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for word in cleaned.split_whitespace() {
        if word.chars().count() > 3
            && !GENERIC_TITLE_WORDS.contains(&word)
            && !keywords.iter().any(|k| k == word)
        {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// Lead-in sentence (with leading space and trailing period) wrapping the link.
pub fn link_sentence<R: Rng>(url: &str, anchor: &str, pillar_title: &str, rng: &mut R) -> String {
    let title = pillar_title.to_lowercase();
    let link = format!("[{}]({})", anchor, url);

    let intro = if title.contains("software") || title.contains("platform") || title.contains("app") {
        let options = [
            format!("Learn more about {}", link),
            format!("See how {} can help", link),
            format!("Explore {} solutions", link),
            format!("Check out {}", link),
        ];
        options[rng.gen_range(0..options.len())].clone()
    } else if title.contains("crm") || title.contains("management") {
        format!("Learn more about {}", link)
    } else if title.contains("scheduling") || title.contains("booking") {
        format!("Discover {} options", link)
    } else {
        format!("Read more about {}", link)
    };

    format!(" {}.", intro)
}

/// Splice the link sentence into the full file; `body_offset` is where the
/// body starts after any frontmatter.
pub fn apply(file_content: &str, body_offset: usize, point: &InsertionPoint) -> String {
    let at = body_offset + point.file_position;
    let mut out = String::with_capacity(file_content.len() + point.link_sentence.len());
    out.push_str(&file_content[..at]);
    out.push_str(&point.link_sentence);
    out.push_str(&file_content[at..]);
    out
}

pub struct InsertionSelector {
    insertion_keywords: Vec<String>,
    min_paragraph_chars: usize,
    min_score: i32,
    excluded_start: Regex,
    product_words: Regex,
    superlative: Regex,
    title_suffix: Regex,
}

impl InsertionSelector {
    pub fn new(insertion_keywords: &[String], min_paragraph_chars: usize, min_score: i32) -> Result<Self> {
        Ok(InsertionSelector {
            insertion_keywords: insertion_keywords.iter().map(|k| k.to_lowercase()).collect(),
            min_paragraph_chars,
            min_score,
            excluded_start: Regex::new(r"^(#+\s|[-*+]\s|\d+[.)]\s|```)")?,
            product_words: Regex::new(r"\b(software|platform|tool|system|solution)\b")?,
            superlative: Regex::new(r"(?i)^(best|top|free)\s+")?,
            title_suffix: Regex::new(r"(?i)\s+(guide|(19|20)\d{2})$")?,
        })
    }

    /// Pillar title without a leading superlative or a trailing "Guide"/year.
    pub fn anchor_text(&self, pillar_title: &str) -> String {
        let anchor = self.superlative.replace(pillar_title, "");
        self.title_suffix.replace(&anchor, "").into_owned()
    }

    fn is_excluded(&self, paragraph: &str) -> bool {
        paragraph.chars().count() < self.min_paragraph_chars || self.excluded_start.is_match(paragraph)
    }

    /// Score of paragraph `index` of `total`, or `None` if it can never host a link.
    pub fn score_paragraph(
        &self,
        paragraph: &str,
        index: usize,
        total: usize,
        keywords: &[String],
        theme_bonus: i32,
    ) -> Option<i32> {
        if self.is_excluded(paragraph) {
            return None;
        }
        let lower = paragraph.to_lowercase();
        let mut score = 0;

        score += 10 * keywords.iter().filter(|k| lower.contains(k.as_str())).count() as i32;
        score += 3 * self
            .insertion_keywords
            .iter()
            .filter(|k| lower.contains(k.as_str()))
            .count() as i32;

        let position = index as f64 / total as f64;
        if position > 0.15 && position < 0.85 {
            score += 5;
        } else if position < 0.1 || position > 0.9 {
            score -= 5;
        }

        score += theme_bonus;

        if self.product_words.is_match(&lower) {
            score += 5;
        }
        Some(score)
    }

    /// Index of the best-scoring paragraph above the threshold; earliest wins ties.
    pub fn select(&self, paragraphs: &[Paragraph], pillar_title: &str, target_themes: &[String]) -> Option<usize> {
        let keywords = title_keywords(pillar_title);
        let shared_themes = target_themes
            .iter()
            .filter(|theme| {
                let theme = theme.to_lowercase();
                keywords.iter().any(|k| theme.contains(k.as_str()))
            })
            .count() as i32;

        let mut best: Option<(usize, i32)> = None;
        for (index, paragraph) in paragraphs.iter().enumerate() {
            let Some(score) =
                self.score_paragraph(paragraph.text, index, paragraphs.len(), &keywords, 3 * shared_themes)
            else {
                continue;
            };
            if score <= self.min_score {
                continue;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Full decision for one post body: existing-link guard, paragraph choice,
    /// anchor and sentence. The sentence links the site-relative URL.
    pub fn decide<R: Rng>(
        &self,
        body: &str,
        candidate: &LinkCandidate,
        target_themes: &[String],
        rng: &mut R,
    ) -> InsertionDecision {
        if link_exists(body, candidate) {
            return InsertionDecision::skipped("Link already exists");
        }

        let paragraphs = split_paragraphs(body);
        let Some(index) = self.select(&paragraphs, candidate.title, target_themes) else {
            return InsertionDecision::skipped("No suitable insertion point found");
        };

        let paragraph = paragraphs[index];
        let anchor_text = self.anchor_text(candidate.title);
        let url = relative_url(candidate.url, candidate.site);
        InsertionDecision::Insert(InsertionPoint {
            file_position: paragraph.start + paragraph.text.len(),
            paragraph_text: paragraph.text.to_string(),
            link_sentence: link_sentence(&url, &anchor_text, candidate.title, rng),
            anchor_text,
        })
    }
}
