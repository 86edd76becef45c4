//! Multi-label classification onto the fixed theme taxonomy.

use crate::config::ThemeDef;
use crate::error::Result;
use crate::model::Topic;
use regex::Regex;

struct CompiledTheme {
    name: String,
    keywords: Vec<(String, Regex)>,
}

pub struct ThemeClassifier {
    themes: Vec<CompiledTheme>,
    min_score: usize,
}

impl ThemeClassifier {
    pub fn new(taxonomy: &[ThemeDef], min_score: usize) -> Result<Self> {
        let mut themes = Vec::with_capacity(taxonomy.len());
        for def in taxonomy {
            let mut keywords = Vec::with_capacity(def.keywords.len());
            for kw in &def.keywords {
                let kw = kw.to_lowercase();
                let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&kw)))?;
                keywords.push((kw, re));
            }
            themes.push(CompiledTheme {
                name: def.name.clone(),
                keywords,
            });
        }
        Ok(ThemeClassifier { themes, min_score })
    }

    /// Score of one theme: +2 per (topic, keyword) substring hit, plus +1 per
    /// whole-word keyword occurrence in the body.
    fn score(theme: &CompiledTheme, body: &str, topics: &[Topic]) -> usize {
        let mut score = 0;
        for topic in topics {
            for (kw, _) in &theme.keywords {
                if topic.phrase.contains(kw.as_str()) {
                    score += 2;
                }
            }
        }
        for (_, re) in &theme.keywords {
            score += re.find_iter(body).count();
        }
        score
    }

    /// Themes scoring at least the threshold, in taxonomy order.
    pub fn classify(&self, body: &str, topics: &[Topic]) -> Vec<String> {
        self.themes
            .iter()
            .filter(|theme| Self::score(theme, body, topics) >= self.min_score)
            .map(|theme| theme.name.clone())
            .collect()
    }
}
