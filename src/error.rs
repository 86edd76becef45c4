use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),

    #[error("invalid pattern: {0}")]
    Pattern(String),

    /// The insert stage has nothing to work from.
    #[error("audit data not found at {}. Run 'crosslink audit' first.", .0.display())]
    MissingAuditData(PathBuf),

    #[error("site not configured: {0}")]
    SiteNotConfigured(String),
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::Pattern(e.to_string())
    }
}

impl From<globset::Error> for Error {
    fn from(e: globset::Error) -> Self {
        Error::Pattern(e.to_string())
    }
}
