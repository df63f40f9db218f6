use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Filename reported when every resolution strategy came up empty.
pub const UNKNOWN_FILENAME: &str = "unknown";

// LLM extraction structure, also used as the tool parameter schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ClassificationResult {
    #[schemars(description = "One of the configured category names, or omitted if none fits")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[schemars(
        description = "Short, descriptive, kebab-case filename for the screenshot, without extension or date"
    )]
    pub filename: String,
}

impl ClassificationResult {
    pub fn new(category: Option<String>, filename: impl Into<String>) -> Self {
        Self {
            category,
            filename: filename.into(),
        }
    }

    /// The failure sentinel: no category, filename `unknown`.
    pub fn unknown() -> Self {
        Self::new(None, UNKNOWN_FILENAME)
    }

    pub fn is_unknown(&self) -> bool {
        self.category.is_none() && self.filename == UNKNOWN_FILENAME
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Low,
    High,
    Auto,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Low => "low",
            DetailLevel::High => "high",
            DetailLevel::Auto => "auto",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(DetailLevel::Low),
            "high" => Ok(DetailLevel::High),
            "auto" => Ok(DetailLevel::Auto),
            other => Err(format!("unknown detail level '{}'", other)),
        }
    }
}

/// Base64-encoded image plus the MIME type it was sniffed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub base64: String,
    pub mime_type: String,
}

impl ImageData {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub image: ImageData,
    pub detail: DetailLevel,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    Retroactive,
    Watcher,
}

/// A path waiting in the processing queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub path: PathBuf,
    pub source: ItemSource,
}

impl WorkItem {
    pub fn new(path: impl Into<PathBuf>, source: ItemSource) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameDecision {
    pub source_path: PathBuf,
    pub backup_path: PathBuf,
    pub target_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The provider returned the failure sentinel.
    Unclassified,
    /// The suggested name sanitised down to nothing.
    EmptyName,
    /// The file was gone before the worker reached it.
    Vanished,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unclassified => write!(f, "provider could not classify the image"),
            SkipReason::EmptyName => write!(f, "suggested filename was empty after sanitising"),
            SkipReason::Vanished => write!(f, "file no longer exists"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Moved(PathBuf),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl QueueSummary {
    pub fn total(&self) -> usize {
        self.moved + self.skipped + self.failed
    }
}
