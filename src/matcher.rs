use regex::{Regex, RegexBuilder};
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_PATTERN: &str = r"^(Screenshot|Screen Shot|CleanShot).*\.(png|jpe?g|webp)$";

/// Decides which file names enter the pipeline. Matching is done against
/// the file name only, never the directory part.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    regex: Regex,
}

impl FileMatcher {
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.regex.is_match(name))
    }
}
