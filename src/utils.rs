use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::matcher::FileMatcher;

const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Matching files directly inside `dir`, sorted by name. Used for the
/// retroactive pass over screenshots that existed before startup.
pub fn scan_directory(dir: &Path, matcher: &FileMatcher) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() && matcher.matches(entry.path()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Turns a model-suggested name into a safe file stem. Returns an empty
/// string when nothing usable is left.
pub fn sanitize_file_stem(suggested: &str, extension: Option<&str>) -> String {
    let mut name: String = suggested
        .trim()
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .collect();

    // Models sometimes echo the extension back
    if let Some(extension) = extension {
        let suffix = format!(".{}", extension.to_ascii_lowercase());
        if name.to_ascii_lowercase().ends_with(&suffix) {
            name.truncate(name.len() - suffix.len());
        }
    }

    name.trim_matches(|c: char| c == '.' || c == '-' || c.is_whitespace())
        .to_string()
}
