//! Pulls a JSON record out of free-form model text.
//!
//! Models asked for JSON tend to answer with JSON, JSON after a preamble
//! ("Here's the JSON:"), or JSON inside a markdown code fence. The
//! strategies below are tried in that order and the first parse wins.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json)?[ \t]*\r?\n?(.*?)```").expect("fenced block pattern is valid")
});

/// Returns the first structured value found in `text`, or `None`.
pub fn extract_record(text: &str) -> Option<Value> {
    parse_whole(text)
        .or_else(|| parse_brace_span(text))
        .or_else(|| parse_fenced_block(text))
}

fn parse_whole(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

fn parse_brace_span(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn parse_fenced_block(text: &str) -> Option<Value> {
    FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|inner| serde_json::from_str(inner.as_str().trim()).ok())
}
