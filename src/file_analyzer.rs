use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;

use crate::{error::ProcessError, models::ImageData};

#[derive(Debug, Clone)]
pub struct AnalyzedFile {
    pub path: PathBuf,
    pub extension: Option<String>,
    pub image: ImageData,
}

impl AnalyzedFile {
    pub async fn new(path: PathBuf) -> Result<Self, ProcessError> {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| ProcessError::Read {
                path: path.clone(),
                source,
            })?;

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());

        let image = ImageData {
            mime_type: detect_mime_type(&bytes, extension.as_deref()),
            base64: STANDARD.encode(&bytes),
        };

        Ok(Self {
            path,
            extension,
            image,
        })
    }
}

/// Sniffs the bytes first; the extension only breaks ties for formats the
/// sniffer does not know.
pub fn detect_mime_type(bytes: &[u8], extension: Option<&str>) -> String {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return kind.mime_type().to_string();
        }
    }

    match extension.map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("heic") => "image/heic",
        _ => "image/png",
    }
    .to_string()
}

#[cfg(test)]
mod tests;
