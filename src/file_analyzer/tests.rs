use super::{detect_mime_type, AnalyzedFile};
use crate::error::ProcessError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn create_test_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_analyze_png_screenshot() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_test_file(&temp_dir, "Screenshot 2024-01-02 at 10.00.00.png", PNG_HEADER);

    let analyzed = AnalyzedFile::new(path.clone()).await.unwrap();

    assert_eq!(analyzed.extension, Some("png".to_string()));
    assert_eq!(analyzed.image.mime_type, "image/png");
    assert_eq!(STANDARD.decode(&analyzed.image.base64).unwrap(), PNG_HEADER);
    assert!(analyzed.path == path);
}

#[tokio::test]
async fn test_content_beats_extension() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_test_file(&temp_dir, "mislabelled.png", JPEG_HEADER);

    let analyzed = AnalyzedFile::new(path).await.unwrap();

    assert_eq!(analyzed.image.mime_type, "image/jpeg");
    assert!(analyzed.image.data_url().starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn test_missing_file_is_a_read_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gone.png");

    let result = AnalyzedFile::new(path).await;

    assert!(matches!(result, Err(ProcessError::Read { .. })));
}

#[test]
fn test_mime_falls_back_to_extension() {
    assert_eq!(detect_mime_type(b"????", Some("JPG")), "image/jpeg");
    assert_eq!(detect_mime_type(b"????", Some("webp")), "image/webp");
    assert_eq!(detect_mime_type(b"????", None), "image/png");
    assert_eq!(detect_mime_type(b"", Some("txt")), "image/png");
}
