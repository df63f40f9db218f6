use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::Settings,
    date_inference::infer_date,
    error::ProcessError,
    file_analyzer::AnalyzedFile,
    file_ops::FileOperator,
    models::{DetailLevel, ProcessOutcome, RenameDecision, SkipReason, WorkItem},
    providers::Classifier,
    utils::sanitize_file_stem,
};

#[derive(Debug, Clone)]
pub struct OrganizerOptions {
    pub output_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub categories: BTreeMap<String, String>,
    pub detail: DetailLevel,
}

impl From<&Settings> for OrganizerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            backup_dir: settings.backup_dir.clone(),
            categories: settings.categories.clone(),
            detail: settings.detail,
        }
    }
}

/// Runs one screenshot through read, classify, date, name and move.
pub struct ScreenshotOrganizer {
    classifier: Arc<dyn Classifier>,
    file_ops: FileOperator,
    output_dir: PathBuf,
    categories: BTreeMap<String, String>,
    detail: DetailLevel,
}

impl ScreenshotOrganizer {
    pub fn new(classifier: Arc<dyn Classifier>, options: OrganizerOptions) -> Self {
        Self {
            classifier,
            file_ops: FileOperator::new(options.backup_dir),
            output_dir: options.output_dir,
            categories: options.categories,
            detail: options.detail,
        }
    }

    pub async fn process(&self, item: &WorkItem) -> Result<ProcessOutcome, ProcessError> {
        if !item.path.exists() {
            return Ok(ProcessOutcome::Skipped(SkipReason::Vanished));
        }

        let AnalyzedFile {
            path,
            extension,
            image,
        } = AnalyzedFile::new(item.path.clone()).await?;

        let result = self.classifier.classify(image, self.detail).await;
        if result.is_unknown() {
            return Ok(ProcessOutcome::Skipped(SkipReason::Unclassified));
        }

        let stem = sanitize_file_stem(&result.filename, extension.as_deref());
        if stem.is_empty() {
            return Ok(ProcessOutcome::Skipped(SkipReason::EmptyName));
        }

        let category = self.resolve_category(result.category.as_deref());
        let date = infer_date(&path);
        let decision = self.rename_decision(&path, category, &date, &stem, extension.as_deref());

        let moved = self.file_ops.backup_and_rename(&decision)?;

        info!(
            from = %decision.source_path.display(),
            to = %moved.display(),
            category = category.unwrap_or("-"),
            "Organised screenshot"
        );
        Ok(ProcessOutcome::Moved(moved))
    }

    /// Unknown or empty categories mean "no category", not an error.
    pub fn resolve_category<'a>(&self, category: Option<&'a str>) -> Option<&'a str> {
        let category = category?.trim();
        if category.is_empty() {
            return None;
        }
        if self.categories.contains_key(category) {
            Some(category)
        } else {
            warn!(category, "Model suggested a category that is not configured");
            None
        }
    }

    pub fn rename_decision(
        &self,
        source: &Path,
        category: Option<&str>,
        date: &str,
        stem: &str,
        extension: Option<&str>,
    ) -> RenameDecision {
        let dir = match category {
            Some(category) => self.output_dir.join(category),
            None => self.output_dir.clone(),
        };

        let base = if date.is_empty() {
            stem.to_string()
        } else {
            format!("{}-{}", date, stem)
        };
        let file_name = match extension {
            Some(extension) => format!("{}.{}", base, extension),
            None => base,
        };

        RenameDecision {
            source_path: source.to_path_buf(),
            backup_path: self.file_ops.backup_path(source),
            target_path: dir.join(file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationResult, ImageData};
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _image: ImageData, _detail: DetailLevel) -> ClassificationResult {
            ClassificationResult::unknown()
        }
    }

    fn organizer() -> ScreenshotOrganizer {
        ScreenshotOrganizer::new(
            Arc::new(Fixed),
            OrganizerOptions {
                output_dir: PathBuf::from("/out"),
                backup_dir: PathBuf::from("/backup"),
                categories: crate::prompt::default_categories(),
                detail: DetailLevel::Low,
            },
        )
    }

    #[test]
    fn test_resolve_category() {
        let organizer = organizer();
        assert_eq!(organizer.resolve_category(Some("web")), Some("web"));
        assert_eq!(organizer.resolve_category(Some(" code ")), Some("code"));
        assert_eq!(organizer.resolve_category(Some("memes")), None);
        assert_eq!(organizer.resolve_category(Some("")), None);
        assert_eq!(organizer.resolve_category(None), None);
    }

    #[test]
    fn test_rename_decision() {
        let organizer = organizer();
        let source = Path::new("/watch/Screenshot 2024-01-02 at 10.00.00.png");

        let decision =
            organizer.rename_decision(source, Some("web"), "2024-01-02", "login-page", Some("png"));
        assert_eq!(decision.source_path, source);
        assert_eq!(
            decision.backup_path,
            PathBuf::from("/backup/Screenshot 2024-01-02 at 10.00.00.png")
        );
        assert_eq!(
            decision.target_path,
            PathBuf::from("/out/web/2024-01-02-login-page.png")
        );

        let undated = organizer.rename_decision(source, None, "", "login-page", None);
        assert_eq!(undated.target_path, PathBuf::from("/out/login-page"));
    }
}
