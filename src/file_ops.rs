use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{error::FileOpError, models::RenameDecision};

/// Backs up and moves processed screenshots. Nothing it does overwrites an
/// existing file.
#[derive(Debug, Clone)]
pub struct FileOperator {
    backup_dir: PathBuf,
}

impl FileOperator {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Where the backup copy of `source` goes, before collision handling.
    pub fn backup_path(&self, source: &Path) -> PathBuf {
        match source.file_name() {
            Some(name) => self.backup_dir.join(name),
            None => self.backup_dir.join("unnamed"),
        }
    }

    /// Copies `source` to `backup_path`, or the first free `-N` variant of it.
    pub fn backup(&self, source: &Path, backup_path: &Path) -> Result<PathBuf, FileOpError> {
        let backup_path = unique_path(backup_path);
        fs::copy(source, &backup_path).map_err(|e| FileOpError::Backup {
            source_path: source.to_path_buf(),
            backup_path: backup_path.clone(),
            source: e,
        })?;
        Ok(backup_path)
    }

    /// Carries out a [`RenameDecision`]: backup first, then the move to the
    /// target (or a free `-N` variant). A failed backup is logged and the
    /// move goes ahead; a failed move leaves the source where it was.
    pub fn backup_and_rename(&self, decision: &RenameDecision) -> Result<PathBuf, FileOpError> {
        match self.backup(&decision.source_path, &decision.backup_path) {
            Ok(backup_path) => {
                debug!(backup = %backup_path.display(), "Backed up original");
            }
            Err(e) => {
                warn!(error = %e, "Continuing without backup");
            }
        }

        move_without_overwrite(&decision.source_path, &decision.target_path)
    }
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// `target` if free, otherwise `stem-1.ext`, `stem-2.ext`, ...
pub fn unique_path(target: &Path) -> PathBuf {
    if !occupied(target) {
        return target.to_path_buf();
    }

    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target
        .extension()
        .map(|e| e.to_string_lossy().into_owned());

    let mut counter: u32 = 1;
    loop {
        let name = match &extension {
            Some(extension) => format!("{}-{}.{}", stem, counter, extension),
            None => format!("{}-{}", stem, counter),
        };
        let candidate = parent.join(name);
        if !occupied(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

pub fn move_without_overwrite(source: &Path, target: &Path) -> Result<PathBuf, FileOpError> {
    let move_error = |to: &Path, e: std::io::Error| FileOpError::Move {
        from: source.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| move_error(target, e))?;
    }

    let destination = unique_path(target);

    if fs::rename(source, &destination).is_ok() {
        return Ok(destination);
    }

    // rename fails across filesystems; copy then remove instead
    fs::copy(source, &destination).map_err(|e| {
        let _ = fs::remove_file(&destination);
        move_error(&destination, e)
    })?;

    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(&destination);
        return Err(move_error(&destination, e));
    }

    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn decision(operator: &FileOperator, source: &Path, target: &Path) -> RenameDecision {
        RenameDecision {
            source_path: source.to_path_buf(),
            backup_path: operator.backup_path(source),
            target_path: target.to_path_buf(),
        }
    }

    #[test]
    fn test_unique_path_free_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("2023-11-05-login.png");
        assert_eq!(unique_path(&target), target);
    }

    #[test]
    fn test_collisions_get_numeric_suffixes() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let target = out.join("2023-11-05-login.png");
        write(&target, b"existing");

        let second = temp_dir.path().join("second.png");
        let third = temp_dir.path().join("third.png");
        write(&second, b"second");
        write(&third, b"third");

        let moved_second = move_without_overwrite(&second, &target).unwrap();
        let moved_third = move_without_overwrite(&third, &target).unwrap();

        assert_eq!(moved_second, out.join("2023-11-05-login-1.png"));
        assert_eq!(moved_third, out.join("2023-11-05-login-2.png"));
        assert_eq!(fs::read(&target).unwrap(), b"existing");
        assert_eq!(fs::read(&moved_second).unwrap(), b"second");
        assert_eq!(fs::read(&moved_third).unwrap(), b"third");
        assert!(!second.exists());
        assert!(!third.exists());
    }

    #[test]
    fn test_unique_path_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("notes");
        write(&target, b"x");
        assert_eq!(unique_path(&target), temp_dir.path().join("notes-1"));
    }

    #[test]
    fn test_backup_and_rename() {
        let temp_dir = TempDir::new().unwrap();
        let backup_dir = temp_dir.path().join("backup");
        fs::create_dir_all(&backup_dir).unwrap();
        let source = temp_dir.path().join("Screenshot 1.png");
        write(&source, b"pixels");
        let target = temp_dir.path().join("out/web/2024-01-02-login-page.png");

        let operator = FileOperator::new(&backup_dir);
        let moved = operator
            .backup_and_rename(&decision(&operator, &source, &target))
            .unwrap();

        assert_eq!(moved, target);
        assert_eq!(fs::read(backup_dir.join("Screenshot 1.png")).unwrap(), b"pixels");
        assert_eq!(fs::read(&target).unwrap(), b"pixels");
        assert!(!source.exists());
    }

    #[test]
    fn test_backup_goes_where_the_decision_says() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("shot.png");
        write(&source, b"pixels");
        let elsewhere = temp_dir.path().join("archive/kept-original.png");
        fs::create_dir_all(elsewhere.parent().unwrap()).unwrap();

        let operator = FileOperator::new(temp_dir.path().join("backup"));
        let decision = RenameDecision {
            source_path: source.clone(),
            backup_path: elsewhere.clone(),
            target_path: temp_dir.path().join("out/shot.png"),
        };
        operator.backup_and_rename(&decision).unwrap();

        assert_eq!(fs::read(&elsewhere).unwrap(), b"pixels");
        assert!(!temp_dir.path().join("backup/shot.png").exists());
    }

    #[test]
    fn test_backup_never_overwrites_older_backup() {
        let temp_dir = TempDir::new().unwrap();
        let backup_dir = temp_dir.path().join("backup");
        write(&backup_dir.join("shot.png"), b"older");
        let source = temp_dir.path().join("shot.png");
        write(&source, b"newer");

        let operator = FileOperator::new(&backup_dir);
        let backup = operator
            .backup(&source, &operator.backup_path(&source))
            .unwrap();

        assert_eq!(backup, backup_dir.join("shot-1.png"));
        assert_eq!(fs::read(backup_dir.join("shot.png")).unwrap(), b"older");
    }

    #[test]
    fn test_failed_backup_does_not_block_move() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the backup directory should be
        let backup_dir = temp_dir.path().join("backup");
        write(&backup_dir, b"not a directory");
        let source = temp_dir.path().join("shot.png");
        write(&source, b"pixels");
        let target = temp_dir.path().join("out/shot-renamed.png");

        let operator = FileOperator::new(&backup_dir);
        assert!(operator.backup(&source, &operator.backup_path(&source)).is_err());

        let moved = operator
            .backup_and_rename(&decision(&operator, &source, &target))
            .unwrap();
        assert_eq!(fs::read(moved).unwrap(), b"pixels");
    }

    #[test]
    fn test_failed_move_leaves_source_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("missing.png");
        let target = temp_dir.path().join("out/renamed.png");

        let result = move_without_overwrite(&source, &target);

        assert!(matches!(result, Err(FileOpError::Move { .. })));
        assert!(!target.exists());
    }
}
