use super::*;
use crate::models::{ClassificationResult, DetailLevel, ImageData, ItemSource};
use crate::organizer::OrganizerOptions;
use crate::providers::Classifier;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

enum Script {
    Answer(ClassificationResult),
    Panic,
}

/// Replies from a script, one entry per call, and remembers call order.
struct ScriptedClassifier {
    script: Vec<Script>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, image: ImageData, _detail: DetailLevel) -> ClassificationResult {
        self.seen.lock().unwrap().push(image.base64.clone());
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script[call] {
            Script::Answer(result) => result.clone(),
            Script::Panic => panic!("provider blew up"),
        }
    }
}

struct Fixture {
    _temp_dir: TempDir,
    watch_dir: PathBuf,
    output_dir: PathBuf,
    backup_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let watch_dir = temp_dir.path().to_path_buf();
        let output_dir = watch_dir.join("sorted");
        let backup_dir = watch_dir.join("backup");
        fs::create_dir_all(&backup_dir).unwrap();
        Self {
            _temp_dir: temp_dir,
            watch_dir,
            output_dir,
            backup_dir,
        }
    }

    fn screenshot(&self, name: &str, content: &str) -> PathBuf {
        let path = self.watch_dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn queue(&self, classifier: Arc<dyn Classifier>) -> (ProcessingQueue, QueueHandle) {
        let organizer = ScreenshotOrganizer::new(
            classifier,
            OrganizerOptions {
                output_dir: self.output_dir.clone(),
                backup_dir: self.backup_dir.clone(),
                categories: crate::prompt::default_categories(),
                detail: DetailLevel::Low,
            },
        );
        ProcessingQueue::new(organizer)
    }
}

fn answer(category: Option<&str>, filename: &str) -> Script {
    Script::Answer(ClassificationResult::new(category.map(str::to_string), filename))
}

fn enqueue_all(handle: QueueHandle, paths: &[&Path]) {
    for path in paths {
        assert!(handle.enqueue(WorkItem::new(*path, ItemSource::Retroactive)));
    }
}

#[tokio::test]
async fn test_failure_in_one_item_does_not_stop_the_others() {
    let fixture = Fixture::new();
    let first = fixture.screenshot("Screenshot 2024-01-01 a.png", "a");
    let second = fixture.screenshot("Screenshot 2024-01-02 b.png", "b");
    let third = fixture.screenshot("Screenshot 2024-01-03 c.png", "c");

    let classifier = ScriptedClassifier::new(vec![
        answer(Some("web"), "first"),
        Script::Panic,
        answer(Some("code"), "third"),
    ]);
    let (queue, handle) = fixture.queue(classifier.clone());
    enqueue_all(handle, &[&first, &second, &third]);

    let summary = queue.run().await;

    assert_eq!(summary, QueueSummary { moved: 2, skipped: 0, failed: 1 });
    assert!(fixture.output_dir.join("web/2024-01-01-first.png").exists());
    assert!(fixture.output_dir.join("code/2024-01-03-third.png").exists());
    assert!(second.exists(), "failed item must stay where it was");
    assert!(!first.exists());
    assert!(!third.exists());
}

#[tokio::test]
async fn test_items_are_processed_in_arrival_order() {
    let fixture = Fixture::new();
    let names = ["Screenshot z.png", "Screenshot a.png", "Screenshot m.png"];
    let paths: Vec<PathBuf> = names
        .iter()
        .map(|name| fixture.screenshot(name, &name[11..12]))
        .collect();

    let classifier = ScriptedClassifier::new(vec![
        answer(None, "one"),
        answer(None, "two"),
        answer(None, "three"),
    ]);
    let (queue, handle) = fixture.queue(classifier.clone());
    enqueue_all(handle, &paths.iter().map(PathBuf::as_path).collect::<Vec<_>>());

    queue.run().await;

    // base64 of "z", "a", "m"
    assert_eq!(*classifier.seen.lock().unwrap(), vec!["eg==", "YQ==", "bQ=="]);
}

#[tokio::test]
async fn test_sentinel_and_unknown_category() {
    let fixture = Fixture::new();
    let unclassified = fixture.screenshot("Screenshot 2024-02-01.png", "x");
    let odd_category = fixture.screenshot("Screenshot 2024-02-02.png", "y");

    let classifier = ScriptedClassifier::new(vec![
        Script::Answer(ClassificationResult::unknown()),
        answer(Some("memes"), "cat-picture"),
    ]);
    let (queue, handle) = fixture.queue(classifier);
    enqueue_all(handle, &[&unclassified, &odd_category]);

    let summary = queue.run().await;

    assert_eq!(summary, QueueSummary { moved: 1, skipped: 1, failed: 0 });
    assert!(unclassified.exists());
    assert!(!fixture.backup_dir.join("Screenshot 2024-02-01.png").exists());
    assert!(fixture.output_dir.join("2024-02-02-cat-picture.png").exists());
    assert!(fixture.backup_dir.join("Screenshot 2024-02-02.png").exists());
}

#[tokio::test]
async fn test_vanished_item_is_skipped() {
    let fixture = Fixture::new();
    let classifier = ScriptedClassifier::new(Vec::new());
    let (queue, handle) = fixture.queue(classifier.clone());
    enqueue_all(handle, &[&fixture.watch_dir.join("Screenshot gone.png")]);

    let summary = queue.run().await;

    assert_eq!(summary, QueueSummary { moved: 0, skipped: 1, failed: 0 });
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shutdown_leaves_backlog_untouched() {
    let fixture = Fixture::new();
    let waiting = fixture.screenshot("Screenshot 2024-03-01.png", "w");
    let classifier = ScriptedClassifier::new(vec![answer(None, "never")]);
    let (queue, handle) = fixture.queue(classifier.clone());
    enqueue_all(handle.clone(), &[&waiting]);

    let summary = queue.run_until(async {}).await;

    assert_eq!(summary.total(), 0);
    assert!(waiting.exists());
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    assert!(!handle.enqueue(WorkItem::new(&waiting, ItemSource::Watcher)));
}

#[tokio::test]
async fn test_duplicate_names_do_not_overwrite() {
    let fixture = Fixture::new();
    let first = fixture.screenshot("Screenshot 2023-11-05 1.png", "1");
    let second = fixture.screenshot("Screenshot 2023-11-05 2.png", "2");

    let classifier = ScriptedClassifier::new(vec![
        answer(Some("web"), "login"),
        answer(Some("web"), "login"),
    ]);
    let (queue, handle) = fixture.queue(classifier);
    enqueue_all(handle, &[&first, &second]);

    queue.run().await;

    let web = fixture.output_dir.join("web");
    assert_eq!(fs::read_to_string(web.join("2023-11-05-login.png")).unwrap(), "1");
    assert_eq!(fs::read_to_string(web.join("2023-11-05-login-1.png")).unwrap(), "2");
}
