//! Wires settings, provider, queue and the two item sources together.

use anyhow::{Context, Result};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::Settings,
    error::ConfigError,
    models::{ItemSource, QueueSummary, WorkItem},
    organizer::{OrganizerOptions, ScreenshotOrganizer},
    processing_queue::{ProcessingQueue, QueueHandle},
    providers::{ollama::OllamaTransport, openai::OpenAiTransport, Provider, RenameProvider},
    utils::scan_directory,
    watcher::DirectoryWatcher,
};

pub fn build_classifier(settings: &Settings) -> Result<RenameProvider, ConfigError> {
    let client = Client::builder()
        .timeout(settings.request_timeout)
        .build()
        .map_err(ConfigError::HttpClient)?;

    let provider = match settings.provider {
        Provider::OpenAI => {
            let api_key = settings.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
            RenameProvider::new(
                OpenAiTransport::new(client, &settings.base_url, api_key, &settings.model_name),
                &settings.prompt,
                &settings.categories,
                settings.request_timeout,
            )
        }
        Provider::Ollama => RenameProvider::new(
            OllamaTransport::new(client, &settings.base_url, &settings.model_name),
            &settings.prompt,
            &settings.categories,
            settings.request_timeout,
        ),
    };

    Ok(provider)
}

/// Runs until the backlog is done (scan only) or until Ctrl-C (watch mode).
pub async fn run(settings: Settings) -> Result<QueueSummary> {
    run_until(settings, shutdown_signal()).await
}

pub async fn run_until<F>(settings: Settings, shutdown: F) -> Result<QueueSummary>
where
    F: Future<Output = ()>,
{
    if !settings.watch && !settings.retroactive {
        warn!("Both watching and the retroactive scan are disabled, nothing to do");
        return Ok(QueueSummary::default());
    }

    settings.prepare_directories()?;

    let classifier = build_classifier(&settings)?;
    info!(
        provider = classifier.transport_name(),
        model = %settings.model_name,
        watch_dir = %settings.watch_dir.display(),
        "Starting screenshot organiser"
    );

    let organizer = ScreenshotOrganizer::new(Arc::new(classifier), OrganizerOptions::from(&settings));
    let (queue, handle) = ProcessingQueue::new(organizer);

    // Held until the queue stops; dropping it stops the watch.
    let _watcher = if settings.watch {
        let dir = settings
            .watch_dir
            .canonicalize()
            .unwrap_or_else(|_| settings.watch_dir.clone());
        let watcher = DirectoryWatcher::start(
            &dir,
            settings.matcher.clone(),
            handle.clone(),
            settings.debounce,
        )
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
        Some(watcher)
    } else {
        None
    };

    if settings.retroactive {
        enqueue_existing(&settings, &handle)?;
    }
    drop(handle);

    Ok(queue.run_until(shutdown).await)
}

fn enqueue_existing(settings: &Settings, handle: &QueueHandle) -> Result<()> {
    let files = scan_directory(&settings.watch_dir, &settings.matcher)
        .with_context(|| format!("Failed to scan {}", settings.watch_dir.display()))?;
    info!(count = files.len(), "Queued existing screenshots");

    for path in files {
        handle.enqueue(WorkItem::new(path, ItemSource::Retroactive));
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
