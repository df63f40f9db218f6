pub mod app;
pub mod config;
pub mod date_inference;
pub mod error;
pub mod extractor;
pub mod file_analyzer;
pub mod file_ops;
pub mod matcher;
pub mod models;
pub mod organizer;
pub mod processing_queue;
pub mod prompt;
pub mod providers;
pub mod utils;
pub mod validator;
pub mod watcher;
