// src/watch/notifier.rs

//! Non-fatal notification channel for errors that must not stop a watcher.

use tracing::error;

use crate::errors::BuildError;

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, error: &BuildError);
}

/// Reports through the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str, err: &BuildError) {
        error!(title, error = %err, "{message}");
    }
}
