use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use build_transform::errors::{BuildError, Result};
use build_transform::fs::FileSystem;
use build_transform::paths::map_output_paths;
use build_transform::pipeline::{TransformRequest, Transformer};
use build_transform::watch::{EventSource, FileEvent, Notifier, Subscription, WatchSignal};

/// Header the fake puts in front of every primary output.
pub const TRANSFORMED_HEADER: &str = "// transformed\n";

/// A fake compiler that:
/// - records every request it gets
/// - writes the mapped outputs of each file through the given `FileSystem`
/// - fails (without writing anything) when a source path contains the
///   configured marker.
#[derive(Debug, Clone)]
pub struct FakeTransformer {
    fs: Arc<dyn FileSystem>,
    requests: Arc<Mutex<Vec<TransformRequest>>>,
    fail_marker: Option<String>,
    fail_code: i32,
}

impl FakeTransformer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_marker: None,
            fail_code: 2,
        }
    }

    /// Fail any request with a file whose path contains `marker`.
    pub fn failing_on(mut self, marker: &str, code: i32) -> Self {
        self.fail_marker = Some(marker.to_string());
        self.fail_code = code;
        self
    }

    pub fn requests(&self) -> Vec<TransformRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Files of every request, in call order.
    pub fn transformed_files(&self) -> Vec<PathBuf> {
        self.requests()
            .into_iter()
            .flat_map(|r| r.files)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn emit(&self, request: &TransformRequest) -> Result<()> {
        if let Some(marker) = &self.fail_marker {
            if let Some(bad) = request
                .files
                .iter()
                .find(|f| f.to_string_lossy().contains(marker.as_str()))
            {
                return Err(BuildError::TransformError {
                    files: request.files.len(),
                    code: Some(self.fail_code),
                    reason: format!("{}: syntax error", bad.display()),
                });
            }
        }

        for file in &request.files {
            let mut source = Vec::new();
            self.fs.open_read(file)?.read_to_end(&mut source)?;

            let mapping =
                map_output_paths(file, &request.base, &request.out_dir, request.options.outputs())?;

            let mut primary = TRANSFORMED_HEADER.as_bytes().to_vec();
            primary.extend_from_slice(&source);
            self.fs.write(&mapping.primary, &primary)?;

            for aux in &mapping.auxiliary {
                self.fs.write(aux, format!("{{\"source\":{:?}}}", file.display().to_string()).as_bytes())?;
            }
        }
        Ok(())
    }
}

impl Transformer for FakeTransformer {
    fn transform<'a>(
        &'a self,
        request: &'a TransformRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            self.emit(request)
        })
    }
}

/// An [`EventSource`] driven by the test.
///
/// Each `subscribe` opens a new channel; `emit` and `ready` go to the most
/// recent one. Readiness is not sent automatically unless `auto_ready` is on.
#[derive(Debug, Clone, Default)]
pub struct ChannelEventSource {
    senders: Arc<Mutex<Vec<(PathBuf, mpsc::UnboundedSender<WatchSignal>)>>>,
    auto_ready: bool,
}

impl ChannelEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `Ready` right after each subscription.
    pub fn auto_ready() -> Self {
        Self {
            auto_ready: true,
            ..Self::default()
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    /// Roots passed to `subscribe`, in order.
    pub fn subscribed_roots(&self) -> Vec<PathBuf> {
        self.senders
            .lock()
            .unwrap()
            .iter()
            .map(|(root, _)| root.clone())
            .collect()
    }

    pub fn ready(&self) {
        self.send(WatchSignal::Ready);
    }

    pub fn emit(&self, event: FileEvent) {
        self.send(WatchSignal::Event(event));
    }

    /// Whether the latest subscriber dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.senders
            .lock()
            .unwrap()
            .last()
            .is_none_or(|(_, tx)| tx.is_closed())
    }

    /// Whether subscription `index` dropped its receiver.
    pub fn is_closed_at(&self, index: usize) -> bool {
        self.senders.lock().unwrap()[index].1.is_closed()
    }

    fn send(&self, signal: WatchSignal) {
        let senders = self.senders.lock().unwrap();
        let (_, tx) = senders.last().expect("no subscription yet");
        let _ = tx.send(signal);
    }
}

impl EventSource for ChannelEventSource {
    fn subscribe(&self, root: &Path) -> anyhow::Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.auto_ready {
            let _ = tx.send(WatchSignal::Ready);
        }
        self.senders.lock().unwrap().push((root.to_path_buf(), tx));
        Ok(Subscription::new(rx))
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub error: String,
}

/// Records every notification instead of showing it.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str, error: &BuildError) {
        self.seen.lock().unwrap().push(Notification {
            title: title.to_string(),
            message: message.to_string(),
            error: error.to_string(),
        });
    }
}
