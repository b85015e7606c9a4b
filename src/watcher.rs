//! Config file watcher: external edit detection with debounce.
//!
//! Watches the directory holding `config.json` and reports external edits to
//! the controller as a single [`ControllerEvent::ExternalChange`] per burst.
//!
//! - Raw notify events for other files in the directory are ignored.
//! - Events arriving while the store's write suppression is active are dropped.
//! - A burst is collapsed into one notification after a quiet period.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::WriteSuppression;
use crate::errors::SoundboardError;
use crate::messages::ControllerEvent;

/// Quiet period that must pass after the last raw event before reporting.
pub const DEBOUNCE_QUIET: Duration = Duration::from_millis(200);

/// Signals consumed by the debounce thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchSignal {
    Changed,
    Shutdown,
}

/// Debounce state machine, driven by the watcher thread.
#[derive(Debug)]
struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// A raw change arrived; restarts the quiet period unless suppressed.
    fn on_change(&mut self, now: Instant, suppressed: bool) {
        if suppressed {
            return;
        }
        self.deadline = Some(now + self.quiet);
    }

    /// How long until the pending deadline, if any.
    fn time_left(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Clears an expired deadline; `true` if a notification should go out.
    fn fire(&mut self, now: Instant, suppressed: bool) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                !suppressed
            }
            _ => false,
        }
    }
}

/// Watcher handle; dropping it stops the watcher and joins its thread.
pub struct FileChangeWatcher {
    path: PathBuf,
    _watcher: Option<RecommendedWatcher>,
    signal_tx: Sender<WatchSignal>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl FileChangeWatcher {
    /// Starts watching `path` for external edits.
    pub fn new(
        path: &Path,
        suppression: Arc<WriteSuppression>,
        events: Sender<ControllerEvent>,
    ) -> Result<Self, SoundboardError> {
        Self::with_quiet_period(path, suppression, events, DEBOUNCE_QUIET)
    }

    pub fn with_quiet_period(
        path: &Path,
        suppression: Arc<WriteSuppression>,
        events: Sender<ControllerEvent>,
        quiet: Duration,
    ) -> Result<Self, SoundboardError> {
        let mut watcher = Self::detached(path, suppression, events, quiet)?;
        let notify_watcher = setup_file_watcher(path, watcher.signal_tx.clone())?;
        watcher._watcher = Some(notify_watcher);
        Ok(watcher)
    }

    /// Debounce thread only; raw changes come from [`Self::notify_changed`].
    fn detached(
        path: &Path,
        suppression: Arc<WriteSuppression>,
        events: Sender<ControllerEvent>,
        quiet: Duration,
    ) -> Result<Self, SoundboardError> {
        let (signal_tx, signal_rx) = mpsc::channel();

        let thread_handle = thread::Builder::new()
            .name("config-watcher".to_string())
            .spawn(move || run_debounce_loop(signal_rx, suppression, events, quiet))
            .map_err(|e| SoundboardError::WatcherSetup {
                path: path.to_path_buf(),
                reason: format!("failed to spawn watcher thread: {e}"),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            _watcher: None,
            signal_tx,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Feeds one raw change notification to the debouncer.
    #[cfg(test)]
    fn notify_changed(&self) {
        self.signal_tx.send(WatchSignal::Changed).ok();
    }

    /// Stops watching and waits for the debounce thread.
    pub fn shutdown(&mut self) {
        self._watcher = None;
        self.signal_tx.send(WatchSignal::Shutdown).ok();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Config watcher thread panicked");
            }
        }
    }
}

impl Drop for FileChangeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_debounce_loop(
    signal_rx: Receiver<WatchSignal>,
    suppression: Arc<WriteSuppression>,
    events: Sender<ControllerEvent>,
    quiet: Duration,
) {
    let mut debouncer = Debouncer::new(quiet);

    loop {
        let signal = match debouncer.time_left(Instant::now()) {
            Some(wait) => match signal_rx.recv_timeout(wait) {
                Ok(signal) => Some(signal),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match signal_rx.recv() {
                Ok(signal) => Some(signal),
                Err(_) => break,
            },
        };

        match signal {
            Some(WatchSignal::Changed) => {
                debouncer.on_change(Instant::now(), suppression.is_suppressed());
            }
            Some(WatchSignal::Shutdown) => break,
            None => {
                if debouncer.fire(Instant::now(), suppression.is_suppressed()) {
                    log::info!("Config file changed externally");
                    if events.send(ControllerEvent::ExternalChange).is_err() {
                        break;
                    }
                }
            }
        }
    }

    log::debug!("Config watcher stopped");
}

/// Watches the parent directory so replaced files (atomic saves, editors that
/// write a new inode) keep being observed.
fn setup_file_watcher(
    config_path: &Path,
    signal_tx: Sender<WatchSignal>,
) -> Result<RecommendedWatcher, SoundboardError> {
    let setup_err = |reason: String| SoundboardError::WatcherSetup {
        path: config_path.to_path_buf(),
        reason,
    };

    let file_name = config_path
        .file_name()
        .ok_or_else(|| setup_err("path has no file name".to_string()))?
        .to_os_string();
    let dir = match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
            let ours = event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()));
            if relevant && ours {
                signal_tx.send(WatchSignal::Changed).ok();
            }
        }
        Err(e) => log::warn!("Config watch error: {e}"),
    })
    .map_err(|e| setup_err(format!("failed to create file watcher: {e}")))?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| setup_err(format!("failed to watch {}: {e}", dir.display())))?;

    log::info!("Watching {} for external edits", config_path.display());
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, Configuration, CONFIG_FILE_NAME};
    use std::fs;

    const QUIET: Duration = Duration::from_millis(60);

    fn collect_for(rx: &Receiver<ControllerEvent>, window: Duration) -> Vec<ControllerEvent> {
        let deadline = Instant::now() + window;
        let mut events = Vec::new();
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(left) {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events
    }

    #[test]
    fn test_debouncer_resets_on_each_change() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        debouncer.on_change(start, false);
        debouncer.on_change(start + Duration::from_millis(150), false);

        assert!(!debouncer.fire(start + Duration::from_millis(250), false));
        assert!(debouncer.fire(start + Duration::from_millis(350), false));
        assert!(!debouncer.fire(start + Duration::from_millis(600), false));
    }

    #[test]
    fn test_debouncer_ignores_suppressed_changes() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        debouncer.on_change(start, true);

        assert_eq!(debouncer.time_left(start), None);
        assert!(!debouncer.fire(start + Duration::from_secs(1), false));
    }

    #[test]
    fn test_debouncer_drops_when_suppressed_at_fire_time() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        debouncer.on_change(start, false);

        assert!(!debouncer.fire(start + Duration::from_millis(300), true));
        assert_eq!(debouncer.time_left(start), None);
    }

    #[test]
    fn test_burst_produces_one_notification() {
        let tmp = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let watcher = FileChangeWatcher::detached(
            &tmp.path().join(CONFIG_FILE_NAME),
            Arc::new(WriteSuppression::new()),
            tx,
            QUIET,
        )
        .unwrap();

        for _ in 0..5 {
            watcher.notify_changed();
            thread::sleep(Duration::from_millis(10));
        }

        let events = collect_for(&rx, Duration::from_millis(400));
        assert_eq!(events, vec![ControllerEvent::ExternalChange]);
    }

    #[test]
    fn test_self_write_is_not_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::new(tmp.path().join(CONFIG_FILE_NAME));
        let (tx, rx) = mpsc::channel();
        let watcher =
            FileChangeWatcher::detached(store.path(), store.suppression(), tx, QUIET).unwrap();

        store.save(&Configuration::default()).unwrap();
        watcher.notify_changed();
        watcher.notify_changed();

        assert!(collect_for(&rx, Duration::from_millis(400)).is_empty());
    }

    #[test]
    fn test_external_edit_after_grace_is_reported_once() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::new(tmp.path().join(CONFIG_FILE_NAME))
            .with_grace(Duration::from_millis(50));
        let (tx, rx) = mpsc::channel();
        let watcher =
            FileChangeWatcher::detached(store.path(), store.suppression(), tx, QUIET).unwrap();

        store.save(&Configuration::default()).unwrap();
        watcher.notify_changed();
        thread::sleep(Duration::from_millis(150));

        // size, attributes and last-write events for one external save
        watcher.notify_changed();
        watcher.notify_changed();
        watcher.notify_changed();

        let events = collect_for(&rx, Duration::from_millis(400));
        assert_eq!(events, vec![ControllerEvent::ExternalChange]);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel();
        let mut watcher = FileChangeWatcher::detached(
            &tmp.path().join(CONFIG_FILE_NAME),
            Arc::new(WriteSuppression::new()),
            tx,
            QUIET,
        )
        .unwrap();

        watcher.shutdown();
        watcher.shutdown();
    }

    #[test]
    fn test_file_watcher_reports_external_write() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{}").unwrap();

        let (tx, rx) = mpsc::channel();
        let _watcher = FileChangeWatcher::with_quiet_period(
            &path,
            Arc::new(WriteSuppression::new()),
            tx,
            QUIET,
        )
        .unwrap();
        thread::sleep(Duration::from_millis(100));

        fs::write(&path, r#"{ "GridRows": 2 }"#).unwrap();

        let events = collect_for(&rx, Duration::from_millis(1500));
        assert_eq!(events, vec![ControllerEvent::ExternalChange]);
    }

    #[test]
    fn test_file_watcher_ignores_store_saves_and_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::new(tmp.path().join(CONFIG_FILE_NAME));
        store.save(&Configuration::default()).unwrap();
        thread::sleep(Duration::from_millis(200));

        let (tx, rx) = mpsc::channel();
        let _watcher = FileChangeWatcher::with_quiet_period(
            store.path(),
            store.suppression(),
            tx,
            QUIET,
        )
        .unwrap();
        thread::sleep(Duration::from_millis(100));

        store.save(&Configuration::with_examples()).unwrap();
        fs::write(tmp.path().join("notes.txt"), "unrelated").unwrap();

        assert!(collect_for(&rx, Duration::from_millis(600)).is_empty());
    }
}
