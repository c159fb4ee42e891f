//! Debounced Change Watcher - decides when to reconcile
//!
//! Watches the directory holding the settings file (so atomic replaces are
//! seen) and runs a small state machine over [`WatcherState`]:
//!
//! - startup: resolve and reconcile unconditionally
//! - qualifying event inside the debounce window: dropped
//! - resolved profile equal to the last applied one: dropped
//! - otherwise: record the profile and timestamp, then reconcile
//!
//! Events are handled one at a time; a reconciliation always finishes before
//! the next event is looked at.

use crate::appearance::ModeResolver;
use crate::reconcile::{ReconciliationOutcome, Reconciler};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use themer_common::{ProfileName, ThemerError, ThemerResult};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Filesystem notification, independent of the notify API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    /// Base name of the entry the event is about
    pub name: Option<OsString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    /// Closed after being opened for writing
    CloseWrite,
    /// Moved into the directory under this name
    MovedTo,
    Other,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: &Path) -> Self {
        Self {
            kind,
            name: path.file_name().map(OsStr::to_os_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Qualifying,
    Ignored,
}

/// Translate a notify event into zero or more [`FsEvent`]s
pub fn fs_events(event: &Event) -> Vec<FsEvent> {
    match event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => event
            .paths
            .iter()
            .map(|p| FsEvent::new(FsEventKind::CloseWrite, p))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .map(|p| FsEvent::new(FsEventKind::MovedTo, p))
            .collect(),
        // paths = [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .get(1)
            .map(|p| vec![FsEvent::new(FsEventKind::MovedTo, p)])
            .unwrap_or_default(),
        _ => event
            .paths
            .iter()
            .map(|p| FsEvent::new(FsEventKind::Other, p))
            .collect(),
    }
}

/// Only a write-close or a move-in of exactly the watched name qualifies
pub fn classify(event: &FsEvent, watched_name: &OsStr) -> EventClass {
    let relevant_kind = matches!(event.kind, FsEventKind::CloseWrite | FsEventKind::MovedTo);
    let same_name = event.name.as_deref() == Some(watched_name);
    if relevant_kind && same_name {
        EventClass::Qualifying
    } else {
        EventClass::Ignored
    }
}

/// The watcher's only state. Owned by the watch loop, never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    /// Intended target of the latest reconciliation, set before applying
    pub last_applied: Option<ProfileName>,
    /// When the latest switch was triggered by an event
    pub last_event: Option<Instant>,
}

impl WatcherState {
    pub fn within_debounce(&self, now: Instant, window: Duration) -> bool {
        self.last_event
            .map(|last| now.saturating_duration_since(last) < window)
            .unwrap_or(false)
    }

    pub fn is_current(&self, profile: &ProfileName) -> bool {
        self.last_applied.as_ref() == Some(profile)
    }
}

/// What happened to one qualifying event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Debounced,
    Unchanged(ProfileName),
    Applied(ReconciliationOutcome),
}

pub struct ChangeWatcher {
    resolver: ModeResolver,
    reconciler: Reconciler,
    path: PathBuf,
    file_name: OsString,
    window: Duration,
}

impl ChangeWatcher {
    pub fn new(resolver: ModeResolver, reconciler: Reconciler, path: PathBuf, window: Duration) -> ThemerResult<Self> {
        let file_name = path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| ThemerError::Watch {
                path: path.clone(),
                reason: "path has no file name".to_string(),
            })?;

        Ok(Self {
            resolver,
            reconciler,
            path,
            file_name,
            window,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn classify(&self, event: &FsEvent) -> EventClass {
        classify(event, &self.file_name)
    }

    /// Forced reconciliation at startup, no comparison with earlier state
    pub async fn start(&self, state: &mut WatcherState) -> ReconciliationOutcome {
        let profile = self.resolver.resolve().await;
        info!("Current theme detected. Setting '{}' profile...", profile);
        state.last_applied = Some(profile.clone());
        self.reconciler.reconcile(&profile).await
    }

    /// Run one qualifying event through the debounce and change gates
    pub async fn handle_event(&self, state: &mut WatcherState, now: Instant) -> EventOutcome {
        if state.within_debounce(now, self.window) {
            debug!("Change event inside debounce window, ignored");
            return EventOutcome::Debounced;
        }

        let profile = self.resolver.resolve().await;
        if state.is_current(&profile) {
            debug!("Profile '{}' already applied, nothing to do", profile);
            return EventOutcome::Unchanged(profile);
        }

        // Recorded before applying so overlapping events are suppressed
        state.last_event = Some(now);
        state.last_applied = Some(profile.clone());
        info!("Theme changed. Switching to '{}' profile...", profile);
        EventOutcome::Applied(self.reconciler.reconcile(&profile).await)
    }

    /// Subscribe to the watched directory and run until `shutdown` resolves.
    ///
    /// Failing to establish the watch is the one fatal error.
    pub async fn run<F>(&self, shutdown: F) -> ThemerResult<WatcherState>
    where
        F: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = self.subscribe(tx)?;
        info!("Watching {} for changes...", self.path.display());

        let state = self.run_events(rx, shutdown).await;
        drop(watcher);
        Ok(state)
    }

    /// Startup reconciliation followed by the serial event loop
    pub async fn run_events<F>(&self, mut rx: mpsc::UnboundedReceiver<FsEvent>, shutdown: F) -> WatcherState
    where
        F: Future<Output = ()>,
    {
        let mut state = WatcherState::default();
        self.start(&mut state).await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                event = rx.recv() => {
                    let Some(event) = event else {
                        warn!("Change event stream closed");
                        break;
                    };
                    if self.classify(&event) == EventClass::Ignored {
                        continue;
                    }
                    self.handle_event(&mut state, Instant::now()).await;
                }
            }
        }

        info!("Shutting down...");
        state
    }

    fn subscribe(&self, tx: mpsc::UnboundedSender<FsEvent>) -> ThemerResult<RecommendedWatcher> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let watch_error = |e: notify::Error| ThemerError::Watch {
            path: dir.clone(),
            reason: e.to_string(),
        };

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                for fs_event in fs_events(&event) {
                    let _ = tx.send(fs_event);
                }
            }
            Err(e) => warn!("Watch error: {:?}", e),
        })
        .map_err(watch_error)?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::CreateKind;

    fn watched() -> &'static OsStr {
        OsStr::new("kdeglobals")
    }

    #[test]
    fn test_close_write_on_watched_file_qualifies() {
        let event = FsEvent::new(FsEventKind::CloseWrite, Path::new("/home/u/.config/kdeglobals"));
        assert_eq!(classify(&event, watched()), EventClass::Qualifying);
    }

    #[test]
    fn test_moved_to_qualifies() {
        let event = FsEvent::new(FsEventKind::MovedTo, Path::new("/home/u/.config/kdeglobals"));
        assert_eq!(classify(&event, watched()), EventClass::Qualifying);
    }

    #[test]
    fn test_other_files_are_ignored() {
        for name in ["kdeglobals.lock", "kdeglobalsXYZ.tmp", "konsolerc", "kdeglobal"] {
            let event = FsEvent::new(FsEventKind::CloseWrite, &Path::new("/cfg").join(name));
            assert_eq!(classify(&event, watched()), EventClass::Ignored, "{}", name);
        }
    }

    #[test]
    fn test_other_kinds_are_ignored() {
        let event = FsEvent::new(FsEventKind::Other, Path::new("/cfg/kdeglobals"));
        assert_eq!(classify(&event, watched()), EventClass::Ignored);

        let nameless = FsEvent {
            kind: FsEventKind::CloseWrite,
            name: None,
        };
        assert_eq!(classify(&nameless, watched()), EventClass::Ignored);
    }

    #[test]
    fn test_notify_close_write_translation() {
        let event = Event::new(EventKind::Access(AccessKind::Close(AccessMode::Write)))
            .add_path(PathBuf::from("/cfg/kdeglobals"));
        assert_eq!(
            fs_events(&event),
            vec![FsEvent::new(FsEventKind::CloseWrite, Path::new("/cfg/kdeglobals"))]
        );
    }

    #[test]
    fn test_notify_rename_both_uses_destination() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/cfg/kdeglobals.XbQ123"))
            .add_path(PathBuf::from("/cfg/kdeglobals"));
        let events = fs_events(&event);
        assert_eq!(events.len(), 1);
        assert_eq!(classify(&events[0], watched()), EventClass::Qualifying);
    }

    #[test]
    fn test_notify_rename_from_is_ignored() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(PathBuf::from("/cfg/kdeglobals"));
        let events = fs_events(&event);
        assert!(events.iter().all(|e| classify(e, watched()) == EventClass::Ignored));
    }

    #[test]
    fn test_notify_create_is_ignored() {
        let event = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/cfg/kdeglobals"));
        assert_eq!(classify(&fs_events(&event)[0], watched()), EventClass::Ignored);
    }

    #[test]
    fn test_fresh_state_is_never_debounced() {
        let state = WatcherState::default();
        assert!(!state.within_debounce(Instant::now(), Duration::from_millis(500)));
    }

    #[test]
    fn test_debounce_window_edges() {
        let start = Instant::now();
        let state = WatcherState {
            last_applied: None,
            last_event: Some(start),
        };
        let window = Duration::from_millis(500);
        assert!(state.within_debounce(start + Duration::from_millis(100), window));
        assert!(!state.within_debounce(start + Duration::from_millis(500), window));
        assert!(!state.within_debounce(start + Duration::from_millis(900), window));
    }

    #[test]
    fn test_is_current() {
        let mut state = WatcherState::default();
        assert!(!state.is_current(&ProfileName::new("Light")));
        state.last_applied = Some(ProfileName::new("Light"));
        assert!(state.is_current(&ProfileName::new("Light")));
        assert!(!state.is_current(&ProfileName::new("Dark")));
    }
}
