//! Debounced filesystem watch over the daemon's YAML config, driving the
//! `daemon.config.reload` path. Follows the teacher's
//! `sx9-dsl-engine::file_watcher` pattern (`notify::recommended_watcher`
//! feeding an mpsc channel), matching `cyberred-output::PluginWatcher`'s
//! manual debounce layer on top of it.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

pub const DEBOUNCE: Duration = Duration::from_millis(500);

pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    events: mpsc::Receiver<Event>,
    pending_since: Option<Instant>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> notify::Result<Self> {
        let path = path.into();
        let (tx, rx) = mpsc::channel(64);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        })?;
        let watch_target: &Path = path.parent().unwrap_or(&path);
        watcher.watch(watch_target, RecursiveMode::NonRecursive)?;

        Ok(Self {
            path,
            _watcher: watcher,
            events: rx,
            pending_since: None,
        })
    }

    /// Resolves once a debounced change to the watched config file has
    /// settled. Cancel-safe: intended to live inside a `tokio::select!` in
    /// the daemon's main loop alongside signal handling.
    pub async fn changed(&mut self) {
        loop {
            if let Some(since) = self.pending_since {
                let elapsed = since.elapsed();
                if elapsed >= DEBOUNCE {
                    self.pending_since = None;
                    return;
                }
                tokio::select! {
                    Some(event) = self.events.recv() => self.note_event(event),
                    _ = tokio::time::sleep(DEBOUNCE - elapsed) => {}
                }
            } else {
                match self.events.recv().await {
                    Some(event) => self.note_event(event),
                    None => {
                        warn!("config watcher channel closed, disabling hot reload");
                        loop {
                            tokio::time::sleep(Duration::from_secs(3600)).await;
                        }
                    }
                }
            }
        }
    }

    fn note_event(&mut self, event: Event) {
        if event.paths.iter().any(|p| p == &self.path) {
            self.pending_since = Some(Instant::now());
        }
    }
}
