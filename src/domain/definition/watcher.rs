//! File system watcher that reloads the registry when definition documents change.

use crate::domain::definition::registry::{is_definition_document, DefinitionRegistry};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Keeps the OS watcher and the reload task alive; dropping it stops both.
pub struct DefinitionWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl DefinitionWatcher {
    /// Starts watching the registry's source directory. Must be called inside a tokio runtime.
    ///
    /// Bursts of events (editors write, rename and chmod in quick succession) are
    /// collapsed: after the first relevant event the task waits `debounce`, drains
    /// whatever else arrived and reloads once.
    pub fn spawn(registry: Arc<DefinitionRegistry>, debounce: Duration) -> Result<Self, notify::Error> {
        let (tx, mut rx) = mpsc::channel::<Event>(256);

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => warn!("Definition watcher error: {}", e),
            },
            Config::default(),
        )?;
        watcher.watch(registry.source_dir(), RecursiveMode::NonRecursive)?;
        info!("Watching {:?} for definition changes", registry.source_dir());

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !is_relevant(&event) {
                    continue;
                }
                debug!("Definition change detected: {:?}", event.paths);
                tokio::time::sleep(debounce).await;
                while rx.try_recv().is_ok() {}

                let registry = registry.clone();
                match tokio::task::spawn_blocking(move || registry.reload()).await {
                    Ok(Ok(snapshot)) => info!(
                        "Registry reloaded after file change ({} definitions)",
                        snapshot.len()
                    ),
                    Ok(Err(e)) => error!("Registry reload after file change failed: {}", e),
                    Err(e) => error!("Registry reload task failed: {}", e),
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for DefinitionWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn is_relevant(event: &Event) -> bool {
    let kind_matters = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    kind_matters && event.paths.iter().any(|p| is_definition_document(p))
}
