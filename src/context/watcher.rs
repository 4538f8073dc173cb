//! Documents directory watcher for hot reload.

use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::context::DocumentContext;

/// Watches the documents directory and reloads the shared context on change.
pub struct ContextWatcher {
    context: Arc<DocumentContext>,
}

impl ContextWatcher {
    pub fn new(context: Arc<DocumentContext>) -> Self {
        Self { context }
    }

    /// Start watching. The returned watcher must be kept alive; dropping it
    /// stops notifications.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let context = self.context.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::info!(paths = ?event.paths, "Document change detected, reloading context");
                        context.reload();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(self.context.dir(), RecursiveMode::NonRecursive)?;

        tracing::info!(dir = %self.context.dir().display(), "Context watcher started");
        Ok(watcher)
    }
}
