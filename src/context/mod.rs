//! Source document context subsystem.
//!
//! # Data Flow
//! ```text
//! documents dir (*.txt)
//!     → loader.rs (ordered sections, character budget)
//!     → DocumentContext (ArcSwap<String>)
//!     → chat handler prepends "Source documents:" system message
//!
//! On directory change (optional):
//!     watcher.rs detects change
//!     → loader.rs rebuilds context
//!     → atomic swap, in-flight requests keep the old Arc
//! ```

pub mod loader;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

pub use loader::load_context_documents;
pub use watcher::ContextWatcher;

/// Shared, hot-swappable document context.
#[derive(Debug)]
pub struct DocumentContext {
    dir: PathBuf,
    max_chars: usize,
    current: ArcSwap<String>,
}

impl DocumentContext {
    /// Load the context from `dir` once.
    pub fn load(dir: impl AsRef<Path>, max_chars: usize) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let initial = load_context_documents(&dir, max_chars);
        tracing::info!(
            dir = %dir.display(),
            chars = initial.chars().count(),
            "Document context loaded"
        );
        Self {
            dir,
            max_chars,
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// A fixed context, not backed by a directory.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            dir: PathBuf::new(),
            max_chars: usize::MAX,
            current: ArcSwap::from_pointee(text.into()),
        }
    }

    /// The context as of now.
    pub fn current(&self) -> Arc<String> {
        self.current.load_full()
    }

    /// Rebuild from disk and swap in the result.
    pub fn reload(&self) {
        if self.dir.as_os_str().is_empty() {
            return;
        }
        if !self.dir.is_dir() {
            tracing::warn!(dir = %self.dir.display(), "Documents directory missing, keeping previous context");
            return;
        }
        let fresh = load_context_documents(&self.dir, self.max_chars);
        let chars = fresh.chars().count();
        self.current.store(Arc::new(fresh));
        tracing::info!(dir = %self.dir.display(), chars, "Document context reloaded");
    }

    /// Directory the context is read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_picks_up_new_documents() {
        let dir = tempfile::tempdir().unwrap();
        let context = DocumentContext::load(dir.path(), 1000);
        assert!(context.current().is_empty());

        std::fs::write(dir.path().join("hours.txt"), "Open 8am-4pm").unwrap();
        let before = context.current();
        context.reload();

        assert_eq!(before.as_str(), "");
        assert_eq!(context.current().as_str(), "Source: hours.txt\nOpen 8am-4pm");
    }

    #[test]
    fn reload_keeps_context_when_directory_disappears() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hours.txt"), "Open 8am-4pm").unwrap();
        let path = dir.path().to_path_buf();
        let context = DocumentContext::load(&path, 1000);

        drop(dir);
        context.reload();
        assert_eq!(context.current().as_str(), "Source: hours.txt\nOpen 8am-4pm");
    }

    #[test]
    fn fixed_context_ignores_reload() {
        let context = DocumentContext::fixed("static");
        context.reload();
        assert_eq!(context.current().as_str(), "static");
    }
}
