//! Source document loading.
//!
//! Every non-empty `*.txt` file in the documents directory becomes one
//! `Source: <name>` section. Sections are taken in file-name order until the
//! character budget is spent; the section that crosses the budget is cut
//! short and loading stops there.

use std::fs;
use std::path::{Path, PathBuf};

/// Separator placed between sections.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Build the combined context string for `dir`.
///
/// A missing or unreadable directory yields an empty context.
pub fn load_context_documents(dir: &Path, max_chars: usize) -> String {
    let mut paths = match text_files(dir) {
        Ok(paths) => paths,
        Err(e) => {
            if dir.exists() {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to list documents");
            }
            return String::new();
        }
    };
    paths.sort();

    let mut collected: Vec<String> = Vec::new();
    let mut total_chars = 0usize;

    for path in paths {
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                continue;
            }
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let section = format!("Source: {}\n{}", name, content);
        let section_chars = section.chars().count();

        if total_chars + section_chars > max_chars {
            let remaining = max_chars.saturating_sub(total_chars);
            if remaining == 0 {
                break;
            }
            collected.push(section.chars().take(remaining).collect());
            total_chars += remaining;
            break;
        }

        collected.push(section);
        total_chars += section_chars;

        if total_chars >= max_chars {
            break;
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        sections = collected.len(),
        chars = total_chars,
        "Document context assembled"
    );

    collected.join(SECTION_SEPARATOR)
}

fn text_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_txt = path.extension().map(|ext| ext == "txt").unwrap_or(false);
        if is_txt && path.is_file() {
            out.push(path);
        }
    }
    Ok(out)
}
