//! Markdown output for generated summaries.
//!
//! Every non-empty line of the summary becomes its own block under a `# {title}` heading.
//! Heading (`### `, `#### `) and bold (`**...**`) markers already use Markdown syntax and pass
//! through unchanged; consecutive list items stay in one list.

use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// File name of the comprehensive summary.
pub const COMPREHENSIVE_FILE_NAME: &str = "summary2page.md";
/// Title of the comprehensive summary document.
pub const COMPREHENSIVE_TITLE: &str = "2-Page Summary";
/// File name of the concise summary.
pub const CONCISE_FILE_NAME: &str = "summary1page.md";
/// Title of the concise summary document.
pub const CONCISE_TITLE: &str = "1-Page Summary";

/// Errors raised while writing summary documents.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Destination could not be created or written.
    #[error("Failed to write summary to {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Writes summaries as Markdown documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    /// Render `summary` under `title` and write it to `destination`, creating parent directories.
    pub fn render(&self, summary: &str, destination: &Path, title: &str) -> Result<(), RenderError> {
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(destination, to_markdown(summary, title)).map_err(|source| RenderError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %destination.display(), title, "Summary written");
        Ok(())
    }
}

/// Markdown body for `summary` headed by `title`.
pub fn to_markdown(summary: &str, title: &str) -> String {
    let mut document = format!("# {title}\n");
    let mut previous_was_item = false;

    for line in summary.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let is_item = is_list_item(line);
        if !(is_item && previous_was_item) {
            document.push('\n');
        }
        document.push_str(line);
        document.push('\n');
        previous_was_item = is_item;
    }
    document
}

fn is_list_item(line: &str) -> bool {
    line.starts_with("- ") || line.starts_with("* ")
}
