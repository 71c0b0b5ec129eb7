//! Diagram discovery and link insertion for documents.
//!
//! This module handles:
//! - Finding Mermaid blocks in Markdown (via comrak) and rendered HTML
//! - Inserting the edit/view links right after each block
//!
//! Annotators never encode anything themselves; they only locate blocks and
//! splice in what they are given.

mod html;
mod markdown;
mod types;

pub use html::HtmlAnnotator;
pub use markdown::MarkdownAnnotator;
pub use types::{DiagramBlock, Insertions};

use crate::config::LinkSettings;
use crate::links::DiagramLinks;

/// Fence/class language that marks a Mermaid diagram.
pub const MERMAID_LANGUAGE: &str = "mermaid";

/// Host document that can be scanned for diagrams and annotated with links.
pub trait DocumentAnnotator {
    /// Diagram blocks in document order.
    fn find_diagram_blocks(&self) -> Vec<DiagramBlock>;

    /// Insert the link element as the next sibling of `block`.
    fn insert_links(&mut self, block: &DiagramBlock, links: &DiagramLinks, settings: &LinkSettings);

    /// Consume the annotator and return the annotated document.
    fn finish(self) -> String;
}

/// Input document kind.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// Pick from the file extension (`.html`/`.htm` is HTML, anything else Markdown)
    #[default]
    Auto,
    Markdown,
    Html,
}

impl DocumentFormat {
    /// Resolve `Auto` against a file path. Without a path, Markdown is assumed.
    pub fn resolve(self, path: Option<&std::path::Path>) -> Self {
        match self {
            Self::Auto => {
                let is_html = path
                    .and_then(|p| p.extension())
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "html" | "htm"));
                if is_html { Self::Html } else { Self::Markdown }
            }
            other => other,
        }
    }
}
