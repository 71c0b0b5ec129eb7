// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. config::SettingsStore)
    clippy::module_name_repetitions
)]

//! # mermaid-links
//!
//! Adds "Edit" and "Full Screen" links to Mermaid diagrams, pointing at
//! [mermaid.live](https://mermaid.live).
//!
//! Each diagram's source is packed into the `#pako:` URL fragment that
//! mermaid.live reads, so the links open the exact diagram without any
//! server round-trip.
//!
//! ## Modules
//!
//! - [`encoder`]: Diagram source to mermaid.live token, and back
//! - [`links`]: Edit and view URLs built from a token
//! - [`document`]: Finding diagram blocks in Markdown and HTML, inserting links
//! - [`annotate`]: Runs the encoder over every block of a document
//! - [`config`]: Link label settings and their store
//!
//! ## Example
//!
//! ```
//! use mermaid_links::annotate::annotate_markdown;
//! use mermaid_links::config::LinkSettings;
//!
//! let (out, report) = annotate_markdown("```mermaid\ngraph TD; A-->B;\n```\n", &LinkSettings::default());
//! assert_eq!(report.annotated, 1);
//! assert!(out.contains("[Full Screen](https://mermaid.live/view#pako:"));
//! ```

pub mod annotate;
pub mod config;
pub mod document;
pub mod encoder;
pub mod links;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::annotate::{AnnotationReport, annotate, annotate_html, annotate_markdown};
    pub use crate::config::{LinkSettings, SettingsStore};
    pub use crate::document::{DocumentAnnotator, HtmlAnnotator, MarkdownAnnotator};
    pub use crate::encoder::{DiagramPayload, decode, encode};
    pub use crate::links::DiagramLinks;
}
