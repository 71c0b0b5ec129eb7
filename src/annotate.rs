//! Drives an annotator: find every diagram, encode it, insert its links.

use tracing::{debug, warn};

use crate::config::LinkSettings;
use crate::document::{DiagramBlock, DocumentAnnotator, HtmlAnnotator, MarkdownAnnotator};
use crate::links::DiagramLinks;

/// What happened to the diagram blocks of one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Blocks that received links.
    pub annotated: usize,
    /// Blocks with no diagram text.
    pub skipped_empty: usize,
    /// Blocks whose source failed to encode.
    pub failed: usize,
}

impl AnnotationReport {
    pub const fn total(&self) -> usize {
        self.annotated + self.skipped_empty + self.failed
    }
}

/// Add edit/view links after every diagram block the annotator finds.
///
/// Empty blocks are left alone. A block that fails to encode is logged and
/// skipped; the rest of the document is still annotated.
pub fn annotate<A: DocumentAnnotator>(mut annotator: A, settings: &LinkSettings) -> (String, AnnotationReport) {
    let mut report = AnnotationReport::default();
    for block in annotator.find_diagram_blocks() {
        if block.is_empty() {
            debug!(index = block.index, "skipping empty diagram block");
            report.skipped_empty += 1;
            continue;
        }
        match DiagramLinks::from_source(&block.source) {
            Ok(links) => {
                debug!(index = block.index, token_len = links.token().len(), "annotating diagram block");
                annotator.insert_links(&block, &links, settings);
                report.annotated += 1;
            }
            Err(err) => {
                warn!(index = block.index, error = %err, "failed to encode diagram block");
                report.failed += 1;
            }
        }
    }
    (annotator.finish(), report)
}

/// Annotate a Markdown document.
pub fn annotate_markdown(source: &str, settings: &LinkSettings) -> (String, AnnotationReport) {
    annotate(MarkdownAnnotator::new(source), settings)
}

/// Annotate a rendered HTML document.
pub fn annotate_html(source: &str, settings: &LinkSettings) -> (String, AnnotationReport) {
    annotate(HtmlAnnotator::new(source), settings)
}

/// Edit/view links for every non-empty diagram block, without touching the document.
pub fn collect_links<A: DocumentAnnotator>(annotator: &A) -> Vec<(DiagramBlock, DiagramLinks)> {
    annotator
        .find_diagram_blocks()
        .into_iter()
        .filter(|block| !block.is_empty())
        .filter_map(|block| match DiagramLinks::from_source(&block.source) {
            Ok(links) => Some((block, links)),
            Err(err) => {
                warn!(index = block.index, error = %err, "failed to encode diagram block");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder;

    /// Fixed blocks with a log of what was inserted.
    struct RecordingAnnotator {
        blocks: Vec<DiagramBlock>,
        inserted: Vec<(usize, String)>,
    }

    impl RecordingAnnotator {
        fn new(sources: &[&str]) -> Self {
            let blocks = sources
                .iter()
                .enumerate()
                .map(|(index, source)| DiagramBlock {
                    index,
                    source: (*source).to_string(),
                    insert_at: 0,
                    prefix: String::new(),
                    closing_fence: None,
                })
                .collect();
            Self {
                blocks,
                inserted: Vec::new(),
            }
        }
    }

    impl DocumentAnnotator for RecordingAnnotator {
        fn find_diagram_blocks(&self) -> Vec<DiagramBlock> {
            self.blocks.clone()
        }

        fn insert_links(&mut self, block: &DiagramBlock, links: &DiagramLinks, settings: &LinkSettings) {
            self.inserted.push((
                block.index,
                format!("{}={}", settings.edit_link_text, links.edit_url()),
            ));
        }

        fn finish(self) -> String {
            self.inserted
                .iter()
                .map(|(index, text)| format!("{index}:{text}"))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    #[test]
    fn test_annotate_skips_empty_blocks() {
        let annotator = RecordingAnnotator::new(&["graph TD", "", "pie"]);
        let (out, report) = annotate(annotator, &LinkSettings::default());
        assert_eq!(
            report,
            AnnotationReport {
                annotated: 2,
                skipped_empty: 1,
                failed: 0
            }
        );
        assert_eq!(report.total(), 3);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0:Edit=https://mermaid.live/edit#pako:"));
        assert!(lines[1].starts_with("2:Edit="));
    }

    #[test]
    fn test_annotate_passes_settings_through() {
        let settings = LinkSettings {
            edit_link_text: "Open".to_string(),
            ..LinkSettings::default()
        };
        let (out, _) = annotate(RecordingAnnotator::new(&["pie"]), &settings);
        let token = encoder::encode("pie").unwrap();
        assert_eq!(out, format!("0:Open=https://mermaid.live/edit#pako:{token}"));
    }

    #[test]
    fn test_annotate_markdown_end_to_end() {
        let md = "# Doc\n\n```mermaid\ngraph TD; A-->B;\n```\n\n```mermaid\n```\n";
        let (out, report) = annotate_markdown(md, &LinkSettings::default());
        assert_eq!(report.annotated, 1);
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(out.matches("](https://mermaid.live/edit#pako:").count(), 1);
        assert_eq!(out.matches("](https://mermaid.live/view#pako:").count(), 1);
    }

    #[test]
    fn test_annotate_html_end_to_end() {
        let html = "<pre><code class=\"language-mermaid\">graph TD</code></pre>";
        let (out, report) = annotate_html(html, &LinkSettings::default());
        assert_eq!(report.annotated, 1);
        assert!(out.contains("class=\"mermaid-edit-link\""));
        assert!(out.contains(">Full Screen</a>"));
    }

    #[test]
    fn test_collect_links_decodes_back_to_sources() {
        let annotator = MarkdownAnnotator::new("```mermaid\nfirst\n```\n\n```mermaid\n```\n\n```mermaid\nsecond\n```\n");
        let collected = collect_links(&annotator);
        let decoded: Vec<_> = collected
            .iter()
            .map(|(block, links)| {
                let fragment = links.edit_url().split_once('#').unwrap().1;
                (block.index, encoder::decode(fragment).unwrap().code)
            })
            .collect();
        assert_eq!(
            decoded,
            vec![(0, "first\n".to_string()), (2, "second\n".to_string())]
        );
    }
}
