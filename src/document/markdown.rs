//! Markdown diagram discovery with comrak.

use std::collections::HashSet;

use comrak::nodes::NodeValue;
use comrak::{Arena, Options, parse_document};

use super::types::{DiagramBlock, Insertions};
use super::{DocumentAnnotator, MERMAID_LANGUAGE};
use crate::config::LinkSettings;
use crate::links::DiagramLinks;

/// Annotates fenced ```` ```mermaid ```` blocks in a Markdown source.
///
/// The links go in a paragraph directly after the closing fence:
///
/// ```text
/// [Edit](https://mermaid.live/edit#pako:...) [Full Screen](https://mermaid.live/view#pako:...)
/// ```
///
/// # Example
///
/// ```
/// use mermaid_links::config::LinkSettings;
/// use mermaid_links::document::{DocumentAnnotator, MarkdownAnnotator};
/// use mermaid_links::links::DiagramLinks;
///
/// let mut annotator = MarkdownAnnotator::new("```mermaid\ngraph TD; A-->B;\n```\n");
/// let blocks = annotator.find_diagram_blocks();
/// assert_eq!(blocks.len(), 1);
///
/// let links = DiagramLinks::from_source(&blocks[0].source).unwrap();
/// annotator.insert_links(&blocks[0], &links, &LinkSettings::default());
/// assert!(annotator.finish().contains("[Edit](https://mermaid.live/edit#pako:"));
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownAnnotator {
    source: String,
    line_starts: Vec<usize>,
    insertions: Insertions,
}

impl MarkdownAnnotator {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
            insertions: Insertions::default(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte offset of the line after 1-based `line`.
    fn offset_after_line(&self, line: usize) -> usize {
        self.line_starts
            .get(line)
            .copied()
            .unwrap_or(self.source.len())
    }

    /// Block-quote markers and indentation in front of the opening fence.
    fn container_prefix(&self, line: usize, column: usize) -> String {
        let Some(&start) = self.line_starts.get(line.saturating_sub(1)) else {
            return String::new();
        };
        let text = &self.source[start..];
        text.get(..column.saturating_sub(1))
            .unwrap_or("")
            .chars()
            .map(|c| if c == '>' || c == '\t' { c } else { ' ' })
            .collect()
    }

    /// Text of 1-based `line` without its line ending.
    fn line_text(&self, line: usize) -> &str {
        let Some(&start) = self.line_starts.get(line.saturating_sub(1)) else {
            return "";
        };
        let end = self.offset_after_line(line).max(start);
        self.source[start..end].trim_end_matches(['\n', '\r'])
    }

    /// `\r\n` for CRLF documents, `\n` otherwise.
    fn line_ending(&self, offset: usize) -> &'static str {
        let before = self.source.get(..offset).unwrap_or(&self.source);
        let crlf = if before.ends_with('\n') {
            before.ends_with("\r\n")
        } else {
            self.source.contains("\r\n")
        };
        if crlf { "\r\n" } else { "\n" }
    }

    fn next_line_has_content(&self, offset: usize) -> bool {
        self.source
            .get(offset..)
            .and_then(|rest| rest.lines().next())
            .is_some_and(|line| {
                !line
                    .trim_start_matches(|c: char| c == '>' || c.is_whitespace())
                    .is_empty()
            })
    }
}

impl DocumentAnnotator for MarkdownAnnotator {
    fn find_diagram_blocks(&self) -> Vec<DiagramBlock> {
        let arena = Arena::new();
        let mut options = Options::default();
        configure_options(&mut options);
        let root = parse_document(&arena, &self.source, &options);

        // comrak numbers lines from the end of the front matter.
        let line_offset = root.first_child().map_or(0, |node| match &node.data.borrow().value {
            NodeValue::FrontMatter(text) => text.matches('\n').count(),
            _ => 0,
        });
        // Lines where some block begins. A fence that is left open ends on the
        // line that closes its container, and that line starts another block.
        let block_starts: HashSet<usize> = root
            .descendants()
            .filter_map(|node| {
                let data = node.data.borrow();
                let counted =
                    data.value.block() && !matches!(data.value, NodeValue::FrontMatter(_));
                counted.then_some(data.sourcepos.start.line + line_offset)
            })
            .collect();

        let mut blocks = Vec::new();
        for node in root.descendants() {
            let data = node.data.borrow();
            let NodeValue::CodeBlock(code_block) = &data.value else {
                continue;
            };
            if !code_block.fenced || !is_mermaid_info(&code_block.info) {
                continue;
            }
            let start_line = data.sourcepos.start.line + line_offset;
            let end_line = data.sourcepos.end.line + line_offset;
            let prefix = self.container_prefix(start_line, data.sourcepos.start.column);
            let fence_char = char::from(code_block.fence_char);
            let last_content_line = start_line + code_block.literal.lines().count();
            let closed = end_line == last_content_line + 1
                && !block_starts.contains(&end_line)
                && is_closing_fence(
                    strip_container(self.line_text(end_line), &prefix),
                    fence_char,
                    code_block.fence_length,
                );
            // Links placed inside an open fence would become diagram text.
            let (last_line, closing_fence) = if closed {
                (end_line, None)
            } else {
                let fence = fence_char.to_string().repeat(code_block.fence_length);
                (last_content_line, Some(format!("{prefix}{fence}")))
            };
            blocks.push(DiagramBlock {
                index: blocks.len(),
                source: code_block.literal.clone(),
                insert_at: self.offset_after_line(last_line),
                prefix,
                closing_fence,
            });
        }
        blocks
    }

    fn insert_links(&mut self, block: &DiagramBlock, links: &DiagramLinks, settings: &LinkSettings) {
        let at_line_start = self
            .source
            .get(..block.insert_at)
            .is_none_or(|before| before.is_empty() || before.ends_with('\n'));
        let blank = block.prefix.trim_end();
        let eol = self.line_ending(block.insert_at);

        let mut text = String::new();
        if !at_line_start {
            text.push_str(eol);
        }
        if let Some(fence) = &block.closing_fence {
            text.push_str(fence);
            text.push_str(eol);
        }
        text.push_str(blank);
        text.push_str(eol);
        text.push_str(&block.prefix);
        text.push_str(&links_markdown(links, settings));
        text.push_str(eol);
        // Keep following text from being read as a lazy continuation.
        if self.next_line_has_content(block.insert_at) {
            text.push_str(blank);
            text.push_str(eol);
        }
        self.insertions.push(block.insert_at, text);
    }

    fn finish(self) -> String {
        self.insertions.apply(&self.source)
    }
}

fn configure_options(options: &mut Options) {
    // Match GitHub/Obsidian parsing so fences inside tables, footnotes and
    // front matter are classified the same way.
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options.extension.front_matter_delimiter = Some("---".to_string());
}

/// Drop the block-quote markers and indentation that `prefix` stands for.
fn strip_container<'a>(line: &'a str, prefix: &str) -> &'a str {
    let mut rest = line;
    for _ in prefix.chars() {
        match rest.strip_prefix(|c: char| c == '>' || c.is_whitespace()) {
            Some(next) => rest = next,
            None => break,
        }
    }
    rest
}

fn is_closing_fence(line: &str, fence_char: char, fence_length: usize) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let rest = trimmed.trim_start_matches(fence_char);
    trimmed.len() - rest.len() >= fence_length && rest.trim().is_empty()
}

fn is_mermaid_info(info: &str) -> bool {
    info.split_whitespace().next() == Some(MERMAID_LANGUAGE)
}

fn links_markdown(links: &DiagramLinks, settings: &LinkSettings) -> String {
    format!(
        "[{}]({}) [{}]({})",
        escape_link_text(&settings.edit_link_text),
        links.edit_url(),
        escape_link_text(&settings.fullscreen_link_text),
        links.view_url(),
    )
}

fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']' | '*' | '_' | '`' | '<' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
