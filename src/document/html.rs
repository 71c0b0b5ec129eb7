//! Diagram discovery in rendered HTML.
//!
//! Renderers emit Mermaid fences as `<pre><code class="language-mermaid">`.
//! The link container is placed right after the closing `</pre>`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::{DiagramBlock, Insertions};
use super::{DocumentAnnotator, MERMAID_LANGUAGE};
use crate::config::LinkSettings;
use crate::links::DiagramLinks;

static PRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre\b[^>]*>(.*?)</pre\s*>").expect("valid pre regex"));
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<code\b([^>]*)>(.*?)</code\s*>").expect("valid code regex")
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid class regex")
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid entity regex")
});

/// Annotates `<pre><code class="language-mermaid">` elements in an HTML page.
#[derive(Debug, Clone)]
pub struct HtmlAnnotator {
    source: String,
    insertions: Insertions,
}

impl HtmlAnnotator {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            insertions: Insertions::default(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl DocumentAnnotator for HtmlAnnotator {
    fn find_diagram_blocks(&self) -> Vec<DiagramBlock> {
        // Each match of `pre > code.language-mermaid`; links go after the `<pre>`.
        PRE_RE
            .captures_iter(&self.source)
            .filter_map(|pre| Some((pre.get(0)?.end(), pre.get(1)?.as_str())))
            .flat_map(|(insert_at, body)| {
                CODE_RE
                    .captures_iter(body)
                    .filter(|code| {
                        code.get(1)
                            .is_some_and(|attrs| has_mermaid_class(attrs.as_str()))
                    })
                    .map(move |code| (insert_at, code.get(2).map_or("", |m| m.as_str())))
            })
            .enumerate()
            .map(|(index, (insert_at, body))| DiagramBlock {
                index,
                source: text_content(body),
                insert_at,
                prefix: String::new(),
                closing_fence: None,
            })
            .collect()
    }

    fn insert_links(&mut self, block: &DiagramBlock, links: &DiagramLinks, settings: &LinkSettings) {
        self.insertions
            .push(block.insert_at, links_html(links, settings));
    }

    fn finish(self) -> String {
        self.insertions.apply(&self.source)
    }
}

fn has_mermaid_class(attrs: &str) -> bool {
    let wanted = format!("language-{MERMAID_LANGUAGE}");
    CLASS_RE.captures(attrs).is_some_and(|caps| {
        let value = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        value.split_whitespace().any(|class| class == wanted)
    })
}

/// The text a browser would report for the element body: tags dropped and
/// character references decoded.
fn text_content(body: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
    decode_entities(&TAG_RE.replace_all(body, ""))
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            decode_entity(name).map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn links_html(links: &DiagramLinks, settings: &LinkSettings) -> String {
    format!(
        concat!(
            r#"<div class="mermaid-links" style="text-align: right; margin-top: 5px;">"#,
            r#"<a href="{edit}" target="_blank" class="mermaid-edit-link" style="margin-right: 10px;">{edit_text}</a>"#,
            r#"<a href="{view}" target="_blank" class="mermaid-fullscreen-link">{view_text}</a>"#,
            "</div>"
        ),
        edit = escape_html(links.edit_url()),
        edit_text = escape_html(&settings.edit_link_text),
        view = escape_html(links.view_url()),
        view_text = escape_html(&settings.fullscreen_link_text),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotate_all(source: &str, settings: &LinkSettings) -> String {
        let mut annotator = HtmlAnnotator::new(source);
        for block in annotator.find_diagram_blocks() {
            let links = DiagramLinks::from_source(&block.source).unwrap();
            annotator.insert_links(&block, &links, settings);
        }
        annotator.finish()
    }

    #[test]
    fn test_find_language_mermaid_block() {
        let html = "<p>Intro</p>\n<pre><code class=\"language-mermaid\">graph TD; A--&gt;B;\n</code></pre>\n<p>After</p>";
        let blocks = HtmlAnnotator::new(html).find_diagram_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "graph TD; A-->B;\n");
        assert_eq!(&html[blocks[0].insert_at..], "\n<p>After</p>");
    }

    #[test]
    fn test_matches_comrak_html_output() {
        let md = "```mermaid\ngraph TD; A-->B;\n```\n\n```rust\nfn main() {}\n```\n";
        let html = comrak::markdown_to_html(md, &comrak::Options::default());
        let blocks = HtmlAnnotator::new(html).find_diagram_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "graph TD; A-->B;\n");
    }

    #[test]
    fn test_class_list_and_quotes() {
        let html = "<pre class=\"x\"><code class='hljs language-mermaid extra'>pie</code></pre>\
                    <pre><code class=language-mermaid>flow</code></pre>\
                    <pre><code class=\"language-mermaidx\">no</code></pre>\
                    <pre><code>plain</code></pre>";
        let blocks = HtmlAnnotator::new(html).find_diagram_blocks();
        let sources: Vec<_> = blocks.iter().map(|b| (b.index, b.source.as_str())).collect();
        assert_eq!(sources, vec![(0, "pie"), (1, "flow")]);
    }

    #[test]
    fn test_block_does_not_run_into_next_pre() {
        let html = "<pre><code class=\"language-mermaid\">a</code>x</pre><p>text</p><pre><code>b</code></pre>";
        let blocks = HtmlAnnotator::new(html).find_diagram_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "a");
        assert_eq!(&html[..blocks[0].insert_at], "<pre><code class=\"language-mermaid\">a</code>x</pre>");

        let out = annotate_all(html, &LinkSettings::default());
        assert!(out.starts_with("<pre><code class=\"language-mermaid\">a</code>x</pre><div class=\"mermaid-links\""));
        assert!(out.ends_with("</div><p>text</p><pre><code>b</code></pre>"), "got {out:?}");
    }

    #[test]
    fn test_plain_pre_followed_by_mermaid_pre() {
        let html = "<pre><code>x</code></pre>\n<pre><code class=\"language-mermaid\">pie</code></pre>";
        let blocks = HtmlAnnotator::new(html).find_diagram_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "pie");
        assert_eq!(blocks[0].insert_at, html.len());
    }

    #[test]
    fn test_code_outside_pre_is_ignored() {
        let html = "<p><code class=\"language-mermaid\">inline</code></p>";
        assert!(HtmlAnnotator::new(html).find_diagram_blocks().is_empty());
    }

    #[test]
    fn test_only_class_attribute_counts() {
        let html = "<pre><code data-class=\"language-mermaid\">a</code></pre>\
                    <pre><code data-x=\"1\" class=\"language-mermaid\">b</code></pre>\
                    <pre><code\tclass=\"language-mermaid\">c</code></pre>";
        let blocks = HtmlAnnotator::new(html).find_diagram_blocks();
        let sources: Vec<_> = blocks.iter().map(|b| b.source.as_str()).collect();
        assert_eq!(sources, vec!["b", "c"]);
        assert!(!has_mermaid_class(" data-class=\"language-mermaid\""));
    }

    #[test]
    fn test_source_is_left_untouched_until_finish() {
        let html = "<pre><code class=\"language-mermaid\">pie</code></pre>";
        let mut annotator = HtmlAnnotator::new(html);
        for block in annotator.find_diagram_blocks() {
            let links = DiagramLinks::from_source(&block.source).unwrap();
            annotator.insert_links(&block, &links, &LinkSettings::default());
        }
        assert_eq!(annotator.source(), html);
        assert!(annotator.finish().ends_with("</a></div>"));
    }

    #[test]
    fn test_text_content_drops_tags_and_decodes_entities() {
        assert_eq!(
            text_content("<span class=\"k\">A</span> --&gt; &quot;B&quot; &amp; &#67;&#x44; &unknown;"),
            "A --> \"B\" & CD &unknown;"
        );
    }

    #[test]
    fn test_decode_entity_rejects_invalid_code_points() {
        assert_eq!(decode_entity("#xD800"), None);
        assert_eq!(decode_entity("#65"), Some('A'));
        assert_eq!(decode_entity("bogus"), None);
    }

    #[test]
    fn test_insert_links_container_after_pre() {
        let html = "<pre><code class=\"language-mermaid\">pie</code></pre><p>x</p>";
        let out = annotate_all(html, &LinkSettings::default());
        let links = DiagramLinks::from_source("pie").unwrap();
        let expected = format!(
            "<pre><code class=\"language-mermaid\">pie</code></pre>\
             <div class=\"mermaid-links\" style=\"text-align: right; margin-top: 5px;\">\
             <a href=\"{}\" target=\"_blank\" class=\"mermaid-edit-link\" style=\"margin-right: 10px;\">Edit</a>\
             <a href=\"{}\" target=\"_blank\" class=\"mermaid-fullscreen-link\">Full Screen</a>\
             </div><p>x</p>",
            links.edit_url(),
            links.view_url()
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_labels_are_escaped() {
        let settings = LinkSettings {
            edit_link_text: "<b>Edit</b>".to_string(),
            fullscreen_link_text: "Tom & Jerry".to_string(),
        };
        let out = annotate_all("<pre><code class=\"language-mermaid\">pie</code></pre>", &settings);
        assert!(out.contains(">&lt;b&gt;Edit&lt;/b&gt;</a>"));
        assert!(out.contains(">Tom &amp; Jerry</a>"));
    }

    #[test]
    fn test_multiple_blocks_each_get_links() {
        let html = "<pre><code class=\"language-mermaid\">a</code></pre>\n\
                    <pre><code class=\"language-mermaid\">b</code></pre>\n";
        let out = annotate_all(html, &LinkSettings::default());
        assert_eq!(out.matches("class=\"mermaid-links\"").count(), 2);
        let a = out.find(">a</code></pre><div").unwrap();
        let b = out.find(">b</code></pre><div").unwrap();
        assert!(a < b);
    }
}
