//! Core document types.

/// A diagram block found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// Zero-based position among the document's diagram blocks.
    pub index: usize,
    /// Diagram source exactly as it appears in the block.
    pub source: String,
    /// Byte offset in the original document where sibling content goes.
    pub insert_at: usize,
    /// Container prefix (`> ` for block quotes, indentation for list items)
    /// that inserted lines must carry. Empty for HTML.
    pub prefix: String,
    /// Fence that closes the block when the document leaves it open up to
    /// the end of its container. `None` when the block is already closed.
    pub closing_fence: Option<String>,
}

impl DiagramBlock {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Pending text insertions against an unchanged source document.
///
/// Offsets always refer to the original text, so blocks found before any
/// insertion stay valid no matter how many links are added.
#[derive(Debug, Clone, Default)]
pub struct Insertions {
    pending: Vec<(usize, String)>,
}

impl Insertions {
    pub fn push(&mut self, offset: usize, text: String) {
        self.pending.push((offset, text));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Splice every insertion into `source`.
    ///
    /// Insertions at the same offset keep the order they were pushed in.
    /// Offsets past the end or off a char boundary are clamped backwards to
    /// the nearest valid position.
    pub fn apply(mut self, source: &str) -> String {
        let extra: usize = self.pending.iter().map(|(_, text)| text.len()).sum();
        let mut out = String::with_capacity(source.len() + extra);
        // Stable sort keeps push order for equal offsets.
        self.pending.sort_by_key(|(offset, _)| *offset);

        let mut cursor = 0;
        for (offset, text) in &self.pending {
            let offset = floor_char_boundary(source, (*offset).max(cursor));
            out.push_str(&source[cursor..offset]);
            out.push_str(text);
            cursor = offset;
        }
        out.push_str(&source[cursor..]);
        out
    }
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0)
}
