//! mermaid.live edit and view URLs.

use crate::encoder::{self, EncodeError, PAKO_PREFIX};

/// URL prefix opening a diagram in the mermaid.live editor.
pub const EDIT_URL_PREFIX: &str = "https://mermaid.live/edit#pako:";

/// URL prefix opening a diagram in the full-screen mermaid.live viewer.
pub const VIEW_URL_PREFIX: &str = "https://mermaid.live/view#pako:";

/// Which mermaid.live page a link opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Edit,
    View,
}

impl LinkKind {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Edit => EDIT_URL_PREFIX,
            Self::View => VIEW_URL_PREFIX,
        }
    }

    /// Full URL for an encoded token.
    pub fn url(self, token: &str) -> String {
        format!("{}{token}", self.prefix())
    }
}

/// Edit and view links for one diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramLinks {
    token: String,
    edit: String,
    view: String,
}

impl DiagramLinks {
    /// Encode `source` once and build both links from the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be encoded.
    pub fn from_source(source: &str) -> Result<Self, EncodeError> {
        encoder::encode(source).map(Self::from_token)
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            edit: LinkKind::Edit.url(&token),
            view: LinkKind::View.url(&token),
            token,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The fragment after `#`, e.g. `pako:eNq...`.
    pub fn fragment(&self) -> String {
        format!("{PAKO_PREFIX}{}", self.token)
    }

    pub fn edit_url(&self) -> &str {
        &self.edit
    }

    pub fn view_url(&self) -> &str {
        &self.view
    }

    pub fn url(&self, kind: LinkKind) -> &str {
        match kind {
            LinkKind::Edit => &self.edit,
            LinkKind::View => &self.view,
        }
    }
}
