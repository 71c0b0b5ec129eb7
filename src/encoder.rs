//! Diagram payload encoding for mermaid.live.
//!
//! mermaid.live keeps the whole editor state in the URL fragment as
//! `pako:<token>`. The token is the JSON payload, deflated with zlib framing
//! (the default output of `pako.deflate`), then base64-encoded with `+` and
//! `/` replaced by `-` and `_`. Padding is kept.
//!
//! # Example
//!
//! ```
//! use mermaid_links::encoder::{decode, encode};
//!
//! let token = encode("graph TD; A-->B;").unwrap();
//! assert!(!token.contains('+') && !token.contains('/'));
//!
//! let payload = decode(&token).unwrap();
//! assert_eq!(payload.code, "graph TD; A-->B;");
//! assert_eq!(payload.render_config.theme, "default");
//! ```

use std::io::{Read, Write};

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD, URL_SAFE};
use base64::engine::DecodePaddingMode;
use flate2::Compression;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Theme written into every payload produced by [`encode`].
pub const DEFAULT_THEME: &str = "default";

/// Fragment prefix mermaid.live expects in front of the token.
pub const PAKO_PREFIX: &str = "pako:";

/// URL-safe alphabet that accepts tokens with or without `=` padding.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced while turning diagram source into a token.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to serialize diagram payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to compress diagram payload: {0}")]
    Compress(#[from] std::io::Error),
}

/// Errors produced while reading a token back into a payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to inflate token: {0}")]
    Inflate(#[source] std::io::Error),
    #[error("token does not hold a diagram payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rendering options sent alongside the diagram source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub theme: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

/// The JSON document mermaid.live decodes from the URL fragment.
///
/// Field order is significant: `code` serializes before `mermaid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramPayload {
    /// Diagram source, passed through verbatim.
    pub code: String,
    #[serde(rename = "mermaid", default)]
    pub render_config: RenderConfig,
}

impl DiagramPayload {
    /// Payload for `code` with the default theme.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            render_config: RenderConfig::default(),
        }
    }

    /// Replace the theme sent to mermaid.live.
    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.render_config.theme = theme.into();
        self
    }

    /// Compact JSON text, byte-identical to `JSON.stringify` output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode this payload into a mermaid.live token.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or compression fails.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let json = self.to_json()?;
        let compressed = deflate(json.as_bytes())?;
        // Standard base64 with `+` -> `-` and `/` -> `_` is exactly the
        // padded URL-safe alphabet.
        Ok(URL_SAFE.encode(compressed))
    }
}

/// Encode diagram source into a mermaid.live token.
///
/// Any text is accepted, including the empty string. The result depends only
/// on `diagram_source`.
///
/// # Errors
///
/// Returns an error if serialization or compression fails.
pub fn encode(diagram_source: &str) -> Result<String, EncodeError> {
    DiagramPayload::new(diagram_source).encode()
}

/// Decode a mermaid.live token back into its payload.
///
/// Accepts an optional leading `pako:`, missing padding, the standard
/// base64 alphabet, and both zlib-framed and raw deflate streams.
///
/// # Errors
///
/// Returns an error if the token is not base64, does not inflate, or does
/// not contain a JSON payload with a `code` field.
pub fn decode(token: &str) -> Result<DiagramPayload, DecodeError> {
    let token = token.trim();
    let token = token.strip_prefix(PAKO_PREFIX).unwrap_or(token);
    let url_safe: String = token
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let compressed = LENIENT_URL_SAFE.decode(url_safe)?;
    let json = inflate(&compressed).map_err(DecodeError::Inflate)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Returns true if `c` can appear in a token produced by [`encode`].
pub const fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=')
}

fn deflate(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(bytes.len()), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn inflate(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    if has_zlib_header(compressed) {
        ZlibDecoder::new(compressed).read_to_end(&mut out)?;
    } else {
        DeflateDecoder::new(compressed).read_to_end(&mut out)?;
    }
    Ok(out)
}

/// CMF must select deflate (low nibble 8) and CMF/FLG must be a multiple of 31.
fn has_zlib_header(bytes: &[u8]) -> bool {
    match bytes {
        [cmf, flg, ..] => cmf & 0x0f == 8 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}
