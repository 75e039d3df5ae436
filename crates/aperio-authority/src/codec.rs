//! Per-attribute value encoding.
//!
//! Protocol layers expect attribute values as strings, but not every
//! directory attribute is textual (certificates, photos, opaque handles).
//! A [`ValueCodec`] is a capability attached to an attribute name through
//! the [`CodecRegistry`]; the responder encodes every disclosed value
//! through the attribute's codec, and admin tooling decodes with the same
//! one.
//!
//! Two codecs ship by default:
//!
//! | Codec         | Use                                    |
//! |---------------|----------------------------------------|
//! | [`PlainCodec`]  | Textual attributes (identity transform) |
//! | [`Base64Codec`] | Binary-valued attributes                |

use aperio_types::AttributeName;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;

/// Errors raised while decoding a wire-form value.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The wire form is not valid for the attribute's codec.
    #[error("invalid encoded value: {0}")]
    InvalidEncoding(String),
}

/// Encodes raw directory values into their wire form and back.
pub trait ValueCodec: Send + Sync {
    /// Encodes a raw directory value for disclosure.
    fn encode(&self, raw: &[u8]) -> String;

    /// Decodes a wire-form value back into its raw form.
    fn decode(&self, wire: &str) -> Result<Vec<u8>, CodecError>;
}

/// Identity codec for textual attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl ValueCodec for PlainCodec {
    fn encode(&self, raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).into_owned()
    }

    fn decode(&self, wire: &str) -> Result<Vec<u8>, CodecError> {
        Ok(wire.as_bytes().to_vec())
    }
}

/// Standard base64 codec for binary-valued attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl ValueCodec for Base64Codec {
    fn encode(&self, raw: &[u8]) -> String {
        STANDARD.encode(raw)
    }

    fn decode(&self, wire: &str) -> Result<Vec<u8>, CodecError> {
        STANDARD
            .decode(wire)
            .map_err(|e| CodecError::InvalidEncoding(e.to_string()))
    }
}

/// Selects the codec for each attribute name.
///
/// Attributes without an explicit registration use [`PlainCodec`].
pub struct CodecRegistry {
    codecs: HashMap<AttributeName, Box<dyn ValueCodec>>,
    default: Box<dyn ValueCodec>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            default: Box::new(PlainCodec),
        }
    }

    /// Registers a codec for one attribute name.
    pub fn with_codec(
        mut self,
        attribute: impl Into<AttributeName>,
        codec: impl ValueCodec + 'static,
    ) -> Self {
        self.codecs.insert(attribute.into(), Box::new(codec));
        self
    }

    /// Registers the base64 codec for a binary-valued attribute.
    pub fn with_base64(self, attribute: impl Into<AttributeName>) -> Self {
        self.with_codec(attribute, Base64Codec)
    }

    /// Returns the codec for an attribute (the plain default when no
    /// registration exists).
    pub fn codec_for(&self, attribute: &AttributeName) -> &dyn ValueCodec {
        match self.codecs.get(attribute) {
            Some(codec) => codec.as_ref(),
            None => self.default.as_ref(),
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("registered", &self.codecs.len())
            .finish()
    }
}
