//! Error types for policy evaluation.

use aperio_types::RequesterId;

/// Errors raised while evaluating an Attribute Release Policy.
#[derive(Debug, thiserror::Error)]
pub enum ArpError {
    /// No Shar is bound to the requester and no default Shar is configured.
    ///
    /// Disclosure cannot be determined, so this is always fatal for the
    /// request being resolved.
    #[error("no policy rule group for requester {0} and no default configured")]
    NoDefaultShar(RequesterId),

    /// A document failed structural validation during unmarshalling.
    #[error("malformed policy document: {0}")]
    MalformedDocument(String),
}
