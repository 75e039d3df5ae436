//! Error types for policy storage and retrieval.

use aperio_types::PolicyKey;

/// Errors raised by a [`PolicyStore`](crate::store::PolicyStore)
/// implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be read.
    #[error("policy store I/O failure for {key}: {source}")]
    Io {
        key: PolicyKey,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while materializing a policy through the repository.
///
/// Both variants are fatal for the resolution that hit them; neither ever
/// leaves a partially populated cache behind.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A fetched document failed to unmarshal or validate.
    #[error("malformed policy document for {key}: {reason}")]
    Malformed { key: PolicyKey, reason: String },
}
