//! # aperio-directory: attribute value retrieval
//!
//! The directory is the collaborator that holds the actual attribute values
//! for an identity (in production an LDAP or SQL-backed person registry).
//! The decision core only needs two operations: resolve a principal into a
//! directory context, and read the raw values of one named attribute from
//! that context.
//!
//! A directory failure is fatal for the whole request it occurs in: the
//! responder never emits a partial attribute set.
//!
//! # Example
//!
//! ```
//! use aperio_directory::{Directory, InMemoryDirectory};
//! use aperio_types::{AttributeName, PrincipalName};
//!
//! let directory = InMemoryDirectory::new()
//!     .with_attribute("jdoe", "mail", ["jdoe@example.org"]);
//!
//! let ctx = directory.lookup(&PrincipalName::from("jdoe")).unwrap();
//! let values = directory
//!     .attribute_values(&ctx, &AttributeName::from("mail"))
//!     .unwrap();
//! assert_eq!(values, vec!["jdoe@example.org".to_string()]);
//! ```

use std::collections::HashMap;

use aperio_types::{AttributeName, PrincipalName};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors raised by a directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// No directory entry exists for the principal.
    #[error("no directory entry for principal {0}")]
    UnknownPrincipal(PrincipalName),

    /// The attribute value store is unreachable.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// A resolved directory entry handle.
///
/// Opaque to callers; a directory implementation hands one out from
/// [`Directory::lookup`] and consumes it in
/// [`Directory::attribute_values`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryContext {
    principal: PrincipalName,
}

impl DirectoryContext {
    pub fn principal(&self) -> &PrincipalName {
        &self.principal
    }
}

/// Supplies raw attribute values for authenticated identities.
pub trait Directory: Send + Sync {
    /// Resolves a principal into a directory context.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UnknownPrincipal`] when no entry exists, or
    /// [`DirectoryError::Unavailable`] when the store cannot be reached.
    fn lookup(&self, principal: &PrincipalName) -> Result<DirectoryContext, DirectoryError>;

    /// Returns the raw values of `name` for the resolved entry.
    ///
    /// An attribute the entry simply does not carry yields an empty vector,
    /// not an error.
    fn attribute_values(
        &self,
        context: &DirectoryContext,
        name: &AttributeName,
    ) -> Result<Vec<String>, DirectoryError>;
}

// ============================================================================
// In-memory directory
// ============================================================================

/// An in-memory directory for tests and embedded deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    entries: HashMap<PrincipalName, HashMap<AttributeName, Vec<String>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds attribute values for a principal, creating the entry on first
    /// use. This is a builder method for chaining.
    pub fn with_attribute<I, V>(
        mut self,
        principal: impl Into<PrincipalName>,
        attribute: impl Into<AttributeName>,
        values: I,
    ) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.entries
            .entry(principal.into())
            .or_default()
            .insert(attribute.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Adds an entry with no attributes (the principal exists but carries
    /// nothing).
    pub fn with_empty_entry(mut self, principal: impl Into<PrincipalName>) -> Self {
        self.entries.entry(principal.into()).or_default();
        self
    }
}

impl Directory for InMemoryDirectory {
    fn lookup(&self, principal: &PrincipalName) -> Result<DirectoryContext, DirectoryError> {
        if !self.entries.contains_key(principal) {
            return Err(DirectoryError::UnknownPrincipal(principal.clone()));
        }
        debug!(principal = %principal, "directory entry resolved");
        Ok(DirectoryContext {
            principal: principal.clone(),
        })
    }

    fn attribute_values(
        &self,
        context: &DirectoryContext,
        name: &AttributeName,
    ) -> Result<Vec<String>, DirectoryError> {
        let entry = self
            .entries
            .get(&context.principal)
            .ok_or_else(|| DirectoryError::UnknownPrincipal(context.principal.clone()))?;

        Ok(entry.get(name).cloned().unwrap_or_default())
    }
}
