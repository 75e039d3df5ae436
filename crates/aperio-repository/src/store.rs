//! Backing stores for raw policy documents.
//!
//! A store only hands back raw document text; unmarshalling into the policy
//! model is the repository's job, so a broken document can never reach the
//! cache half-parsed.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use aperio_types::PolicyKey;

use crate::error::StoreError;

/// Supplies raw policy documents by key.
pub trait PolicyStore: Send + Sync {
    /// Fetches the raw document for `key`, or `None` when no policy exists
    /// for that key. Absence is not an error.
    fn fetch(&self, key: &PolicyKey) -> Result<Option<String>, StoreError>;
}

// ============================================================================
// File store
// ============================================================================

/// A store reading one JSON document per key from a policy directory.
///
/// Layout:
/// - `<dir>/site.arp.json` — the site-wide policy
/// - `<dir>/users/<principal>.arp.json` — per-identity policies
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    policy_dir: PathBuf,
}

impl FilePolicyStore {
    pub fn new(policy_dir: impl Into<PathBuf>) -> Self {
        Self {
            policy_dir: policy_dir.into(),
        }
    }

    fn path_for(&self, key: &PolicyKey) -> PathBuf {
        match key {
            PolicyKey::Site => self.policy_dir.join("site.arp.json"),
            PolicyKey::Principal(name) => self
                .policy_dir
                .join("users")
                .join(format!("{}.arp.json", name.as_str())),
        }
    }
}

impl PolicyStore for FilePolicyStore {
    fn fetch(&self, key: &PolicyKey) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io {
                key: key.clone(),
                source: e,
            }),
        }
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// An in-memory store for tests and embedded deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryPolicyStore {
    documents: HashMap<PolicyKey, String>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw document under the given key.
    pub fn with_document(mut self, key: PolicyKey, raw: impl Into<String>) -> Self {
        self.documents.insert(key, raw.into());
        self
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn fetch(&self, key: &PolicyKey) -> Result<Option<String>, StoreError> {
        Ok(self.documents.get(key).cloned())
    }
}
