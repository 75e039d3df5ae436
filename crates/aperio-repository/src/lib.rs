//! # aperio-repository: policy materialization and caching
//!
//! The repository turns raw documents from a [`PolicyStore`] into immutable
//! [`ArpDocument`] values, fronted by an optional TTL cache. Every read
//! probes the cache first; on a miss the raw document is fetched,
//! unmarshalled, validated, and (when a cache is attached) stored back
//! before being returned. A fetch or unmarshal failure is fatal for that
//! resolution and never leaves a partially populated cache.
//!
//! Caching is disabled by simply not attaching a cache (the configured TTL
//! of zero maps to [`PolicyRepository::new`] without
//! [`with_cache`](PolicyRepository::with_cache)).

pub mod cache;
pub mod store;

mod error;

use std::sync::Arc;

use aperio_arp::ArpDocument;
use aperio_types::{PolicyKey, PrincipalName};
use tracing::debug;

pub use cache::{DEFAULT_SWEEP_INTERVAL, PolicyCache};
pub use error::{RepositoryError, StoreError};
pub use store::{FilePolicyStore, MemoryPolicyStore, PolicyStore};

/// Materializes site-wide and per-identity policies from a backing store.
pub struct PolicyRepository<S: PolicyStore> {
    store: S,
    cache: Option<Arc<PolicyCache>>,
}

impl<S: PolicyStore> PolicyRepository<S> {
    /// Creates an uncached repository over the given store.
    pub fn new(store: S) -> Self {
        Self { store, cache: None }
    }

    /// Attaches a cache. The cache is shared (`Arc`) so its single-instance
    /// lifecycle stays with the caller that constructed it.
    pub fn with_cache(mut self, cache: Arc<PolicyCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the site-wide (administrative) policy, if one exists.
    pub fn site_policy(&self) -> Result<Option<Arc<ArpDocument>>, RepositoryError> {
        self.policy(&PolicyKey::Site)
    }

    /// Returns the policy bound to the given identity, if one exists.
    pub fn user_policy(
        &self,
        principal: &PrincipalName,
    ) -> Result<Option<Arc<ArpDocument>>, RepositoryError> {
        self.policy(&PolicyKey::Principal(principal.clone()))
    }

    /// Returns whichever of the site and user policies exist, in that order.
    ///
    /// The result is a plain (possibly empty) collection; absence of both
    /// policies is not an error here; the responder decides what a missing
    /// site policy means.
    pub fn all_policies(
        &self,
        principal: &PrincipalName,
    ) -> Result<Vec<Arc<ArpDocument>>, RepositoryError> {
        let mut policies = Vec::with_capacity(2);
        if let Some(site) = self.site_policy()? {
            policies.push(site);
        }
        if let Some(user) = self.user_policy(principal)? {
            policies.push(user);
        }
        Ok(policies)
    }

    /// Cache-first policy lookup.
    ///
    /// The cache lock is never held across the store fetch: probe, release,
    /// fetch, unmarshal, then re-acquire to store back.
    fn policy(&self, key: &PolicyKey) -> Result<Option<Arc<ArpDocument>>, RepositoryError> {
        if let Some(cache) = &self.cache {
            if let Some(policy) = cache.get(key) {
                return Ok(Some(policy));
            }
        }

        let Some(raw) = self.store.fetch(key)? else {
            debug!(key = %key, "no policy document in backing store");
            return Ok(None);
        };

        let document =
            ArpDocument::from_json(&raw).map_err(|e| RepositoryError::Malformed {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        let policy = Arc::new(document);

        if let Some(cache) = &self.cache {
            cache.insert(key.clone(), Arc::clone(&policy));
            debug!(key = %key, "policy fetched and cached");
        }

        Ok(Some(policy))
    }
}
