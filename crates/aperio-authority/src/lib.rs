//! # aperio-authority: attribute release orchestration
//!
//! The responder is the entry point a protocol handler calls once per
//! inbound attribute query. It resolves the governing release set (site
//! policy combined with the identity's own policy), fetches the raw values
//! from the directory, applies value filters, and returns the disclosed
//! attributes.
//!
//! Error semantics are all-or-nothing: any failure (missing site policy,
//! malformed document, unreachable directory) yields one aggregate
//! [`AuthorityError`] and no attributes at all. A legitimately empty
//! disclosure, on the other hand, is a successful outcome.

pub mod codec;

use aperio_arp::{ReleaseRule, combine, resolve_release_set};
use aperio_directory::{Directory, DirectoryError};
use aperio_repository::{PolicyRepository, PolicyStore, RepositoryError};
use aperio_types::{AttributeName, PrincipalName, RequesterId};
use tracing::{debug, info, warn};

pub use codec::{Base64Codec, CodecRegistry, PlainCodec, ValueCodec};

/// Errors raised while answering an attribute query.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    /// No site-wide policy exists; disclosure cannot be determined.
    #[error("no site policy configured; cannot determine disclosure")]
    SitePolicyMissing,

    /// Policy evaluation failed (no governing rule group).
    #[error(transparent)]
    Policy(#[from] aperio_arp::ArpError),

    /// The policy repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The directory failed; the whole request is aborted.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Result type for authority operations.
pub type Result<T> = std::result::Result<T, AuthorityError>;

/// A final (name, filtered values) pair returned to the relying party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosedAttribute {
    pub name: AttributeName,
    pub values: Vec<String>,
}

/// The attribute-authority responder.
///
/// Holds the repository and the directory collaborator; one instance serves
/// the whole process and is shared across request threads (all methods take
/// `&self`, and the cache inside the repository carries its own locking).
pub struct AttributeAuthority<S: PolicyStore, D: Directory> {
    repository: PolicyRepository<S>,
    directory: D,
    codecs: CodecRegistry,
}

impl<S: PolicyStore, D: Directory> AttributeAuthority<S, D> {
    pub fn new(repository: PolicyRepository<S>, directory: D) -> Self {
        Self {
            repository,
            directory,
            codecs: CodecRegistry::new(),
        }
    }

    /// Replaces the codec registry (binary attributes, custom encodings).
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Answers one attribute query: which of `principal`'s attributes may be
    /// disclosed to `requester` for `resource_url`, and with which values.
    ///
    /// # Errors
    ///
    /// Any repository, policy, or directory failure aborts the whole request;
    /// no partial attribute set is ever returned.
    pub fn release_attributes(
        &self,
        principal: &PrincipalName,
        requester: &RequesterId,
        resource_url: &str,
    ) -> Result<Vec<DisclosedAttribute>> {
        let context = self.directory.lookup(principal)?;

        let site = self
            .repository
            .site_policy()?
            .ok_or(AuthorityError::SitePolicyMissing)?;
        let user = self.repository.user_policy(principal)?;

        let admin_set = resolve_release_set(&site, requester, resource_url, &site)?;
        let user_set = match &user {
            Some(policy) => Some(resolve_release_set(policy, requester, resource_url, &site)?),
            None => None,
        };

        let release_set = combine(&admin_set, user_set.as_deref());
        debug!(
            principal = %principal,
            requester = %requester,
            rules = release_set.len(),
            "combined release set resolved"
        );

        let mut disclosed = Vec::with_capacity(release_set.len());
        for rule in &release_set {
            let values = self.directory.attribute_values(&context, &rule.attribute)?;
            let values = self.apply_filter(rule, values);
            if values.is_empty() {
                // Filter matched nothing (or the directory holds no values):
                // the attribute is simply not disclosed.
                continue;
            }
            disclosed.push(DisclosedAttribute {
                name: rule.attribute.clone(),
                values,
            });
        }

        info!(
            principal = %principal,
            requester = %requester,
            attributes = disclosed.len(),
            "attribute release computed"
        );
        Ok(disclosed)
    }

    /// Applies a rule's filter to raw values and encodes the survivors.
    ///
    /// A rule flagged must-include guarantees its values are never
    /// suppressed, so its filter is bypassed entirely.
    fn apply_filter(&self, rule: &ReleaseRule, raw_values: Vec<String>) -> Vec<String> {
        let codec = self.codecs.codec_for(&rule.attribute);

        let permitted: Vec<String> = match &rule.filter {
            Some(filter) if !rule.must_include => {
                let had_values = !raw_values.is_empty();
                let kept: Vec<String> = raw_values
                    .into_iter()
                    .filter(|value| filter.permits(value))
                    .collect();
                if had_values && kept.is_empty() {
                    warn!(attribute = %rule.attribute, "filter suppressed every value");
                }
                kept
            }
            _ => raw_values,
        };

        permitted
            .into_iter()
            .map(|value| codec.encode(value.as_bytes()))
            .collect()
    }
}
