//! Release-set resolution.
//!
//! Given one policy, a requester, and a resource URL, selects the
//! best-matching Shar/Resource pair and extracts its release rules.

use aperio_types::RequesterId;
use tracing::debug;

use crate::document::{ArpDocument, ReleaseRule, Shar};
use crate::error::ArpError;

/// Resolves the release rules `policy` grants to `requester` for
/// `resource_url`.
///
/// Selection order:
/// 1. The Shar in `policy` bound to `requester`; failing that, the
///    `fallback` policy's default Shar; failing that, the request cannot be
///    resolved at all.
/// 2. Within the selected Shar, the best-fitting Resource (longest matching
///    URL prefix). When a requester-bound Shar has no matching Resource, the
///    fallback's default Shar is given one more chance before the result is
///    declared empty.
///
/// An empty result is a valid, non-error outcome: the policy simply releases
/// nothing for this target.
///
/// # Errors
///
/// Returns [`ArpError::NoDefaultShar`] when neither a requester-bound Shar
/// nor a fallback default exists.
pub fn resolve_release_set(
    policy: &ArpDocument,
    requester: &RequesterId,
    resource_url: &str,
    fallback: &ArpDocument,
) -> Result<Vec<ReleaseRule>, ArpError> {
    let (shar, used_fallback_default) = select_shar(policy, requester, fallback)?;

    if let Some(resource) = shar.best_fit(resource_url) {
        debug!(
            requester = %requester,
            url = %resource_url,
            pattern = %resource.url_pattern,
            rules = resource.rules.len(),
            "resolved release set"
        );
        return Ok(resource.rules.clone());
    }

    // The requester-bound Shar covered no matching resource; the fallback's
    // default Shar gets one more chance before the result is empty.
    if !used_fallback_default {
        if let Some(resource) = fallback.default_shar().and_then(|s| s.best_fit(resource_url)) {
            debug!(
                requester = %requester,
                url = %resource_url,
                pattern = %resource.url_pattern,
                "resolved release set via fallback default shar"
            );
            return Ok(resource.rules.clone());
        }
    }

    debug!(requester = %requester, url = %resource_url, "no matching resource; empty release set");
    Ok(Vec::new())
}

/// Selects the governing Shar: requester-bound first, fallback default
/// second. Returns whether the fallback default was used.
fn select_shar<'a>(
    policy: &'a ArpDocument,
    requester: &RequesterId,
    fallback: &'a ArpDocument,
) -> Result<(&'a Shar, bool), ArpError> {
    if let Some(shar) = policy.shar_for(requester) {
        return Ok((shar, false));
    }

    fallback
        .default_shar()
        .map(|shar| (shar, true))
        .ok_or_else(|| ArpError::NoDefaultShar(requester.clone()))
}
