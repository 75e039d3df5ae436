//! # aperio-types: Core types for Aperio
//!
//! This crate contains the shared identifiers used across the Aperio system:
//! - [`PrincipalName`] — the authenticated identity a policy is bound to
//! - [`RequesterId`] — the relying party asking for attributes
//! - [`AttributeName`] — a releasable identity attribute
//! - [`PolicyKey`] — the cache/store key for a policy document

use std::fmt::Display;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers - cheap string newtypes
// ============================================================================

/// The name of an authenticated identity (the subject of a user policy).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalName(String);

impl PrincipalName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PrincipalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrincipalName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The identifier of a requesting relying party.
///
/// In a SAML federation this is the service provider's entity/provider ID;
/// the core treats it as an opaque exact-match key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(String);

impl RequesterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RequesterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequesterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The name of a releasable identity attribute (e.g. a directory attribute).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeName(String);

impl AttributeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AttributeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AttributeName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Policy keys
// ============================================================================

/// The key under which a policy document is stored and cached.
///
/// The site-wide (administrative) policy lives under the [`PolicyKey::Site`]
/// sentinel; every user policy is keyed by its principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKey {
    /// The single site-wide administrative policy.
    Site,
    /// The policy bound to one identity.
    Principal(PrincipalName),
}

impl PolicyKey {
    /// Returns the principal for a user-policy key, `None` for the site key.
    pub fn principal(&self) -> Option<&PrincipalName> {
        match self {
            PolicyKey::Site => None,
            PolicyKey::Principal(name) => Some(name),
        }
    }
}

impl Display for PolicyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKey::Site => write!(f, "<site>"),
            PolicyKey::Principal(name) => write!(f, "{name}"),
        }
    }
}

impl From<PrincipalName> for PolicyKey {
    fn from(name: PrincipalName) -> Self {
        PolicyKey::Principal(name)
    }
}
