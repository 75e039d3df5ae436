//! The Attribute Release Policy document model.
//!
//! One `ArpDocument` is either the site-wide administrative policy or bound
//! to a single identity. It is built once by unmarshalling and immutable
//! thereafter; combination produces fresh values rather than mutating
//! documents that may be shared through the cache.

use aperio_types::{AttributeName, PrincipalName, RequesterId};
use serde::{Deserialize, Serialize};

use crate::error::ArpError;
use crate::pattern;

// ============================================================================
// Filters
// ============================================================================

/// One value pattern inside a [`Filter`], with its own polarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterValue {
    /// Value pattern (exact, `"prefix*"`, `"*suffix"`, or `"*"`).
    pub pattern: String,

    /// When set, this value is permanently guaranteed: it survives policy
    /// combination and may not be suppressed by the other side.
    #[serde(default)]
    pub must_include: bool,
}

impl FilterValue {
    /// Creates an optional (non-guaranteed) filter value.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            must_include: false,
        }
    }

    /// Creates a guaranteed filter value.
    pub fn must_include(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            must_include: true,
        }
    }

    /// Returns whether the given raw attribute value matches this pattern.
    pub fn matches(&self, value: &str) -> bool {
        pattern::value_matches(&self.pattern, value)
    }
}

/// An ordered set of value patterns restricting which of an attribute's raw
/// values may be disclosed.
///
/// A rule with no filter releases all values; a rule with a filter releases
/// the values matching at least one [`FilterValue`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    pub values: Vec<FilterValue>,
}

impl Filter {
    pub fn new(values: Vec<FilterValue>) -> Self {
        Self { values }
    }

    /// Returns whether any filter value matches the given raw value.
    pub fn permits(&self, value: &str) -> bool {
        self.values.iter().any(|fv| fv.matches(value))
    }

    /// Returns the filter value with exactly this pattern, if present.
    pub fn find(&self, pattern: &str) -> Option<&FilterValue> {
        self.values.iter().find(|fv| fv.pattern == pattern)
    }
}

// ============================================================================
// Release rules
// ============================================================================

/// Names one releasable attribute and how it may be released.
///
/// The two polarity flags are independent:
/// - `must_include`: the attribute's values may never be suppressed; the
///   responder bypasses the filter for such a rule.
/// - `must_exclude`: the attribute must never be released. This is an
///   absolute veto during combination and overrides everything else,
///   including `must_include`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseRule {
    pub attribute: AttributeName,

    #[serde(default)]
    pub must_include: bool,

    #[serde(default)]
    pub must_exclude: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

impl ReleaseRule {
    /// Creates an unrestricted release rule for the given attribute.
    pub fn new(attribute: impl Into<AttributeName>) -> Self {
        Self {
            attribute: attribute.into(),
            must_include: false,
            must_exclude: false,
            filter: None,
        }
    }

    /// Flags this rule as must-include (values never suppressed).
    pub fn with_must_include(mut self) -> Self {
        self.must_include = true;
        self
    }

    /// Flags this rule as must-exclude (attribute never released).
    pub fn with_must_exclude(mut self) -> Self {
        self.must_exclude = true;
        self
    }

    /// Attaches a value filter to this rule.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

// ============================================================================
// Resources and Shars
// ============================================================================

/// A URL-matching rule owning the release rules that apply beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resource {
    /// URL prefix this resource covers. Longest matching prefix wins.
    pub url_pattern: String,

    #[serde(default)]
    pub rules: Vec<ReleaseRule>,
}

impl Resource {
    pub fn new(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: url_pattern.into(),
            rules: Vec::new(),
        }
    }

    /// Adds a release rule to this resource.
    pub fn with_rule(mut self, rule: ReleaseRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns whether this resource covers the given URL.
    pub fn matches(&self, url: &str) -> bool {
        pattern::url_matches(&self.url_pattern, url)
    }

    /// Returns the specificity used for best-fit selection.
    pub fn specificity(&self) -> usize {
        pattern::url_specificity(&self.url_pattern)
    }
}

/// The scope a [`Shar`] is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharTarget {
    /// Bound to exactly one requesting relying party.
    Requester(RequesterId),
    /// The catch-all rule group. At most one per document.
    Default,
}

/// A rule group bound to one requesting relying party, or the designated
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Shar {
    pub target: SharTarget,

    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Shar {
    /// Creates a Shar bound to the given requester.
    pub fn for_requester(requester: impl Into<RequesterId>) -> Self {
        Self {
            target: SharTarget::Requester(requester.into()),
            resources: Vec::new(),
        }
    }

    /// Creates the default (catch-all) Shar.
    pub fn default_shar() -> Self {
        Self {
            target: SharTarget::Default,
            resources: Vec::new(),
        }
    }

    /// Adds a resource to this Shar.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Returns whether this is the default rule group.
    pub fn is_default(&self) -> bool {
        self.target == SharTarget::Default
    }

    /// Returns the best-fitting resource for a URL, if any.
    ///
    /// The most specific (longest) matching pattern wins; earlier resources
    /// win ties.
    pub fn best_fit(&self, url: &str) -> Option<&Resource> {
        let mut best: Option<&Resource> = None;
        for resource in &self.resources {
            if !resource.matches(url) {
                continue;
            }
            match best {
                Some(b) if b.specificity() >= resource.specificity() => {}
                _ => best = Some(resource),
            }
        }
        best
    }
}

// ============================================================================
// Documents
// ============================================================================

/// One Attribute Release Policy document.
///
/// Either the site-wide administrative policy (`principal: None`) or bound
/// to one identity. Built once by [`ArpDocument::from_json`] (or the
/// builders, in tests and tooling) and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArpDocument {
    /// The identity this policy is bound to; `None` for the site policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalName>,

    #[serde(default)]
    pub shars: Vec<Shar>,
}

impl ArpDocument {
    /// Creates an empty site-wide policy.
    pub fn site() -> Self {
        Self {
            principal: None,
            shars: Vec::new(),
        }
    }

    /// Creates an empty policy bound to the given identity.
    pub fn for_principal(principal: impl Into<PrincipalName>) -> Self {
        Self {
            principal: Some(principal.into()),
            shars: Vec::new(),
        }
    }

    /// Adds a Shar to this document.
    pub fn with_shar(mut self, shar: Shar) -> Self {
        self.shars.push(shar);
        self
    }

    /// Unmarshals a document from JSON and validates its structure.
    ///
    /// # Errors
    ///
    /// Returns [`ArpError::MalformedDocument`] when the JSON does not parse
    /// into the model or when more than one default Shar is declared.
    pub fn from_json(raw: &str) -> Result<Self, ArpError> {
        let document: ArpDocument =
            serde_json::from_str(raw).map_err(|e| ArpError::MalformedDocument(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Validates the single-default-Shar invariant.
    pub fn validate(&self) -> Result<(), ArpError> {
        let defaults = self.shars.iter().filter(|s| s.is_default()).count();
        if defaults > 1 {
            return Err(ArpError::MalformedDocument(format!(
                "document declares {defaults} default shars; at most one is allowed"
            )));
        }
        Ok(())
    }

    /// Returns the Shar bound to exactly this requester, if any.
    pub fn shar_for(&self, requester: &RequesterId) -> Option<&Shar> {
        self.shars
            .iter()
            .find(|s| s.target == SharTarget::Requester(requester.clone()))
    }

    /// Returns the default Shar, if one is configured.
    pub fn default_shar(&self) -> Option<&Shar> {
        self.shars.iter().find(|s| s.is_default())
    }
}
