//! Pattern matching for resource URLs and attribute values.
//!
//! Two distinct languages are in play:
//! - Resource URL patterns are plain prefixes; specificity is pattern length,
//!   so the longest matching prefix is the best fit.
//! - Filter value patterns support `*` wildcards at either end (`"*"`,
//!   `"prefix*"`, `"*suffix"`) in addition to exact matches.

/// Returns whether `url` falls under the resource pattern `pattern`.
///
/// Matching is by prefix: `https://sp.example.org/app` covers
/// `https://sp.example.org/app/page`. An empty pattern matches nothing.
pub fn url_matches(pattern: &str, url: &str) -> bool {
    !pattern.is_empty() && url.starts_with(pattern)
}

/// Returns the specificity of a resource pattern.
///
/// When multiple Resources match a URL, the highest specificity (longest
/// pattern) wins; document order breaks ties.
pub fn url_specificity(pattern: &str) -> usize {
    pattern.len()
}

/// Returns whether an attribute value matches a filter value pattern.
///
/// Supported forms:
/// - `"*"` — any value
/// - `"prefix*"` — values starting with `prefix`
/// - `"*suffix"` — values ending with `suffix`
/// - anything else — exact match
pub fn value_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return value.starts_with(prefix);
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return value.ends_with(suffix);
    }

    // Exact match
    value == pattern
}
