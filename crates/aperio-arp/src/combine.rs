//! Policy combination.
//!
//! Merges the site-wide (admin) and per-identity (user) release sets into
//! one authoritative set. Exclusion is a veto neither side may override;
//! must-include values from either side are permanently guaranteed; all
//! other values are the union of what both policies permit.
//!
//! Combination is pure: both inputs are read-only and the result is a fresh
//! collection, so cache-resident documents shared across concurrent
//! resolutions are never mutated.

use std::collections::HashSet;

use tracing::debug;

use crate::document::{Filter, ReleaseRule};

/// Combines the admin and user release sets.
///
/// - A rule flagged `must_exclude` on either side vetoes that attribute
///   outright.
/// - An attribute present in both sets yields one merged rule: the admin
///   rule with the filters merged per [`merge_filters`] and `must_include`
///   OR-ed across both sides.
/// - Everything else passes through: admin-only rules and user-only rules
///   alike.
///
/// When no user set exists the result is simply the admin set minus its
/// vetoed rules.
pub fn combine(admin_set: &[ReleaseRule], user_set: Option<&[ReleaseRule]>) -> Vec<ReleaseRule> {
    let Some(user_set) = user_set else {
        return admin_set
            .iter()
            .filter(|rule| !rule.must_exclude)
            .cloned()
            .collect();
    };

    // An exclusion anywhere removes the attribute from both sides.
    let vetoed: HashSet<_> = admin_set
        .iter()
        .chain(user_set)
        .filter(|rule| rule.must_exclude)
        .map(|rule| rule.attribute.clone())
        .collect();

    if !vetoed.is_empty() {
        debug!(vetoed = vetoed.len(), "attributes removed by exclusion veto");
    }

    let mut combined = Vec::with_capacity(admin_set.len() + user_set.len());
    let mut consumed_user = HashSet::new();

    for rule in admin_set {
        if vetoed.contains(&rule.attribute) {
            continue;
        }

        match user_set.iter().find(|u| u.attribute == rule.attribute) {
            Some(counterpart) => {
                consumed_user.insert(rule.attribute.clone());
                combined.push(ReleaseRule {
                    attribute: rule.attribute.clone(),
                    must_include: rule.must_include || counterpart.must_include,
                    must_exclude: false,
                    filter: merge_filters(rule.filter.as_ref(), counterpart.filter.as_ref()),
                });
            }
            None => combined.push(rule.clone()),
        }
    }

    // Remaining user-only rules augment the admin set.
    for rule in user_set {
        if vetoed.contains(&rule.attribute) || consumed_user.contains(&rule.attribute) {
            continue;
        }
        combined.push(rule.clone());
    }

    combined
}

/// Merges two optional filters into a fresh one.
///
/// If either side has no filter, the other side wins unchanged. Otherwise
/// the result is the pattern-union of both: every value of `a` is present,
/// and values of `b` are appended unless the same pattern already appears,
/// in which case the `must_include` flags are OR-ed. A value flagged
/// must-include on either side is therefore always present, and still
/// flagged, in the merged filter.
pub fn merge_filters(a: Option<&Filter>, b: Option<&Filter>) -> Option<Filter> {
    let (a, b) = match (a, b) {
        (None, b) => return b.cloned(),
        (a, None) => return a.cloned(),
        (Some(a), Some(b)) => (a, b),
    };

    let mut merged = a.clone();
    for value in &b.values {
        match merged.values.iter_mut().find(|v| v.pattern == value.pattern) {
            Some(existing) => existing.must_include |= value.must_include,
            None => merged.values.push(value.clone()),
        }
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FilterValue;

    fn rule(attribute: &str) -> ReleaseRule {
        ReleaseRule::new(attribute)
    }

    #[test]
    fn no_user_policy_drops_only_excluded_rules() {
        let admin = vec![rule("mail"), rule("uid").with_must_exclude()];

        let combined = combine(&admin, None);

        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].attribute.as_str(), "mail");
    }

    #[test]
    fn admin_exclusion_vetoes_user_permit() {
        let admin = vec![rule("mail").with_must_exclude()];
        let user = vec![rule("mail").with_must_include()];

        let combined = combine(&admin, Some(&user));

        assert!(combined.is_empty(), "exclusion is absolute");
    }

    #[test]
    fn user_exclusion_vetoes_admin_rule() {
        let admin = vec![rule("mail")];
        let user = vec![rule("mail").with_must_exclude()];

        let combined = combine(&admin, Some(&user));

        assert!(combined.is_empty());
    }

    #[test]
    fn matching_rules_merge_without_duplication() {
        let admin = vec![rule("eduPersonAffiliation")
            .with_filter(Filter::new(vec![FilterValue::must_include("member")]))];
        let user = vec![rule("eduPersonAffiliation")
            .with_filter(Filter::new(vec![FilterValue::new("staff")]))
            .with_must_include()];

        let combined = combine(&admin, Some(&user));

        assert_eq!(combined.len(), 1);
        let merged = &combined[0];
        assert!(merged.must_include, "must-include from either side survives");
        let filter = merged.filter.as_ref().unwrap();
        assert_eq!(filter.values.len(), 2);
        assert!(filter.find("member").unwrap().must_include);
        assert!(!filter.find("staff").unwrap().must_include);
    }

    #[test]
    fn user_only_rules_augment_the_admin_set() {
        let admin = vec![rule("mail")];
        let user = vec![rule("displayName")];

        let combined = combine(&admin, Some(&user));

        let attrs: Vec<_> = combined.iter().map(|r| r.attribute.as_str()).collect();
        assert_eq!(attrs, vec!["mail", "displayName"]);
    }

    #[test]
    fn merge_keeps_the_present_side_when_one_filter_is_absent() {
        let filter = Filter::new(vec![FilterValue::new("member")]);

        assert_eq!(merge_filters(None, Some(&filter)), Some(filter.clone()));
        assert_eq!(merge_filters(Some(&filter), None), Some(filter));
        assert_eq!(merge_filters(None, None), None);
    }

    #[test]
    fn merge_dedups_same_pattern_and_ors_polarity() {
        let a = Filter::new(vec![FilterValue::must_include("member")]);
        let b = Filter::new(vec![FilterValue::new("member"), FilterValue::new("staff")]);

        let merged = merge_filters(Some(&a), Some(&b)).unwrap();

        assert_eq!(merged.values.len(), 2);
        assert!(merged.find("member").unwrap().must_include);
    }

    #[test]
    fn combine_does_not_mutate_inputs() {
        let admin = vec![rule("mail").with_filter(Filter::new(vec![FilterValue::new("a@x")]))];
        let user = vec![rule("mail").with_filter(Filter::new(vec![FilterValue::new("b@x")]))];
        let admin_before = admin.clone();
        let user_before = user.clone();

        let _ = combine(&admin, Some(&user));

        assert_eq!(admin, admin_before);
        assert_eq!(user, user_before);
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use crate::document::FilterValue;
    use proptest::prelude::*;

    fn arb_filter() -> impl Strategy<Value = Option<Filter>> {
        proptest::option::of(
            proptest::collection::vec(
                ("[a-c]{1,3}", any::<bool>()).prop_map(|(pattern, must_include)| FilterValue {
                    pattern,
                    must_include,
                }),
                0..4,
            )
            .prop_map(Filter::new),
        )
    }

    fn arb_rule() -> impl Strategy<Value = ReleaseRule> {
        ("[a-e]{1,2}", any::<bool>(), any::<bool>(), arb_filter()).prop_map(
            |(attr, must_include, must_exclude, filter)| ReleaseRule {
                attribute: attr.as_str().into(),
                must_include,
                must_exclude,
                filter,
            },
        )
    }

    fn arb_set() -> impl Strategy<Value = Vec<ReleaseRule>> {
        proptest::collection::vec(arb_rule(), 0..6)
    }

    proptest! {
        /// An attribute flagged must-exclude on either side never appears in
        /// the combined set.
        #[test]
        fn exclusion_is_absolute(admin in arb_set(), user in arb_set()) {
            let combined = combine(&admin, Some(&user));
            for rule in admin.iter().chain(&user).filter(|r| r.must_exclude) {
                prop_assert!(combined.iter().all(|c| c.attribute != rule.attribute));
            }
        }

        /// No combined rule carries the must-exclude flag.
        #[test]
        fn combined_rules_are_never_excluding(admin in arb_set(), user in arb_set()) {
            let combined = combine(&admin, Some(&user));
            prop_assert!(combined.iter().all(|r| !r.must_exclude));
        }

        /// A must-include filter value on either side of a merge is present,
        /// and still flagged, in the merged filter.
        #[test]
        fn must_include_survives_merge(a in arb_filter(), b in arb_filter()) {
            let merged = merge_filters(a.as_ref(), b.as_ref());
            let guaranteed = a.iter().chain(b.iter())
                .flat_map(|f| &f.values)
                .filter(|v| v.must_include);

            for value in guaranteed {
                let merged = merged.as_ref().expect("a side had a filter");
                prop_assert!(merged.find(&value.pattern).is_some_and(|v| v.must_include));
            }
        }

        /// Combination never yields two rules for the same attribute.
        #[test]
        fn combined_attributes_are_unique(admin in arb_set(), user in arb_set()) {
            // Inputs themselves may carry duplicates; restrict to unique sets.
            let mut seen = std::collections::HashSet::new();
            let admin: Vec<_> = admin.into_iter()
                .filter(|r| seen.insert(r.attribute.clone()))
                .collect();
            let mut seen = std::collections::HashSet::new();
            let user: Vec<_> = user.into_iter()
                .filter(|r| seen.insert(r.attribute.clone()))
                .collect();

            let combined = combine(&admin, Some(&user));
            let mut attrs = std::collections::HashSet::new();
            prop_assert!(combined.iter().all(|r| attrs.insert(r.attribute.clone())));
        }
    }
}
