//! End-to-end attribute release flows: policies in a store, values in a
//! directory, disclosure through the responder.

use aperio_authority::{AttributeAuthority, AuthorityError};
use aperio_directory::{Directory, DirectoryContext, DirectoryError, InMemoryDirectory};
use aperio_repository::{MemoryPolicyStore, PolicyRepository};
use aperio_types::{AttributeName, PolicyKey, PrincipalName, RequesterId};

const SP: &str = "https://sp.example.org/shibboleth";
const URL: &str = "https://sp.example.org/app/page";

fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_attribute("jdoe", "eduPersonAffiliation", ["member", "staff"])
        .with_attribute("jdoe", "mail", ["jdoe@example.org"])
        .with_attribute("jdoe", "displayName", ["Jane Doe"])
}

fn authority_with(
    site: &str,
    user: Option<&str>,
) -> AttributeAuthority<MemoryPolicyStore, InMemoryDirectory> {
    let mut store = MemoryPolicyStore::new().with_document(PolicyKey::Site, site);
    if let Some(user) = user {
        store = store.with_document(PolicyKey::Principal(PrincipalName::from("jdoe")), user);
    }
    AttributeAuthority::new(PolicyRepository::new(store), directory())
}

fn release<D: Directory>(
    authority: &AttributeAuthority<MemoryPolicyStore, D>,
) -> Result<Vec<aperio_authority::DisclosedAttribute>, AuthorityError> {
    authority.release_attributes(
        &PrincipalName::from("jdoe"),
        &RequesterId::from(SP),
        URL,
    )
}

#[test]
fn minimal_document_round_trip() {
    // One Shar, one Resource, one attribute, no filter: exactly that one
    // unrestricted attribute comes back.
    let site = r#"{
        "shars": [{
            "target": {"requester": "https://sp.example.org/shibboleth"},
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [{"attribute": "eduPersonAffiliation"}]
            }]
        }]
    }"#;

    let disclosed = release(&authority_with(site, None)).unwrap();

    assert_eq!(disclosed.len(), 1);
    assert_eq!(disclosed[0].name.as_str(), "eduPersonAffiliation");
    assert_eq!(disclosed[0].values, vec!["member", "staff"]);
}

#[test]
fn admin_exclusion_beats_user_permit() {
    let site = r#"{
        "shars": [{
            "target": {"requester": "https://sp.example.org/shibboleth"},
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [
                    {"attribute": "mail", "must_exclude": true},
                    {"attribute": "displayName"}
                ]
            }]
        }]
    }"#;
    let user = r#"{
        "principal": "jdoe",
        "shars": [{
            "target": {"requester": "https://sp.example.org/shibboleth"},
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [{"attribute": "mail", "must_include": true}]
            }]
        }]
    }"#;

    let disclosed = release(&authority_with(site, Some(user))).unwrap();

    let names: Vec<_> = disclosed.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["displayName"], "mail is vetoed despite the user permit");
}

#[test]
fn user_policy_augments_the_admin_set() {
    let site = r#"{
        "shars": [{
            "target": {"requester": "https://sp.example.org/shibboleth"},
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [{"attribute": "displayName"}]
            }]
        }]
    }"#;
    let user = r#"{
        "principal": "jdoe",
        "shars": [{
            "target": {"requester": "https://sp.example.org/shibboleth"},
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [{"attribute": "mail"}]
            }]
        }]
    }"#;

    let disclosed = release(&authority_with(site, Some(user))).unwrap();

    let mut names: Vec<_> = disclosed.iter().map(|d| d.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["displayName", "mail"]);
}

#[test]
fn default_shar_serves_unknown_requesters() {
    let site = r#"{
        "shars": [{
            "target": "default",
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [{"attribute": "eduPersonAffiliation"}]
            }]
        }]
    }"#;

    let disclosed = release(&authority_with(site, None)).unwrap();

    assert_eq!(disclosed.len(), 1, "default Shar governs, not an empty set");
}

#[test]
fn filters_narrow_disclosed_values() {
    let site = r#"{
        "shars": [{
            "target": "default",
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [{
                    "attribute": "eduPersonAffiliation",
                    "filter": {"values": [{"pattern": "member"}]}
                }]
            }]
        }]
    }"#;

    let disclosed = release(&authority_with(site, None)).unwrap();

    assert_eq!(disclosed.len(), 1);
    assert_eq!(disclosed[0].values, vec!["member"], "staff filtered out");
}

#[test]
fn filter_matching_nothing_is_silence_not_error() {
    let site = r#"{
        "shars": [{
            "target": "default",
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [{
                    "attribute": "eduPersonAffiliation",
                    "filter": {"values": [{"pattern": "alumni"}]}
                }]
            }]
        }]
    }"#;

    let disclosed = release(&authority_with(site, None)).unwrap();

    assert!(disclosed.is_empty(), "empty disclosure is a successful outcome");
}

#[test]
fn best_fit_resource_governs() {
    // Both resources match the URL; the more specific one releases mail,
    // and only mail should come back.
    let site = r#"{
        "shars": [{
            "target": "default",
            "resources": [
                {
                    "url_pattern": "https://sp.example.org/",
                    "rules": [{"attribute": "displayName"}]
                },
                {
                    "url_pattern": "https://sp.example.org/app",
                    "rules": [{"attribute": "mail"}]
                }
            ]
        }]
    }"#;

    let disclosed = release(&authority_with(site, None)).unwrap();

    assert_eq!(disclosed.len(), 1);
    assert_eq!(disclosed[0].name.as_str(), "mail");
}

#[test]
fn missing_site_policy_is_fatal() {
    let store = MemoryPolicyStore::new();
    let authority = AttributeAuthority::new(PolicyRepository::new(store), directory());

    let err = release(&authority).unwrap_err();
    assert!(matches!(err, AuthorityError::SitePolicyMissing));
}

#[test]
fn no_governing_shar_is_fatal() {
    // Site policy exists but has neither a Shar for the requester nor a
    // default.
    let site = r#"{
        "shars": [{
            "target": {"requester": "https://other.example.org/sp"},
            "resources": []
        }]
    }"#;

    let err = release(&authority_with(site, None)).unwrap_err();
    assert!(matches!(err, AuthorityError::Policy(_)));
}

#[test]
fn malformed_site_policy_is_fatal() {
    let err = release(&authority_with("{ not json", None)).unwrap_err();
    assert!(matches!(err, AuthorityError::Repository(_)));
}

#[test]
fn directory_failure_aborts_the_whole_request() {
    /// A directory whose value reads always fail.
    struct FailingDirectory(InMemoryDirectory);

    impl Directory for FailingDirectory {
        fn lookup(&self, principal: &PrincipalName) -> Result<DirectoryContext, DirectoryError> {
            self.0.lookup(principal)
        }

        fn attribute_values(
            &self,
            _context: &DirectoryContext,
            _name: &AttributeName,
        ) -> Result<Vec<String>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }
    }

    let site = r#"{
        "shars": [{
            "target": "default",
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [{"attribute": "mail"}]
            }]
        }]
    }"#;

    let store = MemoryPolicyStore::new().with_document(PolicyKey::Site, site);
    let authority =
        AttributeAuthority::new(PolicyRepository::new(store), FailingDirectory(directory()));

    let err = release(&authority).unwrap_err();
    assert!(matches!(err, AuthorityError::Directory(_)), "no partial set: {err}");
}

#[test]
fn unknown_principal_aborts_before_policy_work() {
    let site = r#"{"shars": [{"target": "default", "resources": []}]}"#;
    let authority = authority_with(site, None);

    let err = authority
        .release_attributes(
            &PrincipalName::from("nobody"),
            &RequesterId::from(SP),
            URL,
        )
        .unwrap_err();

    assert!(matches!(err, AuthorityError::Directory(DirectoryError::UnknownPrincipal(_))));
}

#[test]
fn identical_requests_yield_identical_release() {
    let site = r#"{
        "shars": [{
            "target": "default",
            "resources": [{
                "url_pattern": "https://sp.example.org/",
                "rules": [
                    {"attribute": "eduPersonAffiliation"},
                    {"attribute": "mail"}
                ]
            }]
        }]
    }"#;
    let authority = authority_with(site, None);

    let first = release(&authority).unwrap();
    let second = release(&authority).unwrap();

    assert_eq!(first, second);
}
