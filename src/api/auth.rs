//! Bearer API key checks for the authenticated endpoints.
//!
//! The tracking endpoint is unauthenticated; everything under
//! `/api/events` and `/api/analytics` resolves the key to an account and
//! requires that account to own the requested domain.

use crate::ingest::IngestError;
use crate::storage::{normalize_domain, AccountId, ApiKeyAuthenticator, DomainRegistry};
use axum::http::{header, HeaderMap};

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the caller's account and check it owns `domain`.
///
/// Returns the normalized domain. A domain owned by someone else is reported
/// as unregistered so callers cannot probe other accounts' domains.
pub fn authorize_domain(
    authenticator: &dyn ApiKeyAuthenticator,
    registry: &dyn DomainRegistry,
    headers: &HeaderMap,
    domain: &str,
) -> Result<(AccountId, String), IngestError> {
    let token = bearer_token(headers).ok_or(IngestError::Unauthorized)?;
    let account = authenticator
        .authenticate(token)?
        .ok_or(IngestError::Unauthorized)?;

    let domain = normalize_domain(domain);
    if domain.is_empty() {
        return Err(IngestError::InvalidInput("domain is required".to_string()));
    }
    match registry.owner_of(&domain)? {
        Some(owner) if owner == account => Ok((account, domain)),
        _ => Err(IngestError::UnregisteredDomain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::duckdb_store::DuckDbStore;

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth.parse().unwrap());
        headers
    }

    fn store() -> DuckDbStore {
        let store = DuckDbStore::open_in_memory().unwrap();
        let alice = store.register_account("alice-key").unwrap();
        let bob = store.register_account("bob-key").unwrap();
        store.register_domain(&alice, "alice.com").unwrap();
        store.register_domain(&bob, "bob.com").unwrap();
        store
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_authorize_owner() {
        let store = store();
        let (_, domain) =
            authorize_domain(&store, &store, &headers_with("Bearer alice-key"), "WWW.Alice.com")
                .unwrap();
        assert_eq!(domain, "alice.com");
    }

    #[test]
    fn test_missing_or_unknown_key() {
        let store = store();
        let err = authorize_domain(&store, &store, &HeaderMap::new(), "alice.com").unwrap_err();
        assert!(matches!(err, IngestError::Unauthorized));

        let err = authorize_domain(&store, &store, &headers_with("Bearer nope"), "alice.com")
            .unwrap_err();
        assert!(matches!(err, IngestError::Unauthorized));
    }

    #[test]
    fn test_foreign_domain_is_unregistered() {
        let store = store();
        let err = authorize_domain(&store, &store, &headers_with("Bearer alice-key"), "bob.com")
            .unwrap_err();
        assert!(matches!(err, IngestError::UnregisteredDomain));

        let err = authorize_domain(&store, &store, &headers_with("Bearer alice-key"), "nobody.org")
            .unwrap_err();
        assert!(matches!(err, IngestError::UnregisteredDomain));
    }
}
