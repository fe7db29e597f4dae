//! Binding policies to the user that submitted a request.

use std::collections::HashSet;
use std::sync::Arc;

use policy::{AccessReview, CertificateRequest, CertificateRequestPolicy, PermissionOracle, Scope};
use tracing::{debug, warn};

use crate::{Cancellation, Error, Result};

/// Computes the policies a requester holds "use" permission for.
pub struct AccessBinder {
    oracle: Arc<dyn PermissionOracle>,
}

impl AccessBinder {
    pub fn new(oracle: Arc<dyn PermissionOracle>) -> Self {
        Self { oracle }
    }

    /// Return the policies from `policies` that are bound to the requester.
    ///
    /// The request's namespace is checked before cluster scope. A policy
    /// appears at most once, in the order it was first granted. Any failed
    /// permission check fails the whole call.
    pub async fn bound_policies(
        &self,
        request: &CertificateRequest,
        policies: &[CertificateRequestPolicy],
        cancel: &Cancellation,
    ) -> Result<Vec<CertificateRequestPolicy>> {
        let mut bound_names = HashSet::new();
        let mut bound = Vec::new();

        for scope in scopes(request) {
            for policy in policies {
                if bound_names.contains(policy.name.as_str()) {
                    continue;
                }

                let review = AccessReview::use_policy(&request.user, &policy.name, &scope);
                let allowed = cancel
                    .guard(self.oracle.check(&review))
                    .await?
                    .map_err(|source| {
                        warn!(
                            request = %request.key(),
                            policy = %policy.name,
                            %scope,
                            error = %source,
                            "permission check failed"
                        );
                        Error::Binding {
                            policy: policy.name.clone(),
                            scope: scope.clone(),
                            source,
                        }
                    })?;

                debug!(
                    request = %request.key(),
                    policy = %policy.name,
                    %scope,
                    allowed,
                    "checked policy permission"
                );

                if allowed {
                    bound_names.insert(policy.name.as_str());
                    bound.push(policy.clone());
                }
            }
        }

        Ok(bound)
    }
}

/// Scopes to check, namespaced first.
fn scopes(request: &CertificateRequest) -> Vec<Scope> {
    match Scope::for_namespace(&request.namespace) {
        Scope::Cluster => vec![Scope::Cluster],
        namespaced => vec![namespaced, Scope::Cluster],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeOracle, policies, request};

    fn names(policies: &[CertificateRequestPolicy]) -> Vec<&str> {
        policies.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn namespaced_grants_come_before_cluster_grants() {
        let oracle = Arc::new(
            FakeOracle::default()
                .allow("b", "team-a")
                .allow("a", ""),
        );
        let binder = AccessBinder::new(oracle.clone());

        let bound = binder
            .bound_policies(&request("team-a"), &policies(&["a", "b", "c"]), &Cancellation::none())
            .await
            .unwrap();

        assert_eq!(names(&bound), vec!["b", "a"]);
        // three namespaced checks, then cluster checks for the two unbound policies
        assert_eq!(
            oracle.checked(),
            vec![
                ("a".into(), "team-a".into()),
                ("b".into(), "team-a".into()),
                ("c".into(), "team-a".into()),
                ("a".into(), "".into()),
                ("c".into(), "".into()),
            ]
        );
    }

    #[tokio::test]
    async fn policy_bound_at_both_scopes_appears_once() {
        let oracle = Arc::new(
            FakeOracle::default()
                .allow("a", "team-a")
                .allow("a", ""),
        );
        let binder = AccessBinder::new(oracle.clone());

        let bound = binder
            .bound_policies(&request("team-a"), &policies(&["a"]), &Cancellation::none())
            .await
            .unwrap();

        assert_eq!(names(&bound), vec!["a"]);
        assert_eq!(oracle.review_count(), 1);
    }

    #[tokio::test]
    async fn cluster_scoped_request_checks_cluster_once() {
        let oracle = Arc::new(FakeOracle::default());
        let binder = AccessBinder::new(oracle.clone());

        let bound = binder
            .bound_policies(&request(""), &policies(&["a", "b"]), &Cancellation::none())
            .await
            .unwrap();

        assert!(bound.is_empty());
        assert_eq!(
            oracle.checked(),
            vec![("a".into(), "".into()), ("b".into(), "".into())]
        );
    }

    #[tokio::test]
    async fn review_carries_requester_identity() {
        let oracle = Arc::new(FakeOracle::default().allow("a", ""));
        let binder = AccessBinder::new(oracle.clone());
        let request = request("team-a");

        binder
            .bound_policies(&request, &policies(&["a"]), &Cancellation::none())
            .await
            .unwrap();

        let reviews = oracle.reviews.lock().unwrap();
        assert!(reviews.iter().all(|r| r.user == request.user));
        assert!(reviews.iter().all(|r| r.resource.verb == "use"));
    }

    #[tokio::test]
    async fn binding_is_idempotent() {
        let oracle = Arc::new(
            FakeOracle::default()
                .allow("c", "team-a")
                .allow("a", ""),
        );
        let binder = AccessBinder::new(oracle);
        let all = policies(&["a", "b", "c"]);

        let first = binder
            .bound_policies(&request("team-a"), &all, &Cancellation::none())
            .await
            .unwrap();
        let second = binder
            .bound_policies(&request("team-a"), &all, &Cancellation::none())
            .await
            .unwrap();

        let first: HashSet<_> = names(&first).into_iter().collect();
        let second: HashSet<_> = names(&second).into_iter().collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn oracle_failure_returns_no_partial_result() {
        let oracle = Arc::new(
            FakeOracle::default()
                .allow("a", "team-a")
                .fail_on("b"),
        );
        let binder = AccessBinder::new(oracle.clone());

        let err = binder
            .bound_policies(&request("team-a"), &policies(&["a", "b", "c"]), &Cancellation::none())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Binding { .. }));
        assert!(err.to_string().starts_with("failed to determine bound policies"));
        match err {
            Error::Binding { policy, scope, .. } => {
                assert_eq!(policy, "b");
                assert_eq!(scope, Scope::Namespaced("team-a".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
        // aborted before "c" was checked
        assert_eq!(oracle.review_count(), 2);
    }

    #[tokio::test]
    async fn cancelled_binding_never_queries_oracle() {
        let oracle = Arc::new(FakeOracle::default().allow("a", ""));
        let binder = AccessBinder::new(oracle.clone());
        let (handle, cancel) = Cancellation::new();
        handle.cancel();

        let result = binder
            .bound_policies(&request("team-a"), &policies(&["a"]), &cancel)
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(oracle.review_count(), 0);
    }
}
