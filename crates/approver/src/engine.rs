//! Review orchestration.

use std::sync::Arc;

use policy::{CertificateRequest, Evaluator, PermissionOracle, PolicyStore};
use tracing::{info, warn};

use crate::result::{NO_BOUND_POLICIES_MESSAGE, NO_POLICIES_MESSAGE};
use crate::{AccessBinder, Cancellation, DecisionAggregator, Error, ReviewResult, Result};

/// Decides whether certificate requests should be approved.
///
/// Each review lists the current policies, binds them to the requester
/// through the permission oracle, and runs every registered evaluator
/// against the bound policies. The engine holds no mutable state and can
/// serve concurrent reviews.
pub struct ReviewEngine {
    store: Arc<dyn PolicyStore>,
    binder: AccessBinder,
    aggregator: DecisionAggregator,
}

/// Builder for [`ReviewEngine`].
pub struct ReviewEngineBuilder {
    store: Arc<dyn PolicyStore>,
    oracle: Arc<dyn PermissionOracle>,
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl ReviewEngineBuilder {
    /// Register an evaluator. Evaluators run in registration order.
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    pub fn evaluators(mut self, evaluators: impl IntoIterator<Item = Arc<dyn Evaluator>>) -> Self {
        self.evaluators.extend(evaluators);
        self
    }

    pub fn build(self) -> ReviewEngine {
        ReviewEngine::new(self.store, self.oracle, self.evaluators)
    }
}

impl ReviewEngine {
    pub fn new(
        store: Arc<dyn PolicyStore>,
        oracle: Arc<dyn PermissionOracle>,
        evaluators: Vec<Arc<dyn Evaluator>>,
    ) -> Self {
        Self {
            store,
            binder: AccessBinder::new(oracle),
            aggregator: DecisionAggregator::new(evaluators),
        }
    }

    pub fn builder(
        store: Arc<dyn PolicyStore>,
        oracle: Arc<dyn PermissionOracle>,
    ) -> ReviewEngineBuilder {
        ReviewEngineBuilder {
            store,
            oracle,
            evaluators: Vec::new(),
        }
    }

    /// Review a single request.
    pub async fn review(
        &self,
        request: &CertificateRequest,
        cancel: &Cancellation,
    ) -> Result<ReviewResult> {
        let policies = cancel.guard(self.store.list()).await?.map_err(|e| {
            warn!(request = %request.key(), error = %e, "failed to list policies");
            Error::Store(e)
        })?;

        // Nothing exists to approve or deny against yet. The request may be
        // reviewed again once a policy is created.
        if policies.is_empty() {
            info!(request = %request.key(), "no policies exist, leaving request unprocessed");
            return Ok(ReviewResult::unprocessed(NO_POLICIES_MESSAGE));
        }

        let bound = self
            .binder
            .bound_policies(request, &policies, cancel)
            .await?;

        if bound.is_empty() {
            info!(
                request = %request.key(),
                user = %request.user.username,
                policies = policies.len(),
                "no policies bound to requester"
            );
            return Ok(ReviewResult::denied(NO_BOUND_POLICIES_MESSAGE));
        }

        let result = self.aggregator.decide(request, &bound, cancel).await?;

        info!(
            request = %request.key(),
            status = %result.status,
            bound = bound.len(),
            message = %result.message,
            "reviewed request"
        );

        Ok(result)
    }
}
