//! Combining evaluator verdicts into a review result.

use std::sync::Arc;

use policy::{CertificateRequest, CertificateRequestPolicy, Evaluator};
use tracing::{debug, warn};

use crate::{Cancellation, Error, ReviewResult, Result};

/// Aggregated evaluator messages for one denied policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyMessage {
    pub name: String,
    pub message: String,
}

/// Runs every evaluator against bound policies and combines the verdicts.
///
/// A request is approved by the first policy none of the evaluators deny.
/// It is denied only once every bound policy has been denied, with the
/// reasons of each policy in the message.
pub struct DecisionAggregator {
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl DecisionAggregator {
    pub fn new(evaluators: Vec<Arc<dyn Evaluator>>) -> Self {
        Self { evaluators }
    }

    pub async fn decide(
        &self,
        request: &CertificateRequest,
        bound: &[CertificateRequestPolicy],
        cancel: &Cancellation,
    ) -> Result<ReviewResult> {
        let mut policy_messages = Vec::with_capacity(bound.len());

        for policy in bound {
            let mut denied = false;
            let mut messages = Vec::new();

            // Every evaluator runs, even after a denial.
            for evaluator in &self.evaluators {
                let response = cancel
                    .guard(evaluator.evaluate(policy, request))
                    .await?
                    .map_err(|source| {
                        warn!(
                            request = %request.key(),
                            policy = %policy.name,
                            evaluator = evaluator.name(),
                            error = %source,
                            "evaluator failed"
                        );
                        Error::Evaluation {
                            policy: policy.name.clone(),
                            evaluator: evaluator.name().to_string(),
                            source,
                        }
                    })?;

                debug!(
                    request = %request.key(),
                    policy = %policy.name,
                    evaluator = evaluator.name(),
                    verdict = ?response.verdict,
                    "evaluator responded"
                );

                if response.is_denied() {
                    denied = true;
                }
                if !response.message.is_empty() {
                    messages.push(response.message);
                }
            }

            if !denied {
                return Ok(ReviewResult::approved(format!(
                    "Approved by CertificateRequestPolicy: {:?}",
                    policy.name
                )));
            }

            policy_messages.push(PolicyMessage {
                name: policy.name.clone(),
                message: messages.join(", "),
            });
        }

        Ok(ReviewResult::denied(denial_message(policy_messages)))
    }
}

fn denial_message(mut policy_messages: Vec<PolicyMessage>) -> String {
    policy_messages.sort_by(|a, b| a.name.cmp(&b.name));

    let reasons: Vec<String> = policy_messages
        .iter()
        .map(|pm| format!("[{}: {}]", pm.name, pm.message))
        .collect();

    format!("No policy approved this request: {}", reasons.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReviewStatus;
    use crate::testing::{FakeEvaluator, call_log, calls, policies, request};
    use policy::EvaluationResponse;

    #[tokio::test]
    async fn first_clean_policy_approves() {
        let log = call_log();
        let aggregator = DecisionAggregator::new(vec![
            FakeEvaluator::approving("e1", &log),
            FakeEvaluator::approving("e2", &log),
        ]);

        let result = aggregator
            .decide(&request("ns"), &policies(&["p1", "p2"]), &Cancellation::none())
            .await
            .unwrap();

        assert_eq!(result.status, ReviewStatus::Approved);
        assert_eq!(result.message, r#"Approved by CertificateRequestPolicy: "p1""#);
        assert_eq!(calls(&log), vec!["e1:p1", "e2:p1"]);
    }

    #[tokio::test]
    async fn denied_policy_falls_through_to_next() {
        let log = call_log();
        let aggregator = DecisionAggregator::new(vec![FakeEvaluator::new("e1", &log, |p| {
            if p.name == "p1" {
                Ok(EvaluationResponse::deny("no"))
            } else {
                Ok(EvaluationResponse::approve())
            }
        })]);

        let result = aggregator
            .decide(&request("ns"), &policies(&["p1", "p2", "p3"]), &Cancellation::none())
            .await
            .unwrap();

        assert!(result.is_approved());
        assert!(result.message.contains("\"p2\""));
        assert_eq!(calls(&log), vec!["e1:p1", "e1:p2"]);
    }

    #[tokio::test]
    async fn all_evaluators_run_after_a_denial() {
        let log = call_log();
        let aggregator = DecisionAggregator::new(vec![
            FakeEvaluator::denying("e1", "m1", &log),
            FakeEvaluator::denying("e2", "m2", &log),
            FakeEvaluator::approving("e3", &log),
        ]);

        let result = aggregator
            .decide(&request("ns"), &policies(&["p1"]), &Cancellation::none())
            .await
            .unwrap();

        assert_eq!(result.status, ReviewStatus::Denied);
        assert_eq!(result.message, "No policy approved this request: [p1: m1, m2]");
        assert_eq!(calls(&log), vec!["e1:p1", "e2:p1", "e3:p1"]);
    }

    #[tokio::test]
    async fn empty_messages_are_not_joined() {
        let log = call_log();
        let aggregator = DecisionAggregator::new(vec![
            FakeEvaluator::denying("e1", "", &log),
            FakeEvaluator::denying("e2", "too long", &log),
            FakeEvaluator::approving("e3", &log),
        ]);

        let result = aggregator
            .decide(&request("ns"), &policies(&["p1"]), &Cancellation::none())
            .await
            .unwrap();

        assert_eq!(
            result.message,
            "No policy approved this request: [p1: too long]"
        );
    }

    #[tokio::test]
    async fn approval_with_message_ignores_message() {
        let log = call_log();
        let aggregator = DecisionAggregator::new(vec![FakeEvaluator::new("e1", &log, |_| {
            Ok(EvaluationResponse::approve().with_message("looks fine"))
        })]);

        let result = aggregator
            .decide(&request("ns"), &policies(&["p1"]), &Cancellation::none())
            .await
            .unwrap();

        assert_eq!(result.message, r#"Approved by CertificateRequestPolicy: "p1""#);
    }

    #[tokio::test]
    async fn denial_messages_sorted_by_policy_name() {
        let log = call_log();
        let aggregator = DecisionAggregator::new(vec![FakeEvaluator::new("e1", &log, |p| {
            Ok(EvaluationResponse::deny(format!("{} denied", p.name)))
        })]);

        let result = aggregator
            .decide(&request("ns"), &policies(&["p2", "p1"]), &Cancellation::none())
            .await
            .unwrap();

        assert_eq!(result.status, ReviewStatus::Denied);
        assert_eq!(
            result.message,
            "No policy approved this request: [p1: p1 denied] [p2: p2 denied]"
        );
        // evaluated in bound order, reported in name order
        assert_eq!(calls(&log), vec!["e1:p2", "e1:p1"]);
    }

    #[tokio::test]
    async fn failing_evaluator_aborts_immediately() {
        let log = call_log();
        let aggregator = DecisionAggregator::new(vec![
            FakeEvaluator::approving("e1", &log),
            FakeEvaluator::failing("e2", &log),
            FakeEvaluator::approving("e3", &log),
        ]);

        let err = aggregator
            .decide(&request("ns"), &policies(&["p1", "p2"]), &Cancellation::none())
            .await
            .unwrap_err();

        match err {
            Error::Evaluation {
                policy, evaluator, ..
            } => {
                assert_eq!(policy, "p1");
                assert_eq!(evaluator, "e2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls(&log), vec!["e1:p1", "e2:p1"]);
    }

    #[tokio::test]
    async fn no_evaluators_approves_first_policy() {
        let aggregator = DecisionAggregator::new(Vec::new());

        let result = aggregator
            .decide(&request("ns"), &policies(&["p1", "p2"]), &Cancellation::none())
            .await
            .unwrap();

        assert!(result.is_approved());
        assert!(result.message.contains("\"p1\""));
    }

    #[test]
    fn denial_message_sort_is_stable() {
        let message = denial_message(vec![
            PolicyMessage {
                name: "b".into(),
                message: "x".into(),
            },
            PolicyMessage {
                name: "a".into(),
                message: "first".into(),
            },
            PolicyMessage {
                name: "a".into(),
                message: "second".into(),
            },
        ]);
        assert_eq!(
            message,
            "No policy approved this request: [a: first] [a: second] [b: x]"
        );
    }
}
