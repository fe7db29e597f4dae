//! Hand-written collaborators for unit tests.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use policy::{
    AccessReview, CertificateRequest, CertificateRequestPolicy, EvaluationResponse, Evaluator,
    PermissionOracle, PolicyStore, Result, UserInfo,
};
use tokio::sync::Notify;

pub fn request(namespace: &str) -> CertificateRequest {
    CertificateRequest::new(
        "cr-1",
        namespace,
        UserInfo::new("alice").with_groups(["devs"]).with_uid("1"),
    )
}

pub fn policies(names: &[&str]) -> Vec<CertificateRequestPolicy> {
    names
        .iter()
        .map(|name| CertificateRequestPolicy::new(*name))
        .collect()
}

/// Store returning a fixed list, or failing.
#[derive(Default)]
pub struct FakeStore {
    policies: Vec<CertificateRequestPolicy>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeStore {
    pub fn with(names: &[&str]) -> Self {
        Self {
            policies: policies(names),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PolicyStore for FakeStore {
    async fn list(&self) -> Result<Vec<CertificateRequestPolicy>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(policy::Error::backend(
                "list policies",
                io::Error::other("store unavailable"),
            ));
        }
        Ok(self.policies.clone())
    }
}

/// Store whose list call never completes.
pub struct StalledStore;

#[async_trait]
impl PolicyStore for StalledStore {
    async fn list(&self) -> Result<Vec<CertificateRequestPolicy>> {
        std::future::pending().await
    }
}

/// Oracle granting a fixed set of (policy, namespace) pairs.
#[derive(Default)]
pub struct FakeOracle {
    grants: HashSet<(String, String)>,
    fail_on: Option<String>,
    pub reviews: Mutex<Vec<AccessReview>>,
}

impl FakeOracle {
    pub fn allow(mut self, policy: &str, namespace: &str) -> Self {
        self.grants.insert((policy.to_string(), namespace.to_string()));
        self
    }

    pub fn fail_on(mut self, policy: &str) -> Self {
        self.fail_on = Some(policy.to_string());
        self
    }

    pub fn review_count(&self) -> usize {
        self.reviews.lock().unwrap().len()
    }

    pub fn checked(&self) -> Vec<(String, String)> {
        self.reviews
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.resource.name.clone(), r.resource.namespace.clone()))
            .collect()
    }
}

#[async_trait]
impl PermissionOracle for FakeOracle {
    async fn check(&self, review: &AccessReview) -> Result<bool> {
        self.reviews.lock().unwrap().push(review.clone());
        if self.fail_on.as_deref() == Some(review.resource.name.as_str()) {
            return Err(policy::Error::backend(
                "create access review",
                io::Error::other("authorizer unavailable"),
            ));
        }
        Ok(self.grants.contains(&(
            review.resource.name.clone(),
            review.resource.namespace.clone(),
        )))
    }
}

/// Oracle that signals `entered` and then never answers.
#[derive(Default)]
pub struct StalledOracle {
    pub entered: Arc<Notify>,
}

#[async_trait]
impl PermissionOracle for StalledOracle {
    async fn check(&self, _review: &AccessReview) -> Result<bool> {
        self.entered.notify_one();
        std::future::pending().await
    }
}

/// Evaluator that signals `entered` and then never answers.
#[derive(Default)]
pub struct StalledEvaluator {
    pub entered: Arc<Notify>,
}

#[async_trait]
impl Evaluator for StalledEvaluator {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn evaluate(
        &self,
        _policy: &CertificateRequestPolicy,
        _request: &CertificateRequest,
    ) -> Result<EvaluationResponse> {
        self.entered.notify_one();
        std::future::pending().await
    }
}

/// Shared record of `evaluator:policy` calls, in call order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

type Behaviour = Box<dyn Fn(&CertificateRequestPolicy) -> Result<EvaluationResponse> + Send + Sync>;

pub struct FakeEvaluator {
    name: String,
    behaviour: Behaviour,
    log: CallLog,
}

impl FakeEvaluator {
    pub fn new<F>(name: &str, log: &CallLog, behaviour: F) -> Arc<dyn Evaluator>
    where
        F: Fn(&CertificateRequestPolicy) -> Result<EvaluationResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            behaviour: Box::new(behaviour),
            log: Arc::clone(log),
        })
    }

    pub fn approving(name: &str, log: &CallLog) -> Arc<dyn Evaluator> {
        Self::new(name, log, |_| Ok(EvaluationResponse::approve()))
    }

    pub fn denying(name: &str, message: &'static str, log: &CallLog) -> Arc<dyn Evaluator> {
        Self::new(name, log, move |_| Ok(EvaluationResponse::deny(message)))
    }

    pub fn failing(name: &str, log: &CallLog) -> Arc<dyn Evaluator> {
        Self::new(name, log, |_| {
            Err(policy::Error::backend(
                "evaluate",
                io::Error::other("evaluator crashed"),
            ))
        })
    }
}

#[async_trait]
impl Evaluator for FakeEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(
        &self,
        policy: &CertificateRequestPolicy,
        _request: &CertificateRequest,
    ) -> Result<EvaluationResponse> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, policy.name));
        (self.behaviour)(policy)
    }
}

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
