//! Certificate request policy model.
//!
//! Holds the types shared by every part of the approver: the request under
//! review and its requester, the policies it is checked against, evaluator
//! verdicts, and permission queries. It also defines the three contracts the
//! approver consumes: [`PolicyStore`], [`PermissionOracle`] and [`Evaluator`].

mod access;
mod error;
mod evaluator;
mod policy;
mod request;

pub use access::{
    AccessReview, POLICY_GROUP, POLICY_RESOURCE, PermissionOracle, ResourceAttributes, Scope,
    USE_VERB,
};
pub use error::{BoxError, Error, Result};
pub use evaluator::{EvaluationResponse, Evaluator, Verdict};
pub use policy::{CertificateRequestPolicy, PolicyList, PolicyStore};
pub use request::{CertificateRequest, UserInfo};
