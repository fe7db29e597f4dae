//! Certificate request approver: policy binding and decision aggregation.
//!
//! This crate decides whether a certificate request should be approved,
//! denied, or left unprocessed, given the policies an administrator has
//! defined and the identity of the requester.
//!
//! # Overview
//!
//! A review runs in three steps:
//!
//! - **Listing**: all policies are fetched from a [`PolicyStore`]. With no
//!   policies at all the request is left unprocessed.
//! - **Binding**: the [`AccessBinder`] asks a [`PermissionOracle`] whether
//!   the requester may "use" each policy, in the request's namespace and
//!   then cluster wide. Policies nobody granted are dropped.
//! - **Deciding**: the [`DecisionAggregator`] runs every registered
//!   [`Evaluator`] against each bound policy. The first policy that no
//!   evaluator denies approves the request; if all are denied, the request
//!   is denied with every policy's reasons.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use approver::{Cancellation, ReviewEngine};
//!
//! # async fn example(store: Arc<dyn policy::PolicyStore>,
//! #                  oracle: Arc<dyn policy::PermissionOracle>,
//! #                  evaluator: Arc<dyn policy::Evaluator>,
//! #                  request: policy::CertificateRequest) -> approver::Result<()> {
//! let engine = ReviewEngine::builder(store, oracle)
//!     .evaluator(evaluator)
//!     .build();
//!
//! let result = engine.review(&request, &Cancellation::none()).await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```
//!
//! [`PolicyStore`]: policy::PolicyStore
//! [`PermissionOracle`]: policy::PermissionOracle
//! [`Evaluator`]: policy::Evaluator

mod aggregate;
mod binder;
mod cancel;
mod engine;
mod error;
mod result;

#[cfg(test)]
mod testing;

pub use aggregate::{DecisionAggregator, PolicyMessage};
pub use binder::AccessBinder;
pub use cancel::{CancelHandle, Cancellation};
pub use engine::{ReviewEngine, ReviewEngineBuilder};
pub use error::{Error, Result};
pub use result::{NO_BOUND_POLICIES_MESSAGE, NO_POLICIES_MESSAGE, ReviewResult, ReviewStatus};
