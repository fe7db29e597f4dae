//! SQLite-backed storage for the certificate request approver.
//!
//! This crate keeps the two things the approver host needs to persist:
//! the currently defined policies, and a history of past reviews.
//!
//! # Overview
//!
//! 1. **Policies**: The [`SqliteStore`] implements
//!    [`policy::PolicyStore`], so a review engine can list policies from it
//!    directly. Policies are upserted by name and listed in name order.
//!
//! 2. **Review history**: Every review the host runs can be appended as a
//!    [`ReviewRecord`], giving operators a trail of what was approved or
//!    denied and why.
//!
//! # Example
//!
//! ```no_run
//! use policy::CertificateRequestPolicy;
//! use storage::{ReviewRecord, SqliteStore};
//!
//! let store = SqliteStore::open("approver.db")?;
//! store.apply(&CertificateRequestPolicy::new("web-certs"))?;
//!
//! for policy in store.policies()? {
//!     println!("{}", policy.name);
//! }
//!
//! store.append_review(&ReviewRecord::new("team-a/cert-1", "alice", "approved", "ok"))?;
//! for record in store.reviews(10)? {
//!     println!("{}: {} {}", record.timestamp, record.request, record.status);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod record;
mod store;

pub use error::{Error, Result};
pub use record::{RecordId, ReviewRecord};
pub use store::SqliteStore;
