//! Rule-based permission oracle.
//!
//! Decides whether a user may "use" a certificate request policy from roles
//! and bindings declared in TOML. Roles name the policies they cover;
//! bindings grant a role to users or groups, either in one namespace or
//! cluster wide.

mod error;
mod oracle;
mod rules;

pub use error::{Error, Result};
pub use oracle::RbacOracle;
pub use rules::{Binding, Role, Rules, Subject};
