//! Invocation constraints: what a remote call must or should guarantee.
//!
//! The constraint module provides:
//! - Individual constraints (confidentiality, integrity, authentication,
//!   delegation, connection time)
//! - Constraint alternatives (any one of a set)
//! - Requirement/preference sets with relative-to-absolute conversion
//! - Per-method constraint tables

pub mod alternatives;
pub mod method;
pub mod principal;
pub mod set;
pub mod types;

pub use alternatives::ConstraintAlternatives;
pub use method::{MethodConstraints, MethodDesc, MethodEntry};
pub use principal::{Principal, PrincipalKind, PrincipalType};
pub use set::{InvocationConstraints, InvocationConstraintsBuilder};
pub use types::{DelegationWindow, InvocationConstraint, Strength, Toggle};
