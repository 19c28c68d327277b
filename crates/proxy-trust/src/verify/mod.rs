//! Trust verification.
//!
//! - `verifier`: the `TrustVerifier` trait and `ProxyTrustVerifier`
//! - `context`: contexts, the visit budget and `verify_object_trust`
//! - `iterator`: bootstrap-proxy iterators
//! - `policy`: allow-list verifier

pub mod context;
pub mod iterator;
pub mod policy;
pub mod verifier;

pub use context::{
    verify_object_trust, BasicTrustContext, ContextItem, TrustContext, VisitBudget,
    MAX_NESTING_DEPTH,
};
pub use iterator::{
    ProxyTrustIterator, SequenceProxyTrustIterator, SingletonProxyTrustIterator,
    TrustIteratorSource,
};
pub use policy::NamedTrustVerifier;
pub use verifier::{ProxyTrustVerifier, TrustVerifier};
