//! ProxyTrust: trust verification for smart proxies and
//! constraint negotiation for secure connections.
//!
//! Provides bootstrap-proxy trust verification, the main/bootstrap proxy
//! pairing handler, invocation constraints, and per-cipher-suite
//! constraint negotiation for remote calls.

pub mod config;
pub mod constraint;
pub mod descriptor;
pub mod error;
pub mod proxy;
pub mod time;
pub mod transport;
pub mod verify;

// Re-export primary types
pub use config::TrustConfig;
pub use error::{Result, TrustError};

// Re-export constraint types
pub use constraint::{
    ConstraintAlternatives, DelegationWindow, InvocationConstraint, InvocationConstraints,
    MethodConstraints, MethodDesc, Principal, PrincipalKind, PrincipalType, Strength, Toggle,
};

// Re-export proxy types
pub use descriptor::ProxyDescriptor;
pub use proxy::{
    BasicProxy, DynamicProxy, HandlerWireForm, Interface, InvocationHandler, Method, ProxyRef,
    ProxyTrustInvocationHandler, RemoteObject, Value,
};

// Re-export verification types
pub use verify::{
    verify_object_trust, BasicTrustContext, ContextItem, NamedTrustVerifier, ProxyTrustIterator,
    ProxyTrustVerifier, TrustContext, TrustVerifier, VisitBudget,
};

// Re-export transport types
pub use transport::{CipherSuite, ConnectionContext, Support};
