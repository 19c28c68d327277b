//! Proxies and the trust-aware invocation handler.
//!
//! - `object`: the `RemoteObject` trait and capability traits
//! - `dynamic`: handler-backed dynamic proxies and method classification
//! - `handler`: `ProxyTrustInvocationHandler` pairing main and bootstrap proxies
//! - `basic`: a concrete named proxy

pub mod basic;
pub mod dynamic;
pub mod handler;
pub mod object;

pub use basic::{BasicProxy, BasicProxyBuilder};
pub use dynamic::{DynamicProxy, InvocationHandler, MethodKind};
pub use handler::{HandlerWireForm, ProxyTrustInvocationHandler};
pub use object::{
    describe, Interface, Method, ProxyRef, ProxyTrust, RemoteMethodControl, RemoteObject,
    TrustEquivalence, Value,
};
