//! Dynamic proxies: objects whose every call goes to an invocation handler.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::constraint::MethodConstraints;
use crate::error::{Result, TrustError};
use crate::verify::{TrustIteratorSource, TrustVerifier};

use super::object::{
    Interface, Method, ProxyRef, ProxyTrust, RemoteMethodControl, RemoteObject, TrustEquivalence,
    Value,
};

/// Receives every invocation made on a `DynamicProxy`.
pub trait InvocationHandler: fmt::Debug + Send + Sync {
    /// Handle `method` invoked on `proxy`.
    fn invoke(&self, proxy: &DynamicProxy, method: &Method, args: &[Value]) -> Result<Value>;

    fn as_any(&self) -> &dyn Any;

    /// Proxy-trust capability implemented by the handler.
    fn trust_iterator_source(&self) -> Option<&dyn TrustIteratorSource> {
        None
    }
}

/// How a handler routes a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Equals,
    ToString,
    HashCode,
    SetConstraints,
    CheckTrustEquivalence,
    /// Everything else goes to the main proxy.
    Delegate,
}

impl MethodKind {
    pub fn classify(method: &Method) -> Self {
        if *method == Method::EQUALS {
            Self::Equals
        } else if *method == Method::TO_STRING {
            Self::ToString
        } else if *method == Method::HASH_CODE {
            Self::HashCode
        } else if *method == Method::SET_CONSTRAINTS {
            Self::SetConstraints
        } else if *method == Method::CHECK_TRUST_EQUIVALENCE {
            Self::CheckTrustEquivalence
        } else {
            Self::Delegate
        }
    }
}

/// A proxy implementing a fixed interface list by forwarding every
/// invocation to its handler.
#[derive(Debug)]
pub struct DynamicProxy {
    interfaces: Vec<Interface>,
    handler: Arc<dyn InvocationHandler>,
}

impl DynamicProxy {
    /// Create a proxy.
    ///
    /// # Errors
    ///
    /// `TrustError::IllegalArgument` if an interface is listed twice or the
    /// list names `Object`.
    pub fn new(interfaces: Vec<Interface>, handler: Arc<dyn InvocationHandler>) -> Result<Arc<Self>> {
        for (i, iface) in interfaces.iter().enumerate() {
            if *iface == Interface::OBJECT {
                return Err(TrustError::IllegalArgument(
                    "Object is implicit and cannot be listed".into(),
                ));
            }
            if interfaces[..i].contains(iface) {
                return Err(TrustError::IllegalArgument(format!(
                    "repeated interface: {iface}"
                )));
            }
        }
        Ok(Arc::new(Self {
            interfaces,
            handler,
        }))
    }

    pub fn handler(&self) -> &Arc<dyn InvocationHandler> {
        &self.handler
    }

    pub fn interface_list(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Whether `handler` is this proxy's handler instance.
    pub fn is_handled_by(&self, handler: &dyn InvocationHandler) -> bool {
        same_handler(self.handler.as_ref(), handler)
    }

    /// Whether `other` is a dynamic proxy with the same interface list.
    pub fn same_shape<'a>(&self, other: &'a ProxyRef) -> Option<&'a DynamicProxy> {
        other
            .as_any()
            .downcast_ref::<DynamicProxy>()
            .filter(|o| o.interfaces == self.interfaces)
    }

    fn call(&self, method: &Method, args: &[Value]) -> Result<Value> {
        self.handler.invoke(self, method, args)
    }

    /// Answer a boolean query through the handler. These queries cannot
    /// report errors, so a failing handler answers `false`; security
    /// failures are logged at `warn!`, anything else at `debug!`.
    fn ask(&self, method: &Method, args: &[Value]) -> bool {
        match self.call(method, args).and_then(Value::into_bool) {
            Ok(answer) => answer,
            Err(e) if e.is_security() => {
                log::warn!("{method} denied, answering false: {e}");
                false
            }
            Err(e) => {
                log::debug!("{method} failed, answering false: {e}");
                false
            }
        }
    }
}

/// Whether two handler references point at the same handler.
pub fn same_handler(a: &dyn InvocationHandler, b: &dyn InvocationHandler) -> bool {
    std::ptr::eq(
        (a as *const dyn InvocationHandler).cast::<()>(),
        (b as *const dyn InvocationHandler).cast::<()>(),
    )
}

impl RemoteObject for DynamicProxy {
    fn interfaces(&self) -> Vec<Interface> {
        self.interfaces.clone()
    }

    fn invoke(&self, method: &Method, args: &[Value]) -> Result<Value> {
        let declared = *method.interface() == Interface::OBJECT
            || self.interfaces.contains(method.interface());
        if !declared {
            return Err(TrustError::Unsupported(format!(
                "{method} is not declared by this proxy"
            )));
        }
        self.call(method, args)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equals(&self, other: &ProxyRef) -> bool {
        self.ask(&Method::EQUALS, &[Value::Object(other.clone())])
    }

    fn hash_code(&self) -> u64 {
        self.call(&Method::HASH_CODE, &[])
            .and_then(Value::into_int)
            .map(|h| h as u64)
            .unwrap_or(0)
    }

    fn method_control(&self) -> Option<&dyn RemoteMethodControl> {
        self.implements(&Interface::REMOTE_METHOD_CONTROL)
            .then_some(self as &dyn RemoteMethodControl)
    }

    fn trust_equivalence(&self) -> Option<&dyn TrustEquivalence> {
        self.implements(&Interface::TRUST_EQUIVALENCE)
            .then_some(self as &dyn TrustEquivalence)
    }

    fn proxy_trust(&self) -> Option<&dyn ProxyTrust> {
        self.implements(&Interface::PROXY_TRUST)
            .then_some(self as &dyn ProxyTrust)
    }

    fn invocation_handler(&self) -> Option<&dyn InvocationHandler> {
        Some(self.handler.as_ref())
    }

    fn implements(&self, interface: &Interface) -> bool {
        self.interfaces.contains(interface)
    }
}

impl RemoteMethodControl for DynamicProxy {
    fn set_constraints(&self, constraints: Option<MethodConstraints>) -> Result<ProxyRef> {
        self.call(&Method::SET_CONSTRAINTS, &[Value::Constraints(constraints)])?
            .into_object()
    }

    fn get_constraints(&self) -> Result<Option<MethodConstraints>> {
        self.call(&Method::GET_CONSTRAINTS, &[])?.into_constraints()
    }
}

impl TrustEquivalence for DynamicProxy {
    fn check_trust_equivalence(&self, other: &ProxyRef) -> bool {
        self.ask(&Method::CHECK_TRUST_EQUIVALENCE, &[Value::Object(other.clone())])
    }
}

impl ProxyTrust for DynamicProxy {
    fn get_proxy_verifier(&self) -> Result<Arc<dyn TrustVerifier>> {
        self.call(&Method::GET_PROXY_VERIFIER, &[])?.into_verifier()
    }
}

impl fmt::Display for DynamicProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.call(&Method::TO_STRING, &[]).and_then(Value::into_string) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "Proxy[{:?}]", self.handler),
        }
    }
}
