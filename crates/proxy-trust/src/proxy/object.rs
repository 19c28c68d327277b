//! Remote objects and the capabilities they may expose.
//!
//! A remote object is anything a caller can hold a reference to and
//! invoke methods on. Optional capabilities are discovered through the
//! `Option`-returning accessors on `RemoteObject`, never by probing.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constraint::MethodConstraints;
use crate::error::{Result, TrustError};
use crate::verify::{TrustIteratorSource, TrustVerifier};

use super::dynamic::InvocationHandler;

/// Shared handle to a remote object.
pub type ProxyRef = Arc<dyn RemoteObject>;

/// Name of an interface a remote object implements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interface(Cow<'static, str>);

impl Interface {
    /// Methods every object answers: `equals`, `hashCode`, `toString`.
    pub const OBJECT: Self = Self(Cow::Borrowed("Object"));
    pub const REMOTE_METHOD_CONTROL: Self = Self(Cow::Borrowed("RemoteMethodControl"));
    pub const TRUST_EQUIVALENCE: Self = Self(Cow::Borrowed("TrustEquivalence"));
    pub const PROXY_TRUST: Self = Self(Cow::Borrowed("ProxyTrust"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the capability interfaces defined here
    /// rather than a service interface.
    pub fn is_capability(&self) -> bool {
        *self == Self::OBJECT
            || *self == Self::REMOTE_METHOD_CONTROL
            || *self == Self::TRUST_EQUIVALENCE
            || *self == Self::PROXY_TRUST
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A method, identified by its declaring interface and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    interface: Interface,
    name: Cow<'static, str>,
}

impl Method {
    pub const EQUALS: Self = Self::declared(Interface::OBJECT, "equals");
    pub const HASH_CODE: Self = Self::declared(Interface::OBJECT, "hashCode");
    pub const TO_STRING: Self = Self::declared(Interface::OBJECT, "toString");
    pub const SET_CONSTRAINTS: Self =
        Self::declared(Interface::REMOTE_METHOD_CONTROL, "setConstraints");
    pub const GET_CONSTRAINTS: Self =
        Self::declared(Interface::REMOTE_METHOD_CONTROL, "getConstraints");
    pub const CHECK_TRUST_EQUIVALENCE: Self =
        Self::declared(Interface::TRUST_EQUIVALENCE, "checkTrustEquivalence");
    pub const GET_PROXY_VERIFIER: Self = Self::declared(Interface::PROXY_TRUST, "getProxyVerifier");

    const fn declared(interface: Interface, name: &'static str) -> Self {
        Self {
            interface,
            name: Cow::Borrowed(name),
        }
    }

    pub fn new(interface: Interface, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            interface,
            name: name.into(),
        }
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.interface, self.name)
    }
}

/// Argument or result of a method invocation.
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Str(String),
    Object(ProxyRef),
    Constraints(Option<MethodConstraints>),
    Verifier(Arc<dyn TrustVerifier>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::Constraints(_) => "constraints",
            Self::Verifier(_) => "verifier",
        }
    }

    fn mismatch(&self, expected: &str) -> TrustError {
        TrustError::IllegalArgument(format!("expected {expected}, got {}", self.kind()))
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn into_int(self) -> Result<i64> {
        match self {
            Self::Int(i) => Ok(i),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn into_object(self) -> Result<ProxyRef> {
        match self {
            Self::Object(o) => Ok(o),
            other => Err(other.mismatch("object")),
        }
    }

    pub fn into_constraints(self) -> Result<Option<MethodConstraints>> {
        match self {
            Self::Constraints(c) => Ok(c),
            other => Err(other.mismatch("constraints")),
        }
    }

    pub fn into_verifier(self) -> Result<Arc<dyn TrustVerifier>> {
        match self {
            Self::Verifier(v) => Ok(v),
            other => Err(other.mismatch("verifier")),
        }
    }
}

/// An object that can be invoked remotely.
pub trait RemoteObject: fmt::Debug + Send + Sync {
    /// Interfaces implemented, in declaration order.
    fn interfaces(&self) -> Vec<Interface>;

    /// Invoke `method` with `args`.
    fn invoke(&self, method: &Method, args: &[Value]) -> Result<Value>;

    fn as_any(&self) -> &dyn Any;

    /// Plain equality. Defaults to identity.
    fn equals(&self, other: &ProxyRef) -> bool {
        same_object(self.as_any(), other.as_any())
    }

    /// Hash consistent with `equals`. Defaults to the object address.
    fn hash_code(&self) -> u64 {
        (self.as_any() as *const dyn Any).cast::<()>() as usize as u64
    }

    /// Remote-method-control capability: attaching call constraints.
    fn method_control(&self) -> Option<&dyn RemoteMethodControl> {
        None
    }

    /// Trust-equivalence capability.
    fn trust_equivalence(&self) -> Option<&dyn TrustEquivalence> {
        None
    }

    /// Verification-result capability: handing out a `TrustVerifier`.
    fn proxy_trust(&self) -> Option<&dyn ProxyTrust> {
        None
    }

    /// Proxy-trust capability implemented by the object itself.
    fn trust_iterator_source(&self) -> Option<&dyn TrustIteratorSource> {
        None
    }

    /// The handler behind a dynamic proxy.
    fn invocation_handler(&self) -> Option<&dyn InvocationHandler> {
        None
    }

    fn implements(&self, interface: &Interface) -> bool {
        self.interfaces().contains(interface)
    }
}

/// Attach and read invocation constraints.
///
/// Setting constraints never mutates the object: a new object carrying
/// the constraints is returned.
pub trait RemoteMethodControl {
    fn set_constraints(&self, constraints: Option<MethodConstraints>) -> Result<ProxyRef>;

    fn get_constraints(&self) -> Result<Option<MethodConstraints>>;
}

/// Equality that ignores transient constraint state.
pub trait TrustEquivalence {
    fn check_trust_equivalence(&self, other: &ProxyRef) -> bool;
}

/// Hands out the verifier that decides trust for related proxies.
pub trait ProxyTrust {
    /// May require a remote call.
    fn get_proxy_verifier(&self) -> Result<Arc<dyn TrustVerifier>>;
}

/// Whether two references point at the same object.
pub fn same_object(a: &dyn Any, b: &dyn Any) -> bool {
    std::ptr::eq(
        (a as *const dyn Any).cast::<()>(),
        (b as *const dyn Any).cast::<()>(),
    )
}

/// The object's `toString` form, falling back to its debug form.
pub fn describe(obj: &ProxyRef) -> String {
    obj.invoke(&Method::TO_STRING, &[])
        .and_then(Value::into_string)
        .unwrap_or_else(|_| format!("{obj:?}"))
}
