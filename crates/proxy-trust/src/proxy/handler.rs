//! The invocation handler pairing a main proxy with a bootstrap proxy.
//!
//! Ordinary calls go to the main proxy. Trust-sensitive calls
//! (`equals`, `hashCode`, `toString`, `setConstraints`,
//! `checkTrustEquivalence`) are answered here, and the bootstrap proxy
//! is what the trust verifier examines on the main proxy's behalf.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::constraint::MethodConstraints;
use crate::error::{Result, TrustError};
use crate::verify::{ProxyTrustIterator, SingletonProxyTrustIterator, TrustIteratorSource};

use super::dynamic::{same_handler, DynamicProxy, InvocationHandler, MethodKind};
use super::object::{describe, Interface, Method, ProxyRef, Value};

/// Serialized form of a handler: exactly the (main, boot) pair.
#[derive(Debug, Clone)]
pub struct HandlerWireForm {
    pub main: ProxyRef,
    pub boot: ProxyRef,
}

/// Handler for a dynamic proxy whose trust is established through a
/// separate bootstrap proxy.
#[derive(Debug, Clone)]
pub struct ProxyTrustInvocationHandler {
    main: ProxyRef,
    boot: ProxyRef,
}

impl ProxyTrustInvocationHandler {
    /// Pair a main proxy with a bootstrap proxy.
    ///
    /// # Errors
    ///
    /// `TrustError::IllegalArgument` if `main` lacks trust equivalence or
    /// `boot` lacks remote method control or trust equivalence.
    pub fn new(main: ProxyRef, boot: ProxyRef) -> Result<Self> {
        Self::validate(&main, &boot).map_err(TrustError::IllegalArgument)?;
        Ok(Self { main, boot })
    }

    /// Rebuild a handler from its wire form, re-running the pairing checks.
    ///
    /// # Errors
    ///
    /// `TrustError::InvalidData` if the pairing is invalid.
    pub fn from_wire(form: HandlerWireForm) -> Result<Self> {
        Self::validate(&form.main, &form.boot).map_err(TrustError::InvalidData)?;
        Ok(Self {
            main: form.main,
            boot: form.boot,
        })
    }

    pub fn to_wire(&self) -> HandlerWireForm {
        HandlerWireForm {
            main: self.main.clone(),
            boot: self.boot.clone(),
        }
    }

    /// Pairing invariants, checked on every entry point that builds a handler.
    fn validate(main: &ProxyRef, boot: &ProxyRef) -> std::result::Result<(), String> {
        if main.trust_equivalence().is_none() {
            return Err("main proxy must implement TrustEquivalence".into());
        }
        if boot.method_control().is_none() {
            return Err("bootstrap proxy must implement RemoteMethodControl".into());
        }
        if boot.trust_equivalence().is_none() {
            return Err("bootstrap proxy must implement TrustEquivalence".into());
        }
        Ok(())
    }

    /// Build a dynamic proxy over `interfaces` backed by a new handler.
    pub fn create_proxy(
        interfaces: Vec<Interface>,
        main: ProxyRef,
        boot: ProxyRef,
    ) -> Result<Arc<DynamicProxy>> {
        let handler = Self::new(main, boot)?;
        DynamicProxy::new(interfaces, Arc::new(handler))
    }

    pub fn main(&self) -> &ProxyRef {
        &self.main
    }

    pub fn boot(&self) -> &ProxyRef {
        &self.boot
    }

    /// Plain equality: same instance, or both proxies equal.
    pub fn equals(&self, other: &dyn InvocationHandler) -> bool {
        if same_handler(self, other) {
            return true;
        }
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| self.main.equals(&o.main) && self.boot.equals(&o.boot))
    }

    pub fn hash_code(&self) -> u64 {
        self.main.hash_code()
    }

    /// Trust equivalence requires both halves to be equivalent.
    pub fn check_trust_equivalence(&self, other: &dyn InvocationHandler) -> bool {
        if same_handler(self, other) {
            return true;
        }
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        let main_equivalent = self
            .main
            .trust_equivalence()
            .is_some_and(|te| te.check_trust_equivalence(&other.main));
        let boot_equivalent = self
            .boot
            .trust_equivalence()
            .is_some_and(|te| te.check_trust_equivalence(&other.boot));
        main_equivalent && boot_equivalent
    }

    // ── Intercepted methods ──────────────────────────────────────────────────

    fn proxy_equals(&self, proxy: &DynamicProxy, args: &[Value]) -> bool {
        let Some(Value::Object(other)) = args.first() else {
            return false;
        };
        if std::ptr::eq(
            (proxy as *const DynamicProxy).cast::<()>(),
            (other.as_any() as *const dyn Any).cast::<()>(),
        ) {
            return true;
        }
        proxy
            .same_shape(other)
            .is_some_and(|o| self.equals(o.handler().as_ref()))
    }

    /// `Proxy[<interface>,<handler>]`, naming the first service interface
    /// the proxy declares. Only proxies declaring nothing but capability
    /// interfaces show their first capability interface instead.
    fn proxy_to_string(&self, proxy: &DynamicProxy) -> String {
        let interfaces = proxy.interface_list();
        let shown = interfaces
            .iter()
            .find(|i| !i.is_capability())
            .or_else(|| interfaces.first())
            .map(Interface::name)
            .unwrap_or("");
        format!("Proxy[{shown},{self}]")
    }

    fn set_proxy_constraints(&self, proxy: &DynamicProxy, args: &[Value]) -> Result<Value> {
        if !proxy.is_handled_by(self) {
            return Err(TrustError::IllegalArgument(
                "setConstraints invoked through a proxy not owning this handler".into(),
            ));
        }
        let constraints: Option<MethodConstraints> = match args.first() {
            Some(Value::Constraints(c)) => c.clone(),
            _ => {
                return Err(TrustError::IllegalArgument(
                    "setConstraints expects a constraints argument".into(),
                ))
            }
        };
        let control = self.main.method_control().ok_or_else(|| {
            TrustError::Unsupported("main proxy does not implement RemoteMethodControl".into())
        })?;
        let new_main = control.set_constraints(constraints)?;
        let handler = Self::new(new_main, self.boot.clone())?;
        let new_proxy = DynamicProxy::new(proxy.interface_list().to_vec(), Arc::new(handler))?;
        Ok(Value::Object(new_proxy))
    }

    fn proxy_trust_equivalence(&self, proxy: &DynamicProxy, args: &[Value]) -> bool {
        let Some(Value::Object(other)) = args.first() else {
            return false;
        };
        proxy
            .same_shape(other)
            .is_some_and(|o| self.check_trust_equivalence(o.handler().as_ref()))
    }
}

impl InvocationHandler for ProxyTrustInvocationHandler {
    fn invoke(&self, proxy: &DynamicProxy, method: &Method, args: &[Value]) -> Result<Value> {
        match MethodKind::classify(method) {
            MethodKind::Equals => Ok(Value::Bool(self.proxy_equals(proxy, args))),
            MethodKind::ToString => Ok(Value::Str(self.proxy_to_string(proxy))),
            MethodKind::HashCode => Ok(Value::Int(self.hash_code() as i64)),
            MethodKind::SetConstraints => self.set_proxy_constraints(proxy, args),
            MethodKind::CheckTrustEquivalence => {
                Ok(Value::Bool(self.proxy_trust_equivalence(proxy, args)))
            }
            MethodKind::Delegate => self.main.invoke(method, args),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn trust_iterator_source(&self) -> Option<&dyn TrustIteratorSource> {
        Some(self)
    }
}

impl TrustIteratorSource for ProxyTrustInvocationHandler {
    fn proxy_trust_iterator(&self) -> Result<Box<dyn ProxyTrustIterator>> {
        Ok(Box::new(SingletonProxyTrustIterator::new(self.boot.clone())))
    }
}

impl fmt::Display for ProxyTrustInvocationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProxyTrustInvocationHandler[{}, {}]",
            describe(&self.main),
            describe(&self.boot)
        )
    }
}
