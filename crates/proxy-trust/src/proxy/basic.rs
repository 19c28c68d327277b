//! A concrete proxy identified by name, used as a main or bootstrap proxy.
//!
//! Service methods answer with `"<name>.<method>"`. A proxy marked offline
//! fails every remote call with `TrustError::Remote`.

use std::any::Any;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::constraint::MethodConstraints;
use crate::error::{Result, TrustError};
use crate::verify::TrustVerifier;

use super::object::{
    Interface, Method, ProxyRef, ProxyTrust, RemoteMethodControl, RemoteObject, TrustEquivalence,
    Value,
};

/// A named proxy with optional capabilities.
#[derive(Debug, Clone)]
pub struct BasicProxy {
    name: String,
    services: Vec<Interface>,
    method_control: bool,
    trust_equivalence: bool,
    verifier: Option<Arc<dyn TrustVerifier>>,
    constraints: Option<MethodConstraints>,
    offline: bool,
}

impl BasicProxy {
    pub fn builder(name: impl Into<String>) -> BasicProxyBuilder {
        BasicProxyBuilder {
            proxy: BasicProxy {
                name: name.into(),
                services: Vec::new(),
                method_control: false,
                trust_equivalence: false,
                verifier: None,
                constraints: None,
                offline: false,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraints(&self) -> Option<&MethodConstraints> {
        self.constraints.as_ref()
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// SHA-256 over the identity of the proxy (name, interfaces and
    /// capabilities), hex encoded. Constraints do not contribute.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.digest())
    }

    fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        for iface in self.interfaces() {
            hasher.update([0u8]);
            hasher.update(iface.name().as_bytes());
        }
        hasher.update([u8::from(self.offline)]);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    /// Same identity, ignoring constraints.
    fn same_identity(&self, other: &Self) -> bool {
        self.name == other.name
            && self.services == other.services
            && self.method_control == other.method_control
            && self.trust_equivalence == other.trust_equivalence
            && self.verifier.is_some() == other.verifier.is_some()
            && self.offline == other.offline
    }

    fn downcast(obj: &ProxyRef) -> Option<&Self> {
        obj.as_any().downcast_ref::<Self>()
    }

    fn remote_call(&self, method: &Method) -> Result<()> {
        if self.offline {
            return Err(TrustError::Remote(format!(
                "{}: {method} failed, endpoint unreachable",
                self.name
            )));
        }
        Ok(())
    }

    fn object_arg(args: &[Value]) -> Option<&ProxyRef> {
        match args.first() {
            Some(Value::Object(o)) => Some(o),
            _ => None,
        }
    }
}

impl RemoteObject for BasicProxy {
    fn interfaces(&self) -> Vec<Interface> {
        let mut all = self.services.clone();
        if self.method_control {
            all.push(Interface::REMOTE_METHOD_CONTROL);
        }
        if self.trust_equivalence {
            all.push(Interface::TRUST_EQUIVALENCE);
        }
        if self.verifier.is_some() {
            all.push(Interface::PROXY_TRUST);
        }
        all
    }

    fn invoke(&self, method: &Method, args: &[Value]) -> Result<Value> {
        if *method == Method::EQUALS {
            return Ok(Value::Bool(
                Self::object_arg(args).is_some_and(|o| self.equals(o)),
            ));
        }
        if *method == Method::HASH_CODE {
            return Ok(Value::Int(self.hash_code() as i64));
        }
        if *method == Method::TO_STRING {
            return Ok(Value::Str(format!("BasicProxy[{}]", self.name)));
        }
        if let Some(control) = self.method_control() {
            if *method == Method::SET_CONSTRAINTS {
                let constraints = match args.first() {
                    Some(Value::Constraints(c)) => c.clone(),
                    _ => {
                        return Err(TrustError::IllegalArgument(
                            "setConstraints expects a constraints argument".into(),
                        ))
                    }
                };
                return control.set_constraints(constraints).map(Value::Object);
            }
            if *method == Method::GET_CONSTRAINTS {
                return control.get_constraints().map(Value::Constraints);
            }
        }
        if let Some(te) = self.trust_equivalence() {
            if *method == Method::CHECK_TRUST_EQUIVALENCE {
                return Ok(Value::Bool(
                    Self::object_arg(args).is_some_and(|o| te.check_trust_equivalence(o)),
                ));
            }
        }
        if let Some(pt) = self.proxy_trust() {
            if *method == Method::GET_PROXY_VERIFIER {
                return pt.get_proxy_verifier().map(Value::Verifier);
            }
        }
        if self.services.contains(method.interface()) {
            self.remote_call(method)?;
            return Ok(Value::Str(format!("{}.{}", self.name, method.name())));
        }
        Err(TrustError::Unsupported(format!(
            "{method} is not implemented by {}",
            self.name
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equals(&self, other: &ProxyRef) -> bool {
        Self::downcast(other)
            .is_some_and(|o| self.same_identity(o) && self.constraints == o.constraints)
    }

    fn hash_code(&self) -> u64 {
        let digest = self.digest();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }

    fn method_control(&self) -> Option<&dyn RemoteMethodControl> {
        self.method_control.then_some(self as &dyn RemoteMethodControl)
    }

    fn trust_equivalence(&self) -> Option<&dyn TrustEquivalence> {
        self.trust_equivalence.then_some(self as &dyn TrustEquivalence)
    }

    fn proxy_trust(&self) -> Option<&dyn ProxyTrust> {
        self.verifier.as_ref().map(|_| self as &dyn ProxyTrust)
    }
}

impl RemoteMethodControl for BasicProxy {
    fn set_constraints(&self, constraints: Option<MethodConstraints>) -> Result<ProxyRef> {
        Ok(Arc::new(Self {
            constraints,
            ..self.clone()
        }))
    }

    fn get_constraints(&self) -> Result<Option<MethodConstraints>> {
        Ok(self.constraints.clone())
    }
}

impl TrustEquivalence for BasicProxy {
    fn check_trust_equivalence(&self, other: &ProxyRef) -> bool {
        Self::downcast(other).is_some_and(|o| self.same_identity(o))
    }
}

impl ProxyTrust for BasicProxy {
    fn get_proxy_verifier(&self) -> Result<Arc<dyn TrustVerifier>> {
        self.remote_call(&Method::GET_PROXY_VERIFIER)?;
        self.verifier
            .clone()
            .ok_or_else(|| TrustError::Unsupported(format!("{} has no verifier", self.name)))
    }
}

/// Builder for `BasicProxy`.
#[derive(Debug)]
pub struct BasicProxyBuilder {
    proxy: BasicProxy,
}

impl BasicProxyBuilder {
    /// Add a service interface. Capability interfaces are ignored here;
    /// use the capability setters instead.
    pub fn interface(mut self, iface: Interface) -> Self {
        if !iface.is_capability() && !self.proxy.services.contains(&iface) {
            self.proxy.services.push(iface);
        }
        self
    }

    pub fn method_control(mut self) -> Self {
        self.proxy.method_control = true;
        self
    }

    pub fn trust_equivalence(mut self) -> Self {
        self.proxy.trust_equivalence = true;
        self
    }

    /// Hand out `verifier` through the ProxyTrust capability.
    pub fn verifier(mut self, verifier: Arc<dyn TrustVerifier>) -> Self {
        self.proxy.verifier = Some(verifier);
        self
    }

    pub fn constraints(mut self, constraints: MethodConstraints) -> Self {
        self.proxy.constraints = Some(constraints);
        self
    }

    /// Make every remote call fail.
    pub fn offline(mut self) -> Self {
        self.proxy.offline = true;
        self
    }

    pub fn build(self) -> Arc<BasicProxy> {
        Arc::new(self.proxy)
    }
}
