//! JSON descriptions of proxies.
//!
//! ```json
//! {
//!   "kind": "trust_proxy",
//!   "interfaces": ["Echo"],
//!   "main": { "kind": "basic", "name": "echo", "interfaces": ["Echo"],
//!             "method_control": true, "trust_equivalence": true },
//!   "boot": { "kind": "basic", "name": "echo-boot", "method_control": true,
//!             "trust_equivalence": true, "verifier": { "trusted": ["echo-boot"] } }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constraint::MethodConstraints;
use crate::error::Result;
use crate::proxy::{
    BasicProxy, DynamicProxy, HandlerWireForm, Interface, ProxyRef, ProxyTrustInvocationHandler,
};
use crate::verify::NamedTrustVerifier;

/// Description of a proxy, rebuilt with `materialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProxyDescriptor {
    /// A `BasicProxy`.
    Basic {
        name: String,
        #[serde(default)]
        interfaces: Vec<Interface>,
        #[serde(default)]
        method_control: bool,
        #[serde(default)]
        trust_equivalence: bool,
        /// Present when the proxy hands out a verifier.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        verifier: Option<NamedTrustVerifier>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constraints: Option<MethodConstraints>,
        #[serde(default)]
        offline: bool,
    },
    /// A dynamic proxy backed by a `ProxyTrustInvocationHandler`.
    TrustProxy {
        /// Service interfaces. RemoteMethodControl and TrustEquivalence
        /// are always added.
        #[serde(default)]
        interfaces: Vec<Interface>,
        main: Box<ProxyDescriptor>,
        boot: Box<ProxyDescriptor>,
    },
}

impl ProxyDescriptor {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the described proxy.
    ///
    /// # Errors
    ///
    /// `TrustError::InvalidData` if a trust proxy pairs incompatible main
    /// and bootstrap proxies.
    pub fn materialize(&self) -> Result<ProxyRef> {
        match self {
            Self::Basic {
                name,
                interfaces,
                method_control,
                trust_equivalence,
                verifier,
                constraints,
                offline,
            } => {
                let mut builder = BasicProxy::builder(name.clone());
                for iface in interfaces {
                    builder = builder.interface(iface.clone());
                }
                if *method_control {
                    builder = builder.method_control();
                }
                if *trust_equivalence {
                    builder = builder.trust_equivalence();
                }
                if let Some(v) = verifier {
                    builder = builder.verifier(Arc::new(v.clone()));
                }
                if let Some(c) = constraints {
                    builder = builder.constraints(c.clone());
                }
                if *offline {
                    builder = builder.offline();
                }
                Ok(builder.build())
            }
            Self::TrustProxy {
                interfaces,
                main,
                boot,
            } => {
                let form = HandlerWireForm {
                    main: main.materialize()?,
                    boot: boot.materialize()?,
                };
                let handler = ProxyTrustInvocationHandler::from_wire(form)?;
                let mut all: Vec<Interface> = Vec::new();
                for iface in interfaces.iter().filter(|i| !i.is_capability()) {
                    if !all.contains(iface) {
                        all.push(iface.clone());
                    }
                }
                all.push(Interface::REMOTE_METHOD_CONTROL);
                all.push(Interface::TRUST_EQUIVALENCE);
                Ok(DynamicProxy::new(all, Arc::new(handler))?)
            }
        }
    }
}
