//! Principals and principal types named by authentication constraints.

use serde::{Deserialize, Serialize};

/// The kind of authenticated identity a principal carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// X.500 distinguished name, as authenticated by TLS certificates.
    X500,
    /// Kerberos principal name.
    Kerberos,
    /// Any other principal implementation, identified by name.
    Other(String),
}

impl PrincipalKind {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::X500 => "x500",
            Self::Kerberos => "kerberos",
            Self::Other(s) => s.as_str(),
        }
    }
}

/// An authenticated identity: a kind plus a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal {
    pub kind: PrincipalKind,
    pub name: String,
}

impl Principal {
    /// Create an X.500 principal from a distinguished name.
    pub fn x500(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::X500,
            name: name.into(),
        }
    }

    /// Create a Kerberos principal.
    pub fn kerberos(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Kerberos,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.name)
    }
}

/// A principal type as used by the `*PrincipalType` constraints.
///
/// Types form a two-level hierarchy: `Any` is the supertype of every
/// principal kind, every other type admits exactly its own kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalType {
    Any,
    X500,
    Kerberos,
    Named(String),
}

impl PrincipalType {
    /// Whether a principal of `kind` is an instance of this type.
    pub fn admits(&self, kind: &PrincipalKind) -> bool {
        match (self, kind) {
            (Self::Any, _) => true,
            (Self::X500, PrincipalKind::X500) => true,
            (Self::Kerberos, PrincipalKind::Kerberos) => true,
            (Self::Named(a), PrincipalKind::Other(b)) => a == b,
            _ => false,
        }
    }
}
