//! Per-method constraints.
//!
//! Maps method names to the `InvocationConstraints` that apply to calls of
//! those methods. Descriptors are matched in order and the first match
//! wins; a descriptor that can never match because an earlier one already
//! covers every name it would match is rejected at construction.
//!
//! Descriptor syntax:
//!   - `getConstraints`: exactly that method
//!   - `get*`: any method whose name starts with `get`
//!   - `*Verifier`: any method whose name ends with `Verifier`
//!   - `*`: every method

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};
use crate::proxy::Method;

use super::set::InvocationConstraints;

/// Pattern selecting methods by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MethodDesc {
    Any,
    Exact(String),
    Prefix(String),
    Suffix(String),
}

impl MethodDesc {
    /// Parse a descriptor pattern.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern == "*" {
            return Ok(Self::Any);
        }
        let (desc, name) = if let Some(prefix) = pattern.strip_suffix('*') {
            (Self::Prefix(prefix.to_string()), prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            (Self::Suffix(suffix.to_string()), suffix)
        } else {
            (Self::Exact(pattern.to_string()), pattern)
        };
        if name.is_empty() || !name.chars().all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$') {
            return Err(TrustError::IllegalArgument(format!(
                "invalid method descriptor: {pattern:?}"
            )));
        }
        Ok(desc)
    }

    /// Whether this descriptor selects a method named `name`.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(n) => n == name,
            Self::Prefix(p) => name.starts_with(p.as_str()),
            Self::Suffix(s) => name.ends_with(s.as_str()),
        }
    }

    /// Whether every name `other` matches is also matched by `self`.
    pub fn covers(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (_, Self::Any) => false,
            (_, Self::Exact(n)) => self.matches(n),
            (Self::Prefix(p), Self::Prefix(q)) => q.starts_with(p.as_str()),
            (Self::Suffix(s), Self::Suffix(t)) => t.ends_with(s.as_str()),
            _ => false,
        }
    }
}

impl TryFrom<String> for MethodDesc {
    type Error = TrustError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<MethodDesc> for String {
    fn from(desc: MethodDesc) -> Self {
        desc.to_string()
    }
}

impl std::fmt::Display for MethodDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Exact(n) => write!(f, "{n}"),
            Self::Prefix(p) => write!(f, "{p}*"),
            Self::Suffix(s) => write!(f, "*{s}"),
        }
    }
}

/// One descriptor and the constraints it selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodEntry {
    pub method: MethodDesc,
    pub constraints: InvocationConstraints,
}

/// Constraints keyed by method, with a default for unmatched methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMethodConstraints")]
pub struct MethodConstraints {
    entries: Vec<MethodEntry>,
    default: InvocationConstraints,
}

#[derive(Deserialize)]
struct RawMethodConstraints {
    #[serde(default)]
    entries: Vec<MethodEntry>,
    #[serde(default)]
    default: InvocationConstraints,
}

impl TryFrom<RawMethodConstraints> for MethodConstraints {
    type Error = TrustError;

    fn try_from(raw: RawMethodConstraints) -> Result<Self> {
        let mut mc = Self::uniform(raw.default);
        for entry in raw.entries {
            mc = mc.with(entry.method, entry.constraints)?;
        }
        Ok(mc)
    }
}

impl MethodConstraints {
    /// The same constraints for every method.
    pub fn uniform(constraints: InvocationConstraints) -> Self {
        Self {
            entries: Vec::new(),
            default: constraints,
        }
    }

    /// Append a descriptor. Fails if an earlier descriptor shadows it.
    pub fn with(mut self, method: MethodDesc, constraints: InvocationConstraints) -> Result<Self> {
        if let Some(earlier) = self.entries.iter().find(|e| e.method.covers(&method)) {
            return Err(TrustError::IllegalArgument(format!(
                "method descriptor {method} is shadowed by {}",
                earlier.method
            )));
        }
        self.entries.push(MethodEntry {
            method,
            constraints,
        });
        Ok(self)
    }

    /// Constraints for calls of `method`.
    pub fn get_constraints(&self, method: &Method) -> &InvocationConstraints {
        self.entries
            .iter()
            .find(|e| e.method.matches(method.name()))
            .map(|e| &e.constraints)
            .unwrap_or(&self.default)
    }

    /// Every constraint set some method could receive.
    pub fn possible_constraints(&self) -> impl Iterator<Item = &InvocationConstraints> {
        self.entries
            .iter()
            .map(|e| &e.constraints)
            .chain(std::iter::once(&self.default))
    }

    pub fn entries(&self) -> &[MethodEntry] {
        &self.entries
    }
}
