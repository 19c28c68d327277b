//! Individual invocation constraints.
//!
//! A constraint names one property a remote call must (requirement) or
//! should (preference) satisfy: confidentiality, integrity, who is
//! authenticated as whom, delegation, and how long a connection may take.
//! Times are milliseconds; absolute times are relative to the Unix epoch,
//! relative times to the moment the call is made.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

use super::alternatives::ConstraintAlternatives;
use super::principal::{Principal, PrincipalType};

/// Yes/no value of a boolean constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Yes,
    No,
}

/// Requested strength of confidentiality protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Strong,
    Weak,
}

/// Bounds on when delegated credentials may start and stop being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DelegationWindow {
    pub min_start: i64,
    pub max_start: i64,
    pub min_stop: i64,
    pub max_stop: i64,
}

impl DelegationWindow {
    /// Create a window, checking that the bounds are ordered.
    pub fn new(min_start: i64, max_start: i64, min_stop: i64, max_stop: i64) -> Result<Self> {
        let window = Self {
            min_start,
            max_start,
            min_stop,
            max_stop,
        };
        window.validate()?;
        Ok(window)
    }

    fn validate(&self) -> Result<()> {
        if self.min_start > self.max_start
            || self.min_stop > self.max_stop
            || self.max_start > self.max_stop
            || self.min_start > self.min_stop
        {
            return Err(TrustError::InvalidConstraint(format!(
                "delegation window out of order: {self:?}"
            )));
        }
        Ok(())
    }

    fn shifted(&self, base: i64) -> Self {
        Self {
            min_start: self.min_start.saturating_add(base),
            max_start: self.max_start.saturating_add(base),
            min_stop: self.min_stop.saturating_add(base),
            max_stop: self.max_stop.saturating_add(base),
        }
    }
}

/// A single invocation constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationConstraint {
    Confidentiality(Toggle),
    ConfidentialityStrength(Strength),
    Integrity(Toggle),
    ClientAuthentication(Toggle),
    ServerAuthentication(Toggle),
    Delegation(Toggle),
    /// The client must authenticate as at least all of these principals.
    ClientMinPrincipal(BTreeSet<Principal>),
    /// The client may authenticate as at most these principals.
    ClientMaxPrincipal(BTreeSet<Principal>),
    ClientMinPrincipalType(BTreeSet<PrincipalType>),
    ClientMaxPrincipalType(BTreeSet<PrincipalType>),
    /// The server must authenticate as at least all of these principals.
    ServerMinPrincipal(BTreeSet<Principal>),
    DelegationAbsoluteTime(DelegationWindow),
    DelegationRelativeTime(DelegationWindow),
    /// Latest absolute time by which the connection must be established.
    ConnectionAbsoluteTime(i64),
    /// Maximum duration allowed for establishing the connection.
    ConnectionRelativeTime(i64),
    Alternatives(ConstraintAlternatives),
    /// A constraint this crate does not understand; never supported.
    Unknown(String),
}

impl InvocationConstraint {
    pub const CONFIDENTIALITY_YES: Self = Self::Confidentiality(Toggle::Yes);
    pub const CONFIDENTIALITY_NO: Self = Self::Confidentiality(Toggle::No);
    pub const INTEGRITY_YES: Self = Self::Integrity(Toggle::Yes);
    pub const INTEGRITY_NO: Self = Self::Integrity(Toggle::No);
    pub const CLIENT_AUTHENTICATION_YES: Self = Self::ClientAuthentication(Toggle::Yes);
    pub const CLIENT_AUTHENTICATION_NO: Self = Self::ClientAuthentication(Toggle::No);
    pub const SERVER_AUTHENTICATION_YES: Self = Self::ServerAuthentication(Toggle::Yes);
    pub const SERVER_AUTHENTICATION_NO: Self = Self::ServerAuthentication(Toggle::No);
    pub const DELEGATION_YES: Self = Self::Delegation(Toggle::Yes);
    pub const DELEGATION_NO: Self = Self::Delegation(Toggle::No);

    /// Client must authenticate as at least `principals`.
    pub fn client_min_principal(principals: impl IntoIterator<Item = Principal>) -> Result<Self> {
        non_empty_set("ClientMinPrincipal", principals).map(Self::ClientMinPrincipal)
    }

    /// Client may authenticate as at most `principals`.
    pub fn client_max_principal(principals: impl IntoIterator<Item = Principal>) -> Result<Self> {
        non_empty_set("ClientMaxPrincipal", principals).map(Self::ClientMaxPrincipal)
    }

    /// Server must authenticate as at least `principals`.
    pub fn server_min_principal(principals: impl IntoIterator<Item = Principal>) -> Result<Self> {
        non_empty_set("ServerMinPrincipal", principals).map(Self::ServerMinPrincipal)
    }

    pub fn client_min_principal_type(
        types: impl IntoIterator<Item = PrincipalType>,
    ) -> Result<Self> {
        non_empty_set("ClientMinPrincipalType", types).map(Self::ClientMinPrincipalType)
    }

    pub fn client_max_principal_type(
        types: impl IntoIterator<Item = PrincipalType>,
    ) -> Result<Self> {
        non_empty_set("ClientMaxPrincipalType", types).map(Self::ClientMaxPrincipalType)
    }

    /// Relative connection time; negative durations are rejected.
    pub fn connection_relative_time(millis: i64) -> Result<Self> {
        let c = Self::ConnectionRelativeTime(millis);
        c.validate()?;
        Ok(c)
    }

    /// Check the invariants a deserialized constraint may have violated.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::ClientMinPrincipal(s) | Self::ClientMaxPrincipal(s) | Self::ServerMinPrincipal(s)
                if s.is_empty() =>
            {
                Err(TrustError::InvalidConstraint(
                    "principal constraint with no principals".into(),
                ))
            }
            Self::ClientMinPrincipalType(s) | Self::ClientMaxPrincipalType(s) if s.is_empty() => {
                Err(TrustError::InvalidConstraint(
                    "principal type constraint with no types".into(),
                ))
            }
            Self::ConnectionRelativeTime(t) if *t < 0 => Err(TrustError::InvalidConstraint(
                format!("negative relative connection time: {t}"),
            )),
            Self::DelegationAbsoluteTime(w) | Self::DelegationRelativeTime(w) => w.validate(),
            Self::Alternatives(alts) => alts.elements().iter().try_for_each(|c| c.validate()),
            _ => Ok(()),
        }
    }

    /// Whether `self` and `other` are the same kind of constraint.
    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Whether this constraint carries a time relative to the call.
    pub fn is_relative(&self) -> bool {
        match self {
            Self::ConnectionRelativeTime(_) | Self::DelegationRelativeTime(_) => true,
            Self::Alternatives(alts) => alts.elements().iter().any(|c| c.is_relative()),
            _ => false,
        }
    }

    /// Convert relative times to absolute ones, taking `base` as "now".
    pub fn make_absolute(&self, base: i64) -> Self {
        match self {
            Self::ConnectionRelativeTime(t) => Self::ConnectionAbsoluteTime(base.saturating_add(*t)),
            Self::DelegationRelativeTime(w) => Self::DelegationAbsoluteTime(w.shifted(base)),
            Self::Alternatives(alts) => alts.make_absolute(base),
            other => other.clone(),
        }
    }
}

fn non_empty_set<T: Ord>(what: &str, items: impl IntoIterator<Item = T>) -> Result<BTreeSet<T>> {
    let set: BTreeSet<T> = items.into_iter().collect();
    if set.is_empty() {
        return Err(TrustError::InvalidConstraint(format!(
            "{what} requires at least one element"
        )));
    }
    Ok(set)
}
