//! Connection context: can a candidate connection satisfy the constraints?
//!
//! A context pairs one cipher suite with the client and server principals a
//! connection would authenticate as, and checks that combination against a
//! call's `InvocationConstraints`. Requirements are checked first, in order;
//! any unsupported requirement rejects the combination. Preferences are then
//! counted, unsupported ones are skipped. The derived fields rank viable
//! connections against each other.
//!
//! Relative times are only meaningful on the server side, which measures
//! them from when the call arrived. Clients convert them with
//! `InvocationConstraints::make_absolute` before negotiating.

use log::{debug, trace};

use crate::config::TrustConfig;
use crate::constraint::{
    ConstraintAlternatives, InvocationConstraint, InvocationConstraints, Principal, Strength, Toggle,
};

use super::cipher_suite::CipherSuite;

/// How a connection would satisfy a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// The constraint cannot be satisfied.
    NotSupported,
    /// Satisfied with no further obligation.
    Ok,
    /// Satisfied only if codebase integrity is enforced.
    Integrity,
    /// Satisfied if the connection is established by this time (ms).
    Deadline(u64),
}

impl Support {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::NotSupported)
    }
}

/// One viable way to connect, with its derived negotiation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    cipher_suite: String,
    client: Option<Principal>,
    server: Option<Principal>,
    client_side: bool,
    max_alternative_depth: usize,
    integrity_required: bool,
    integrity_preferred: bool,
    connection_time: Option<u64>,
    preferences: usize,
}

impl ConnectionContext {
    /// Return the context for this combination, or `None` if it cannot
    /// satisfy `constraints`.
    ///
    /// `integrity` asks for codebase integrity to be enforceable: the
    /// combination is rejected unless the constraints require or prefer
    /// `Integrity::Yes`.
    pub fn get_instance(
        cipher_suite: &str,
        client: Option<&Principal>,
        server: Option<&Principal>,
        integrity: bool,
        client_side: bool,
        constraints: &InvocationConstraints,
    ) -> Option<Self> {
        Self::get_instance_with_config(
            cipher_suite,
            client,
            server,
            integrity,
            client_side,
            constraints,
            &TrustConfig::default(),
        )
    }

    /// Like `get_instance`, with explicit resolution limits.
    pub fn get_instance_with_config(
        cipher_suite: &str,
        client: Option<&Principal>,
        server: Option<&Principal>,
        integrity: bool,
        client_side: bool,
        constraints: &InvocationConstraints,
        config: &TrustConfig,
    ) -> Option<Self> {
        let mut context = Self {
            cipher_suite: cipher_suite.to_string(),
            client: client.cloned(),
            server: server.cloned(),
            client_side,
            max_alternative_depth: config.max_alternative_depth,
            integrity_required: false,
            integrity_preferred: false,
            connection_time: None,
            preferences: 0,
        };
        if context.evaluate(integrity, constraints) {
            Some(context)
        } else {
            debug!(
                "connection context rejected: suite={} client={:?} server={:?}",
                cipher_suite, client, server
            );
            None
        }
    }

    /// Build one context per suite and keep the best (see `select_best`).
    pub fn negotiate<'s>(
        suites: impl IntoIterator<Item = &'s str>,
        client: Option<&Principal>,
        server: Option<&Principal>,
        integrity: bool,
        client_side: bool,
        constraints: &InvocationConstraints,
    ) -> Option<Self> {
        Self::select_best(suites.into_iter().filter_map(|suite| {
            Self::get_instance(suite, client, server, integrity, client_side, constraints)
        }))
    }

    /// The context satisfying the most preferences; ties keep the earlier one.
    pub fn select_best(contexts: impl IntoIterator<Item = Self>) -> Option<Self> {
        contexts.into_iter().fold(None, |best: Option<Self>, c| match best {
            Some(b) if b.preferences >= c.preferences => Some(b),
            _ => Some(c),
        })
    }

    fn evaluate(&mut self, integrity: bool, constraints: &InvocationConstraints) -> bool {
        let suite = CipherSuite::parse(&self.cipher_suite);
        if suite.does_server_authentication() != self.server.is_some() {
            return false;
        }
        if self.client.is_some() && self.server.is_none() {
            return false;
        }

        for c in constraints.requirements() {
            match self.supported(c) {
                Support::NotSupported => {
                    trace!("requirement not supported: {c:?}");
                    return false;
                }
                Support::Integrity => self.integrity_required = true,
                Support::Deadline(t) => {
                    self.connection_time = Some(self.connection_time.map_or(t, |d| d.min(t)));
                }
                Support::Ok => {}
            }
        }

        for c in constraints.preferences() {
            match self.supported(c) {
                Support::NotSupported => trace!("preference skipped: {c:?}"),
                Support::Integrity => {
                    if !self.integrity_required {
                        self.integrity_preferred = true;
                    }
                    self.preferences += 1;
                }
                Support::Ok | Support::Deadline(_) => self.preferences += 1,
            }
        }

        !integrity || self.integrity_required || self.integrity_preferred
    }

    /// How this connection would satisfy `constraint`.
    pub fn supported(&self, constraint: &InvocationConstraint) -> Support {
        self.resolve(constraint, 0)
    }

    fn resolve(&self, constraint: &InvocationConstraint, depth: usize) -> Support {
        use InvocationConstraint as C;

        let suite = CipherSuite::parse(&self.cipher_suite);
        let client = self.client.as_ref();
        let server = self.server.as_ref();
        let ok_if = |cond: bool| {
            if cond {
                Support::Ok
            } else {
                Support::NotSupported
            }
        };

        let result = match constraint {
            C::Alternatives(alts) => {
                if depth >= self.max_alternative_depth {
                    debug!("constraint alternatives nested deeper than {depth}");
                    Support::NotSupported
                } else {
                    self.resolve_alternatives(alts, depth + 1)
                }
            }
            C::Confidentiality(Toggle::Yes) => ok_if(suite.does_encryption()),
            C::Confidentiality(Toggle::No) => ok_if(!suite.does_encryption()),
            C::ConfidentialityStrength(Strength::Strong) => ok_if(suite.does_strong_encryption()),
            C::ConfidentialityStrength(Strength::Weak) => {
                ok_if(suite.does_encryption() && !suite.does_strong_encryption())
            }
            C::Integrity(Toggle::Yes) => Support::Integrity,
            C::Integrity(Toggle::No) => Support::NotSupported,
            C::ClientAuthentication(Toggle::Yes) => ok_if(client.is_some()),
            C::ClientAuthentication(Toggle::No) => ok_if(client.is_none()),
            C::ServerAuthentication(Toggle::Yes) => ok_if(server.is_some()),
            C::ServerAuthentication(Toggle::No) => ok_if(server.is_none()),
            C::Delegation(Toggle::No) => Support::Ok,
            C::Delegation(Toggle::Yes) => ok_if(client.is_none()),
            C::ClientMinPrincipal(set) => ok_if(client.is_some_and(|c| set.iter().all(|p| p == c))),
            C::ClientMaxPrincipal(set) => ok_if(client.map_or(true, |c| set.contains(c))),
            C::ClientMinPrincipalType(types) => {
                ok_if(client.is_some_and(|c| types.iter().all(|t| t.admits(&c.kind))))
            }
            C::ClientMaxPrincipalType(types) => {
                ok_if(client.map_or(true, |c| types.iter().any(|t| t.admits(&c.kind))))
            }
            C::ServerMinPrincipal(set) => ok_if(server.is_some_and(|s| set.iter().all(|p| p == s))),
            C::DelegationAbsoluteTime(_) => Support::Ok,
            C::DelegationRelativeTime(_) | C::ConnectionRelativeTime(_) => ok_if(!self.client_side),
            C::ConnectionAbsoluteTime(t) => Support::Deadline((*t).max(0) as u64),
            C::Unknown(_) => Support::NotSupported,
        };
        trace!("{constraint:?} -> {result:?}");
        result
    }

    fn resolve_alternatives(&self, alts: &ConstraintAlternatives, depth: usize) -> Support {
        let mut elements = alts.elements().iter();
        let Some(first) = elements.next() else {
            return Support::NotSupported;
        };
        if !elements.all(|c| c.same_kind(first)) {
            return Support::NotSupported;
        }

        let mut supported = false;
        let mut integrity = false;
        let mut deadline: Option<u64> = None;
        for c in alts.elements() {
            match self.resolve(c, depth) {
                Support::NotSupported => {}
                Support::Ok => supported = true,
                Support::Integrity => {
                    supported = true;
                    integrity = true;
                }
                Support::Deadline(t) => {
                    supported = true;
                    deadline = Some(deadline.map_or(t, |d| d.max(t)));
                }
            }
        }

        match (supported, integrity, deadline) {
            (false, _, _) => Support::NotSupported,
            (true, true, _) => Support::Integrity,
            (true, false, Some(t)) => Support::Deadline(t),
            (true, false, None) => Support::Ok,
        }
    }

    pub fn cipher_suite(&self) -> &str {
        &self.cipher_suite
    }

    pub fn client(&self) -> Option<&Principal> {
        self.client.as_ref()
    }

    pub fn server(&self) -> Option<&Principal> {
        self.server.as_ref()
    }

    pub fn is_client_side(&self) -> bool {
        self.client_side
    }

    /// Whether some requirement resolved to `Integrity::Yes`.
    pub fn integrity_required(&self) -> bool {
        self.integrity_required
    }

    /// Whether some satisfiable preference asked for integrity and no
    /// requirement did.
    pub fn integrity_preferred(&self) -> bool {
        self.integrity_preferred
    }

    /// Earliest connection deadline among the requirements (ms since
    /// epoch), or `None` for no limit.
    pub fn connection_time(&self) -> Option<u64> {
        self.connection_time
    }

    /// Number of preferences this connection satisfies.
    pub fn preferences(&self) -> usize {
        self.preferences
    }
}

impl std::fmt::Display for ConnectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let anonymous =
            |p: Option<&Principal>| p.map_or_else(|| "anonymous".to_string(), |p| p.to_string());
        write!(
            f,
            "ConnectionContext[{}, client={}, server={}, integrity={}, connTime={}, preferences={}]",
            self.cipher_suite,
            anonymous(self.client.as_ref()),
            anonymous(self.server.as_ref()),
            if self.integrity_required {
                "required"
            } else if self.integrity_preferred {
                "preferred"
            } else {
                "none"
            },
            self.connection_time
                .map_or_else(|| "none".to_string(), |t| t.to_string()),
            self.preferences,
        )
    }
}
