//! Trust verifiers, including the bootstrap-proxy verifier.
//!
//! `ProxyTrustVerifier` trusts an object when one of the bootstrap
//! proxies it offers is itself trusted by the verifier that bootstrap
//! proxy hands out:
//!
//! ```text
//! obj ──iterator──▶ candidate ──get_proxy_verifier──▶ verifier
//!                        ▲                               │
//!                        └──── is_trusted_object ────────┘
//! ```

use std::fmt;

use crate::config::TrustConfig;
use crate::error::{Result, TrustError};
use crate::proxy::{ProxyRef, RemoteObject};

use super::context::{TrustContext, VisitBudget, MAX_NESTING_DEPTH};
use super::iterator::{ProxyTrustIterator, TrustIteratorSource};

/// Decides whether an object is trusted.
pub trait TrustVerifier: fmt::Debug + Send + Sync {
    /// Returns `Ok(false)` when this verifier has no opinion or the object
    /// is not trusted.
    ///
    /// # Errors
    ///
    /// `TrustError::Security` must propagate to the caller. Other errors
    /// mean this verifier could not decide.
    fn is_trusted_object(
        &self,
        obj: &ProxyRef,
        ctx: &dyn TrustContext,
        budget: &mut VisitBudget,
    ) -> Result<bool>;
}

// ── Trust source ─────────────────────────────────────────────────────────────

/// Where an object's bootstrap-proxy iterator comes from, decided once.
enum TrustSource<'a> {
    /// The object's invocation handler provides the iterator.
    Handler(&'a dyn TrustIteratorSource),
    /// The object itself provides the iterator.
    Direct(&'a dyn TrustIteratorSource),
    Absent,
}

impl<'a> TrustSource<'a> {
    /// The handler's iterator takes precedence over the object's own.
    fn of(obj: &'a dyn RemoteObject) -> Self {
        if let Some(source) = obj
            .invocation_handler()
            .and_then(|h| h.trust_iterator_source())
        {
            return Self::Handler(source);
        }
        match obj.trust_iterator_source() {
            Some(source) => Self::Direct(source),
            None => Self::Absent,
        }
    }

    /// `None` when the object offers no usable iterator.
    fn iterator(&self) -> Result<Option<Box<dyn ProxyTrustIterator>>> {
        let source = match self {
            Self::Handler(s) | Self::Direct(s) => *s,
            Self::Absent => return Ok(None),
        };
        match source.proxy_trust_iterator() {
            Ok(it) => Ok(Some(it)),
            Err(e) if e.is_security() => Err(e),
            Err(e) => {
                log::debug!("trust iterator unavailable, treating as absent: {e}");
                Ok(None)
            }
        }
    }
}

// ── Proxy trust verifier ─────────────────────────────────────────────────────

/// Verifies objects through the bootstrap proxies they offer.
#[derive(Debug, Clone, Default)]
pub struct ProxyTrustVerifier {
    config: TrustConfig,
}

impl ProxyTrustVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrustConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Verify with a fresh budget taken from the configuration.
    pub fn is_trusted(&self, obj: &ProxyRef, ctx: &dyn TrustContext) -> Result<bool> {
        let mut budget = VisitBudget::from_config(&self.config);
        self.is_trusted_object(obj, ctx, &mut budget)
    }

    /// A candidate must offer constraint control, trust equivalence and a
    /// verifier.
    fn is_candidate(candidate: &ProxyRef) -> bool {
        candidate.method_control().is_some()
            && candidate.trust_equivalence().is_some()
            && candidate.proxy_trust().is_some()
    }

    /// Ask the candidate for its verifier and let that verifier judge the
    /// candidate.
    fn check_candidate(
        &self,
        candidate: &ProxyRef,
        ctx: &dyn TrustContext,
        budget: &mut VisitBudget,
    ) -> Result<bool> {
        if self.config.require_trusted_bootstrap && !ctx.is_trusted_object(candidate, budget)? {
            log::debug!("bootstrap candidate not trusted by context, skipping");
            return Ok(false);
        }
        let target = match (ctx.method_constraints(), candidate.method_control()) {
            (Some(constraints), Some(control)) => control.set_constraints(Some(constraints.clone()))?,
            _ => candidate.clone(),
        };
        let Some(proxy_trust) = target.proxy_trust() else {
            log::debug!("constrained candidate lost its verifier capability");
            return Ok(false);
        };
        let verifier = proxy_trust.get_proxy_verifier()?;
        verifier.is_trusted_object(candidate, ctx, budget)
    }

    /// One level of verification: walk the object's bootstrap candidates.
    fn examine(
        &self,
        obj: &ProxyRef,
        ctx: &dyn TrustContext,
        budget: &mut VisitBudget,
    ) -> Result<bool> {
        let source = TrustSource::of(obj.as_ref());
        let Some(mut iter) = source.iterator()? else {
            return Ok(false);
        };
        if !budget.try_visit() {
            log::warn!("visit budget exhausted before examining object, failing closed");
            return Ok(false);
        }
        while iter.has_next() {
            let candidate = match iter.next() {
                Ok(c) => c,
                Err(TrustError::NoSuchElement) => break,
                Err(e) => return Err(e),
            };
            if !budget.try_visit() {
                log::warn!(
                    "visit budget exhausted after {} objects, failing closed",
                    budget.examined()
                );
                return Ok(false);
            }
            if !Self::is_candidate(&candidate) {
                log::debug!("skipping candidate lacking required capabilities: {candidate:?}");
                continue;
            }
            match self.check_candidate(&candidate, ctx, budget) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if e.is_remote() => {
                    log::warn!("bootstrap candidate failed remotely: {e}");
                    iter.set_exception(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }
}

impl TrustVerifier for ProxyTrustVerifier {
    /// Nested bootstrap verifications deeper than `MAX_NESTING_DEPTH`
    /// fail closed, independent of the visit budget.
    fn is_trusted_object(
        &self,
        obj: &ProxyRef,
        ctx: &dyn TrustContext,
        budget: &mut VisitBudget,
    ) -> Result<bool> {
        if !budget.enter() {
            log::warn!("bootstrap verification nested {MAX_NESTING_DEPTH} deep, failing closed");
            return Ok(false);
        }
        let result = self.examine(obj, ctx, budget);
        budget.leave();
        result
    }
}
