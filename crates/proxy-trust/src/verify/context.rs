//! Verification context and the visit budget.

use std::sync::Arc;

use crate::config::TrustConfig;
use crate::constraint::MethodConstraints;
use crate::error::{Result, TrustError};
use crate::proxy::{describe, ProxyRef};

use super::verifier::TrustVerifier;

// ── Visit budget ─────────────────────────────────────────────────────────────

/// Deepest chain of nested bootstrap verifications one top-level
/// verification may open, whatever the configured visit budget.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Bound on the objects examined by one top-level verification,
/// including candidates examined by nested verifications, and on how
/// deeply those verifications nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitBudget {
    examined: usize,
    limit: usize,
    depth: usize,
}

impl VisitBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            examined: 0,
            limit,
            depth: 0,
        }
    }

    pub fn from_config(config: &TrustConfig) -> Self {
        Self::new(config.max_examined)
    }

    /// Account for one more object. Returns false once the limit is spent.
    pub fn try_visit(&mut self) -> bool {
        if self.examined >= self.limit {
            return false;
        }
        self.examined += 1;
        true
    }

    pub fn examined(&self) -> usize {
        self.examined
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.examined
    }

    pub fn is_exhausted(&self) -> bool {
        self.examined >= self.limit
    }

    /// Open one more level of nested verification. Returns false once
    /// `MAX_NESTING_DEPTH` levels are open; the caller must not `leave`
    /// in that case.
    pub fn enter(&mut self) -> bool {
        if self.depth >= MAX_NESTING_DEPTH {
            return false;
        }
        self.depth += 1;
        true
    }

    /// Close the level opened by the matching `enter`.
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

// ── Context ──────────────────────────────────────────────────────────────────

/// Caller-supplied item carried by a context.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextItem {
    /// Constraints to attach to a bootstrap proxy before calling it.
    Constraints(MethodConstraints),
    /// Free-form marker for verifiers that understand it.
    Tag(String),
}

/// What a `TrustVerifier` may consult while deciding trust.
pub trait TrustContext {
    /// Items supplied by the caller of the verification.
    fn caller_context(&self) -> &[ContextItem];

    /// Name of the code source the object was loaded from, if known.
    fn loader(&self) -> Option<&str>;

    /// Ask the context's registered verifiers whether `obj` is trusted.
    fn is_trusted_object(&self, obj: &ProxyRef, budget: &mut VisitBudget) -> Result<bool>;

    /// The first constraints item in the caller context.
    fn method_constraints(&self) -> Option<&MethodConstraints> {
        self.caller_context().iter().find_map(|item| match item {
            ContextItem::Constraints(c) => Some(c),
            ContextItem::Tag(_) => None,
        })
    }
}

/// A context over an ordered list of verifiers.
#[derive(Debug, Clone, Default)]
pub struct BasicTrustContext {
    verifiers: Vec<Arc<dyn TrustVerifier>>,
    caller_context: Vec<ContextItem>,
    loader: Option<String>,
}

impl BasicTrustContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn TrustVerifier>) -> Self {
        self.verifiers.push(verifier);
        self
    }

    pub fn with_item(mut self, item: ContextItem) -> Self {
        self.caller_context.push(item);
        self
    }

    pub fn with_loader(mut self, loader: impl Into<String>) -> Self {
        self.loader = Some(loader.into());
        self
    }

    pub fn verifiers(&self) -> &[Arc<dyn TrustVerifier>] {
        &self.verifiers
    }
}

impl TrustContext for BasicTrustContext {
    fn caller_context(&self) -> &[ContextItem] {
        &self.caller_context
    }

    fn loader(&self) -> Option<&str> {
        self.loader.as_deref()
    }

    /// First verifier to answer true wins. `Security` errors propagate at
    /// once; other errors surface only if no verifier trusts the object.
    fn is_trusted_object(&self, obj: &ProxyRef, budget: &mut VisitBudget) -> Result<bool> {
        let mut deferred = None;
        for verifier in &self.verifiers {
            match verifier.is_trusted_object(obj, self, budget) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if e.is_security() => return Err(e),
                Err(e) => {
                    log::debug!("verifier {verifier:?} failed: {e}");
                    deferred = Some(e);
                }
            }
        }
        deferred.map_or(Ok(false), Err)
    }
}

/// Verify that `obj` is trusted by `ctx`, with a fresh budget from `config`.
///
/// # Errors
///
/// `TrustError::Untrusted` if no verifier trusts the object; errors raised
/// by verifiers propagate unchanged.
pub fn verify_object_trust(obj: &ProxyRef, ctx: &dyn TrustContext, config: &TrustConfig) -> Result<()> {
    let mut budget = VisitBudget::from_config(config);
    if ctx.is_trusted_object(obj, &mut budget)? {
        log::debug!("trusted after examining {} objects", budget.examined());
        Ok(())
    } else {
        Err(TrustError::Untrusted(describe(obj)))
    }
}
