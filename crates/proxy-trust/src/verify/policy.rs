//! Allow-list verifier for named proxies.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::proxy::{BasicProxy, ProxyRef};

use super::context::{TrustContext, VisitBudget};
use super::verifier::TrustVerifier;

/// Trusts `BasicProxy` objects whose name is on the allow list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedTrustVerifier {
    trusted: BTreeSet<String>,
}

impl NamedTrustVerifier {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            trusted: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn trusts(&self, name: &str) -> bool {
        self.trusted.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trusted.iter().map(String::as_str)
    }
}

impl TrustVerifier for NamedTrustVerifier {
    fn is_trusted_object(
        &self,
        obj: &ProxyRef,
        _ctx: &dyn TrustContext,
        budget: &mut VisitBudget,
    ) -> Result<bool> {
        let Some(proxy) = obj.as_any().downcast_ref::<BasicProxy>() else {
            return Ok(false);
        };
        if !budget.try_visit() {
            log::warn!("visit budget exhausted, not trusting {}", proxy.name());
            return Ok(false);
        }
        let trusted = self.trusts(proxy.name());
        log::trace!("{} trusted by name: {trusted}", proxy.name());
        Ok(trusted)
    }
}
