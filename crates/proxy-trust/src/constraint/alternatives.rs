//! Constraint alternatives: a disjunction of constraints.
//!
//! The set is satisfied when any one of its elements is satisfied.
//! Duplicate elements collapse. Alternatives may structurally contain
//! further alternatives; resolvers bound how deep they will look.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

use super::types::InvocationConstraint;

/// A non-empty set of alternative constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<InvocationConstraint>",
    into = "Vec<InvocationConstraint>"
)]
pub struct ConstraintAlternatives {
    elements: BTreeSet<InvocationConstraint>,
}

impl ConstraintAlternatives {
    /// Create alternatives from the given constraints.
    ///
    /// Fails with `InvalidConstraint` if no elements are given or any
    /// element is itself invalid.
    pub fn new(elements: impl IntoIterator<Item = InvocationConstraint>) -> Result<Self> {
        let elements: BTreeSet<InvocationConstraint> = elements.into_iter().collect();
        if elements.is_empty() {
            return Err(TrustError::InvalidConstraint(
                "constraint alternatives cannot be empty".into(),
            ));
        }
        for element in &elements {
            element.validate()?;
        }
        Ok(Self { elements })
    }

    /// Create the simplest constraint equivalent to the given alternatives:
    /// the element itself when only one distinct element remains.
    pub fn create(
        elements: impl IntoIterator<Item = InvocationConstraint>,
    ) -> Result<InvocationConstraint> {
        let mut alts = Self::new(elements)?;
        if alts.elements.len() == 1 {
            if let Some(only) = alts.elements.pop_first() {
                return Ok(only);
            }
        }
        Ok(InvocationConstraint::Alternatives(alts))
    }

    /// The alternative constraints, in canonical order.
    pub fn elements(&self) -> &BTreeSet<InvocationConstraint> {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub(crate) fn make_absolute(&self, base: i64) -> InvocationConstraint {
        let elements = self.elements.iter().map(|c| c.make_absolute(base)).collect();
        InvocationConstraint::Alternatives(Self { elements })
    }
}

impl TryFrom<Vec<InvocationConstraint>> for ConstraintAlternatives {
    type Error = TrustError;

    fn try_from(elements: Vec<InvocationConstraint>) -> Result<Self> {
        Self::new(elements)
    }
}

impl From<ConstraintAlternatives> for Vec<InvocationConstraint> {
    fn from(alts: ConstraintAlternatives) -> Self {
        alts.elements.into_iter().collect()
    }
}
