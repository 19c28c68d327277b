//! Invocation constraints: the requirements and preferences of a call.
//!
//! Both lists keep the order constraints were added in, without
//! duplicates. A preference that is also a requirement is dropped since
//! the requirement already demands it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

use super::types::InvocationConstraint;

/// Requirements and preferences for a remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConstraints")]
pub struct InvocationConstraints {
    requirements: Vec<InvocationConstraint>,
    preferences: Vec<InvocationConstraint>,
}

/// Unchecked on-disk form.
#[derive(Deserialize)]
struct RawConstraints {
    #[serde(default)]
    requirements: Vec<InvocationConstraint>,
    #[serde(default)]
    preferences: Vec<InvocationConstraint>,
}

impl TryFrom<RawConstraints> for InvocationConstraints {
    type Error = TrustError;

    fn try_from(raw: RawConstraints) -> Result<Self> {
        Self::new(raw.requirements, raw.preferences)
    }
}

impl InvocationConstraints {
    /// No requirements, no preferences.
    pub const EMPTY: Self = Self {
        requirements: Vec::new(),
        preferences: Vec::new(),
    };

    /// Create constraints, validating every element.
    pub fn new(
        requirements: impl IntoIterator<Item = InvocationConstraint>,
        preferences: impl IntoIterator<Item = InvocationConstraint>,
    ) -> Result<Self> {
        let mut builder = InvocationConstraintsBuilder::new();
        for c in requirements {
            builder = builder.require(c);
        }
        for c in preferences {
            builder = builder.prefer(c);
        }
        builder.build()
    }

    /// Start building a constraint set.
    pub fn builder() -> InvocationConstraintsBuilder {
        InvocationConstraintsBuilder::new()
    }

    pub fn requirements(&self) -> &[InvocationConstraint] {
        &self.requirements
    }

    pub fn preferences(&self) -> &[InvocationConstraint] {
        &self.preferences
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.preferences.is_empty()
    }

    /// Merge two constraint sets: `self` first, then `other`.
    pub fn combine(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for c in &other.requirements {
            push_unique(&mut merged.requirements, c.clone());
        }
        merged.preferences.retain(|p| !merged.requirements.contains(p));
        for c in &other.preferences {
            if !merged.requirements.contains(c) {
                push_unique(&mut merged.preferences, c.clone());
            }
        }
        merged
    }

    /// Whether any constraint carries a time relative to the call.
    pub fn has_relative_time(&self) -> bool {
        self.requirements
            .iter()
            .chain(self.preferences.iter())
            .any(InvocationConstraint::is_relative)
    }

    /// Convert every relative time to an absolute one, taking `base` as
    /// the current time in milliseconds.
    pub fn make_absolute(&self, base: i64) -> Self {
        if !self.has_relative_time() {
            return self.clone();
        }
        let mut out = Self::default();
        for c in &self.requirements {
            push_unique(&mut out.requirements, c.make_absolute(base));
        }
        for c in &self.preferences {
            let abs = c.make_absolute(base);
            if !out.requirements.contains(&abs) {
                push_unique(&mut out.preferences, abs);
            }
        }
        out
    }
}

/// Builder for `InvocationConstraints`.
#[derive(Debug, Default)]
pub struct InvocationConstraintsBuilder {
    requirements: Vec<InvocationConstraint>,
    preferences: Vec<InvocationConstraint>,
}

impl InvocationConstraintsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement.
    pub fn require(mut self, c: InvocationConstraint) -> Self {
        self.requirements.push(c);
        self
    }

    /// Add a preference.
    pub fn prefer(mut self, c: InvocationConstraint) -> Self {
        self.preferences.push(c);
        self
    }

    /// Validate and deduplicate.
    pub fn build(self) -> Result<InvocationConstraints> {
        let mut out = InvocationConstraints::default();
        for c in self.requirements {
            c.validate()?;
            push_unique(&mut out.requirements, c);
        }
        for c in self.preferences {
            c.validate()?;
            if !out.requirements.contains(&c) {
                push_unique(&mut out.preferences, c);
            }
        }
        Ok(out)
    }
}

fn push_unique(list: &mut Vec<InvocationConstraint>, c: InvocationConstraint) {
    if !list.contains(&c) {
        list.push(c);
    }
}
