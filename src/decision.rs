use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Sentinel option meaning "no branching" — the key used for a node's
/// unique child when it carries no decision variable.
pub const NIL: i32 = -1;

/// A finite-option branching label tagging a decision node in a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionVariable {
    pub id: i32,
    domain: Vec<i32>,
    default: i32,
}

impl DecisionVariable {
    /// Panics if `domain` is empty or `default` is not one of its options —
    /// these are caller-enforced invariants, not recoverable runtime errors.
    pub fn new(id: i32, domain: Vec<i32>, default: i32) -> Self {
        assert!(!domain.is_empty(), "decision variable domain must be non-empty");
        assert!(
            domain.contains(&default),
            "default option must be in the domain"
        );
        DecisionVariable { id, domain, default }
    }

    pub fn domain(&self) -> &[i32] {
        &self.domain
    }

    pub fn default_option(&self) -> i32 {
        self.default
    }

    pub fn contains(&self, option: i32) -> bool {
        self.domain.contains(&option)
    }

    /// True iff every option of `self` is also an option of `other`.
    pub fn is_subdomain_of(&self, other: &DecisionVariable) -> bool {
        let other_domain: HashSet<_> = other.domain.iter().collect();
        self.domain.iter().all(|option| other_domain.contains(option))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomain_check() {
        let small = DecisionVariable::new(0, vec![0, 1], 1);
        let big = DecisionVariable::new(1, vec![0, 1, 2], 1);
        assert!(small.is_subdomain_of(&big));
        assert!(!big.is_subdomain_of(&small));
    }

    #[test]
    #[should_panic]
    fn default_must_be_in_domain() {
        DecisionVariable::new(0, vec![0, 1], 2);
    }
}
