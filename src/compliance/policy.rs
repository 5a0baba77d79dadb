use std::collections::BTreeSet;

use serde::Serialize;

use crate::detect::ComplianceCategory;
use crate::error::ConfigError;

/// Which protection categories were observed after gating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub head: bool,
    pub hand: bool,
    pub body: bool,
}

impl Coverage {
    pub fn covers(&self, category: ComplianceCategory) -> bool {
        match category {
            ComplianceCategory::Head => self.head,
            ComplianceCategory::Hand => self.hand,
            ComplianceCategory::Body => self.body,
            ComplianceCategory::Person | ComplianceCategory::Other => false,
        }
    }
}

/// Set of protection categories a compliant frame must show, on top of a person.
///
/// Deployments disagree on which items are mandatory (gloves in particular),
/// so the set is configuration. The default requires head, hand and body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompliancePolicy {
    required: BTreeSet<ComplianceCategory>,
}

impl CompliancePolicy {
    /// `Person` entries are accepted and ignored: a person is always required.
    pub fn requiring(categories: impl IntoIterator<Item = ComplianceCategory>) -> Self {
        Self {
            required: categories
                .into_iter()
                .filter(|c| *c != ComplianceCategory::Person)
                .collect(),
        }
    }

    pub fn required(&self) -> &BTreeSet<ComplianceCategory> {
        &self.required
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required.contains(&ComplianceCategory::Other) {
            return Err(ConfigError::invalid(
                "policy.required",
                "'other' is not a protection category",
            ));
        }
        Ok(())
    }

    /// `has_person` and every required category covered.
    pub fn is_compliant(&self, has_person: bool, coverage: &Coverage) -> bool {
        has_person && self.required.iter().all(|c| coverage.covers(*c))
    }

    /// Required categories not covered, in category order.
    pub fn missing(&self, coverage: &Coverage) -> Vec<ComplianceCategory> {
        self.required
            .iter()
            .copied()
            .filter(|c| !coverage.covers(*c))
            .collect()
    }
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self::requiring(ComplianceCategory::PROTECTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComplianceCategory::*;

    #[test]
    fn default_policy_truth_table() {
        let policy = CompliancePolicy::default();
        for bits in 0u8..16 {
            let has_person = bits & 0b0001 != 0;
            let coverage = Coverage {
                head: bits & 0b0010 != 0,
                hand: bits & 0b0100 != 0,
                body: bits & 0b1000 != 0,
            };
            let expected = has_person && coverage.head && coverage.hand && coverage.body;
            assert_eq!(
                policy.is_compliant(has_person, &coverage),
                expected,
                "person={} coverage={:?}",
                has_person,
                coverage
            );
        }
    }

    #[test]
    fn subset_policy_ignores_unrequired_categories() {
        let policy = CompliancePolicy::requiring([Head, Body]);
        let coverage = Coverage {
            head: true,
            hand: false,
            body: true,
        };
        assert!(policy.is_compliant(true, &coverage));
        assert!(!policy.is_compliant(false, &coverage));
        assert!(policy.missing(&coverage).is_empty());
    }

    #[test]
    fn empty_policy_requires_only_a_person() {
        let policy = CompliancePolicy::requiring([Person]);
        assert!(policy.required().is_empty());
        assert!(policy.is_compliant(true, &Coverage::default()));
        assert!(!policy.is_compliant(false, &Coverage::default()));
    }

    #[test]
    fn missing_lists_uncovered_in_order() {
        let coverage = Coverage {
            head: true,
            ..Coverage::default()
        };
        assert_eq!(CompliancePolicy::default().missing(&coverage), vec![Hand, Body]);
    }

    #[test]
    fn other_cannot_be_required() {
        assert!(CompliancePolicy::requiring([Head, Other]).validate().is_err());
        assert!(CompliancePolicy::default().validate().is_ok());
    }
}
