use std::fmt;

use serde::{Deserialize, Serialize};

/// Protection category a detection class maps to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceCategory {
    Person,
    Head,
    Hand,
    Body,
    Other,
}

impl ComplianceCategory {
    /// The protection categories a policy may require.
    pub const PROTECTION: [ComplianceCategory; 3] = [Self::Head, Self::Hand, Self::Body];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Head => "head",
            Self::Hand => "hand",
            Self::Body => "body",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "person" => Some(Self::Person),
            "head" => Some(Self::Head),
            "hand" => Some(Self::Hand),
            "body" => Some(Self::Body),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ComplianceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Matcher {
    Equals(String),
    ContainsAny(Vec<String>),
}

impl Matcher {
    fn matches(&self, class_name: &str) -> bool {
        match self {
            Matcher::Equals(expected) => class_name == expected,
            Matcher::ContainsAny(keywords) => keywords.iter().any(|k| class_name.contains(k)),
        }
    }
}

/// One row of the taxonomy table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaxonomyRule {
    category: ComplianceCategory,
    matcher: Matcher,
}

impl TaxonomyRule {
    /// Matches when the lowercased class name equals `name`.
    pub fn equals(category: ComplianceCategory, name: &str) -> Self {
        Self {
            category,
            matcher: Matcher::Equals(name.to_lowercase()),
        }
    }

    /// Matches when the lowercased class name contains any keyword.
    pub fn contains_any(category: ComplianceCategory, keywords: &[&str]) -> Self {
        Self {
            category,
            matcher: Matcher::ContainsAny(keywords.iter().map(|k| k.to_lowercase()).collect()),
        }
    }

    pub fn category(&self) -> ComplianceCategory {
        self.category
    }
}

/// Ordered class-name to category table. The first matching rule wins;
/// a class name no rule matches is `Other`.
///
/// Row order is the tie-break for names matching several keyword groups,
/// e.g. `safety_glove` is `Hand` because the hand row precedes the body row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Taxonomy {
    rules: Vec<TaxonomyRule>,
}

impl Taxonomy {
    pub fn new(rules: Vec<TaxonomyRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TaxonomyRule] {
        &self.rules
    }

    /// Case-insensitive classification of a detector class name.
    pub fn classify(&self, class_name: &str) -> ComplianceCategory {
        let class_name = class_name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(&class_name))
            .map(|rule| rule.category)
            .unwrap_or(ComplianceCategory::Other)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new(vec![
            TaxonomyRule::equals(ComplianceCategory::Person, "person"),
            TaxonomyRule::contains_any(ComplianceCategory::Head, &["hardhat", "helmet", "head"]),
            TaxonomyRule::contains_any(ComplianceCategory::Hand, &["glove", "hand"]),
            TaxonomyRule::contains_any(ComplianceCategory::Body, &["vest", "jacket", "safety"]),
        ])
    }
}
