//! Confidence gating and compliance verdicts.

mod policy;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::detect::{CanonicalDetection, ComplianceCategory, Taxonomy};

pub use policy::{CompliancePolicy, Coverage};

/// Count and confidence spread of a group of detections.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ConfidenceStats {
    pub count: usize,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl ConfidenceStats {
    fn first(confidence: f64) -> Self {
        Self {
            count: 1,
            min: confidence,
            avg: confidence,
            max: confidence,
        }
    }

    fn add(&mut self, confidence: f64) {
        let total = self.avg * self.count as f64 + confidence;
        self.count += 1;
        self.avg = total / self.count as f64;
        self.min = self.min.min(confidence);
        self.max = self.max.max(confidence);
    }
}

fn record<K: Ord>(groups: &mut BTreeMap<K, ConfidenceStats>, key: K, confidence: f64) {
    groups
        .entry(key)
        .and_modify(|stats| stats.add(confidence))
        .or_insert_with(|| ConfidenceStats::first(confidence));
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComplianceVerdict {
    pub has_person: bool,
    pub coverage: Coverage,
    pub is_compliant: bool,
    /// Required categories that were not covered.
    pub missing: Vec<ComplianceCategory>,
    /// Detections at or above the confidence threshold.
    pub total_detections: usize,
    /// Detections discarded by the confidence gate.
    pub gated_out: usize,
    /// Statistics per category; categories without detections are absent.
    pub categories: BTreeMap<ComplianceCategory, ConfidenceStats>,
    /// Statistics per detector class name.
    pub classes: BTreeMap<String, ConfidenceStats>,
    pub detections: Vec<CanonicalDetection>,
}

impl ComplianceVerdict {
    pub fn count(&self, category: ComplianceCategory) -> usize {
        self.categories.get(&category).map_or(0, |stats| stats.count)
    }
}

/// Aggregates canonical detections into a verdict under a policy.
#[derive(Clone, Debug, Default)]
pub struct ComplianceEngine {
    taxonomy: Taxonomy,
    policy: CompliancePolicy,
}

impl ComplianceEngine {
    pub fn new(taxonomy: Taxonomy, policy: CompliancePolicy) -> Self {
        Self { taxonomy, policy }
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    /// Keep detections with `confidence >= threshold`, classify them, and
    /// derive coverage and compliance.
    pub fn aggregate(
        &self,
        detections: &[CanonicalDetection],
        threshold: f64,
    ) -> ComplianceVerdict {
        let mut categories = BTreeMap::new();
        let mut classes = BTreeMap::new();
        let mut kept = Vec::with_capacity(detections.len());

        for detection in detections.iter().filter(|d| d.confidence >= threshold) {
            let category = self.taxonomy.classify(&detection.class);
            record(&mut categories, category, detection.confidence);
            record(&mut classes, detection.class.clone(), detection.confidence);
            kept.push(CanonicalDetection {
                category,
                ..detection.clone()
            });
        }

        let present = |c: ComplianceCategory| categories.contains_key(&c);
        let has_person = present(ComplianceCategory::Person);
        let coverage = Coverage {
            head: present(ComplianceCategory::Head),
            hand: present(ComplianceCategory::Hand),
            body: present(ComplianceCategory::Body),
        };

        ComplianceVerdict {
            has_person,
            coverage,
            is_compliant: self.policy.is_compliant(has_person, &coverage),
            missing: self.policy.missing(&coverage),
            total_detections: kept.len(),
            gated_out: detections.len() - kept.len(),
            categories,
            classes,
            detections: kept,
        }
    }
}
