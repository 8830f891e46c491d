/*!
 * Attribute-level comparison of file entities and whole snapshots
 */

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SnapshotConfiguration;
use crate::rules::{should_check, RuleSet};
use crate::types::{Attribute, Difference, EqualityReport, FileSnapshot, FileTrace, Snapshot};

const NULL_VALUE: &str = "null";

/// Compare two entities that share a path.
///
/// Returns `None` when no attribute differs. An attribute captured on one
/// side only counts as a difference; an attribute captured on neither side
/// does not. Differences come out in [`Attribute`] declaration order.
pub fn compare_files(
    left_label: &str,
    left: &FileSnapshot,
    right_label: &str,
    right: &FileSnapshot,
) -> Option<FileTrace> {
    debug_assert_eq!(left.path(), right.path());

    let differences: Vec<Difference> = Attribute::all()
        .filter_map(|attribute| {
            let (l, r) = (left.value(attribute), right.value(attribute));
            if l == r {
                return None;
            }
            Some(Difference {
                attribute,
                left: l.unwrap_or_else(|| NULL_VALUE.to_string()),
                right: r.unwrap_or_else(|| NULL_VALUE.to_string()),
            })
        })
        .collect();

    if differences.is_empty() {
        debug!("Same files: {} and {}", left.path(), right.path());
        return None;
    }

    Some(FileTrace {
        path: left.path().to_string(),
        left_label: left_label.to_string(),
        right_label: right_label.to_string(),
        differences,
    })
}

/// Comparison under an active check policy.
///
/// Attributes the policy resolves disabled for a path are ignored on both
/// sides; enabled attributes are compared exactly as [`compare_files`] does.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    config: SnapshotConfiguration,
    rules: RuleSet,
}

impl Comparator {
    pub fn new(config: SnapshotConfiguration, rules: RuleSet) -> Self {
        Self { config, rules }
    }

    /// Compare two entities for the same path
    pub fn compare(
        &self,
        left_label: &str,
        left: &FileSnapshot,
        right_label: &str,
        right: &FileSnapshot,
    ) -> Option<FileTrace> {
        let rule = self.rules.rule_for(left.path());
        let mut left = left.clone();
        let mut right = right.clone();

        for attribute in Attribute::all() {
            if !should_check(attribute, rule, &self.config) {
                left = left.without(attribute);
                right = right.without(attribute);
            }
        }

        compare_files(left_label, &left, right_label, &right)
    }

    /// Compare two snapshots path by path.
    ///
    /// Matched pairs are compared in parallel; traces are sorted by path.
    pub fn compare_snapshots(&self, left: &Snapshot, right: &Snapshot) -> EqualityReport {
        let mut report = EqualityReport::new(&left.name, &right.name);
        let pairs: Vec<(&FileSnapshot, &FileSnapshot)> = left
            .iter()
            .filter_map(|l| right.get(l.path()).map(|r| (l, r)))
            .collect();

        report.traces = pairs
            .par_iter()
            .filter_map(|(l, r)| self.compare(&left.name, l, &right.name, r))
            .collect();
        report.traces.sort_by(|a, b| a.path.cmp(&b.path));

        report.only_in_left = left
            .files
            .keys()
            .filter(|path| !right.files.contains_key(*path))
            .cloned()
            .collect();
        report.only_in_right = right
            .files
            .keys()
            .filter(|path| !left.files.contains_key(*path))
            .cloned()
            .collect();

        info!(
            left = %left.name,
            right = %right.name,
            compared = pairs.len(),
            different = report.traces.len(),
            only_in_left = report.only_in_left.len(),
            only_in_right = report.only_in_right.len(),
            "Compared snapshots"
        );

        report
    }
}

/// Compare two snapshots with no policy masking
pub fn compare_snapshots(left: &Snapshot, right: &Snapshot) -> EqualityReport {
    Comparator::default().compare_snapshots(left, right)
}
