//! Data models for the homologation pipeline.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

// ---

/// One count observation in the canonical intermediate format shared by all
/// sources before homologation.
///
/// `(timestamp, control_point, category)` is unique within one source table;
/// readers enforce this by summing duplicates. `control_point` is still the
/// raw source code (e.g. `PC1A3B`) — mapping to intersection names happens
/// in the homologator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRow {
    // ---
    pub timestamp: NaiveDateTime,
    pub control_point: String,
    /// Normalized count-class label ("auto", "tricycle", "persona", ...).
    pub category: String,
    pub count: i64,
}

impl CanonicalRow {
    pub fn key(&self) -> RowKey {
        (
            self.timestamp,
            self.control_point.clone(),
            self.category.clone(),
        )
    }
}

/// Merge/dedup key: (timestamp, control point, category).
pub type RowKey = (NaiveDateTime, String, String);

/// Combined, deduplicated rows in ascending key order.
pub type MergedTable = Vec<CanonicalRow>;

/// Raw control-point code → canonical intersection name.
///
/// Built once per run from the template; immutable thereafter.
pub type ControlPointMap = BTreeMap<String, String>;

/// Normalized input count-class label → report-level output label.
///
/// Keeps the first-appearance order of output labels; that order becomes the
/// report's count column order.
#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    map: BTreeMap<String, String>,
    outputs: Vec<String>,
}

impl CategoryMap {
    pub fn insert(&mut self, input: String, output: String) {
        if !self.outputs.contains(&output) {
            self.outputs.push(output.clone());
        }
        self.map.insert(input, output);
    }

    /// Output label for a normalized input label.
    pub fn get(&self, input: &str) -> Option<&str> {
        self.map.get(input).map(String::as_str)
    }

    /// Output labels in report column order.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Sampling interval driving interpolation bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Minutes per bucket, in `[1, 60]`.
    pub interval_minutes: u32,
}

impl SamplingConfig {
    pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

    /// Build a config, rejecting values outside `[1, 60]`.
    pub fn new(interval_minutes: u32) -> Option<Self> {
        (1..=60)
            .contains(&interval_minutes)
            .then_some(Self { interval_minutes })
    }

    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_minutes: Self::DEFAULT_INTERVAL_MINUTES,
        }
    }
}

/// One reader's output, tagged with its merge priority (higher wins).
#[derive(Debug, Clone)]
pub struct SourceTable {
    /// Label used in warnings and merge-conflict messages.
    pub name: String,
    pub priority: u8,
    pub rows: Vec<CanonicalRow>,
}

/// Which report convention the homologator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Vehicular,
    Pedestrian,
}

/// Final homologated table in the Peru report convention.
///
/// Rows are ordered by (intersection, timestamp); `categories` fixes the
/// per-row count column order.
#[derive(Debug, Clone)]
pub struct Report {
    pub kind: ReportKind,
    pub interval_minutes: u32,
    /// Output count column headers, in report order.
    pub categories: Vec<String>,
    pub rows: Vec<ReportRow>,
}

/// One report row: a single intersection/time bucket with its counts.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub control_point: String,
    pub intersection: String,
    pub start: NaiveDateTime,
    /// Parallel to `Report::categories`.
    pub counts: Vec<i64>,
}

impl ReportRow {
    /// Bucket end, derived from the sampling interval.
    pub fn end(&self, interval_minutes: u32) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(interval_minutes))
    }

    /// Quarter-of-hour tag in the report's `"{hour},{quarter}"` convention
    /// (first quarter is 1).
    pub fn quarter(&self) -> String {
        use chrono::Timelike;
        let hour = self.start.hour();
        let quarter = self.start.minute() / 15 + 1;
        format!("{hour},{quarter}")
    }

    pub fn total(&self) -> i64 {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 29)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn sampling_config_rejects_out_of_range() {
        // ---
        assert!(SamplingConfig::new(0).is_none());
        assert!(SamplingConfig::new(61).is_none());
        assert_eq!(SamplingConfig::new(15).unwrap().interval_minutes, 15);
        assert_eq!(SamplingConfig::default().interval_minutes, 60);
    }

    #[test]
    fn report_row_end_and_quarter() {
        // ---
        let row = ReportRow {
            control_point: "PC1".into(),
            intersection: "Av. Principal".into(),
            start: ts(8, 45),
            counts: vec![3, 4],
        };
        assert_eq!(row.end(15), ts(9, 0));
        assert_eq!(row.quarter(), "8,4");
        assert_eq!(row.total(), 7);

        let row = ReportRow {
            start: ts(10, 0),
            ..row
        };
        assert_eq!(row.quarter(), "10,1");
    }
}
