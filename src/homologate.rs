//! Homologation of merged canonical tables into the Peru report schema.
//!
//! Two things happen here and nowhere else: raw control-point codes become
//! canonical intersection names, and input count classes are grouped into
//! the report-level categories (summing sub-classes), keeping the merge
//! logic oblivious to report conventions. Unmapped control points are
//! collected across the whole table before failing, so one template fix
//! covers every offender.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use crate::error::{DataWarning, UnmappedControlPointError};
use crate::models::{MergedTable, Report, ReportKind, ReportRow};
use crate::template::Template;

// ---

/// Output column header of the pedestrian report.
const PERSONA_HEADER: &str = "PERSONA";

/// Build the final report from a merged table.
pub fn homologate(
    merged: &MergedTable,
    template: &Template,
    kind: ReportKind,
) -> Result<(Report, Vec<DataWarning>), UnmappedControlPointError> {
    let mut warnings = Vec::new();

    // Every code must resolve; collect all offenders, not just the first
    let unmapped: BTreeSet<String> = merged
        .iter()
        .filter(|row| !template.control_points.contains_key(&row.control_point))
        .map(|row| row.control_point.clone())
        .collect();
    if !unmapped.is_empty() {
        return Err(UnmappedControlPointError {
            codes: unmapped.into_iter().collect(),
        });
    }

    let categories: Vec<String> = match kind {
        ReportKind::Vehicular => template.categories.outputs().to_vec(),
        ReportKind::Pedestrian => vec![PERSONA_HEADER.to_string()],
    };

    // (intersection, timestamp, control point) -> counts per output category
    let mut grouped: BTreeMap<(String, NaiveDateTime, String), Vec<i64>> = BTreeMap::new();
    let mut dropped_categories: BTreeSet<String> = BTreeSet::new();

    for row in merged {
        let column = match kind {
            ReportKind::Vehicular => match template.categories.get(&row.category) {
                Some(output) => categories.iter().position(|c| c == output),
                None => {
                    dropped_categories.insert(row.category.clone());
                    continue;
                }
            },
            ReportKind::Pedestrian => Some(0),
        };
        let Some(column) = column else { continue };

        let intersection = template.control_points[&row.control_point].clone();
        let counts = grouped
            .entry((intersection, row.timestamp, row.control_point.clone()))
            .or_insert_with(|| vec![0; categories.len()]);
        counts[column] += row.count;
    }

    for category in dropped_categories {
        warnings.push(DataWarning::file(
            "homologation",
            format!("count class '{category}' has no template mapping, dropped"),
        ));
    }

    // Two raw codes can map to one intersection; on a (intersection,
    // timestamp) collision keep the row with the larger total, last wins on
    // equal totals.
    let mut rows: BTreeMap<(String, NaiveDateTime), ReportRow> = BTreeMap::new();
    for ((intersection, timestamp, control_point), counts) in grouped {
        let candidate = ReportRow {
            control_point,
            intersection: intersection.clone(),
            start: timestamp,
            counts,
        };
        match rows.entry((intersection, timestamp)) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                warnings.push(DataWarning::file(
                    "homologation",
                    format!(
                        "control points '{}' and '{}' both map to '{}' at {}; keeping one",
                        slot.get().control_point,
                        candidate.control_point,
                        candidate.intersection,
                        timestamp.format("%Y-%m-%d %H:%M"),
                    ),
                ));
                if candidate.total() >= slot.get().total() {
                    slot.insert(candidate);
                }
            }
        }
    }

    let report = Report {
        kind,
        interval_minutes: template.sampling.interval_minutes,
        categories,
        rows: rows.into_values().collect(),
    };
    Ok((report, warnings))
}
