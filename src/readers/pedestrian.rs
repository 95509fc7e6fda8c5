//! Reader for the pedestrian exports.
//!
//! Pedestrian workbooks come with Spanish or English headers; the language
//! is resolved by the shared layout logic, so this reader only needs the
//! already-normalized `persona` category. Any other count column in the
//! sheet is dropped with a warning — the pedestrian report carries a single
//! class.

use std::path::Path;

use crate::error::{DataWarning, SourceFormatError};

use super::{file_label, read_canonical, ReadResult};

// ---

/// The single pedestrian count class, post-normalization.
const PERSONA: &str = "persona";

/// Read one pedestrian workbook into canonical rows.
pub fn read_pedestrian(path: &Path) -> ReadResult {
    let label = file_label(path);
    let (rows, mut warnings) = read_canonical(path, &label)?;

    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped: Vec<String> = Vec::new();
    for row in rows {
        if row.category == PERSONA {
            kept.push(row);
        } else if !dropped.contains(&row.category) {
            dropped.push(row.category.clone());
        }
    }

    if kept.is_empty() {
        return Err(SourceFormatError::new(
            label,
            "required column 'PERSONA' not found",
        ));
    }
    for category in dropped {
        warnings.push(DataWarning::file(
            &label,
            format!("ignoring non-pedestrian column '{category}'"),
        ));
    }

    Ok((kept, warnings))
}
