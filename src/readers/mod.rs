//! Country Readers: one module per vendor spreadsheet layout, each producing
//! canonical rows plus row-level warnings.
//!
//! All source exports share one physical shape: the data lives on the second
//! worksheet, the first row is a banner, the second row is the header. The
//! header language differs (Spanish or English) and is resolved once here
//! into a [`HeaderLayout`]; everything downstream of the readers sees the
//! normalized Spanish vocabulary.
//!
//! Readers never apply the control-point map — raw codes (prefix before the
//! first dash) flow through to the homologator. The movement dimension of
//! the source sheets is folded away: duplicate (timestamp, control point,
//! category) keys are summed.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::Data;
use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{DataWarning, SourceFormatError};
use crate::models::{CanonicalRow, RowKey};
use crate::normalize::{control_point_prefix, normalize_label};
use crate::xlsx::{cell_count, cell_datetime, cell_str, sheet_at};

mod chile;
mod pedestrian;
mod philippines;

pub use chile::read_chile;
pub use pedestrian::read_pedestrian;
pub use philippines::read_philippines;

// ---

/// Worksheet position of the data sheet in every source export.
const DATA_SHEET: usize = 1;

/// Identifier columns; every other header is a count category.
const IDENTIFIER_COLUMNS: [&str; 6] = [
    "proyecto",
    "localizacion",
    "fuente de datos",
    "geolocalizacion",
    "intervalo",
    "movimiento",
];

/// Header language of a source sheet, detected before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLanguage {
    Spanish,
    English,
}

/// Resolved column layout of one source sheet.
#[derive(Debug)]
pub struct HeaderLayout {
    pub language: HeaderLanguage,
    pub col_source: usize,
    pub col_interval: usize,
    /// (column index, normalized category label)
    pub categories: Vec<(usize, String)>,
}

/// Rows plus accumulated warnings from one file.
pub type ReadResult = Result<(Vec<CanonicalRow>, Vec<DataWarning>), SourceFormatError>;

/// Resolve the header row of a source sheet into a [`HeaderLayout`].
fn resolve_layout(raw_headers: &[Data], file: &str) -> Result<HeaderLayout, SourceFormatError> {
    let raw: Vec<String> = raw_headers.iter().map(cell_str).collect();
    let language = if raw
        .iter()
        .any(|h| h.trim().eq_ignore_ascii_case("data source"))
    {
        HeaderLanguage::English
    } else {
        HeaderLanguage::Spanish
    };

    let normalized: Vec<String> = raw.iter().map(|h| normalize_label(h)).collect();

    let position = |want: &str| normalized.iter().position(|h| h == want);
    let col_source = position("fuente de datos").ok_or_else(|| {
        SourceFormatError::new(file, "required column 'FUENTE DE DATOS' not found")
    })?;
    let col_interval = position("intervalo")
        .ok_or_else(|| SourceFormatError::new(file, "required column 'INTERVALO' not found"))?;

    let categories = normalized
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.is_empty() && !IDENTIFIER_COLUMNS.contains(&h.as_str()))
        .map(|(i, h)| (i, h.clone()))
        .collect::<Vec<_>>();

    if categories.is_empty() {
        return Err(SourceFormatError::new(file, "no count columns found"));
    }

    debug!(file, ?language, categories = categories.len(), "layout resolved");
    Ok(HeaderLayout {
        language,
        col_source,
        col_interval,
        categories,
    })
}

/// Timestamp of a row: the start of its `INTERVALO` value.
///
/// Accepts the export's `"start - end"` strings and native datetime cells.
fn interval_start(cell: &Data) -> Option<NaiveDateTime> {
    if let Data::String(s) = cell {
        let start = s.split(" - ").next().unwrap_or(s).trim();
        return NaiveDateTime::parse_from_str(start, "%m/%d/%Y %H:%M:%S").ok();
    }
    cell_datetime(cell)
}

/// Read one source sheet into canonical rows.
///
/// Shared by all three readers; per-source fixups (tricycle scaling,
/// category restriction) happen in the caller.
fn read_canonical(path: &Path, file_label: &str) -> ReadResult {
    let range = sheet_at(path, DATA_SHEET)
        .map_err(|detail| SourceFormatError::new(file_label, detail))?;

    let mut rows_iter = range.rows();
    // First row is a banner; the header follows it
    rows_iter.next();
    let header = rows_iter
        .next()
        .ok_or_else(|| SourceFormatError::new(file_label, "data sheet has no header row"))?;
    let layout = resolve_layout(header, file_label)?;

    let mut warnings = Vec::new();
    let mut counts: BTreeMap<RowKey, i64> = BTreeMap::new();

    for (row_idx, row) in rows_iter.enumerate() {
        let source = cell_str(row.get(layout.col_source).unwrap_or(&Data::Empty));
        if source.is_empty() {
            continue;
        }
        let control_point = control_point_prefix(&source);

        let interval_cell = row.get(layout.col_interval).unwrap_or(&Data::Empty);
        let Some(timestamp) = interval_start(interval_cell) else {
            warnings.push(DataWarning::row(
                file_label,
                row_idx,
                format!("unparseable interval '{}', row skipped", cell_str(interval_cell)),
            ));
            continue;
        };

        for (col, category) in &layout.categories {
            let cell = row.get(*col).unwrap_or(&Data::Empty);
            let count = match cell_count(cell) {
                Ok(count) => count,
                Err(detail) => {
                    warnings.push(DataWarning::row(
                        file_label,
                        row_idx,
                        format!("bad count in '{category}' ({detail}), using 0"),
                    ));
                    0
                }
            };
            *counts
                .entry((timestamp, control_point.clone(), category.clone()))
                .or_insert(0) += count.max(0);
        }
    }

    let rows = counts
        .into_iter()
        .map(|((timestamp, control_point, category), count)| CanonicalRow {
            timestamp,
            control_point,
            category,
            count,
        })
        .collect();

    Ok((rows, warnings))
}

/// File-name label used in warnings and errors.
fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
