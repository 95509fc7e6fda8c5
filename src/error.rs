//! Error taxonomy for the homologation pipeline.
//!
//! Format and mapping errors abort the run for the session and carry enough
//! detail (sheet, column, offending codes) for the user to fix the uploaded
//! workbooks. Row-level problems never abort: they are recorded as
//! [`DataWarning`]s and returned alongside the finished report.

use serde::Serialize;
use thiserror::Error;

// ---

/// The template workbook is missing a sheet or a required column.
#[derive(Debug, Error)]
#[error("template format error in sheet '{sheet}': {detail}")]
pub struct TemplateFormatError {
    pub sheet: String,
    pub detail: String,
}

impl TemplateFormatError {
    pub fn new(sheet: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            detail: detail.into(),
        }
    }
}

/// A source workbook does not match its expected layout.
#[derive(Debug, Error)]
#[error("source format error in '{file}': {detail}")]
pub struct SourceFormatError {
    pub file: String,
    pub detail: String,
}

impl SourceFormatError {
    pub fn new(file: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            detail: detail.into(),
        }
    }
}

/// Two sources with equal priority supplied the same
/// (timestamp, control point, category) key.
///
/// Picking one silently would mask a data-quality problem, so the merge
/// refuses instead. `keys` holds the formatted colliding keys.
#[derive(Debug, Error)]
pub struct AmbiguousMergeError {
    pub keys: Vec<String>,
}

impl std::fmt::Display for AmbiguousMergeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Cap the listing so a badly duplicated upload does not flood the response
        let shown = self.keys.iter().take(10).cloned().collect::<Vec<_>>();
        write!(
            f,
            "ambiguous merge: {} key(s) supplied by sources with equal priority: {}",
            self.keys.len(),
            shown.join(", ")
        )?;
        if self.keys.len() > shown.len() {
            write!(f, ", ...")?;
        }
        Ok(())
    }
}

/// One or more control-point codes did not resolve through the template map.
///
/// Collected across the whole table (not fail-fast) so the template can be
/// fixed in one pass. `codes` is sorted and deduplicated.
#[derive(Debug, Error)]
pub struct UnmappedControlPointError {
    pub codes: Vec<String>,
}

impl std::fmt::Display for UnmappedControlPointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unmapped control point(s) not found in template: {}",
            self.codes.join(", ")
        )
    }
}

/// Any failure that aborts one pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Template(#[from] TemplateFormatError),

    #[error(transparent)]
    Source(#[from] SourceFormatError),

    #[error(transparent)]
    AmbiguousMerge(#[from] AmbiguousMergeError),

    #[error(transparent)]
    UnmappedControlPoint(#[from] UnmappedControlPointError),

    #[error("workbook write error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True when the failure is in the uploaded data rather than the server.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Template(_) | Self::Source(_) | Self::AmbiguousMerge(_)
                | Self::UnmappedControlPoint(_)
        )
    }
}

/// Non-fatal row-level issue, surfaced in the upload response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DataWarning {
    /// File (or stage) the issue was found in.
    pub file: String,
    /// 0-based data row index when the issue is tied to one row.
    pub row: Option<usize>,
    pub detail: String,
}

impl DataWarning {
    pub fn row(file: impl Into<String>, row: usize, detail: impl Into<String>) -> Self {
        let warning = Self {
            file: file.into(),
            row: Some(row),
            detail: detail.into(),
        };
        tracing::warn!("{}: row {}: {}", warning.file, row, warning.detail);
        warning
    }

    pub fn file(file: impl Into<String>, detail: impl Into<String>) -> Self {
        let warning = Self {
            file: file.into(),
            row: None,
            detail: detail.into(),
        };
        tracing::warn!("{}: {}", warning.file, warning.detail);
        warning
    }
}
