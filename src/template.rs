//! Template Mapper: parses the reference workbook (`plantilla_peru.xlsx`)
//! into the lookups the pipeline needs.
//!
//! Sheet layout, by position:
//! - sheet 0: control-point map, columns `PUNTO NORUN` / `NOMBRE PARA
//!   CLIENTE` (required)
//! - sheet 1: count-class map, columns `VEHICULO ENTRADA (NORUN)` /
//!   `VEHICULOS SALIDA (PERU)`, Spanish or English headers (required for
//!   vehicular runs only)
//! - sheet 2 (optional): run configuration; a column `INTERVALO_MINUTOS`
//!   supplies the sampling default when the caller sent none
//!
//! Pure read; nothing is written.

use std::path::Path;

use calamine::Data;
use tracing::{debug, warn};

use crate::error::TemplateFormatError;
use crate::models::{CategoryMap, ControlPointMap, ReportKind, SamplingConfig};
use crate::normalize::normalize_label;
use crate::xlsx::{cell_count, cell_str, sheet_at};

// ---

const SHEET_CONTROL_POINTS: usize = 0;
const SHEET_CATEGORIES: usize = 1;
const SHEET_CONFIG: usize = 2;

/// Everything the pipeline takes from the template workbook.
#[derive(Debug, Clone)]
pub struct Template {
    pub control_points: ControlPointMap,
    /// Empty for pedestrian runs.
    pub categories: CategoryMap,
    pub sampling: SamplingConfig,
}

/// Load the template for one run.
///
/// `requested_interval` is the caller-supplied sampling value (already
/// range-checked); when absent the optional config sheet is consulted, then
/// `fallback_interval`.
pub fn load_template(
    path: &Path,
    kind: ReportKind,
    requested_interval: Option<SamplingConfig>,
    fallback_interval: SamplingConfig,
) -> Result<Template, TemplateFormatError> {
    let control_points = load_control_points(path)?;
    let categories = match kind {
        ReportKind::Vehicular => load_categories(path)?,
        ReportKind::Pedestrian => CategoryMap::default(),
    };

    let sampling = match requested_interval {
        Some(sampling) => sampling,
        None => load_config_interval(path)?.unwrap_or(fallback_interval),
    };

    debug!(
        control_points = control_points.len(),
        interval_minutes = sampling.interval_minutes,
        "template loaded"
    );

    Ok(Template {
        control_points,
        categories,
        sampling,
    })
}

fn load_control_points(path: &Path) -> Result<ControlPointMap, TemplateFormatError> {
    let range = sheet_at(path, SHEET_CONTROL_POINTS)
        .map_err(|detail| TemplateFormatError::new("puntos de control", detail))?;

    let headers = header_row(&range)
        .ok_or_else(|| TemplateFormatError::new("puntos de control", "sheet is empty"))?;
    let col_code = find_column(&headers, "punto norun")
        .ok_or_else(|| missing_column("puntos de control", "PUNTO NORUN"))?;
    let col_name = find_column(&headers, "nombre para cliente")
        .ok_or_else(|| missing_column("puntos de control", "NOMBRE PARA CLIENTE"))?;

    let mut map = ControlPointMap::new();
    for row in range.rows().skip(1) {
        let code = cell_str(cell(row, col_code));
        let name = cell_str(cell(row, col_name));
        if code.is_empty() || name.is_empty() {
            continue;
        }
        if let Some(previous) = map.insert(code.clone(), name) {
            // Documented behavior: the last occurrence wins
            warn!("duplicate control point '{code}' in template; replacing '{previous}'");
        }
    }

    if map.is_empty() {
        return Err(TemplateFormatError::new(
            "puntos de control",
            "no control-point rows found",
        ));
    }
    Ok(map)
}

fn load_categories(path: &Path) -> Result<CategoryMap, TemplateFormatError> {
    let range = sheet_at(path, SHEET_CATEGORIES)
        .map_err(|detail| TemplateFormatError::new("categorias", detail))?;

    let headers =
        header_row(&range).ok_or_else(|| TemplateFormatError::new("categorias", "sheet is empty"))?;
    let col_input = find_column(&headers, "vehiculo entrada (norun)")
        .ok_or_else(|| missing_column("categorias", "VEHICULO ENTRADA (NORUN)"))?;
    let col_output = find_column(&headers, "vehiculos salida (peru)")
        .ok_or_else(|| missing_column("categorias", "VEHICULOS SALIDA (PERU)"))?;

    let mut map = CategoryMap::default();
    for row in range.rows().skip(1) {
        let input = normalize_label(&cell_str(cell(row, col_input)));
        let output = cell_str(cell(row, col_output));
        if input.is_empty() || output.is_empty() {
            continue;
        }
        map.insert(input, output);
    }

    if map.is_empty() {
        return Err(TemplateFormatError::new(
            "categorias",
            "no category mapping rows found",
        ));
    }
    Ok(map)
}

/// Sampling interval from the optional config sheet, if present.
fn load_config_interval(path: &Path) -> Result<Option<SamplingConfig>, TemplateFormatError> {
    let Ok(range) = sheet_at(path, SHEET_CONFIG) else {
        return Ok(None);
    };
    let Some(headers) = header_row(&range) else {
        return Ok(None);
    };
    let Some(col) = find_column(&headers, "intervalo_minutos") else {
        return Ok(None);
    };

    for row in range.rows().skip(1) {
        let value = cell(row, col);
        if matches!(value, Data::Empty) {
            continue;
        }
        let minutes = cell_count(value)
            .map_err(|detail| TemplateFormatError::new("configuracion", detail))?;
        let minutes = u32::try_from(minutes).ok().and_then(SamplingConfig::new);
        return match minutes {
            Some(sampling) => Ok(Some(sampling)),
            None => Err(TemplateFormatError::new(
                "configuracion",
                "INTERVALO_MINUTOS must be between 1 and 60",
            )),
        };
    }
    Ok(None)
}

// ---

fn header_row(range: &calamine::Range<Data>) -> Option<Vec<String>> {
    range
        .rows()
        .next()
        .map(|row| row.iter().map(|c| normalize_label(&cell_str(c))).collect())
}

fn find_column(headers: &[String], want: &str) -> Option<usize> {
    headers.iter().position(|h| h == want)
}

static EMPTY_CELL: Data = Data::Empty;

fn cell<'a>(row: &'a [Data], index: usize) -> &'a Data {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

fn missing_column(sheet: &str, column: &str) -> TemplateFormatError {
    TemplateFormatError::new(sheet, format!("required column '{column}' not found"))
}
