//! Workbook access helpers: cell coercion on the calamine side and the
//! final report writer on the rust_xlsxwriter side.

use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};

use crate::models::Report;

// ---

/// Fixed leading columns of the Peru report convention; count categories
/// follow these.
pub const REPORT_FIXED_HEADERS: [&str; 6] = [
    "PC",
    "INTERSECCION",
    "FECHA",
    "HORA INICIO",
    "HORA TERMINO",
    "CUARTO",
];

/// Open `path` and return the worksheet at `index` (0-based).
///
/// Returns a plain detail string so callers can wrap it in their own error
/// type (template vs. source format errors).
pub fn sheet_at(path: &Path, index: usize) -> Result<Range<Data>, String> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e| format!("cannot open workbook: {e}"))?;
    match workbook.worksheet_range_at(index) {
        Some(Ok(range)) => Ok(range),
        Some(Err(e)) => Err(format!("cannot read worksheet {index}: {e}")),
        None => Err(format!("worksheet {index} does not exist")),
    }
}

/// Render any cell as a trimmed string ("" for empty cells).
pub fn cell_str(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            // Excel stores integers as floats; print them without ".0"
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%m/%d/%Y %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => format!("#{e:?}"),
    }
}

/// Interpret a cell as a count.
///
/// Empty cells are a missing observation and coerce to `Ok(0)`; anything
/// that is present but not numeric is `Err` so the caller can record a
/// warning and fall back to zero.
pub fn cell_count(cell: &Data) -> Result<i64, String> {
    match cell {
        Data::Empty => Ok(0),
        Data::Int(i) => Ok(*i),
        Data::Float(f) => Ok(f.round() as i64),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse::<f64>()
                .map(|f| f.round() as i64)
                .map_err(|_| format!("not a number: '{trimmed}'"))
        }
        other => Err(format!("not a number: {other:?}")),
    }
}

/// Interpret a cell as a datetime, accepting native datetime cells and the
/// export's `%m/%d/%Y %H:%M:%S` strings.
pub fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::String(s) => NaiveDateTime::parse_from_str(s.trim(), "%m/%d/%Y %H:%M:%S").ok(),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S").ok(),
        _ => None,
    }
}

/// Write the homologated report workbook to `path`.
///
/// One worksheet, bold frozen header row, the fixed Peru columns followed by
/// one column per output category.
pub fn write_report(report: &Report, path: &Path) -> Result<(), rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Reporte")?;

    let fmt_header = Format::new().set_bold();

    let mut col: u16 = 0;
    for header in REPORT_FIXED_HEADERS {
        worksheet.write_string_with_format(0, col, header, &fmt_header)?;
        col += 1;
    }
    for category in &report.categories {
        worksheet.write_string_with_format(0, col, category, &fmt_header)?;
        col += 1;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (i, row) in report.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, &row.control_point)?;
        worksheet.write_string(r, 1, &row.intersection)?;
        worksheet.write_string(r, 2, &row.start.format("%d-%m-%Y").to_string())?;
        worksheet.write_string(r, 3, &row.start.format("%H:%M:%S").to_string())?;
        worksheet.write_string(
            r,
            4,
            &row.end(report.interval_minutes).format("%H:%M:%S").to_string(),
        )?;
        worksheet.write_string(r, 5, &row.quarter())?;
        for (j, count) in row.counts.iter().enumerate() {
            let c = REPORT_FIXED_HEADERS.len() as u16 + j as u16;
            worksheet.write_number(r, c, *count as f64)?;
        }
    }

    // Readable widths for the name-bearing columns
    worksheet.set_column_width(1, 32.0)?;
    worksheet.set_column_width(2, 12.0)?;

    workbook.save(path)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn cell_count_coercions() {
        // ---
        assert_eq!(cell_count(&Data::Empty), Ok(0));
        assert_eq!(cell_count(&Data::Int(7)), Ok(7));
        assert_eq!(cell_count(&Data::Float(4.6)), Ok(5));
        assert_eq!(cell_count(&Data::String(" 12 ".into())), Ok(12));
        assert_eq!(cell_count(&Data::String("".into())), Ok(0));
        assert!(cell_count(&Data::String("n/a".into())).is_err());
        assert!(cell_count(&Data::Bool(true)).is_err());
    }

    #[test]
    fn cell_datetime_parses_export_strings() {
        // ---
        let dt = cell_datetime(&Data::String("01/29/2025 08:00:00".into())).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2025-01-29 08:00");
        assert!(cell_datetime(&Data::String("29/01/2025".into())).is_none());
        assert!(cell_datetime(&Data::Empty).is_none());
    }

    #[test]
    fn cell_str_drops_float_point_zero() {
        // ---
        assert_eq!(cell_str(&Data::Float(15.0)), "15");
        assert_eq!(cell_str(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_str(&Data::String("  PC1 ".into())), "PC1");
    }
}
