//! Reader for the Philippine vehicular export.
//!
//! Same physical layout as Chile plus a `TRICYCLE` class. The export's
//! tricycle counter samples the first 5 minutes of every 15-minute bucket,
//! so tricycle counts are scaled ×3 at read time to cover the full bucket.
//! Gaps between buckets are left alone here; the interpolator fills them.

use std::path::Path;

use super::{file_label, read_canonical, ReadResult};

// ---

/// Category carrying the sub-sampled counts.
const TRICYCLE: &str = "tricycle";

/// Bucket minutes over sampled minutes (15 / 5).
const SCALE: i64 = 3;

/// Read one Philippine workbook into canonical rows.
pub fn read_philippines(path: &Path) -> ReadResult {
    let (mut rows, warnings) = read_canonical(path, &file_label(path))?;

    for row in &mut rows {
        if row.category == TRICYCLE {
            row.count *= SCALE;
        }
    }

    Ok((rows, warnings))
}
