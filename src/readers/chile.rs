//! Reader for the Chilean vehicular export.
//!
//! The Chile layout is the baseline vendor shape: Spanish headers, one count
//! column per vehicle class. Complementary workbooks use the same layout and
//! are read with this reader too (they differ only in merge priority).

use std::path::Path;

use super::{file_label, read_canonical, ReadResult};

// ---

/// Read one Chilean (or complementary) workbook into canonical rows.
pub fn read_chile(path: &Path) -> ReadResult {
    read_canonical(path, &file_label(path))
}
