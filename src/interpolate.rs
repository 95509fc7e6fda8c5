//! Gap interpolation for sparse count series.
//!
//! Each (control point, category) series is handled independently: whenever
//! two consecutive observations sit more than one sampling interval apart,
//! intermediate buckets are generated at the configured step with linearly
//! interpolated counts. Nothing is extrapolated outside the observed range,
//! and a series that is already dense passes through unchanged — running
//! the interpolation twice is the same as running it once.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::models::{CanonicalRow, SamplingConfig};

// ---

/// Fill time-bucket gaps in `rows` by linear interpolation.
pub fn interpolate(rows: Vec<CanonicalRow>, sampling: SamplingConfig) -> Vec<CanonicalRow> {
    let step = sampling.interval();

    // Series keyed by (control point, category), ordered by timestamp
    let mut series: BTreeMap<(String, String), BTreeMap<NaiveDateTime, i64>> = BTreeMap::new();
    for row in rows {
        series
            .entry((row.control_point, row.category))
            .or_default()
            .insert(row.timestamp, row.count);
    }

    let mut out = Vec::new();
    for ((control_point, category), points) in series {
        let points: Vec<(NaiveDateTime, i64)> = points.into_iter().collect();

        for window in points.windows(2) {
            let (t0, c0) = window[0];
            let (t1, c1) = window[1];
            out.push(row(t0, &control_point, &category, c0));

            let gap = t1 - t0;
            if gap <= step {
                continue;
            }
            let span_secs = gap.num_seconds() as f64;
            let mut t = t0 + step;
            while t < t1 {
                let progress = (t - t0).num_seconds() as f64 / span_secs;
                let value = c0 as f64 + (c1 - c0) as f64 * progress;
                out.push(row(t, &control_point, &category, value.round() as i64));
                t += step;
            }
        }

        // Last observation (or the only one); never extrapolated past
        if let Some(&(t_last, c_last)) = points.last() {
            out.push(row(t_last, &control_point, &category, c_last));
        }
    }

    out.sort_by(|a, b| a.key().cmp(&b.key()));
    out
}

fn row(timestamp: NaiveDateTime, control_point: &str, category: &str, count: i64) -> CanonicalRow {
    CanonicalRow {
        timestamp,
        control_point: control_point.to_string(),
        category: category.to_string(),
        count: count.max(0),
    }
}
