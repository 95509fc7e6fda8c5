//! Row-wise merge of canonical tables by source priority.
//!
//! Rows are keyed by (timestamp, control point, category). On a key
//! collision the higher-priority source wins; a collision between sources of
//! equal priority is refused with [`AmbiguousMergeError`] instead of picking
//! one silently. Rows unique to any source pass through unchanged, and with
//! distinct priorities the result does not depend on table order.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::AmbiguousMergeError;
use crate::models::{CanonicalRow, MergedTable, RowKey, SourceTable};

// ---

/// Merge source tables into one deduplicated table.
pub fn merge(tables: &[SourceTable]) -> Result<MergedTable, AmbiguousMergeError> {
    let mut best: BTreeMap<RowKey, (u8, i64)> = BTreeMap::new();
    let mut collisions: BTreeSet<String> = BTreeSet::new();

    for table in tables {
        for row in &table.rows {
            match best.entry(row.key()) {
                Entry::Vacant(slot) => {
                    slot.insert((table.priority, row.count));
                }
                Entry::Occupied(mut slot) => {
                    let (winning_priority, _) = *slot.get();
                    if table.priority > winning_priority {
                        slot.insert((table.priority, row.count));
                    } else if table.priority == winning_priority {
                        collisions.insert(format_key(&row.key()));
                    }
                }
            }
        }
    }

    if !collisions.is_empty() {
        return Err(AmbiguousMergeError {
            keys: collisions.into_iter().collect(),
        });
    }

    Ok(best
        .into_iter()
        .map(|((timestamp, control_point, category), (_, count))| CanonicalRow {
            timestamp,
            control_point,
            category,
            count,
        })
        .collect())
}

fn format_key(key: &RowKey) -> String {
    format!("{} / {} / {}", key.0.format("%Y-%m-%d %H:%M"), key.1, key.2)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 29)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn row(h: u32, cp: &str, cat: &str, count: i64) -> CanonicalRow {
        CanonicalRow {
            timestamp: ts(h),
            control_point: cp.into(),
            category: cat.into(),
            count,
        }
    }

    fn table(name: &str, priority: u8, rows: Vec<CanonicalRow>) -> SourceTable {
        SourceTable {
            name: name.into(),
            priority,
            rows,
        }
    }

    #[test]
    fn higher_priority_wins_on_overlap() {
        // ---
        let chile = table("chile", 3, vec![row(10, "PC1", "car", 8)]);
        let ph = table("ph", 1, vec![row(10, "PC1", "car", 99)]);

        let merged = merge(&[chile, ph]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].count, 8);
    }

    #[test]
    fn unique_rows_pass_through() {
        // ---
        let chile = table("chile", 3, vec![row(10, "PC1", "car", 8)]);
        let ph = table("ph", 1, vec![row(10, "PC1", "tricycle", 4), row(11, "PC2", "car", 2)]);

        let merged = merge(&[chile, ph]).unwrap();
        assert_eq!(merged.len(), 3);
        // Ascending (timestamp, control point, category)
        assert_eq!(merged[0].category, "car");
        assert_eq!(merged[1].category, "tricycle");
        assert_eq!(merged[2].control_point, "PC2");
    }

    #[test]
    fn order_independent_with_distinct_priorities() {
        // ---
        let a = table("a", 3, vec![row(10, "PC1", "car", 1), row(11, "PC1", "car", 2)]);
        let b = table("b", 2, vec![row(10, "PC1", "car", 10), row(12, "PC1", "car", 3)]);
        let c = table("c", 1, vec![row(12, "PC1", "car", 30), row(13, "PC1", "car", 4)]);

        let abc = merge(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let cab = merge(&[c, a, b]).unwrap();
        assert_eq!(abc, cab);
        assert_eq!(abc.iter().map(|r| r.count).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn equal_priority_collision_is_refused() {
        // ---
        let day1 = table("day1", 3, vec![row(10, "PC1", "car", 5)]);
        let day2 = table("day2", 3, vec![row(10, "PC1", "car", 6)]);

        let err = merge(&[day1, day2]).unwrap_err();
        assert_eq!(err.keys.len(), 1);
        assert!(err.keys[0].contains("PC1"));
    }

    #[test]
    fn equal_priority_disjoint_keys_are_fine() {
        // ---
        let day1 = table("day1", 3, vec![row(10, "PC1", "car", 5)]);
        let day2 = table("day2", 3, vec![row(11, "PC1", "car", 6)]);

        let merged = merge(&[day1, day2]).unwrap();
        assert_eq!(merged.len(), 2);
    }
}
