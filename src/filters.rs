//! Distinct-value index per column, for building selection filters.

use crate::normalize::{CellValue, DataRow};
use std::collections::{BTreeMap, BTreeSet};

/// Scan every row and every column, collecting the distinct non-null,
/// non-empty values per column. List cells contribute each element. The
/// result is sorted and deduplicated; recomputed in full on every load.
pub fn build_filter_options(rows: &[DataRow]) -> BTreeMap<String, Vec<String>> {
    let mut acc: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        for (column, cell) in row {
            match cell {
                CellValue::Null => {}
                CellValue::Scalar(value) => add_value(&mut acc, column, value),
                CellValue::List(values) => {
                    for value in values {
                        add_value(&mut acc, column, value);
                    }
                }
            }
        }
    }
    acc.into_iter()
        .map(|(column, values)| (column, values.into_iter().collect()))
        .collect()
}

fn add_value(acc: &mut BTreeMap<String, BTreeSet<String>>, column: &str, value: &str) {
    if value.trim().is_empty() {
        return;
    }
    acc.entry(column.to_string())
        .or_default()
        .insert(value.to_string());
}
