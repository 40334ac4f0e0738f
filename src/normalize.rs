//! Flattening of heterogeneous column encodings into a canonical cell shape.
//!
//! Source files encode "list of strings" several ways: a native list column,
//! a JSON-encoded string, or a bare scalar. Every cell is reduced to one of
//! three shapes: null, a scalar string, or a list of strings.
//!
//! Two variants exist and they deliberately disagree. The catalog variant is
//! total for the classified list fields: those always come back as a list,
//! even length one, and the classified scalar fields stay plain strings. The
//! generic datastore variant instead collapses any list of length <= 1 back
//! to a scalar (or null when empty) and only keeps true lists. Downstream
//! consumers depend on both behaviors: the catalog table treats its four
//! list fields as arrays unconditionally, the datastore table inspects each
//! cell's runtime shape.

use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::LoadError;

/// Canonical cell representation after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Scalar(String),
    List(Vec<String>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// One normalized row: column name to canonical cell.
pub type DataRow = BTreeMap<String, CellValue>;

/// Static field classification for the metacatalog shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    List,
}

/// Stringify an engine value the way cells are displayed.
fn stringify(value: &AnyValue) -> String {
    value.str_value().to_string()
}

/// Materialize an engine-native vector into plain strings, dropping nulls.
fn list_from_series(series: &Series) -> Vec<String> {
    series
        .iter()
        .filter(|v| !matches!(v, AnyValue::Null))
        .map(|v| stringify(&v))
        .collect()
}

/// Stringify one JSON value without quoting strings.
fn json_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decode a JSON array string into elements, dropping JSON nulls.
fn json_array_elements(value: &serde_json::Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter(|v| !v.is_null())
            .map(json_to_string)
            .collect()
    })
}

/// Normalize a cell for the metacatalog shape. List-classified fields always
/// yield a list; scalar-classified fields stay plain strings.
pub fn normalize_catalog_cell(value: AnyValue, kind: FieldKind) -> CellValue {
    match value {
        AnyValue::Null => match kind {
            FieldKind::List => CellValue::List(Vec::new()),
            FieldKind::Scalar => CellValue::Scalar(String::new()),
        },
        AnyValue::List(series) => {
            let items = list_from_series(&series);
            match kind {
                FieldKind::List => CellValue::List(items),
                // Not expected for the classified scalar fields; degrade gracefully.
                FieldKind::Scalar => CellValue::Scalar(items.join(", ")),
            }
        }
        AnyValue::String(s) => normalize_catalog_string(s, kind),
        AnyValue::StringOwned(s) => normalize_catalog_string(s.as_str(), kind),
        other => {
            let s = stringify(&other);
            match kind {
                FieldKind::List => CellValue::List(vec![s]),
                FieldKind::Scalar => CellValue::Scalar(s),
            }
        }
    }
}

fn normalize_catalog_string(s: &str, kind: FieldKind) -> CellValue {
    match kind {
        // Classified scalar fields are left untouched, JSON-looking or not.
        FieldKind::Scalar => CellValue::Scalar(s.to_string()),
        FieldKind::List => {
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(s) {
                if let Some(items) = json_array_elements(&parsed) {
                    return CellValue::List(items);
                }
                return CellValue::List(vec![json_to_string(&parsed)]);
            }
            CellValue::List(vec![s.to_string()])
        }
    }
}

/// Normalize a cell for the generic per-datastore shape, collapsing any list
/// of length <= 1 back to a bare scalar (or null when empty).
pub fn normalize_datastore_cell(value: AnyValue) -> CellValue {
    match value {
        AnyValue::Null => CellValue::Null,
        AnyValue::List(series) => collapse(list_from_series(&series)),
        AnyValue::String(s) => normalize_datastore_string(s),
        AnyValue::StringOwned(s) => normalize_datastore_string(s.as_str()),
        other => CellValue::Scalar(stringify(&other)),
    }
}

fn normalize_datastore_string(s: &str) -> CellValue {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(s) {
        if let Some(items) = json_array_elements(&parsed) {
            return collapse(items);
        }
        if parsed.is_null() {
            return CellValue::Null;
        }
        return CellValue::Scalar(json_to_string(&parsed));
    }
    CellValue::Scalar(s.to_string())
}

fn collapse(mut items: Vec<String>) -> CellValue {
    match items.len() {
        0 => CellValue::Null,
        1 => CellValue::Scalar(items.remove(0)),
        _ => CellValue::List(items),
    }
}

/// Which normalizer variant to run over a rowset.
#[derive(Debug, Clone, Copy)]
pub enum NormalizeMode {
    /// Metacatalog shape: classify fields with the given function.
    Catalog(fn(&str) -> FieldKind),
    /// Generic per-datastore shape (collapsing).
    Datastore,
}

/// Normalize every row of a rowset into canonical records.
pub fn rows_from_frame(df: &DataFrame, mode: NormalizeMode) -> Result<Vec<DataRow>, LoadError> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut row = DataRow::new();
        for column in columns {
            let name = column.name().to_string();
            let value = column.get(idx)?;
            let cell = match mode {
                NormalizeMode::Catalog(classify) => {
                    normalize_catalog_cell(value, classify(&name))
                }
                NormalizeMode::Datastore => normalize_datastore_cell(value),
            };
            row.insert(name, cell);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_value(items: &[&str]) -> AnyValue<'static> {
        AnyValue::List(Series::new("".into(), items))
    }

    fn empty_list_value() -> AnyValue<'static> {
        AnyValue::List(Series::new_empty("".into(), &DataType::String))
    }

    #[test]
    fn catalog_list_field_is_total() {
        // Every input shape yields a list, never null or a bare scalar.
        let cases: Vec<(AnyValue, Vec<&str>)> = vec![
            (AnyValue::Null, vec![]),
            (list_value(&["ocean", "atmos"]), vec!["ocean", "atmos"]),
            (empty_list_value(), vec![]),
            (AnyValue::String(r#"["a","b"]"#), vec!["a", "b"]),
            (AnyValue::String(r#""mon""#), vec!["mon"]),
            (AnyValue::String("mon"), vec!["mon"]),
            (AnyValue::Int64(3), vec!["3"]),
        ];
        for (input, expected) in cases {
            let cell = normalize_catalog_cell(input.clone(), FieldKind::List);
            let expected: Vec<String> = expected.into_iter().map(String::from).collect();
            assert_eq!(cell, CellValue::List(expected), "input: {:?}", input);
        }
    }

    #[test]
    fn catalog_scalar_field_stays_a_string() {
        let cell = normalize_catalog_cell(AnyValue::String("a plain description"), FieldKind::Scalar);
        assert_eq!(cell, CellValue::Scalar("a plain description".to_string()));
        // JSON-looking scalars are not decoded for scalar fields.
        let cell = normalize_catalog_cell(AnyValue::String(r#"["x"]"#), FieldKind::Scalar);
        assert_eq!(cell, CellValue::Scalar(r#"["x"]"#.to_string()));
        let cell = normalize_catalog_cell(AnyValue::Null, FieldKind::Scalar);
        assert_eq!(cell, CellValue::Scalar(String::new()));
    }

    #[test]
    fn catalog_list_drops_nulls_inside_vectors() {
        let series = Series::new("".into(), &[Some("ocean"), None, Some("ice")]);
        let cell = normalize_catalog_cell(AnyValue::List(series), FieldKind::List);
        assert_eq!(
            cell,
            CellValue::List(vec!["ocean".to_string(), "ice".to_string()])
        );
    }

    #[test]
    fn datastore_collapses_by_length() {
        // Lengths 0, 1, 2: null, bare scalar, list.
        assert_eq!(normalize_datastore_cell(empty_list_value()), CellValue::Null);
        assert_eq!(
            normalize_datastore_cell(list_value(&["ocean"])),
            CellValue::Scalar("ocean".to_string())
        );
        assert_eq!(
            normalize_datastore_cell(list_value(&["ocean", "atmos"])),
            CellValue::List(vec!["ocean".to_string(), "atmos".to_string()])
        );
    }

    #[test]
    fn datastore_collapses_json_arrays_too() {
        assert_eq!(normalize_datastore_cell(AnyValue::String("[]")), CellValue::Null);
        assert_eq!(
            normalize_datastore_cell(AnyValue::String(r#"["only"]"#)),
            CellValue::Scalar("only".to_string())
        );
        assert_eq!(
            normalize_datastore_cell(AnyValue::String(r#"["a","b"]"#)),
            CellValue::List(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn datastore_null_and_scalars() {
        assert_eq!(normalize_datastore_cell(AnyValue::Null), CellValue::Null);
        assert_eq!(
            normalize_datastore_cell(AnyValue::String("plain")),
            CellValue::Scalar("plain".to_string())
        );
        assert_eq!(
            normalize_datastore_cell(AnyValue::Int64(42)),
            CellValue::Scalar("42".to_string())
        );
        // A JSON scalar string stays a scalar on the generic path.
        assert_eq!(
            normalize_datastore_cell(AnyValue::String(r#""quoted""#)),
            CellValue::Scalar("quoted".to_string())
        );
    }

    #[test]
    fn rows_from_frame_walks_every_cell() {
        let df = df!(
            "name" => &["x", "y"],
            "value" => &[Some(1_i64), None]
        )
        .unwrap();
        let rows = rows_from_frame(&df, NormalizeMode::Datastore).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], CellValue::Scalar("x".to_string()));
        assert_eq!(rows[0]["value"], CellValue::Scalar("1".to_string()));
        assert_eq!(rows[1]["value"], CellValue::Null);
    }

    #[test]
    fn cell_value_serializes_untagged() {
        let row: DataRow = [
            ("a".to_string(), CellValue::Null),
            ("b".to_string(), CellValue::Scalar("s".to_string())),
            ("c".to_string(), CellValue::List(vec!["x".to_string()])),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"a":null,"b":"s","c":["x"]}"#);
    }
}
