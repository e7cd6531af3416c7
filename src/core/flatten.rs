//! Turns listing records into tables.
//!
//! * raw: one column per top-level key, nested values kept as compact JSON
//! * clean: nested objects flattened into dotted columns (`Comprador.NombreUnidad`),
//!   amounts and `Fecha*` columns normalized

use crate::domain::model::{ListingRecord, Table};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Columns parsed as Chilean-formatted amounts (`1.234.567,89`).
pub const AMOUNT_COLUMNS: [&str; 3] = ["MontoEstimado", "Monto", "MontoTotal"];
pub const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column used when a record is not a JSON object.
const SCALAR_COLUMN: &str = "value";

/// Collects rows whose columns are discovered as they arrive.
#[derive(Debug, Default)]
pub(crate) struct TableBuilder {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<Vec<Option<String>>>,
}

impl TableBuilder {
    pub(crate) fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Self::default();
        for column in columns {
            builder.position(column.into());
        }
        builder
    }

    fn position(&mut self, column: String) -> usize {
        if let Some(&idx) = self.positions.get(&column) {
            return idx;
        }
        let idx = self.columns.len();
        self.positions.insert(column.clone(), idx);
        self.columns.push(column);
        idx
    }

    /// Adds one row. When two cells land on the same column (a literal
    /// `"A.B"` key next to a nested `A: {B}`), the first one is kept.
    pub(crate) fn push_row<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut row = vec![None; self.columns.len()];
        let mut filled = vec![false; self.columns.len()];
        for (column, cell) in cells {
            let idx = self.position(column);
            if idx >= row.len() {
                row.resize(idx + 1, None);
                filled.resize(idx + 1, false);
            }
            if filled[idx] {
                tracing::debug!(
                    "Column {} appears twice in one record, keeping the first value",
                    self.columns[idx]
                );
                continue;
            }
            filled[idx] = true;
            row[idx] = cell;
        }
        self.rows.push(row);
    }

    pub(crate) fn finish(mut self) -> Table {
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, None);
        }
        Table {
            columns: self.columns,
            rows: self.rows,
        }
    }
}

/// Text form of a JSON value for a CSV cell. `null` is an empty cell.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}

pub fn raw_table(records: &[ListingRecord]) -> Table {
    let mut builder = TableBuilder::default();
    for record in records {
        match record {
            Value::Object(map) => {
                builder.push_row(map.iter().map(|(k, v)| (k.clone(), cell_text(v))));
            }
            other => builder.push_row([(SCALAR_COLUMN.to_string(), cell_text(other))]),
        }
    }
    builder.finish()
}

/// Dotted key/value pairs of a record. Objects are walked recursively; lists
/// and scalars are leaves.
pub fn flatten_record(record: &ListingRecord) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    match record {
        Value::Object(_) => flatten_into("", record, &mut out),
        other => out.push((SCALAR_COLUMN.to_string(), other.clone())),
    }
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(&path, child, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.clone())),
    }
}

pub fn clean_table(records: &[ListingRecord]) -> Table {
    let mut builder = TableBuilder::default();
    for record in records {
        let cells = flatten_record(record)
            .into_iter()
            .map(|(column, value)| {
                let cell = normalize_cell(&column, &value);
                (column, cell)
            })
            .collect::<Vec<_>>();
        builder.push_row(cells);
    }
    builder.finish()
}

fn normalize_cell(column: &str, value: &Value) -> Option<String> {
    if AMOUNT_COLUMNS.contains(&column) {
        normalize_amount(value)
    } else if column.contains("Fecha") {
        normalize_date(value)
    } else {
        cell_text(value)
    }
}

/// Numeric text for an amount, or `None` when it cannot be read as a number.
pub fn normalize_amount(value: &Value) -> Option<String> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_amount(s)?,
        _ => return None,
    };
    Some(format_amount(amount))
}

fn thousands_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d{1,3}(\.\d{3})+$").expect("static regex"))
}

/// Reads `1.234.567,89`, `1.500.000`, `1500000` and `1500000.5` style amounts.
pub fn parse_amount(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_start_matches('$').trim();
    if trimmed.is_empty() {
        return None;
    }

    let canonical = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else if thousands_only().is_match(trimmed) {
        trimmed.replace('.', "")
    } else {
        trimmed.to_string()
    };

    canonical.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{:.0}", amount)
    } else {
        amount.to_string()
    }
}

/// Timestamp as `YYYY-MM-DD HH:MM:SS`, or `None` when unparseable.
pub fn normalize_date(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    parse_timestamp(text).map(|ts| ts.format(DATE_OUTPUT_FORMAT).to_string())
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%d-%m-%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Value> {
        vec![
            json!({
                "CodigoExterno": "1509-5-L124",
                "Nombre": "Servicio de aseo",
                "FechaCierre": "2025-10-20T15:00:00",
                "MontoEstimado": "1.500.000",
                "Comprador": {"NombreOrganismo": "Municipalidad de Arica", "RegionUnidad": "Arica"},
                "Items": [{"Cantidad": 2}]
            }),
            json!({
                "CodigoExterno": "2239-12-LE24",
                "Estado": 5,
                "FechaCierre": "no informada",
                "MontoEstimado": 2500000.0
            }),
        ]
    }

    #[test]
    fn test_raw_table_keeps_nested_values_as_json() {
        let table = raw_table(&records());
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.cell(0, "Comprador"),
            Some(r#"{"NombreOrganismo":"Municipalidad de Arica","RegionUnidad":"Arica"}"#)
        );
        assert_eq!(table.cell(0, "Items"), Some(r#"[{"Cantidad":2}]"#));
        assert_eq!(table.cell(1, "Estado"), Some("5"));
        assert_eq!(table.cell(0, "Estado"), None);
        assert!(table.rows.iter().all(|r| r.len() == table.columns.len()));
    }

    #[test]
    fn test_clashing_dotted_key_keeps_first_value() {
        // "Comprador" sorts before "Comprador.Nombre", so the nested value comes first
        let record = json!({
            "Comprador.Nombre": "literal",
            "Comprador": {"Nombre": "nested"}
        });
        let table = clean_table(&[record]);
        assert_eq!(table.columns, vec!["Comprador.Nombre"]);
        assert_eq!(table.cell(0, "Comprador.Nombre"), Some("nested"));
    }

    #[test]
    fn test_clean_table_flattens_and_normalizes() {
        let table = clean_table(&records());
        assert_eq!(
            table.cell(0, "Comprador.NombreOrganismo"),
            Some("Municipalidad de Arica")
        );
        assert!(table.column_index("Comprador").is_none());
        assert_eq!(table.cell(0, "MontoEstimado"), Some("1500000"));
        assert_eq!(table.cell(1, "MontoEstimado"), Some("2500000"));
        assert_eq!(table.cell(0, "FechaCierre"), Some("2025-10-20 15:00:00"));
        assert_eq!(table.cell(1, "FechaCierre"), None);
        assert_eq!(table.cell(0, "Items"), Some(r#"[{"Cantidad":2}]"#));
    }

    #[test]
    fn test_non_object_records_use_value_column() {
        let table = clean_table(&[json!("suelto"), json!({"a": {"b": 1}})]);
        assert_eq!(table.cell(0, "value"), Some("suelto"));
        assert_eq!(table.cell(1, "a.b"), Some("1"));
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("1.234.567,89"), Some(1234567.89));
        assert_eq!(parse_amount("1.500.000"), Some(1500000.0));
        assert_eq!(parse_amount("1500000"), Some(1500000.0));
        assert_eq!(parse_amount("1500000.5"), Some(1500000.5));
        assert_eq!(parse_amount("$ 990"), Some(990.0));
        assert_eq!(parse_amount("a convenir"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 10, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2025-10-04"), Some(expected));
        assert_eq!(parse_timestamp("04-10-2025"), Some(expected));
        assert_eq!(parse_timestamp("04/10/2025"), Some(expected));
        assert!(parse_timestamp("2025-10-04T10:30:00.123").is_some());
        assert!(parse_timestamp("2025-10-04T10:30:00-03:00").is_some());
        assert!(parse_timestamp("mañana").is_none());
    }

    #[test]
    fn test_builder_pads_short_rows() {
        let mut builder = TableBuilder::with_columns(["a"]);
        builder.push_row([("a".to_string(), Some("1".to_string()))]);
        builder.push_row([("b".to_string(), Some("2".to_string()))]);
        let table = builder.finish();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows[0], vec![Some("1".to_string()), None]);
        assert_eq!(table.rows[1], vec![None, Some("2".to_string())]);
    }
}
