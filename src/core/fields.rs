//! Business fields requested by the procurement analysts, pulled out of each
//! listing with the fallbacks the API's field renames require.

use crate::core::flatten::{cell_text, normalize_amount, normalize_date, TableBuilder};
use crate::domain::model::{ListingRecord, Table};
use serde_json::Value;

pub const REQUESTED_FIELDS: [&str; 14] = [
    "FechaCierre",
    "Descripcion",
    "Estado",
    "Comprador.NombreOrganismo",
    "Comprador.NombreUnidad",
    "Comprador.ComunaUnidad",
    "Comprador.RegionUnidad",
    "Comprador.NombreUsuario",
    "Comprador.CargoUsuario",
    "CodigoTipo",
    "TipoConvocatoria",
    "MontoEstimado",
    "Modalidad",
    "EmailResponsablePago",
];

/// Empty strings, zero, `false`, empty containers and `null` count as missing,
/// so a fallback key is consulted.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn first_present<'a>(source: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| source.get(*key))
        .find(|value| is_present(value))
}

/// The buyer block, which some responses send as a one-element list.
fn buyer(record: &Value) -> Option<&Value> {
    let comprador = record.get("Comprador")?;
    match comprador {
        Value::Array(items) => items.first().filter(|b| b.is_object()),
        Value::Object(_) => Some(comprador),
        _ => None,
    }
}

fn payment_email(record: &Value) -> Option<&Value> {
    first_present(record, &["EmailResponsablePago"]).or_else(|| {
        let responsible = record.get("ResponsablePago").filter(|v| v.is_object())?;
        first_present(responsible, &["Email", "EmailResponsablePago"])
    })
}

/// Requested fields of one listing, in `REQUESTED_FIELDS` order.
pub fn extract_fields(record: &ListingRecord) -> Vec<(&'static str, Option<String>)> {
    let text = |value: Option<&Value>| value.and_then(cell_text);
    let comprador = buyer(record);
    let from_buyer = |keys: &[&str]| comprador.and_then(|c| first_present(c, keys));

    vec![
        (
            "FechaCierre",
            record.get("FechaCierre").and_then(normalize_date),
        ),
        (
            "Descripcion",
            text(first_present(
                record,
                &["Descripcion", "DescripcionLarga", "Nombre"],
            )),
        ),
        ("Estado", text(record.get("Estado"))),
        (
            "Comprador.NombreOrganismo",
            text(from_buyer(&["NombreOrganismo"])),
        ),
        (
            "Comprador.NombreUnidad",
            text(from_buyer(&["NombreUnidad", "Unidad"])),
        ),
        ("Comprador.ComunaUnidad", text(from_buyer(&["ComunaUnidad"]))),
        ("Comprador.RegionUnidad", text(from_buyer(&["RegionUnidad"]))),
        (
            "Comprador.NombreUsuario",
            text(from_buyer(&["NombreUsuario", "NombreResponsable"])),
        ),
        (
            "Comprador.CargoUsuario",
            text(from_buyer(&["CargoUsuario", "CargoResponsable"])),
        ),
        ("CodigoTipo", text(record.get("CodigoTipo"))),
        ("TipoConvocatoria", text(record.get("TipoConvocatoria"))),
        (
            "MontoEstimado",
            first_present(record, &["MontoEstimado", "Monto"]).and_then(normalize_amount),
        ),
        ("Modalidad", text(record.get("Modalidad"))),
        ("EmailResponsablePago", text(payment_email(record))),
    ]
}

pub fn requested_table(records: &[ListingRecord]) -> Table {
    let mut builder = TableBuilder::with_columns(REQUESTED_FIELDS);
    for record in records {
        builder.push_row(
            extract_fields(record)
                .into_iter()
                .map(|(column, cell)| (column.to_string(), cell)),
        );
    }
    builder.finish()
}
