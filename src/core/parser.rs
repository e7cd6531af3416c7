//! Envelope normalization for the listings endpoint.
//!
//! The API has wrapped its results in several different envelopes over time.
//! Shapes are tried in a fixed order, most common and most specific first; the
//! first one that matches wins and anything unrecognized yields no records.

use crate::domain::model::ListingRecord;
use serde_json::Value;

const LISTADO: &str = "Listado";
const LICITACION: &str = "Licitacion";
const RESULTADOS: &str = "Resultados";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// `[...]`
    BareList,
    /// `{"Listado": {"Licitacion": ...}}`
    NestedListado,
    /// `{"Listado": [...]}`
    ListadoList,
    /// `{"Licitacion": [...]}`
    LicitacionList,
    /// `{"Resultados": [...]}`
    ResultadosList,
}

impl EnvelopeShape {
    pub const PRECEDENCE: [EnvelopeShape; 5] = [
        EnvelopeShape::BareList,
        EnvelopeShape::NestedListado,
        EnvelopeShape::ListadoList,
        EnvelopeShape::LicitacionList,
        EnvelopeShape::ResultadosList,
    ];

    pub fn matches(&self, payload: &Value) -> bool {
        match self {
            EnvelopeShape::BareList => payload.is_array(),
            EnvelopeShape::NestedListado => payload
                .get(LISTADO)
                .and_then(Value::as_object)
                .is_some_and(|listado| listado.contains_key(LICITACION)),
            EnvelopeShape::ListadoList => payload.get(LISTADO).is_some_and(Value::is_array),
            EnvelopeShape::LicitacionList => payload.get(LICITACION).is_some_and(Value::is_array),
            EnvelopeShape::ResultadosList => payload.get(RESULTADOS).is_some_and(Value::is_array),
        }
    }

    /// Moves the records out of a payload this shape `matches`.
    fn take(self, payload: Value) -> Vec<ListingRecord> {
        let inner = match (self, payload) {
            (EnvelopeShape::BareList, list) => list,
            (EnvelopeShape::NestedListado, mut payload) => payload[LISTADO][LICITACION].take(),
            (EnvelopeShape::ListadoList, mut payload) => payload[LISTADO].take(),
            (EnvelopeShape::LicitacionList, mut payload) => payload[LICITACION].take(),
            (EnvelopeShape::ResultadosList, mut payload) => payload[RESULTADOS].take(),
        };
        into_records(inner)
    }
}

// Only the nested `Licitacion` value is unchecked by `matches`; a lone object
// there is a single listing.
fn into_records(value: Value) -> Vec<ListingRecord> {
    match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => Vec::new(),
    }
}

/// First shape in precedence order that fits `payload`.
pub fn detect_shape(payload: &Value) -> Option<EnvelopeShape> {
    EnvelopeShape::PRECEDENCE
        .into_iter()
        .find(|shape| shape.matches(payload))
}

pub struct ResponseParser;

impl ResponseParser {
    /// Extracts listing records from any known envelope. Never fails: an
    /// unrecognized payload is logged and produces an empty list.
    pub fn parse(payload: Value) -> Vec<ListingRecord> {
        match detect_shape(&payload) {
            Some(shape) => {
                let records = shape.take(payload);
                tracing::debug!("Envelope {:?} matched, {} records", shape, records.len());
                records
            }
            None => {
                tracing::debug!(
                    "Unrecognized response envelope ({}), treating as empty",
                    describe(&payload)
                );
                Vec::new()
            }
        }
    }
}

fn describe(payload: &Value) -> String {
    match payload {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(5).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
    }
}
