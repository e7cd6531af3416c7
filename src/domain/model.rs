use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_listing_date;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One procurement listing exactly as the API returned it. No schema is assumed.
pub type ListingRecord = serde_json::Value;

/// Status filter accepted by the `estado` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ListingStatus {
    #[default]
    Activas,
    Publicadas,
    Cerradas,
    Adjudicadas,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 4] = [
        ListingStatus::Activas,
        ListingStatus::Publicadas,
        ListingStatus::Cerradas,
        ListingStatus::Adjudicadas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Activas => "activas",
            ListingStatus::Publicadas => "publicadas",
            ListingStatus::Cerradas => "cerradas",
            ListingStatus::Adjudicadas => "adjudicadas",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| EtlError::InvalidConfigValueError {
                field: "estado".to_string(),
                value: s.to_string(),
                reason: "Expected one of: activas, publicadas, cerradas, adjudicadas".to_string(),
            })
    }
}

/// API access credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Ticket(String);

impl Ticket {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticket({})", self.masked())
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.chars().count() > 8 {
        format!("{}...", secret.chars().take(8).collect::<String>())
    } else {
        "***".to_string()
    }
}

pub const TICKET_PARAM: &str = "ticket";
pub const DATE_PARAM: &str = "fecha";
pub const STATUS_PARAM: &str = "estado";

/// Query string sent with every request. Always carries the ticket; `fecha` and
/// `estado` are meant to be exclusive but nothing here enforces it.
#[derive(Clone, PartialEq, Eq)]
pub struct QueryParameters {
    params: BTreeMap<String, String>,
}

impl QueryParameters {
    pub fn new(ticket: &Ticket) -> Self {
        let mut params = BTreeMap::new();
        params.insert(TICKET_PARAM.to_string(), ticket.expose().to_string());
        Self { params }
    }

    /// Adds `fecha`, rejecting anything that is not a real ddmmyyyy date.
    pub fn with_date(mut self, fecha: &str) -> Result<Self> {
        validate_listing_date(DATE_PARAM, fecha)?;
        self.params.insert(DATE_PARAM.to_string(), fecha.to_string());
        Ok(self)
    }

    pub fn with_status(mut self, status: ListingStatus) -> Self {
        self.params
            .insert(STATUS_PARAM.to_string(), status.as_str().to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Name used for output files and the SQLite table, e.g. `licitaciones_fecha_04102025`.
    pub fn output_prefix(&self) -> String {
        if let Some(fecha) = self.get(DATE_PARAM) {
            format!("licitaciones_fecha_{}", fecha)
        } else if let Some(estado) = self.get(STATUS_PARAM) {
            format!("licitaciones_estado_{}", estado)
        } else {
            "licitaciones".to_string()
        }
    }
}

impl fmt::Debug for QueryParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.params {
            if key == TICKET_PARAM {
                map.entry(key, &mask_secret(value));
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// A rectangular table of string cells, the unit handed to storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub prefix: String,
    pub raw: Table,
    pub clean: Table,
    pub requested: Table,
}

/// Where a run put its output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub raw_csv: Option<String>,
    pub clean_csv: Option<String>,
    pub requested_csv: Option<String>,
    pub sqlite: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub records: usize,
    pub outputs: LoadReport,
}
