use crate::domain::model::ListingRecord;
use serde_json::Value;

/// Result of checking the first listing against the required field list.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureReport {
    pub total_records: usize,
    pub fields_found: Vec<String>,
    pub missing_fields: Vec<String>,
}

impl StructureReport {
    pub fn is_valid(&self) -> bool {
        self.total_records > 0 && self.missing_fields.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.total_records == 0 {
            return "API returned no listings".to_string();
        }
        format!(
            "{} listings, {} fields in first record, structure {}",
            self.total_records,
            self.fields_found.len(),
            if self.missing_fields.is_empty() {
                "valid"
            } else {
                "has warnings"
            }
        )
    }
}

/// Every dotted path present in a listing. Lists are described by their first
/// element and do not add a path segment.
pub fn analyze_fields(record: &ListingRecord) -> Vec<String> {
    let mut fields = Vec::new();
    collect_fields(record, "", &mut fields);
    fields
}

fn collect_fields(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                out.push(path.clone());
                if child.is_object() || child.is_array() {
                    collect_fields(child, &path, out);
                }
            }
        }
        Value::Array(items) => {
            if let Some(first) = items.first() {
                collect_fields(first, prefix, out);
            }
        }
        _ => {}
    }
}

/// Required fields with no matching path. A path matches when it equals the
/// required name or ends with `.<name>`.
pub fn missing_required(found: &[String], required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|wanted| {
            let suffix = format!(".{}", wanted);
            !found
                .iter()
                .any(|path| path == *wanted || path.ends_with(&suffix))
        })
        .cloned()
        .collect()
}

pub fn inspect(records: &[ListingRecord], required: &[String]) -> StructureReport {
    let fields_found = records.first().map(analyze_fields).unwrap_or_default();
    let missing_fields = if records.is_empty() {
        Vec::new()
    } else {
        missing_required(&fields_found, required)
    };

    StructureReport {
        total_records: records.len(),
        fields_found,
        missing_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analyze_fields_walks_objects_and_first_list_item() {
        let record = json!({
            "Codigo": "1",
            "Comprador": {"NombreOrganismo": "Muni"},
            "Items": {"Listado": [{"Cantidad": 1}, {"Otro": 2}]}
        });
        let fields = analyze_fields(&record);
        assert_eq!(
            fields,
            vec![
                "Codigo",
                "Comprador",
                "Comprador.NombreOrganismo",
                "Items",
                "Items.Listado",
                "Items.Listado.Cantidad",
            ]
        );
    }

    #[test]
    fn test_missing_required_uses_exact_or_suffix_match() {
        let found = vec![
            "CodigoEstado".to_string(),
            "Fechas.FechaCierre".to_string(),
            "Comprador.NombreUnidad".to_string(),
        ];
        let required = vec![
            "Estado".to_string(),
            "FechaCierre".to_string(),
            "Comprador.NombreUnidad".to_string(),
        ];
        assert_eq!(missing_required(&found, &required), vec!["Estado"]);
    }

    #[test]
    fn test_inspect_reports() {
        let required = vec!["Nombre".to_string()];
        let ok = inspect(&[json!({"Nombre": "x"})], &required);
        assert!(ok.is_valid());
        assert!(ok.summary().contains("valid"));

        let warn = inspect(&[json!({"Codigo": "x"})], &required);
        assert!(!warn.is_valid());
        assert_eq!(warn.missing_fields, vec!["Nombre"]);

        let empty = inspect(&[], &required);
        assert!(!empty.is_valid());
        assert_eq!(empty.summary(), "API returned no listings");
    }
}
