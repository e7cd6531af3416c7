use crate::domain::model::Table;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Spreadsheet tools on Windows need the BOM to pick UTF-8 for accented names.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

pub fn table_to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

impl Storage for LocalStorage {
    async fn write_table(&self, path: &str, table: &Table) -> Result<String> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = table_to_csv(table)?;
        let mut file = fs::File::create(&full_path)?;
        file.write_all(&data)?;

        tracing::debug!("Wrote {} rows to {}", table.len(), full_path.display());
        Ok(full_path.to_string_lossy().into_owned())
    }
}
