use crate::adapters::http::{ReqwestTransport, TokioSleeper};
use crate::adapters::sqlite::SqliteSink;
use crate::core::fetcher::ResilientFetcher;
use crate::core::fields::requested_table;
use crate::core::flatten::{clean_table, raw_table};
use crate::core::inspect::inspect;
use crate::core::parser::ResponseParser;
use crate::domain::model::{ListingRecord, LoadReport, Table, TransformResult};
use crate::domain::ports::{ConfigProvider, HttpTransport, Pipeline, Sleeper, Storage};
use crate::utils::error::Result;
use chrono::NaiveDate;

pub struct LicitacionesPipeline<
    S: Storage,
    C: ConfigProvider,
    T: HttpTransport = ReqwestTransport,
    Z: Sleeper = TokioSleeper,
> {
    pub(crate) storage: S,
    pub(crate) config: C,
    fetcher: ResilientFetcher<T, Z>,
    run_date: NaiveDate,
}

impl<S: Storage, C: ConfigProvider> LicitacionesPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let fetcher = ResilientFetcher::new(config.fetcher_settings())?;
        Ok(Self::with_fetcher(storage, config, fetcher))
    }
}

impl<S: Storage, C: ConfigProvider, T: HttpTransport, Z: Sleeper> LicitacionesPipeline<S, C, T, Z> {
    pub fn with_fetcher(storage: S, config: C, fetcher: ResilientFetcher<T, Z>) -> Self {
        Self {
            storage,
            config,
            fetcher,
            run_date: chrono::Local::now().date_naive(),
        }
    }

    /// Date stamped into output file names (defaults to today).
    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }

    fn file_name(&self, dir: &str, prefix: &str, kind: &str) -> String {
        format!(
            "{}/{}_{}_{}.csv",
            dir,
            prefix,
            kind,
            self.run_date.format("%Y%m%d")
        )
    }

    async fn append_sqlite(&self, table_name: String, table: Table) -> Option<String> {
        let path = self.config.sqlite_path()?;
        let shown = path.display().to_string();
        let sink = SqliteSink::new(path);

        // SQLite 失敗不影響整體流程
        match tokio::task::spawn_blocking(move || sink.append(&table_name, &table)).await {
            Ok(Ok(rows)) => {
                tracing::info!("🗄️ Appended {} rows to {}", rows, shown);
                Some(shown)
            }
            Ok(Err(e)) => {
                tracing::warn!("⚠️ Could not write SQLite database {}: {}", shown, e);
                None
            }
            Err(e) => {
                tracing::warn!("⚠️ SQLite export task failed: {}", e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, T: HttpTransport, Z: Sleeper> Pipeline
    for LicitacionesPipeline<S, C, T, Z>
{
    async fn extract(&self) -> Result<Vec<ListingRecord>> {
        let query = self.config.query();
        tracing::info!("🌐 Querying listings with {:?}", query);

        let payload = self.fetcher.fetch(query, self.config.retry_policy()).await?;
        let records = ResponseParser::parse(payload);

        let report = inspect(&records, self.config.required_fields());
        tracing::info!("🔍 {}", report.summary());
        if report.total_records > 0 && !report.missing_fields.is_empty() {
            tracing::warn!(
                "⚠️ Required fields missing from the first listing: {}",
                report.missing_fields.join(", ")
            );
        }

        Ok(records)
    }

    async fn transform(&self, data: Vec<ListingRecord>) -> Result<TransformResult> {
        Ok(TransformResult {
            prefix: self.config.query().output_prefix(),
            raw: raw_table(&data),
            clean: clean_table(&data),
            requested: requested_table(&data),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<LoadReport> {
        let raw_path = self.file_name("raw", &result.prefix, "raw");
        let clean_path = self.file_name("clean", &result.prefix, "clean");
        let requested_path = self.file_name("clean", &result.prefix, "requested");

        let raw_csv = self.storage.write_table(&raw_path, &result.raw).await?;
        tracing::info!("📁 RAW: {} rows -> {}", result.raw.len(), raw_csv);

        let clean_csv = self.storage.write_table(&clean_path, &result.clean).await?;
        tracing::info!("📁 CLEAN: {} rows -> {}", result.clean.len(), clean_csv);

        let requested_csv = self
            .storage
            .write_table(&requested_path, &result.requested)
            .await?;
        tracing::info!(
            "📁 REQUESTED: {} rows -> {}",
            result.requested.len(),
            requested_csv
        );

        let sqlite = self.append_sqlite(result.prefix, result.clean).await;

        Ok(LoadReport {
            raw_csv: Some(raw_csv),
            clean_csv: Some(clean_csv),
            requested_csv: Some(requested_csv),
            sqlite,
        })
    }
}
