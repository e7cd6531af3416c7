use chrono::NaiveDate;
use httpmock::prelude::*;
use licitaciones_etl::config::toml_config::TomlConfig;
use licitaciones_etl::{AppConfig, ConfigOverrides, EtlEngine, LicitacionesPipeline, LocalStorage};
use std::path::Path;
use tempfile::TempDir;

fn config_for(server: &MockServer, output_dir: &Path, overrides: ConfigOverrides) -> AppConfig {
    let toml = format!(
        r#"
[api]
base_url = "{}"
timeout_seconds = 5

[retry]
max_retries = 1
backoff_base = 1.0

[output]
sqlite_enabled = true
"#,
        server.url("/servicios/v1/publico/licitaciones.json")
    );
    let file = TomlConfig::from_toml_str(&toml).unwrap();
    let overrides = ConfigOverrides {
        ticket: Some("TEST-TICKET-1234".to_string()),
        output_dir: Some(output_dir.to_string_lossy().into_owned()),
        ..overrides
    };
    AppConfig::resolve_with_env(file, overrides, |_| None).unwrap()
}

fn read_csv(path: &str) -> String {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"), "{} lacks UTF-8 BOM", path);
    String::from_utf8(bytes[3..].to_vec()).unwrap()
}

#[tokio::test]
async fn test_full_run_writes_csvs_and_sqlite() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/servicios/v1/publico/licitaciones.json")
            .query_param("ticket", "TEST-TICKET-1234")
            .query_param("fecha", "04102025");
        then.status(200).json_body(serde_json::json!({
            "Cantidad": 2,
            "Listado": [
                {
                    "CodigoExterno": "1509-5-L125",
                    "Nombre": "Adquisición de insumos médicos",
                    "Estado": "Publicada",
                    "MontoEstimado": "1.500.000",
                    "Comprador": {
                        "NombreOrganismo": "Municipalidad de Ñuñoa",
                        "RegionUnidad": "Región Metropolitana"
                    },
                    "Fechas": {"FechaCierre": "2025-10-20T15:00:00"}
                },
                {
                    "CodigoExterno": "2240-12-LE25",
                    "Nombre": "Servicio de aseo",
                    "Estado": "Publicada"
                }
            ]
        }));
    });

    let output = TempDir::new().unwrap();
    let overrides = ConfigOverrides {
        fecha: Some("04102025".to_string()),
        ..ConfigOverrides::default()
    };
    let config = config_for(&server, output.path(), overrides);
    let sqlite_file = config.sqlite_file();

    let storage = LocalStorage::new(config.output.base_dir.clone());
    let pipeline = LicitacionesPipeline::new(storage, config)
        .unwrap()
        .with_run_date(NaiveDate::from_ymd_opt(2025, 10, 4).unwrap());
    let summary = EtlEngine::new(pipeline).run().await.unwrap();

    api_mock.assert_hits(1);
    assert_eq!(summary.records, 2);

    let raw_csv = summary.outputs.raw_csv.unwrap();
    assert!(raw_csv.ends_with("raw/licitaciones_fecha_04102025_raw_20251004.csv"));
    let raw = read_csv(&raw_csv);
    assert_eq!(raw.lines().count(), 3);
    assert!(raw.contains("1509-5-L125"));

    let clean = read_csv(&summary.outputs.clean_csv.unwrap());
    assert!(clean.lines().next().unwrap().contains("Comprador.NombreOrganismo"));
    assert!(clean.contains("Municipalidad de Ñuñoa"));

    let requested_csv = summary.outputs.requested_csv.unwrap();
    assert!(requested_csv.ends_with("clean/licitaciones_fecha_04102025_requested_20251004.csv"));
    assert!(read_csv(&requested_csv).contains("Servicio de aseo"));

    assert_eq!(
        summary.outputs.sqlite.as_deref(),
        Some(sqlite_file.to_string_lossy().as_ref())
    );
    let conn = rusqlite::Connection::open(&sqlite_file).unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM licitaciones_fecha_04102025", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn test_unwritable_sqlite_only_warns() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/servicios/v1/publico/licitaciones.json");
        then.status(200).json_body(serde_json::json!({
            "Resultados": [{"CodigoExterno": "3001-7-LP25", "Nombre": "Obras viales"}]
        }));
    });

    let output = TempDir::new().unwrap();
    let config = config_for(&server, output.path(), ConfigOverrides::default());
    // A directory where the database file should be makes every open fail
    std::fs::create_dir_all(config.sqlite_file()).unwrap();

    let storage = LocalStorage::new(config.output.base_dir.clone());
    let pipeline = LicitacionesPipeline::new(storage, config).unwrap();
    let summary = EtlEngine::new(pipeline).run().await.unwrap();

    assert_eq!(summary.records, 1);
    assert_eq!(summary.outputs.sqlite, None);
    for path in [
        summary.outputs.raw_csv.unwrap(),
        summary.outputs.clean_csv.unwrap(),
        summary.outputs.requested_csv.unwrap(),
    ] {
        assert!(read_csv(&path).contains("Obras viales"));
    }
}

#[tokio::test]
async fn test_empty_listing_writes_nothing() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/servicios/v1/publico/licitaciones.json")
            .query_param("estado", "activas");
        then.status(200)
            .json_body(serde_json::json!({"Cantidad": 0, "Listado": []}));
    });

    let output = TempDir::new().unwrap();
    let config = config_for(&server, output.path(), ConfigOverrides::default());
    let storage = LocalStorage::new(config.output.base_dir.clone());
    let pipeline = LicitacionesPipeline::new(storage, config).unwrap();
    let summary = EtlEngine::new(pipeline).run().await.unwrap();

    api_mock.assert_hits(1);
    assert_eq!(summary.records, 0);
    assert!(summary.outputs.raw_csv.is_none());
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unauthorized_ticket_stops_without_retry() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/servicios/v1/publico/licitaciones.json");
        then.status(401).body("ticket invalido");
    });

    let output = TempDir::new().unwrap();
    let overrides = ConfigOverrides {
        max_retries: Some(5),
        ..ConfigOverrides::default()
    };
    let config = config_for(&server, output.path(), overrides);
    let storage = LocalStorage::new(config.output.base_dir.clone());
    let pipeline = LicitacionesPipeline::new(storage, config).unwrap();
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    api_mock.assert_hits(1);
    assert!(err.to_string().contains("401"));
    assert_ne!(err.exit_code(), 0);
}
