use clap::Parser;
use licitaciones_etl::config::toml_config::TomlConfig;
use licitaciones_etl::utils::{logger, validation::Validate};
use licitaciones_etl::{
    AppConfig, CliConfig, ConfigOverrides, EtlEngine, EtlError, LicitacionesPipeline, LocalStorage,
};

fn fail(e: &EtlError) -> ! {
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 是選用的
    let dotenv = dotenvy::dotenv().ok();

    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting licitaciones-etl");
    if let Some(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let file_config = match cli.config.as_deref() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            TomlConfig::from_file(path).unwrap_or_else(|e| fail(&e))
        }
        None => TomlConfig::default(),
    };

    let config = AppConfig::resolve(file_config, ConfigOverrides::from(&cli))
        .unwrap_or_else(|e| fail(&e));

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    if cli.show_config {
        println!("{}", config.summary());
    }

    let storage = LocalStorage::new(config.output.base_dir.clone());
    let pipeline = LicitacionesPipeline::new(storage, config).unwrap_or_else(|e| fail(&e));
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(summary) if summary.records == 0 => {
            println!("ℹ️ No listings found for the given parameters");
        }
        Ok(summary) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ Processed {} listings", summary.records);
            let outputs = [
                ("RAW", summary.outputs.raw_csv),
                ("CLEAN", summary.outputs.clean_csv),
                ("REQUESTED", summary.outputs.requested_csv),
                ("SQLITE", summary.outputs.sqlite),
            ];
            for (label, path) in outputs {
                if let Some(path) = path {
                    println!("📁 {}: {}", label, path);
                }
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
