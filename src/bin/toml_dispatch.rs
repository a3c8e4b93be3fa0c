use bulk_mailer::core::ConfigProvider;
use bulk_mailer::utils::{logger, validation::Validate};
use bulk_mailer::{BulkMailPipeline, DispatchEngine, LocalStorage, SmtpMailTransport, TomlConfig};
use clap::Parser;

#[derive(Parser)]
#[command(name = "toml-dispatch")]
#[command(about = "Bulk email dispatch driven by a TOML job file")]
struct Args {
    /// Path to TOML job file
    #[arg(short, long, default_value = "mail-job.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Resolve recipients and show the job summary without sending
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.log_format() == Some("json") {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based bulk dispatch");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置 (dry run 不需要寄件憑證)
    let validation = if args.dry_run {
        config.validate_preview()
    } else {
        config.validate()
    };
    if let Err(e) = validation {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config);

    let transport = SmtpMailTransport::new().with_timeout(config.timeout_seconds());
    let storage = LocalStorage::new(".".to_string());
    let pipeline = BulkMailPipeline::new(storage, config, transport);
    let engine = DispatchEngine::new(pipeline);

    let result = if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No emails will be sent");
        engine.preview().await.map(|recipients| {
            println!("✅ Found {} valid email addresses.", recipients.len());
            for address in &recipients {
                println!("  {}", address);
            }
            true
        })
    } else {
        engine.run().await.map(|report| {
            for line in report.summary_lines() {
                println!("{}", line);
            }
            report.is_full_success()
        })
    };

    match result {
        Ok(true) => {}
        // 部分收件人寄送失敗
        Ok(false) => std::process::exit(2),
        Err(e) => {
            tracing::error!(
                "❌ Job failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            for address in e.failed_recipients() {
                eprintln!("  {}", address);
            }
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    tracing::info!("📋 Job: {}", config.job_name());
    if let Some(description) = &config.job.description {
        tracing::info!("📝 {}", description);
    }
    tracing::info!("📄 Input: {} (column: {})", config.input_path(), config.column_hint());
    tracing::info!("📮 Server: {}:{}", config.smtp_host(), config.smtp_port());
    tracing::info!("✉️ Subject: {}", config.subject());
    tracing::info!("📁 Output: {}", config.output_path());
}
