use bulk_mailer::utils::{logger, validation::Validate};
use bulk_mailer::{
    BulkMailPipeline, CliConfig, DispatchEngine, EtlError, LocalStorage, SmtpMailTransport,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting bulk-mailer CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 載入內文並驗證配置
    if let Err(e) = config.load_body_file().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let dry_run = config.dry_run;
    let transport = SmtpMailTransport::new().with_timeout(config.timeout);
    let storage = LocalStorage::new(".".to_string());
    let pipeline = BulkMailPipeline::new(storage, config, transport);
    let engine = DispatchEngine::new(pipeline);

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - No emails will be sent");
        match engine.preview().await {
            Ok(recipients) => {
                println!("✅ Found {} valid email addresses.", recipients.len());
                for address in &recipients {
                    println!("  {}", address);
                }
                return Ok(());
            }
            Err(e) => exit_with(&e),
        }
    }

    match engine.run().await {
        Ok(report) => {
            for line in report.summary_lines() {
                println!("{}", line);
            }
            if !report.is_full_success() {
                std::process::exit(2);
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

fn exit_with(e: &EtlError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Bulk dispatch failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    for address in e.failed_recipients() {
        eprintln!("  {}", address);
    }

    std::process::exit(e.exit_code());
}
