pub mod toml_config;

use crate::adapters::reader::SUPPORTED_EXTENSIONS;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_address, validate_file_extension, validate_non_empty_secret,
    validate_non_empty_string, validate_path, validate_range,
};

#[cfg(feature = "cli")]
pub use cli::CliConfig;

/// 驗證收件人來源 (dry run 只需要這部分)
pub fn validate_source<C: ConfigProvider>(config: &C) -> Result<()> {
    validate_path("input", config.input_path())?;
    validate_file_extension("input", config.input_path(), &SUPPORTED_EXTENSIONS)?;
    validate_non_empty_string("column", config.column_hint())?;
    Ok(())
}

/// 驗證寄送所需的全部設定
pub fn validate_dispatch<C: ConfigProvider>(config: &C) -> Result<()> {
    validate_source(config)?;
    validate_address("sender", config.sender())?;
    validate_non_empty_secret("password", config.sender_secret())?;
    validate_non_empty_string("smtp_host", config.smtp_host())?;
    validate_range("smtp_port", config.smtp_port(), 1, u16::MAX)?;
    validate_non_empty_string("subject", config.subject())?;
    validate_non_empty_string("body", config.body())?;
    validate_path("output_path", config.output_path())?;
    Ok(())
}

#[cfg(feature = "cli")]
mod cli {
    use super::{validate_dispatch, validate_source};
    use crate::adapters::smtp::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, DEFAULT_TIMEOUT_SECONDS};
    use crate::core::resolver::DEFAULT_COLUMN_HINT;
    use crate::core::ConfigProvider;
    use crate::domain::model::Secret;
    use crate::utils::error::Result;
    use crate::utils::validation::Validate;
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "bulk-mailer")]
    #[command(about = "Send one plain-text email to every address in a CSV or spreadsheet")]
    pub struct CliConfig {
        #[arg(short, long, help = "Recipient file (.csv, .tsv, .json, .xlsx, .xls)")]
        pub input: String,

        #[arg(long, default_value = DEFAULT_COLUMN_HINT)]
        pub column: String,

        #[arg(long, help = "Sender address, also used as the SMTP username")]
        pub sender: Option<String>,

        #[arg(
            long,
            env = "SMTP_PASSWORD",
            hide_env_values = true,
            default_value = "",
            hide_default_value = true
        )]
        pub password: Secret,

        #[arg(long, default_value = DEFAULT_SMTP_HOST)]
        pub smtp_host: String,

        #[arg(long, default_value_t = DEFAULT_SMTP_PORT)]
        pub smtp_port: u16,

        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS, help = "SMTP connect/IO timeout in seconds")]
        pub timeout: u64,

        #[arg(long)]
        pub subject: Option<String>,

        #[arg(long)]
        pub body: Option<String>,

        #[arg(long, conflicts_with = "body", help = "Read the message body from a file")]
        pub body_file: Option<String>,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, help = "Resolve and preview recipients without sending")]
        pub dry_run: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,
    }

    impl CliConfig {
        /// 讀取 --body-file 內容到 body
        pub fn load_body_file(&mut self) -> Result<()> {
            if let Some(path) = &self.body_file {
                self.body = Some(std::fs::read_to_string(path)?);
            }
            Ok(())
        }
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn column_hint(&self) -> &str {
            &self.column
        }

        fn sender(&self) -> &str {
            self.sender.as_deref().unwrap_or_default()
        }

        fn sender_secret(&self) -> &Secret {
            &self.password
        }

        fn smtp_host(&self) -> &str {
            &self.smtp_host
        }

        fn smtp_port(&self) -> u16 {
            self.smtp_port
        }

        fn subject(&self) -> &str {
            self.subject.as_deref().unwrap_or_default()
        }

        fn body(&self) -> &str {
            self.body.as_deref().unwrap_or_default()
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            if self.dry_run {
                validate_source(self)
            } else {
                validate_dispatch(self)
            }
        }
    }

}
