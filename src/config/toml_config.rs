use crate::adapters::smtp::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, DEFAULT_TIMEOUT_SECONDS};
use crate::config::{validate_dispatch, validate_source};
use crate::core::resolver::DEFAULT_COLUMN_HINT;
use crate::core::ConfigProvider;
use crate::domain::model::Secret;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is a valid regex"));

const DEFAULT_OUTPUT_PATH: &str = "./output";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub job: JobConfig,
    pub input: InputConfig,
    pub sender: SenderConfig,
    pub transport: Option<TransportConfig>,
    pub message: MessageConfig,
    pub output: Option<OutputConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    pub column: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    pub address: String,
    pub secret: Secret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    pub subject: String,
    pub body: Option<String>,
    pub body_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置，body_file 以設定檔所在目錄為基準
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        let mut config = Self::from_toml_str(&content)?;
        config.load_body_file(path.as_ref().parent())?;
        Ok(config)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SMTP_PASSWORD})；未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                match std::env::var(var_name) {
                    // 值會落在 TOML 字串內，需跳脫
                    Ok(value) => value.replace('\\', "\\\\").replace('"', "\\\""),
                    Err(_) => format!("${{{}}}", var_name),
                }
            })
            .into_owned()
    }

    /// 讀取 message.body_file 到 message.body
    pub fn load_body_file(&mut self, base_dir: Option<&Path>) -> Result<()> {
        if let Some(file) = &self.message.body_file {
            let path = match base_dir {
                Some(dir) => dir.join(file),
                None => Path::new(file).to_path_buf(),
            };
            self.message.body = Some(std::fs::read_to_string(path)?);
        }
        Ok(())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(name) = unresolved_placeholder(self.sender.secret.expose()) {
            return Err(EtlError::MissingConfigError {
                field: format!("sender.secret (environment variable {} is not set)", name),
            });
        }

        if self.message.body.is_none() && self.message.body_file.is_some() {
            return Err(EtlError::ConfigError {
                message: "message.body_file was not loaded".to_string(),
            });
        }

        self.validate_log_format()?;
        validate_dispatch(self)
    }

    /// 預覽 (dry run) 只需要輸入來源，不檢查寄件憑證與伺服器
    pub fn validate_preview(&self) -> Result<()> {
        self.validate_log_format()?;
        validate_source(self)
    }

    fn validate_log_format(&self) -> Result<()> {
        if let Some(format) = self.log_format() {
            if !["compact", "json"].contains(&format) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn job_name(&self) -> &str {
        &self.job.name
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.transport
            .as_ref()
            .and_then(|t| t.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn log_format(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.format.as_deref())
    }
}

fn unresolved_placeholder(value: &str) -> Option<String> {
    ENV_PLACEHOLDER
        .captures(value)
        .map(|caps| caps[1].to_string())
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn column_hint(&self) -> &str {
        self.input.column.as_deref().unwrap_or(DEFAULT_COLUMN_HINT)
    }

    fn sender(&self) -> &str {
        &self.sender.address
    }

    fn sender_secret(&self) -> &Secret {
        &self.sender.secret
    }

    fn smtp_host(&self) -> &str {
        self.transport
            .as_ref()
            .and_then(|t| t.host.as_deref())
            .unwrap_or(DEFAULT_SMTP_HOST)
    }

    fn smtp_port(&self) -> u16 {
        self.transport
            .as_ref()
            .and_then(|t| t.port)
            .unwrap_or(DEFAULT_SMTP_PORT)
    }

    fn subject(&self) -> &str {
        &self.message.subject
    }

    fn body(&self) -> &str {
        self.message.body.as_deref().unwrap_or_default()
    }

    fn output_path(&self) -> &str {
        self.output
            .as_ref()
            .map(|o| o.path.as_str())
            .unwrap_or(DEFAULT_OUTPUT_PATH)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const BASIC: &str = r#"
[job]
name = "newsletter"

[input]
path = "recipients.csv"

[sender]
address = "me@example.com"
secret = "app-password"

[message]
subject = "Monthly update"
body = "Hello!"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.job_name(), "newsletter");
        assert_eq!(config.column_hint(), "email");
        assert_eq!(config.smtp_host(), "smtp.gmail.com");
        assert_eq!(config.smtp_port(), 587);
        assert_eq!(config.output_path(), "./output");
        assert_eq!(config.timeout_seconds(), 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transport_overrides() {
        let content = format!(
            "{}\n[transport]\nhost = \"mail.example.org\"\nport = 2525\ntimeout_seconds = 5\n",
            BASIC
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();

        assert_eq!(config.smtp_host(), "mail.example.org");
        assert_eq!(config.smtp_port(), 2525);
        assert_eq!(config.timeout_seconds(), 5);
    }

    #[test]
    fn test_env_var_substitution_escapes_value() {
        std::env::set_var("BULK_MAILER_TEST_SECRET", r#"p"a\ss"#);

        let content = BASIC.replace("app-password", "${BULK_MAILER_TEST_SECRET}");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.sender_secret().expose(), r#"p"a\ss"#);

        std::env::remove_var("BULK_MAILER_TEST_SECRET");
    }

    #[test]
    fn test_unset_secret_variable_fails_validation() {
        let content = BASIC.replace("app-password", "${BULK_MAILER_TEST_UNSET_VAR}");
        let config = TomlConfig::from_toml_str(&content).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BULK_MAILER_TEST_UNSET_VAR"));
    }

    #[test]
    fn test_preview_validation_ignores_unset_secret() {
        let content = BASIC
            .replace("app-password", "${BULK_MAILER_TEST_UNSET_VAR}")
            .replace("me@example.com", "");
        let config = TomlConfig::from_toml_str(&content).unwrap();

        assert!(config.validate().is_err());
        assert!(config.validate_preview().is_ok());
    }

    #[test]
    fn test_preview_validation_still_checks_source() {
        let content = BASIC
            .replace("app-password", "${BULK_MAILER_TEST_UNSET_VAR}")
            .replace("recipients.csv", "recipients.pdf");
        let config = TomlConfig::from_toml_str(&content).unwrap();

        let err = config.validate_preview().unwrap_err();
        assert!(err.to_string().contains("pdf"));
    }

    #[test]
    fn test_debug_output_hides_secret() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();
        assert!(!format!("{:?}", config).contains("app-password"));
    }

    #[test]
    fn test_invalid_sender_fails_validation() {
        let content = BASIC.replace("me@example.com", "me-at-example");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let content = format!("{}\n[logging]\nformat = \"xml\"\n", BASIC);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file_loads_relative_body_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("body.txt"), "Body from file").unwrap();

        let content = BASIC.replace("body = \"Hello!\"", "body_file = \"body.txt\"");
        let config_path = dir.path().join("job.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(&config_path).unwrap();
        assert_eq!(config.body(), "Body from file");
        assert!(config.validate().is_ok());
    }
}
