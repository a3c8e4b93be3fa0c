use crate::domain::model::Address;
use crate::domain::ports::SessionStage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet processing error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unsupported input file '{file}' (extension: {extension})")]
    UnsupportedInputError { file: String, extension: String },

    #[error("Column '{column}' not found (available columns: {})", .available.join(", "))]
    ColumnNotFoundError {
        column: String,
        available: Vec<String>,
    },

    #[error("No valid recipient addresses found in {rows} rows")]
    NoValidRecipientsError { rows: usize },

    #[error("Transport session to {endpoint} failed during {stage}: {reason}")]
    TransportError {
        endpoint: String,
        stage: SessionStage,
        reason: String,
        /// Every recipient of the batch; nothing was sent.
        failed: Vec<Address>,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Transport,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::SpreadsheetError(_)
            | EtlError::UnsupportedInputError { .. }
            | EtlError::ColumnNotFoundError { .. }
            | EtlError::NoValidRecipientsError { .. } => ErrorCategory::Input,
            EtlError::TransportError { .. } => ErrorCategory::Transport,
            EtlError::IoError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            // the server may simply be unreachable right now
            ErrorCategory::Transport => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ColumnNotFoundError { column, .. } => format!(
                "Add a column named '{}' (case and surrounding spaces are ignored) or pass the right column name",
                column
            ),
            EtlError::NoValidRecipientsError { .. } => {
                "Check that the address column contains entries like name@example.com".to_string()
            }
            EtlError::UnsupportedInputError { .. } => {
                "Upload a .csv, .tsv, .json, .xlsx or .xls file".to_string()
            }
            EtlError::TransportError {
                stage: SessionStage::Authenticate,
                ..
            } => "Check the sender address and password (app passwords are required by some providers)"
                .to_string(),
            EtlError::TransportError { .. } => {
                "Check the SMTP host, port and network connectivity, then try again".to_string()
            }
            EtlError::MissingConfigError { field } => format!("Provide a value for '{}'", field),
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Review the configuration values and try again".to_string()
            }
            EtlError::CsvError(_) | EtlError::SpreadsheetError(_) => {
                "Make sure the file is a well-formed table with a header row".to_string()
            }
            EtlError::IoError(_) => "Check that the file exists and is readable".to_string(),
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                "Re-run with --verbose for more details".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ColumnNotFoundError { column, .. } => {
                format!("The uploaded file must contain a column named '{}'.", column)
            }
            EtlError::NoValidRecipientsError { .. } => {
                "No valid email addresses found in the uploaded file.".to_string()
            }
            EtlError::TransportError { failed, .. } => format!(
                "Could not connect to the mail server; none of the {} emails were sent.",
                failed.len()
            ),
            other => other.to_string(),
        }
    }

    /// Recipients left undelivered by this error, if it carries any.
    pub fn failed_recipients(&self) -> &[Address] {
        match self {
            EtlError::TransportError { failed, .. } => failed,
            _ => &[],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
