pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{LocalStorage, SmtpMailTransport};
pub use config::toml_config::TomlConfig;
pub use core::{dispatcher::dispatch_all, etl::DispatchEngine, pipeline::BulkMailPipeline};
pub use core::resolver::{resolve, resolve_with};
pub use domain::model::{Address, DispatchReport, DispatchRequest, DispatchResult, RawRow, RecipientSet};
pub use utils::error::{EtlError, Result};
