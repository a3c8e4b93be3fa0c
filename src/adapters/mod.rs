// Adapters layer: concrete implementations for external systems (files, storage, smtp).

pub mod reader;
pub mod smtp;
pub mod storage;
pub mod template;

pub use smtp::SmtpMailTransport;
pub use storage::LocalStorage;
