use crate::domain::model::{DispatchReport, Endpoint, OutgoingMessage, RawRow, RecipientSet, Secret};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn column_hint(&self) -> &str;
    fn sender(&self) -> &str;
    fn sender_secret(&self) -> &Secret;
    fn smtp_host(&self) -> &str;
    fn smtp_port(&self) -> u16;
    fn subject(&self) -> &str;
    fn body(&self) -> &str;
    fn output_path(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RawRow>>;
    async fn transform(&self, rows: Vec<RawRow>) -> Result<RecipientSet>;
    async fn load(&self, recipients: RecipientSet) -> Result<DispatchReport>;
}

/// Where in the session lifecycle a transport call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Connect,
    Encrypt,
    Authenticate,
    Submit,
    Close,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStage::Connect => "connect",
            SessionStage::Encrypt => "starttls",
            SessionStage::Authenticate => "authentication",
            SessionStage::Submit => "submission",
            SessionStage::Close => "close",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} failed: {message}")]
pub struct SessionError {
    pub stage: SessionStage,
    pub message: String,
}

impl SessionError {
    pub fn new(stage: SessionStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Opens mail-submission sessions. One session per dispatch call.
pub trait MailTransport: Send + Sync {
    type Session: TransportSession;

    fn connect(&self, endpoint: &Endpoint) -> std::result::Result<Self::Session, SessionError>;
}

/// An open connection to a submission endpoint.
pub trait TransportSession {
    fn start_tls(&mut self) -> std::result::Result<(), SessionError>;

    fn authenticate(&mut self, username: &str, secret: &Secret)
        -> std::result::Result<(), SessionError>;

    fn submit(&mut self, message: &OutgoingMessage) -> std::result::Result<(), SessionError>;

    /// Must be safe to call on a half-established session.
    fn close(&mut self);
}
