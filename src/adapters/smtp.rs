use crate::domain::model::{Endpoint, OutgoingMessage, Secret};
use crate::domain::ports::{MailTransport, SessionError, SessionStage, TransportSession};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::Rset;
use lettre::transport::smtp::extension::ClientId;
use lettre::Message;
use std::time::Duration;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

const AUTH_MECHANISMS: [Mechanism; 2] = [Mechanism::Plain, Mechanism::Login];

/// Submission over SMTP: plain connect, STARTTLS, AUTH, then one transaction per message.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    timeout: Option<Duration>,
    hello_name: ClientId,
}

impl SmtpMailTransport {
    pub fn new() -> Self {
        Self {
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
            hello_name: ClientId::default(),
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(Duration::from_secs(seconds));
        self
    }
}

impl Default for SmtpMailTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MailTransport for SmtpMailTransport {
    type Session = SmtpSession;

    fn connect(&self, endpoint: &Endpoint) -> Result<SmtpSession, SessionError> {
        let connection = SmtpConnection::connect(
            (endpoint.host.as_str(), endpoint.port),
            self.timeout,
            &self.hello_name,
            None,
            None,
        )
        .map_err(|e| SessionError::new(SessionStage::Connect, e.to_string()))?;

        tracing::debug!("Connected to {}", endpoint);
        Ok(SmtpSession {
            connection: Some(connection),
            host: endpoint.host.clone(),
            hello_name: self.hello_name.clone(),
        })
    }
}

pub struct SmtpSession {
    connection: Option<SmtpConnection>,
    host: String,
    hello_name: ClientId,
}

impl SmtpSession {
    fn connection(&mut self, stage: SessionStage) -> Result<&mut SmtpConnection, SessionError> {
        self.connection
            .as_mut()
            .ok_or_else(|| SessionError::new(stage, "session already closed"))
    }
}

impl TransportSession for SmtpSession {
    fn start_tls(&mut self) -> Result<(), SessionError> {
        let tls = TlsParameters::new(self.host.clone())
            .map_err(|e| SessionError::new(SessionStage::Encrypt, e.to_string()))?;
        let hello_name = self.hello_name.clone();
        let connection = self.connection(SessionStage::Encrypt)?;

        if !connection.can_starttls() {
            return Err(SessionError::new(
                SessionStage::Encrypt,
                "server does not advertise STARTTLS",
            ));
        }

        connection
            .starttls(&tls, &hello_name)
            .map_err(|e| SessionError::new(SessionStage::Encrypt, e.to_string()))
    }

    fn authenticate(&mut self, username: &str, secret: &Secret) -> Result<(), SessionError> {
        let credentials = Credentials::new(username.to_string(), secret.expose().to_string());
        self.connection(SessionStage::Authenticate)?
            .auth(&AUTH_MECHANISMS, &credentials)
            .map(|_| ())
            .map_err(|e| SessionError::new(SessionStage::Authenticate, e.to_string()))
    }

    fn submit(&mut self, message: &OutgoingMessage) -> Result<(), SessionError> {
        let email = build_message(message)?;
        let connection = self.connection(SessionStage::Submit)?;

        match connection.send(email.envelope(), &email.formatted()) {
            Ok(_) => Ok(()),
            Err(e) => {
                // leave the connection ready for the next transaction
                if !connection.has_broken() {
                    if let Err(reset) = connection.command(Rset) {
                        tracing::debug!("RSET after rejected submission failed: {}", reset);
                    }
                }
                Err(SessionError::new(SessionStage::Submit, e.to_string()))
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.quit() {
                tracing::debug!("QUIT failed, dropping connection: {}", e);
                connection.abort();
            }
        }
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Single-part text/plain message with From, To and Subject headers.
pub fn build_message(message: &OutgoingMessage) -> Result<Message, SessionError> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|_| SessionError::new(SessionStage::Submit, format!("invalid sender address: {}", message.from)))?;
    let to: Mailbox = message
        .to
        .as_str()
        .parse()
        .map_err(|_| SessionError::new(SessionStage::Submit, format!("invalid recipient address: {}", message.to)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| SessionError::new(SessionStage::Submit, e.to_string()))
}
