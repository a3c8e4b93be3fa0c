use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::utils::validation::is_valid_address;

/// One uploaded record: column name -> cell value, in file column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(column.to_string(), value.into());
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.data.get(column)
    }
}

/// A destination address that passed the address contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Trims the candidate and checks it against the default address pattern.
    pub fn parse(candidate: &str) -> Option<Self> {
        let trimmed = candidate.trim();
        is_valid_address(trimmed).then(|| Self(trimmed.to_string()))
    }

    /// Wraps a value some other rule has already accepted.
    pub(crate) fn accepted(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Distinct addresses in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecipientSet(Vec<Address>);

impl RecipientSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<Address> {
        self.0.clone()
    }
}

impl FromIterator<Address> for RecipientSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let addresses = iter
            .into_iter()
            .filter(|address| seen.insert(address.clone()))
            .collect();
        Self(addresses)
    }
}

impl<'a> IntoIterator for &'a RecipientSet {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Sender password or token. Never rendered in logs, errors or reports.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("[redacted]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Everything one dispatch call needs.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub sender: String,
    pub secret: Secret,
    pub endpoint: Endpoint,
    pub subject: String,
    pub body: String,
    pub recipients: RecipientSet,
}

/// A single plain-text message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: Address,
    pub subject: String,
    pub body: String,
}

/// Result of one submission attempt inside the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Submitted,
    Rejected { reason: String },
}

/// Outcome of a dispatch whose session was established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub attempted: usize,
    /// Recipients whose submission failed, in dispatch order.
    pub failed: Vec<Address>,
}

impl DispatchResult {
    pub fn delivered(&self) -> usize {
        self.attempted - self.failed.len()
    }

    pub fn is_full_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Summary of one pipeline run, written next to the failure list.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub endpoint: String,
    pub valid_recipients: usize,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<Address>,
    pub session_error: Option<String>,
}

impl DispatchReport {
    pub fn is_full_success(&self) -> bool {
        self.failed.is_empty() && self.session_error.is_none()
    }

    /// Console summary shared by the binaries; the caller picks the exit status.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("✅ Found {} valid email addresses.", self.valid_recipients),
            format!(
                "📨 Attempted: {}, delivered: {}, failed: {}",
                self.attempted,
                self.delivered,
                self.failed.len()
            ),
        ];

        if let Some(error) = &self.session_error {
            lines.push(format!("❌ Session error: {}", error));
        }

        if self.failed.is_empty() {
            lines.push("✅ All emails were sent successfully!".to_string());
        } else {
            lines.push(format!(
                "⚠️ Failed to send emails to {} recipients:",
                self.failed.len()
            ));
            lines.extend(self.failed.iter().map(|address| format!("  {}", address)));
        }

        lines
    }
}
