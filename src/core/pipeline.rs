use crate::adapters::reader::read_rows;
use crate::core::dispatcher::dispatch_all;
use crate::core::resolver::resolve;
use crate::core::{ConfigProvider, Pipeline, RawRow, RecipientSet, Storage};
use crate::domain::model::{DispatchReport, DispatchRequest, Endpoint};
use crate::domain::ports::MailTransport;
use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

pub const FAILED_RECIPIENTS_FILE: &str = "failed_recipients.csv";
pub const REPORT_FILE: &str = "dispatch_report.json";

pub struct BulkMailPipeline<S: Storage, C: ConfigProvider, T: MailTransport> {
    storage: S,
    config: C,
    transport: Arc<T>,
}

impl<S: Storage, C: ConfigProvider, T: MailTransport> BulkMailPipeline<S, C, T> {
    pub fn new(storage: S, config: C, transport: T) -> Self {
        Self {
            storage,
            config,
            transport: Arc::new(transport),
        }
    }

    fn request(&self, recipients: RecipientSet) -> DispatchRequest {
        DispatchRequest {
            sender: self.config.sender().trim().to_string(),
            secret: self.config.sender_secret().clone(),
            endpoint: Endpoint::new(self.config.smtp_host().trim(), self.config.smtp_port()),
            subject: self.config.subject().to_string(),
            body: self.config.body().to_string(),
            recipients,
        }
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    async fn write_report(&self, report: &DispatchReport) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["email"])?;
        for address in &report.failed {
            writer.write_record([address.as_str()])?;
        }
        let failed_csv = writer.into_inner().map_err(|e| EtlError::ProcessingError {
            message: format!("Failed to finish failure list: {}", e),
        })?;

        let json = serde_json::to_vec_pretty(report)?;

        let failed_path = self.output_file(FAILED_RECIPIENTS_FILE);
        let report_path = self.output_file(REPORT_FILE);
        self.storage.write_file(&failed_path, &failed_csv).await?;
        self.storage.write_file(&report_path, &json).await?;

        tracing::debug!("Reports written to {} and {}", failed_path, report_path);
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S, C, T> Pipeline for BulkMailPipeline<S, C, T>
where
    S: Storage,
    C: ConfigProvider,
    T: MailTransport + 'static,
{
    async fn extract(&self) -> Result<Vec<RawRow>> {
        let input_path = self.config.input_path();
        tracing::debug!("Reading recipients from: {}", input_path);

        let bytes = self.storage.read_file(input_path).await?;
        read_rows(input_path, &bytes)
    }

    async fn transform(&self, rows: Vec<RawRow>) -> Result<RecipientSet> {
        let total = rows.len();
        let recipients = resolve(&rows, self.config.column_hint())?;
        tracing::info!(
            "Found {} valid email addresses ({} rows, {} dropped or duplicate)",
            recipients.len(),
            total,
            total - recipients.len()
        );
        Ok(recipients)
    }

    async fn load(&self, recipients: RecipientSet) -> Result<DispatchReport> {
        let started_at = Utc::now();
        let valid_recipients = recipients.len();
        let request = self.request(recipients);
        let endpoint = request.endpoint.to_string();

        // the dispatcher blocks on socket I/O for the whole batch
        let transport = Arc::clone(&self.transport);
        let outcome = tokio::task::spawn_blocking(move || dispatch_all(transport.as_ref(), &request))
            .await
            .map_err(|e| EtlError::ProcessingError {
                message: format!("Dispatch task failed: {}", e),
            })?;

        let report = match &outcome {
            Ok(result) => DispatchReport {
                started_at,
                finished_at: Utc::now(),
                endpoint,
                valid_recipients,
                attempted: result.attempted,
                delivered: result.delivered(),
                failed: result.failed.clone(),
                session_error: None,
            },
            Err(e) => DispatchReport {
                started_at,
                finished_at: Utc::now(),
                endpoint,
                valid_recipients,
                attempted: 0,
                delivered: 0,
                failed: e.failed_recipients().to_vec(),
                session_error: Some(e.to_string()),
            },
        };

        self.write_report(&report).await?;
        outcome?;
        Ok(report)
    }
}
