use crate::core::{Pipeline, RecipientSet};
use crate::domain::model::DispatchReport;
use crate::utils::error::Result;

pub struct DispatchEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> DispatchEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Read, resolve and send. Resolution errors stop the run before any network I/O.
    pub async fn run(&self) -> Result<DispatchReport> {
        tracing::info!("Starting bulk dispatch...");

        let recipients = self.preview().await?;

        tracing::info!("Sending to {} recipients...", recipients.len());
        let report = self.pipeline.load(recipients).await?;

        if report.is_full_success() {
            tracing::info!("All {} emails were sent successfully", report.delivered);
        } else {
            tracing::warn!(
                "Failed to send emails to {} of {} recipients",
                report.failed.len(),
                report.attempted
            );
        }

        Ok(report)
    }

    /// Extract and resolve only; nothing is sent.
    pub async fn preview(&self) -> Result<RecipientSet> {
        tracing::info!("Extracting rows...");
        let rows = self.pipeline.extract().await?;
        tracing::info!("Extracted {} rows", rows.len());

        tracing::info!("Resolving recipients...");
        self.pipeline.transform(rows).await
    }
}
