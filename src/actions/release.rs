//! The Release action.
//!
//! Moves an already-ledgered identifier to review, or directly to
//! registered when review is skipped. Works entirely from the stored output
//! artifact of the identifier's latest transaction; the identifier's entry
//! is extracted from that document since stored documents may hold
//! unrelated identifiers alongside the requested one.

use chrono::Utc;

use crate::error::DoiError;
use crate::model::{DoiStatus, Lidvid, Transaction};
use crate::validate::Validator;
use crate::transcode;

use super::{ActionOutput, DoiEngine};

#[derive(Debug, Clone)]
pub struct ReleaseRequest {
    pub identifier: Lidvid,
    /// Downgrade business-rule failures to logged warnings.
    pub force: bool,
    /// Skip the review step and register directly.
    pub no_review: bool,
}

impl DoiEngine {
    /// Submit the identifier's latest record for review or direct release,
    /// and commit a transaction with the resulting status. Any error list
    /// the registry returns is aggregated into one warning, even when the
    /// submission was accepted with caveats.
    pub async fn release(&self, request: ReleaseRequest) -> Result<ActionOutput, DoiError> {
        let identifier = &request.identifier;
        tracing::info!(%identifier, no_review = request.no_review, "running release action");

        let latest = self
            .ledger()
            .latest(identifier)
            .await?
            .ok_or_else(|| DoiError::UnknownIdentifier(identifier.to_string()))?;

        let content = latest
            .output_content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DoiError::NoTransactionHistory(identifier.to_string()))?;

        let entry = transcode::entry_for_identifier(content, identifier)?;
        let (mut records, _) = transcode::parse_document(&entry)?;
        let mut record = records.pop().ok_or_else(|| {
            DoiError::Critical(format!(
                "stored entry for {identifier} did not yield a parseable record"
            ))
        })?;

        record.status = if request.no_review {
            DoiStatus::Registered
        } else {
            DoiStatus::PendingReview
        };
        record.previous_status = None;
        record.date_record_updated = Some(Utc::now().date_naive());

        let validator = Validator::new(self.ledger());
        let outcome = validator.validate_record(&record).await?;
        outcome.into_result(request.force)?;

        let document = transcode::build_single(&record)?;

        // Stored artifacts may predate the current schema; never submit one
        // that no longer passes the structural pass. Not gated by the
        // draft/reserve config flags, which cover authoring paths only.
        validator.validate_structure(&document)?;

        let response = self
            .client
            .submit(&document, &self.config().endpoint, &self.config().credentials)
            .await?;

        let records = if response.records.is_empty() {
            vec![record]
        } else {
            response.records
        };
        let document = if response.document.trim().is_empty() {
            document
        } else {
            response.document
        };

        // The node and submitter of record are the ones who put this
        // identifier into the ledger.
        for released in &records {
            let transaction = Transaction::for_record(
                released,
                &latest.node,
                &latest.submitter,
                &latest.input_location,
                Some(document.clone()),
            );
            self.ledger().append(transaction).await?;
        }

        if !response.errors.is_empty() {
            return Err(DoiError::warning(response.errors));
        }

        tracing::info!(%identifier, "release action committed");

        Ok(ActionOutput { records, document })
    }
}
