//! The Draft action.
//!
//! Two modes share one entry point: drafting fresh input content, and
//! reverting an already-ledgered identifier back to draft (typical for
//! records that do not advance past review).

use crate::error::DoiError;
use crate::input::{Ingestor, InputSource};
use crate::model::{DoiStatus, Lidvid, Transaction};
use crate::validate::Validator;
use crate::{node, transcode};

use super::{ActionOutput, DoiEngine};

/// What a Draft call operates on.
#[derive(Debug, Clone)]
pub enum DraftInput {
    /// Ingest new content and draft a record per input.
    Content(InputSource),
    /// Revert the latest transaction for this identifier back to draft.
    Identifier(Lidvid),
}

#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub input: DraftInput,
    pub node: String,
    pub submitter: String,
    /// Downgrade business-rule failures to logged warnings.
    pub force: bool,
    /// Extra keywords to attach; ignored for reversions.
    pub keywords: Vec<String>,
}

impl DoiEngine {
    /// Create draft records from input content, or revert an existing
    /// identifier to draft.
    pub async fn draft(&self, request: DraftRequest) -> Result<ActionOutput, DoiError> {
        tracing::info!(node = %request.node, "running draft action");

        match request.input.clone() {
            DraftInput::Identifier(identifier) => self.draft_reversion(&identifier, &request).await,
            DraftInput::Content(source) => self.draft_inputs(&source, &request).await,
        }
    }

    /// Roll the latest transaction for `identifier` back to draft status,
    /// noting the prior status, and commit a fresh transaction for the roll.
    async fn draft_reversion(
        &self,
        identifier: &Lidvid,
        request: &DraftRequest,
    ) -> Result<ActionOutput, DoiError> {
        node::long_name(&request.node)?;

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

        // The stored document may hold entries for other identifiers too.
        let entry = transcode::entry_for_identifier(content, identifier)?;
        let (mut records, _) = transcode::parse_document(&entry)?;
        let mut record = records.pop().ok_or_else(|| {
            DoiError::Critical(format!(
                "stored entry for {identifier} did not yield a parseable record"
            ))
        })?;

        record.transition_to(DoiStatus::Draft);

        let document = transcode::build_single(&record)?;
        let transaction = Transaction::for_record(
            &record,
            &request.node,
            &request.submitter,
            &format!("transaction:{}", latest.transaction_id),
            Some(document.clone()),
        );
        self.ledger().append(transaction).await?;

        tracing::info!(%identifier, previous = ?record.previous_status, "reverted record to draft");

        Ok(ActionOutput {
            records: vec![record],
            document,
        })
    }

    /// Draft every record the input yields, committing one transaction per
    /// processed record. Inputs yielding no record are skipped; a
    /// business-rule failure without `force` aborts the remainder but leaves
    /// transactions already committed intact.
    async fn draft_inputs(
        &self,
        source: &InputSource,
        request: &DraftRequest,
    ) -> Result<ActionOutput, DoiError> {
        let contributor = node::long_name(&request.node)?;
        let ingestor = Ingestor::new(self.config());
        let validator = Validator::new(self.ledger());

        let mut drafted = Vec::new();

        for input in ingestor.expand(source)? {
            let records = ingestor.read(&input).await?;
            if records.is_empty() {
                // Unsupported shape; the ingestor already logged the notice.
                continue;
            }

            for mut record in records {
                record.status = DoiStatus::Draft;
                record.previous_status = None;
                self.stamp(&mut record, contributor);
                for keyword in &request.keywords {
                    record.keywords.insert(keyword.trim().to_string());
                }

                let document = transcode::build_single(&record)?;

                if self.config().validate_draft_schema {
                    validator.validate_structure(&document)?;
                }

                let outcome = validator.validate_record(&record).await?;
                outcome.into_result(request.force)?;

                let transaction = Transaction::for_record(
                    &record,
                    &request.node,
                    &request.submitter,
                    &input.describe(),
                    Some(document),
                );
                self.ledger().append(transaction).await?;

                drafted.push(record);
            }
        }

        if drafted.is_empty() {
            return Err(DoiError::input_format(
                source.describe(),
                "input produced no records",
            ));
        }

        // All the resulting entries concatenated into one combined document.
        let document = transcode::build_document(&drafted)?;

        tracing::info!(count = drafted.len(), "draft action committed");

        Ok(ActionOutput {
            records: drafted,
            document,
        })
    }
}
