//! The Reserve action.
//!
//! Reserves DOIs for a batch of unpublished datasets. Validation aggregates
//! every failure across the batch before deciding, so an operator can fix
//! all issues in one pass. Unless `dry_run` is set, the batch document is
//! submitted to the registration service and whatever comes back — the
//! registry is the authority on assigned DOI strings — replaces the working
//! records.

use crate::error::DoiError;
use crate::input::{Ingestor, InputSource};
use crate::model::{DoiStatus, Transaction};
use crate::validate::Validator;
use crate::{node, transcode};

use super::{ActionOutput, DoiEngine};

#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub input: InputSource,
    pub node: String,
    pub submitter: String,
    /// Skip the registration service; records stay reserved-not-submitted.
    pub dry_run: bool,
    /// Downgrade business-rule failures to logged warnings.
    pub force: bool,
}

impl DoiEngine {
    /// Reserve DOIs for every record in the input batch, committing the
    /// batch as one ledger commit per identifier sharing one output
    /// document.
    pub async fn reserve(&self, request: ReserveRequest) -> Result<ActionOutput, DoiError> {
        tracing::info!(node = %request.node, dry_run = request.dry_run, "running reserve action");

        let contributor = node::long_name(&request.node)?;
        let ingestor = Ingestor::new(self.config());
        let validator = Validator::new(self.ledger());

        let mut records = ingestor.ingest(&request.input).await?;

        let status = if request.dry_run {
            DoiStatus::ReservedNotSubmitted
        } else {
            DoiStatus::Reserved
        };

        // Status and dates are stamped before validation runs so the fields
        // are correct even when the caller overrides failures with force.
        for record in &mut records {
            record.status = status;
            record.previous_status = None;
            self.stamp(record, contributor);
        }

        if self.config().validate_reserve_schema {
            for record in &records {
                let single = transcode::build_single(record)?;
                validator.validate_structure(&single)?;
            }
        }

        let outcome = validator.validate_batch(&records).await?;
        outcome.into_result(request.force)?;

        let mut document = transcode::build_document(&records)?;

        if !request.dry_run {
            let response = self
                .client
                .submit(&document, &self.config().endpoint, &self.config().credentials)
                .await?;

            for error in &response.errors {
                tracing::warn!(%error, "registration service reported an entry error");
            }

            if !response.records.is_empty() {
                records = response.records;
            }
            document = response.document;
        }

        let location = request.input.describe();
        for record in &records {
            let transaction = Transaction::for_record(
                record,
                &request.node,
                &request.submitter,
                &location,
                Some(document.clone()),
            );
            self.ledger().append(transaction).await?;
        }

        tracing::info!(count = records.len(), "reserve action committed");

        Ok(ActionOutput { records, document })
    }
}
