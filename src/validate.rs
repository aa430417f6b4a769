//! Record validation.
//!
//! Two independent passes run before a record participates in a transition:
//!
//! - **Structural**: the transcoded wire document must conform to the fixed
//!   schema shape. Failure is always fatal — it means a malformed transcoder
//!   output or corrupt input, never a business concern — and is never
//!   subject to override.
//! - **Business rules**: duplicate title against existing ledger entries, a
//!   transition not permitted from the recorded prior status, and the
//!   title/product-type naming convention. Failures are classified values
//!   collected into a [`ValidationOutcome`]; the action decides whether the
//!   aggregate terminates the call based on the `force` flag.
//!
//! When validating a batch, every record is checked and every failure is
//! collected before any decision is made, so the caller sees the complete
//! list and can fix all issues in one pass.

use crate::error::DoiError;
use crate::ledger::TransactionLedger;
use crate::model::{DoiRecord, TransactionFilter};
use crate::transcode;

/// Product types whose records must carry the type name in their title.
const TYPED_PRODUCTS: &[&str] = &["bundle", "collection", "document", "dataset"];

/// Classification of a business-rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    DuplicatedTitle,
    UnexpectedTransition,
    TitleMismatch,
}

/// One classified business-rule failure.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ValidationFailure {
    fn new(kind: FailureKind, message: String) -> Self {
        Self { kind, message }
    }
}

/// Transient aggregate of zero or more classified failures from one
/// validation pass. Never persisted.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    failures: Vec<ValidationFailure>,
}

impl ValidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn messages(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.message.clone()).collect()
    }

    pub fn push(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    pub fn extend(&mut self, other: ValidationOutcome) {
        self.failures.extend(other.failures);
    }

    /// Convert the aggregate into a terminating error unless the caller
    /// requested override, in which case every failure is logged and the
    /// action proceeds.
    pub fn into_result(self, force: bool) -> Result<(), DoiError> {
        if self.is_clean() {
            return Ok(());
        }
        if force {
            for failure in &self.failures {
                tracing::warn!(kind = ?failure.kind, "{} (overridden by force)", failure.message);
            }
            return Ok(());
        }
        Err(DoiError::warning(self.messages()))
    }
}

/// Stateless validator over a ledger snapshot; constructed per action call.
pub struct Validator<'a> {
    ledger: &'a dyn TransactionLedger,
}

impl<'a> Validator<'a> {
    pub fn new(ledger: &'a dyn TransactionLedger) -> Self {
        Self { ledger }
    }

    /// Structural pass: the document must parse and every entry must carry
    /// the fields the registry schema requires. Always fatal.
    pub fn validate_structure(&self, xml: &str) -> Result<(), DoiError> {
        let (records, errors) = transcode::parse_document(xml)?;

        if !errors.is_empty() {
            return Err(DoiError::Critical(format!(
                "wire document failed schema validation: {}",
                errors.join("; ")
            )));
        }

        for record in &records {
            if record.publisher.trim().is_empty() {
                return Err(DoiError::Critical(format!(
                    "wire document failed schema validation: entry for {} has no publisher",
                    record.identifier
                )));
            }
            if record.date_record_added.is_none() {
                return Err(DoiError::Critical(format!(
                    "wire document failed schema validation: entry for {} has no record-added date",
                    record.identifier
                )));
            }
        }

        Ok(())
    }

    /// Business-rule pass over a single record.
    pub async fn validate_record(
        &self,
        record: &DoiRecord,
    ) -> Result<ValidationOutcome, DoiError> {
        let mut outcome = ValidationOutcome::default();

        self.check_duplicate_title(record, &mut outcome).await?;
        self.check_transition(record, &mut outcome).await?;
        self.check_title_matches_product_type(record, &mut outcome);

        Ok(outcome)
    }

    /// Business-rule pass over a batch. One record's failure never
    /// short-circuits validation of its siblings.
    pub async fn validate_batch(
        &self,
        records: &[DoiRecord],
    ) -> Result<ValidationOutcome, DoiError> {
        let mut outcome = ValidationOutcome::default();
        for record in records {
            outcome.extend(self.validate_record(record).await?);
        }
        Ok(outcome)
    }

    async fn check_duplicate_title(
        &self,
        record: &DoiRecord,
        outcome: &mut ValidationOutcome,
    ) -> Result<(), DoiError> {
        let filter = TransactionFilter::for_title(record.title.clone()).latest_only();
        let rows = self.ledger.history(&filter).await?;

        for row in rows {
            if row.identifier != record.identifier {
                outcome.push(ValidationFailure::new(
                    FailureKind::DuplicatedTitle,
                    format!(
                        "title '{}' for {} is already used by {}",
                        record.title, record.identifier, row.identifier
                    ),
                ));
            }
        }

        Ok(())
    }

    async fn check_transition(
        &self,
        record: &DoiRecord,
        outcome: &mut ValidationOutcome,
    ) -> Result<(), DoiError> {
        let Some(latest) = self.ledger.latest(&record.identifier).await? else {
            return Ok(());
        };

        // A deliberate reversion records where it came from; anything else
        // moving backwards in the workflow is suspect.
        if record.previous_status.is_none()
            && record.status.workflow_rank() < latest.status.workflow_rank()
        {
            outcome.push(ValidationFailure::new(
                FailureKind::UnexpectedTransition,
                format!(
                    "transition for {} from '{}' back to '{}' is not an expected workflow step",
                    record.identifier, latest.status, record.status
                ),
            ));
        }

        Ok(())
    }

    fn check_title_matches_product_type(
        &self,
        record: &DoiRecord,
        outcome: &mut ValidationOutcome,
    ) {
        let Some(product_type) = record.product_type.as_deref() else {
            return;
        };
        let product_type = product_type.to_ascii_lowercase();

        if TYPED_PRODUCTS.contains(&product_type.as_str())
            && !record.title.to_ascii_lowercase().contains(&product_type)
        {
            outcome.push(ValidationFailure::new(
                FailureKind::TitleMismatch,
                format!(
                    "title '{}' for {} does not reference its product type '{}'",
                    record.title, record.identifier, product_type
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::model::{DoiStatus, Lidvid, Transaction};
    use chrono::Utc;

    fn record(lidvid: &str, title: &str, status: DoiStatus) -> DoiRecord {
        let mut record = DoiRecord::new(Lidvid::parse(lidvid).unwrap(), title);
        record.status = status;
        record.publisher = "Scientific Data Archive".into();
        record.date_record_added = Some(Utc::now().date_naive());
        record
    }

    async fn seed(ledger: &MemoryLedger, lidvid: &str, title: &str, status: DoiStatus) {
        let seeded = record(lidvid, title, status);
        ledger
            .append(Transaction::for_record(
                &seeded,
                "img",
                "ops@node.gov",
                "input.xml",
                None,
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_title_across_identifiers_is_flagged() {
        let ledger = MemoryLedger::new();
        seed(&ledger, "urn:nasa:pds:existing::1.0", "Shared Title", DoiStatus::Reserved).await;

        let validator = Validator::new(&ledger);
        let candidate = record("urn:nasa:pds:incoming::1.0", "Shared Title", DoiStatus::Reserved);
        let outcome = validator.validate_record(&candidate).await.unwrap();

        assert_eq!(outcome.failures().len(), 1);
        assert_eq!(outcome.failures()[0].kind, FailureKind::DuplicatedTitle);
    }

    #[tokio::test]
    async fn same_identifier_may_keep_its_title() {
        let ledger = MemoryLedger::new();
        seed(&ledger, "urn:nasa:pds:thing::1.0", "Kept Title", DoiStatus::Draft).await;

        let validator = Validator::new(&ledger);
        let candidate = record("urn:nasa:pds:thing::1.0", "Kept Title", DoiStatus::Reserved);
        let outcome = validator.validate_record(&candidate).await.unwrap();
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn backwards_transition_without_reversion_is_flagged() {
        let ledger = MemoryLedger::new();
        seed(&ledger, "urn:nasa:pds:thing::1.0", "A Title", DoiStatus::PendingReview).await;

        let validator = Validator::new(&ledger);
        let candidate = record("urn:nasa:pds:thing::1.0", "A Title", DoiStatus::Reserved);
        let outcome = validator.validate_record(&candidate).await.unwrap();
        assert_eq!(outcome.failures()[0].kind, FailureKind::UnexpectedTransition);

        let mut reversion = candidate.clone();
        reversion.status = DoiStatus::Draft;
        reversion.previous_status = Some(DoiStatus::PendingReview);
        let outcome = validator.validate_record(&reversion).await.unwrap();
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn title_must_reference_product_type() {
        let ledger = MemoryLedger::new();
        let validator = Validator::new(&ledger);

        let mut candidate = record("urn:nasa:pds:thing::1.0", "Some Data", DoiStatus::Draft);
        candidate.product_type = Some("bundle".into());
        let outcome = validator.validate_record(&candidate).await.unwrap();
        assert_eq!(outcome.failures()[0].kind, FailureKind::TitleMismatch);

        candidate.title = "Some Data Bundle".into();
        let outcome = validator.validate_record(&candidate).await.unwrap();
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn batch_collects_every_failure_before_deciding() {
        let ledger = MemoryLedger::new();
        seed(&ledger, "urn:nasa:pds:existing::1.0", "Taken Title", DoiStatus::Reserved).await;

        let validator = Validator::new(&ledger);
        let mut bad_type = record("urn:nasa:pds:b::1.0", "Plain Name", DoiStatus::Reserved);
        bad_type.product_type = Some("collection".into());
        let batch = vec![
            record("urn:nasa:pds:a::1.0", "Taken Title", DoiStatus::Reserved),
            bad_type,
            record("urn:nasa:pds:c::1.0", "Fresh Title", DoiStatus::Reserved),
        ];

        let outcome = validator.validate_batch(&batch).await.unwrap();
        assert_eq!(outcome.failures().len(), 2);

        let err = outcome.into_result(false).unwrap_err();
        let DoiError::Warning { messages } = err else {
            panic!("expected aggregate warning");
        };
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn force_downgrades_failures_to_logged_warnings() {
        let ledger = MemoryLedger::new();
        seed(&ledger, "urn:nasa:pds:existing::1.0", "Taken Title", DoiStatus::Reserved).await;

        let validator = Validator::new(&ledger);
        let candidate = record("urn:nasa:pds:a::1.0", "Taken Title", DoiStatus::Reserved);
        let outcome = validator.validate_record(&candidate).await.unwrap();
        assert!(outcome.into_result(true).is_ok());
    }

    #[tokio::test]
    async fn structural_pass_rejects_missing_publisher() {
        let ledger = MemoryLedger::new();
        let validator = Validator::new(&ledger);

        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <records>
              <record status="draft">
                <title>Bare Bundle</title>
                <related_identifier>urn:nasa:pds:bare::1.0</related_identifier>
              </record>
            </records>"#;

        assert!(matches!(
            validator.validate_structure(xml),
            Err(DoiError::Critical(_))
        ));
    }
}
