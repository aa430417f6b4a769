//! The action state machine.
//!
//! Three operations advance a DOI through its lifecycle: Draft, Reserve, and
//! Release. Each validates its inputs, drives the transcoder / validator /
//! registration client as appropriate, and commits transactions to the
//! ledger. Collaborators are stateless and constructed per call; the engine
//! only owns the configuration, the ledger handle, and the client handle.

mod draft;
mod release;
mod reserve;

pub use draft::{DraftInput, DraftRequest};
pub use release::ReleaseRequest;
pub use reserve::ReserveRequest;

use std::sync::Arc;

use chrono::Utc;

use crate::config::EngineConfig;
use crate::ledger::TransactionLedger;
use crate::model::DoiRecord;
use crate::registry::RegistrationClient;

/// Result of one action invocation: the records it produced and the combined
/// wire document reflecting them.
#[derive(Debug)]
pub struct ActionOutput {
    pub records: Vec<DoiRecord>,
    pub document: String,
}

/// Orchestrates the DOI lifecycle operations.
pub struct DoiEngine {
    config: EngineConfig,
    ledger: Arc<dyn TransactionLedger>,
    client: Arc<dyn RegistrationClient>,
}

impl DoiEngine {
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn TransactionLedger>,
        client: Arc<dyn RegistrationClient>,
    ) -> Self {
        Self {
            config,
            ledger,
            client,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Query access to the transaction history, for façades that need
    /// `latest`/`history` without going through an action.
    pub fn ledger(&self) -> &dyn TransactionLedger {
        self.ledger.as_ref()
    }

    /// Stamp the fields every outgoing record carries: publisher,
    /// contributor (also added as a keyword), and the record dates. Runs
    /// before validation so the fields are correct even on the override
    /// path.
    pub(crate) fn stamp(&self, record: &mut DoiRecord, contributor: &str) {
        record.publisher = self.config.publisher.clone();
        record.contributor = contributor.to_string();
        record.keywords.insert(contributor.to_string());

        let today = Utc::now().date_naive();
        if record.date_record_added.is_none() {
            record.date_record_added = Some(today);
        }
        record.date_record_updated = Some(today);
    }
}
