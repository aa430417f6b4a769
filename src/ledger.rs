//! Transaction ledger.
//!
//! Append-only store of one transaction per action invocation. The ledger
//! itself enforces the one-latest-per-identifier invariant: `append` demotes
//! the prior latest row and flags the new row in a single atomic step, so
//! racing commits on the same identifier serialize here and never both
//! observe themselves as authoritative.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::DoiError;
use crate::model::{Lidvid, Transaction, TransactionFilter};

/// Query and append interface over the transaction history.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Atomically commit a transaction, demoting the prior latest row for
    /// the same identifier. Returns the stored row with `is_latest` set.
    async fn append(&self, transaction: Transaction) -> Result<Transaction, DoiError>;

    /// The transaction currently flagged latest for an identifier.
    async fn latest(&self, identifier: &Lidvid) -> Result<Option<Transaction>, DoiError>;

    /// All transactions matching the filter, ordered by commit time.
    async fn history(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, DoiError>;
}

/// In-memory ledger. The single mutex section around demote-then-push is
/// what makes concurrent commits on one identifier serialize.
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<Transaction>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionLedger for MemoryLedger {
    async fn append(&self, mut transaction: Transaction) -> Result<Transaction, DoiError> {
        let mut rows = self.rows.lock().await;

        for row in rows.iter_mut() {
            if row.identifier == transaction.identifier {
                row.is_latest = false;
            }
        }

        transaction.is_latest = true;
        rows.push(transaction.clone());

        tracing::debug!(
            identifier = %transaction.identifier,
            status = %transaction.status,
            "committed ledger transaction"
        );

        Ok(transaction)
    }

    async fn latest(&self, identifier: &Lidvid) -> Result<Option<Transaction>, DoiError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|row| &row.identifier == identifier && row.is_latest)
            .cloned())
    }

    async fn history(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, DoiError> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<Transaction> = rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        matched.sort_by_key(|row| row.committed_at);
        Ok(matched)
    }
}
