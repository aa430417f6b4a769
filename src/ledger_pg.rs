//! PostgreSQL-backed transaction ledger.
//!
//! The one-latest-per-identifier invariant is enforced by the store itself:
//! a partial unique index over `(identifier) WHERE is_latest` makes two
//! racing commits impossible to both land as latest, and `append` runs the
//! demote-then-insert as a single SQL transaction.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::error::DoiError;
use crate::ledger::TransactionLedger;
use crate::model::{Lidvid, Transaction, TransactionFilter};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS doi_transactions (
    transaction_id UUID PRIMARY KEY,
    identifier     TEXT NOT NULL,
    doi            TEXT,
    title          TEXT NOT NULL,
    node           TEXT NOT NULL,
    submitter      TEXT NOT NULL,
    status         TEXT NOT NULL,
    input_location TEXT NOT NULL,
    output_content TEXT,
    committed_at   TIMESTAMPTZ NOT NULL,
    is_latest      BOOLEAN NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_doi_transactions_identifier
    ON doi_transactions (identifier);
CREATE UNIQUE INDEX IF NOT EXISTS uniq_doi_transactions_latest
    ON doi_transactions (identifier) WHERE is_latest;
"#;

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the ledger table and its invariant-bearing indexes.
    pub async fn ensure_schema(&self) -> Result<(), DoiError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_transaction(row: &sqlx::postgres::PgRow) -> Result<Transaction, DoiError> {
    let identifier: String = row.get("identifier");
    let status: String = row.get("status");

    Ok(Transaction {
        transaction_id: row.get("transaction_id"),
        identifier: Lidvid::parse(&identifier)?,
        doi: row.get("doi"),
        title: row.get("title"),
        node: row.get("node"),
        submitter: row.get("submitter"),
        status: status
            .parse()
            .map_err(|_| DoiError::Critical(format!("ledger row carries bad status '{status}'")))?,
        input_location: row.get("input_location"),
        output_content: row.get("output_content"),
        committed_at: row.get("committed_at"),
        is_latest: row.get("is_latest"),
    })
}

#[async_trait]
impl TransactionLedger for PgLedger {
    async fn append(&self, mut transaction: Transaction) -> Result<Transaction, DoiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE doi_transactions SET is_latest = FALSE WHERE identifier = $1 AND is_latest",
        )
        .bind(transaction.identifier.to_string())
        .execute(&mut *tx)
        .await?;

        transaction.is_latest = true;

        sqlx::query(
            r#"INSERT INTO doi_transactions (
                   transaction_id, identifier, doi, title, node, submitter,
                   status, input_location, output_content, committed_at, is_latest
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)"#,
        )
        .bind(transaction.transaction_id)
        .bind(transaction.identifier.to_string())
        .bind(&transaction.doi)
        .bind(&transaction.title)
        .bind(&transaction.node)
        .bind(&transaction.submitter)
        .bind(transaction.status.to_string())
        .bind(&transaction.input_location)
        .bind(&transaction.output_content)
        .bind(transaction.committed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(transaction)
    }

    async fn latest(&self, identifier: &Lidvid) -> Result<Option<Transaction>, DoiError> {
        let row = sqlx::query(
            "SELECT * FROM doi_transactions WHERE identifier = $1 AND is_latest",
        )
        .bind(identifier.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn history(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, DoiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM doi_transactions WHERE 1 = 1");

        if let Some(doi) = &filter.doi {
            builder.push(" AND doi = ").push_bind(doi.clone());
        }
        if let Some(identifier) = &filter.identifier {
            builder
                .push(" AND identifier = ")
                .push_bind(identifier.to_string());
        }
        if let Some(lid) = &filter.lid {
            // Match the bare lid and every versioned form of it.
            builder
                .push(" AND (identifier = ")
                .push_bind(lid.clone())
                .push(" OR identifier LIKE ")
                .push_bind(format!("{lid}::%"))
                .push(")");
        }
        if let Some(submitter) = &filter.submitter {
            builder.push(" AND submitter = ").push_bind(submitter.clone());
        }
        if let Some(node) = &filter.node {
            builder.push(" AND node = ").push_bind(node.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(title) = &filter.title {
            builder
                .push(" AND LOWER(title) = LOWER(")
                .push_bind(title.clone())
                .push(")");
        }
        if let Some(after) = filter.updated_after {
            builder.push(" AND committed_at >= ").push_bind(after);
        }
        if let Some(before) = filter.updated_before {
            builder.push(" AND committed_at <= ").push_bind(before);
        }
        if filter.latest_only {
            builder.push(" AND is_latest");
        }

        builder.push(" ORDER BY committed_at");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_transaction).collect()
    }
}
