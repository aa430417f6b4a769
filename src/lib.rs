//! DOI lifecycle engine.
//!
//! Manages the lifecycle of Digital Object Identifiers minted for scientific
//! data products, mediating between locally authored metadata labels and a
//! remote registration authority. Metadata — structured XML labels or
//! tabular batches — moves an identifier through draft, reserved, pending
//! review, and registered states; every transition commits an immutable
//! transaction to an append-only ledger keyed by the dataset identifier.
//!
//! The crate is request-scoped: construct a [`DoiEngine`] with a ledger and
//! a registration client, then invoke [`DoiEngine::draft`],
//! [`DoiEngine::reserve`], or [`DoiEngine::release`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use doi_lifecycle::{
//!     DoiEngine, DraftInput, DraftRequest, EngineConfig, HttpRegistrationClient,
//!     InputSource, MemoryLedger,
//! };
//!
//! # async fn run() -> Result<(), doi_lifecycle::DoiError> {
//! let engine = DoiEngine::new(
//!     EngineConfig::from_env(),
//!     Arc::new(MemoryLedger::new()),
//!     Arc::new(HttpRegistrationClient::new()?),
//! );
//!
//! let output = engine
//!     .draft(DraftRequest {
//!         input: DraftInput::Content(InputSource::resolve("bundle.xml")?),
//!         node: "img".into(),
//!         submitter: "my.email@node.gov".into(),
//!         force: false,
//!         keywords: vec![],
//!     })
//!     .await?;
//! println!("{}", output.document);
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod input;
pub mod ledger;
#[cfg(feature = "database")]
pub mod ledger_pg;
pub mod model;
pub mod node;
pub mod registry;
pub mod transcode;
pub mod validate;

pub use actions::{
    ActionOutput, DoiEngine, DraftInput, DraftRequest, ReleaseRequest, ReserveRequest,
};
pub use config::{Credentials, EngineConfig};
pub use error::DoiError;
pub use input::InputSource;
pub use ledger::{MemoryLedger, TransactionLedger};
#[cfg(feature = "database")]
pub use ledger_pg::PgLedger;
pub use model::{DoiRecord, DoiStatus, Lidvid, Transaction, TransactionFilter};
pub use registry::{HttpRegistrationClient, RegistrationClient, RegistryResponse};
pub use validate::{FailureKind, ValidationFailure, ValidationOutcome, Validator};
