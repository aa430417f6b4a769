//! Canonical entities: identifiers, workflow status, DOI records, and ledger
//! transactions.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::DoiError;

/// A persistent dataset identifier plus optional version suffix
/// (`lid::vid`). The primary key for a record's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lidvid {
    lid: String,
    vid: Option<String>,
}

impl Lidvid {
    /// Parse an identifier of the form `lid` or `lid::vid`.
    pub fn parse(value: &str) -> Result<Self, DoiError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DoiError::input_format(value, "empty identifier"));
        }

        match value.split_once("::") {
            Some((lid, vid)) if !lid.is_empty() && !vid.is_empty() => Ok(Self {
                lid: lid.to_string(),
                vid: Some(vid.to_string()),
            }),
            Some(_) => Err(DoiError::input_format(
                value,
                "identifier has an empty lid or vid segment",
            )),
            None => Ok(Self {
                lid: value.to_string(),
                vid: None,
            }),
        }
    }

    pub fn lid(&self) -> &str {
        &self.lid
    }

    pub fn vid(&self) -> Option<&str> {
        self.vid.as_deref()
    }

    /// Whether this identifier carries a version suffix.
    pub fn is_versioned(&self) -> bool {
        self.vid.is_some()
    }
}

impl fmt::Display for Lidvid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.vid {
            Some(vid) => write!(f, "{}::{}", self.lid, vid),
            None => write!(f, "{}", self.lid),
        }
    }
}

impl FromStr for Lidvid {
    type Err = DoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lidvid::parse(s)
    }
}

impl Serialize for Lidvid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Lidvid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Lidvid::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Workflow status of a DOI record.
///
/// The permitted forward order is draft → reserved_not_submitted → reserved
/// → pending_review → registered; the only sanctioned reversion is back to
/// draft, recorded via `previous_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoiStatus {
    Draft,
    ReservedNotSubmitted,
    Reserved,
    PendingReview,
    Registered,
}

impl DoiStatus {
    /// Position of this status in the forward workflow. Used to detect
    /// transitions that move backwards without an explicit reversion.
    pub fn workflow_rank(self) -> u8 {
        match self {
            DoiStatus::Draft => 0,
            DoiStatus::ReservedNotSubmitted => 1,
            DoiStatus::Reserved => 2,
            DoiStatus::PendingReview => 3,
            DoiStatus::Registered => 4,
        }
    }

    /// Terminal states admit no further transitions except reversion.
    pub fn is_terminal(self) -> bool {
        matches!(self, DoiStatus::Registered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoiStatus::Draft => "draft",
            DoiStatus::ReservedNotSubmitted => "reserved_not_submitted",
            DoiStatus::Reserved => "reserved",
            DoiStatus::PendingReview => "pending_review",
            DoiStatus::Registered => "registered",
        }
    }
}

impl fmt::Display for DoiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoiStatus {
    type Err = DoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(DoiStatus::Draft),
            "reserved_not_submitted" => Ok(DoiStatus::ReservedNotSubmitted),
            "reserved" => Ok(DoiStatus::Reserved),
            "pending_review" | "review" | "pending" => Ok(DoiStatus::PendingReview),
            "registered" => Ok(DoiStatus::Registered),
            other => Err(DoiError::input_format(
                other,
                "not a recognized DOI workflow status",
            )),
        }
    }
}

/// The canonical DOI metadata unit.
///
/// Constructed fresh by the ingestor or reconstructed by the transcoder from
/// a parsed wire document. Never stored directly, only via the
/// [`Transaction`] that wraps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoiRecord {
    pub identifier: Lidvid,
    /// Assigned by the registry; absent until a reservation is submitted.
    /// Once assigned it never changes for this identifier.
    pub doi: Option<String>,
    pub title: String,
    pub publisher: String,
    /// Long name of the contributing discipline node.
    pub contributor: String,
    /// Ordered, deduplicated free-text keywords.
    pub keywords: BTreeSet<String>,
    pub status: DoiStatus,
    /// Set only when a transition reverts state (e.g. back to draft).
    pub previous_status: Option<DoiStatus>,
    pub publication_date: Option<NaiveDate>,
    pub date_record_added: Option<NaiveDate>,
    pub date_record_updated: Option<NaiveDate>,
    /// Landing page for the dataset, rendered from the configured template.
    pub site_url: Option<String>,
    /// Domain product type parsed from the label (bundle, collection, ...).
    pub product_type: Option<String>,
    /// Non-fatal remarks surfaced to the caller, e.g. registry caveats.
    pub message: Option<String>,
}

impl DoiRecord {
    /// A minimal record with the given identifier and title, in draft.
    pub fn new(identifier: Lidvid, title: impl Into<String>) -> Self {
        Self {
            identifier,
            doi: None,
            title: title.into(),
            publisher: String::new(),
            contributor: String::new(),
            keywords: BTreeSet::new(),
            status: DoiStatus::Draft,
            previous_status: None,
            publication_date: None,
            date_record_added: None,
            date_record_updated: None,
            site_url: None,
            product_type: None,
            message: None,
        }
    }

    /// Move this record to `status`, remembering where it came from when the
    /// move is a reversion (a decrease in workflow rank).
    pub fn transition_to(&mut self, status: DoiStatus) {
        if status.workflow_rank() < self.status.workflow_rank() {
            self.previous_status = Some(self.status);
        }
        self.status = status;
        self.date_record_updated = Some(Utc::now().date_naive());
    }
}

/// The atomic unit of the transaction ledger. Immutable once appended;
/// corrections are new transactions, never edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub identifier: Lidvid,
    pub doi: Option<String>,
    pub title: String,
    /// Submitting organization code.
    pub node: String,
    /// Email/identity of the submitter.
    pub submitter: String,
    /// Workflow status at commit time.
    pub status: DoiStatus,
    /// Path or URL of what was ingested.
    pub input_location: String,
    /// The transcoded wire document produced by the action. `None` models a
    /// ledger/artifact desync and makes later Release calls fail with
    /// [`DoiError::NoTransactionHistory`].
    pub output_content: Option<String>,
    pub committed_at: DateTime<Utc>,
    /// Exactly one transaction per identifier carries this flag; maintained
    /// by the ledger, not by callers.
    pub is_latest: bool,
}

impl Transaction {
    /// Build a transaction for one record. The ledger assigns `is_latest`
    /// on append.
    pub fn for_record(
        record: &DoiRecord,
        node: &str,
        submitter: &str,
        input_location: &str,
        output_content: Option<String>,
    ) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            identifier: record.identifier.clone(),
            doi: record.doi.clone(),
            title: record.title.clone(),
            node: node.to_string(),
            submitter: submitter.to_string(),
            status: record.status,
            input_location: input_location.to_string(),
            output_content,
            committed_at: Utc::now(),
            is_latest: false,
        }
    }
}

/// Criteria for ledger history queries. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub doi: Option<String>,
    pub identifier: Option<Lidvid>,
    /// Match every version of a lid when no full identifier is given.
    pub lid: Option<String>,
    pub submitter: Option<String>,
    pub node: Option<String>,
    pub status: Option<DoiStatus>,
    pub title: Option<String>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
    /// Restrict to rows currently flagged as latest for their identifier.
    pub latest_only: bool,
}

impl TransactionFilter {
    pub fn for_identifier(identifier: Lidvid) -> Self {
        Self {
            identifier: Some(identifier),
            ..Default::default()
        }
    }

    pub fn for_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn latest_only(mut self) -> Self {
        self.latest_only = true;
        self
    }

    /// Whether `txn` satisfies every populated criterion.
    pub fn matches(&self, txn: &Transaction) -> bool {
        if let Some(doi) = &self.doi {
            if txn.doi.as_deref() != Some(doi.as_str()) {
                return false;
            }
        }
        if let Some(identifier) = &self.identifier {
            if &txn.identifier != identifier {
                return false;
            }
        }
        if let Some(lid) = &self.lid {
            if txn.identifier.lid() != lid {
                return false;
            }
        }
        if let Some(submitter) = &self.submitter {
            if &txn.submitter != submitter {
                return false;
            }
        }
        if let Some(node) = &self.node {
            if &txn.node != node {
                return false;
            }
        }
        if let Some(status) = self.status {
            if txn.status != status {
                return false;
            }
        }
        if let Some(title) = &self.title {
            if !txn.title.eq_ignore_ascii_case(title) {
                return false;
            }
        }
        if let Some(after) = self.updated_after {
            if txn.committed_at < after {
                return false;
            }
        }
        if let Some(before) = self.updated_before {
            if txn.committed_at > before {
                return false;
            }
        }
        if self.latest_only && !txn.is_latest {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lidvid_round_trips_with_and_without_version() {
        let versioned = Lidvid::parse("urn:nasa:pds:lab_shocked_feldspars::1.0").unwrap();
        assert_eq!(versioned.lid(), "urn:nasa:pds:lab_shocked_feldspars");
        assert_eq!(versioned.vid(), Some("1.0"));
        assert_eq!(
            versioned.to_string(),
            "urn:nasa:pds:lab_shocked_feldspars::1.0"
        );

        let bare = Lidvid::parse("urn:nasa:pds:insight_cameras").unwrap();
        assert!(!bare.is_versioned());
        assert_eq!(bare.to_string(), "urn:nasa:pds:insight_cameras");
    }

    #[test]
    fn lidvid_rejects_empty_and_dangling_segments() {
        assert!(Lidvid::parse("").is_err());
        assert!(Lidvid::parse("lid::").is_err());
        assert!(Lidvid::parse("::1.0").is_err());
    }

    #[test]
    fn status_ranks_follow_workflow_order() {
        assert!(DoiStatus::Draft.workflow_rank() < DoiStatus::Reserved.workflow_rank());
        assert!(DoiStatus::Reserved.workflow_rank() < DoiStatus::PendingReview.workflow_rank());
        assert!(DoiStatus::Registered.is_terminal());
    }

    #[test]
    fn status_parses_wire_spellings() {
        assert_eq!("review".parse::<DoiStatus>().unwrap(), DoiStatus::PendingReview);
        assert_eq!(
            "reserved_not_submitted".parse::<DoiStatus>().unwrap(),
            DoiStatus::ReservedNotSubmitted
        );
        assert!("launched".parse::<DoiStatus>().is_err());
    }

    #[test]
    fn transition_to_records_previous_status_only_on_reversion() {
        let lidvid = Lidvid::parse("urn:nasa:pds:thing::1.0").unwrap();
        let mut record = DoiRecord::new(lidvid, "Thing Bundle");
        record.status = DoiStatus::PendingReview;

        record.transition_to(DoiStatus::Draft);
        assert_eq!(record.status, DoiStatus::Draft);
        assert_eq!(record.previous_status, Some(DoiStatus::PendingReview));

        let mut forward = record.clone();
        forward.previous_status = None;
        forward.transition_to(DoiStatus::Reserved);
        assert_eq!(forward.previous_status, None);
    }

    #[test]
    fn filter_matches_on_all_populated_criteria() {
        let lidvid = Lidvid::parse("urn:nasa:pds:thing::1.0").unwrap();
        let record = DoiRecord::new(lidvid.clone(), "Thing Bundle");
        let txn = Transaction::for_record(&record, "img", "ops@node.gov", "input.xml", None);

        assert!(TransactionFilter::default().matches(&txn));
        assert!(TransactionFilter::for_identifier(lidvid).matches(&txn));
        assert!(TransactionFilter::for_title("thing bundle").matches(&txn));

        let mut filter = TransactionFilter::default();
        filter.node = Some("geo".into());
        assert!(!filter.matches(&txn));

        let lid_filter = TransactionFilter {
            lid: Some("urn:nasa:pds:thing".into()),
            ..Default::default()
        };
        assert!(lid_filter.matches(&txn));
    }
}
