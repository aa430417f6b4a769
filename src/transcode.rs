//! Wire-format transcoding.
//!
//! The registration authority exchanges a container document holding zero or
//! more `<record>` entries, with the workflow status carried as an attribute
//! so the registry's copy reflects lifecycle state and not just the DOI
//! payload. A container may legally hold entries for multiple identifiers;
//! every lookup here filters by identifier.
//!
//! Both directions are deterministic and lossless over the canonical record
//! fields. Parsing skips and reports malformed entries instead of failing
//! the whole document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DoiError;
use crate::model::{DoiRecord, DoiStatus, Lidvid};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The wire container: `<records>` holding zero or more `<record>` entries.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "records")]
pub struct WireDocument {
    #[serde(rename = "record", default)]
    pub records: Vec<WireRecord>,
}

/// One `<record status="...">` entry. Fields are optional on the way in so
/// that a single malformed entry can be reported without poisoning its
/// siblings; [`WireRecord::try_to_record`] enforces what is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRecord {
    #[serde(rename = "@status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsoring_organization: Option<String>,
    #[serde(default)]
    pub related_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Semicolon-delimited keyword list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_record_added: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_record_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WireRecord {
    /// Map a canonical record onto its wire shape.
    pub fn from_record(record: &DoiRecord) -> Self {
        let keywords = if record.keywords.is_empty() {
            None
        } else {
            Some(
                record
                    .keywords
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };

        Self {
            status: record.status.to_string(),
            id: None,
            title: Some(record.title.clone()),
            doi: record.doi.clone(),
            publisher: Some(record.publisher.clone()),
            sponsoring_organization: if record.contributor.is_empty() {
                None
            } else {
                Some(record.contributor.clone())
            },
            related_identifier: Some(record.identifier.to_string()),
            product_type: record.product_type.clone(),
            keywords,
            publication_date: record.publication_date.map(format_date),
            date_record_added: record.date_record_added.map(format_date),
            date_record_updated: record.date_record_updated.map(format_date),
            previous_status: record.previous_status.map(|s| s.to_string()),
            site_url: record.site_url.clone(),
            message: record.message.clone(),
        }
    }

    /// Reconstruct the canonical record, or explain why this entry is
    /// malformed.
    pub fn try_to_record(&self) -> Result<DoiRecord, String> {
        let identifier = self
            .related_identifier
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or("entry is missing its related_identifier")?;
        let identifier =
            Lidvid::parse(identifier).map_err(|err| format!("bad identifier: {err}"))?;

        let title = self
            .title
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| format!("entry for {identifier} is missing its title"))?;

        let status: DoiStatus = self
            .status
            .parse()
            .map_err(|_| format!("entry for {identifier} has unknown status '{}'", self.status))?;

        let previous_status = match self.previous_status.as_deref() {
            Some(raw) => Some(
                raw.parse::<DoiStatus>()
                    .map_err(|_| format!("entry for {identifier} has unknown previous status"))?,
            ),
            None => None,
        };

        let mut record = DoiRecord::new(identifier, title.trim());
        record.doi = self.doi.clone().filter(|s| !s.trim().is_empty());
        record.publisher = self.publisher.clone().unwrap_or_default();
        record.contributor = self.sponsoring_organization.clone().unwrap_or_default();
        record.status = status;
        record.previous_status = previous_status;
        record.product_type = self.product_type.clone();
        record.site_url = self.site_url.clone();
        record.message = self.message.clone();
        record.publication_date = parse_date(self.publication_date.as_deref())?;
        record.date_record_added = parse_date(self.date_record_added.as_deref())?;
        record.date_record_updated = parse_date(self.date_record_updated.as_deref())?;

        if let Some(raw) = &self.keywords {
            record.keywords = raw
                .split(';')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(record)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match raw {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| format!("unparseable date '{raw}'")),
    }
}

/// Build the wire document for a set of records.
pub fn build_document(records: &[DoiRecord]) -> Result<String, DoiError> {
    let document = WireDocument {
        records: records.iter().map(WireRecord::from_record).collect(),
    };
    serialize_document(&document)
}

/// Build a single-entry wire document.
pub fn build_single(record: &DoiRecord) -> Result<String, DoiError> {
    build_document(std::slice::from_ref(record))
}

fn serialize_document(document: &WireDocument) -> Result<String, DoiError> {
    let body = quick_xml::se::to_string(document)
        .map_err(|err| DoiError::Critical(format!("failed to serialize wire document: {err}")))?;
    Ok(format!(r#"<?xml version="1.0" encoding="UTF-8"?>{body}"#))
}

/// Parse a wire document into canonical records plus a list of per-entry
/// transcoding errors. Malformed entries are skipped and reported; a
/// document that is not parseable XML at all is a critical failure.
pub fn parse_document(xml: &str) -> Result<(Vec<DoiRecord>, Vec<String>), DoiError> {
    let document: WireDocument = quick_xml::de::from_str(xml)
        .map_err(|err| DoiError::Critical(format!("failed to parse wire document: {err}")))?;

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for entry in &document.records {
        match entry.try_to_record() {
            Ok(record) => records.push(record),
            Err(reason) => {
                tracing::warn!(%reason, "skipping malformed wire entry");
                errors.push(reason);
            }
        }
    }

    Ok((records, errors))
}

/// Extract the single entry matching `identifier` from a multi-entry
/// document, re-serialized as its own document. Stored documents may hold
/// unrelated identifiers alongside the requested one.
pub fn entry_for_identifier(xml: &str, identifier: &Lidvid) -> Result<String, DoiError> {
    let document: WireDocument = quick_xml::de::from_str(xml)
        .map_err(|err| DoiError::Critical(format!("failed to parse wire document: {err}")))?;

    let wanted = identifier.to_string();
    let matching: Vec<WireRecord> = document
        .records
        .into_iter()
        .filter(|entry| entry.related_identifier.as_deref() == Some(wanted.as_str()))
        .collect();

    if matching.is_empty() {
        return Err(DoiError::UnknownIdentifier(wanted));
    }

    serialize_document(&WireDocument { records: matching })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn sample_record() -> DoiRecord {
        let identifier = Lidvid::parse("urn:nasa:pds:insight_cameras::1.0").unwrap();
        let mut record = DoiRecord::new(identifier, "InSight Cameras Bundle");
        record.doi = Some("10.17189/21734".into());
        record.publisher = "Scientific Data Archive".into();
        record.contributor = "Geosciences".into();
        record.status = DoiStatus::Reserved;
        record.publication_date = NaiveDate::from_ymd_opt(2020, 1, 1);
        record.date_record_added = NaiveDate::from_ymd_opt(2020, 3, 18);
        record.keywords = BTreeSet::from(["mars".to_string(), "camera".to_string()]);
        record
    }

    #[test]
    fn round_trip_preserves_canonical_fields() {
        let record = sample_record();
        let xml = build_single(&record).unwrap();
        let (parsed, errors) = parse_document(&xml).unwrap();

        assert!(errors.is_empty());
        assert_eq!(parsed.len(), 1);
        let back = &parsed[0];
        assert_eq!(back.identifier, record.identifier);
        assert_eq!(back.doi, record.doi);
        assert_eq!(back.title, record.title);
        assert_eq!(back.status, record.status);
        assert_eq!(back.keywords, record.keywords);
        assert_eq!(back.publication_date, record.publication_date);
    }

    #[test]
    fn status_is_an_attribute_of_the_entry() {
        let xml = build_single(&sample_record()).unwrap();
        assert!(xml.contains(r#"<record status="reserved">"#));
    }

    #[test]
    fn malformed_entries_are_skipped_and_reported() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <records>
              <record status="reserved">
                <title>Good Entry Bundle</title>
                <related_identifier>urn:nasa:pds:good::1.0</related_identifier>
              </record>
              <record status="reserved">
                <title>No Identifier Here</title>
              </record>
            </records>"#;

        let (records, errors) = parse_document(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier.to_string(), "urn:nasa:pds:good::1.0");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("related_identifier"));
    }

    #[test]
    fn unparseable_document_is_critical() {
        let err = parse_document("this is not xml <<<").unwrap_err();
        assert!(matches!(err, DoiError::Critical(_)));
    }

    #[test]
    fn entry_extraction_filters_by_identifier() {
        let first = sample_record();
        let mut second = sample_record();
        second.identifier = Lidvid::parse("urn:nasa:pds:other::2.0").unwrap();
        second.title = "Other Collection".into();

        let xml = build_document(&[first, second]).unwrap();

        let wanted = Lidvid::parse("urn:nasa:pds:other::2.0").unwrap();
        let extracted = entry_for_identifier(&xml, &wanted).unwrap();
        let (records, _) = parse_document(&extracted).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, wanted);

        let missing = Lidvid::parse("urn:nasa:pds:absent::1.0").unwrap();
        assert!(matches!(
            entry_for_identifier(&xml, &missing),
            Err(DoiError::UnknownIdentifier(_))
        ));
    }
}
