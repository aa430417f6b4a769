//! Tabular decoding.
//!
//! Reserve batches arrive as CSV files (or pre-parsed rows from a façade)
//! with a fixed mandatory column set. A missing column or an empty batch is
//! an input-format error, never a silent no-op.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::DoiError;
use crate::model::{DoiRecord, Lidvid};

/// Columns every tabular input must carry.
pub const MANDATORY_COLUMNS: &[&str] = &[
    "status",
    "title",
    "publication_date",
    "product_type_specific",
    "author_last_name",
    "author_first_name",
    "related_resource",
];

/// Decode a CSV file into canonical records.
pub fn decode_csv(path: &Path) -> Result<Vec<DoiRecord>, DoiError> {
    let origin = path.display().to_string();
    let mut reader =
        csv::Reader::from_path(path).map_err(|err| DoiError::input_format(&origin, err))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| DoiError::input_format(&origin, err))?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    for column in MANDATORY_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DoiError::input_format(
                &origin,
                format!("missing mandatory column '{column}'"),
            ));
        }
    }

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result.map_err(|err| {
            DoiError::input_format(&origin, format!("row {}: {}", index + 2, err))
        })?;
        let map: BTreeMap<String, String> = headers
            .iter()
            .cloned()
            .zip(row.iter().map(|cell| cell.trim().to_string()))
            .collect();
        rows.push(map);
    }

    records_from_rows(&rows, &origin)
}

/// Convert pre-parsed rows (column name → cell value) into records.
pub fn records_from_rows(
    rows: &[BTreeMap<String, String>],
    origin: &str,
) -> Result<Vec<DoiRecord>, DoiError> {
    if rows.is_empty() {
        return Err(DoiError::input_format(
            origin,
            "tabular input produced no records",
        ));
    }

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        records.push(record_from_row(row, origin, index + 1)?);
    }
    Ok(records)
}

fn field<'a>(row: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    row.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

fn record_from_row(
    row: &BTreeMap<String, String>,
    origin: &str,
    line: usize,
) -> Result<DoiRecord, DoiError> {
    for column in MANDATORY_COLUMNS {
        if !row.contains_key(*column) {
            return Err(DoiError::input_format(
                origin,
                format!("row {line}: missing mandatory column '{column}'"),
            ));
        }
    }

    let identifier = field(row, "related_resource").ok_or_else(|| {
        DoiError::input_format(origin, format!("row {line}: empty related_resource"))
    })?;
    let identifier = Lidvid::parse(identifier)?;

    let title = field(row, "title")
        .ok_or_else(|| DoiError::input_format(origin, format!("row {line}: empty title")))?;

    let mut record = DoiRecord::new(identifier, title);

    if let Some(status) = field(row, "status") {
        record.status = status.parse()?;
    }

    if let Some(date) = field(row, "publication_date") {
        record.publication_date = Some(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                DoiError::input_format(
                    origin,
                    format!("row {line}: unparseable publication_date '{date}'"),
                )
            })?,
        );
    }

    // Product-type column is free text ("PDS4 Refereed Data Bundle"); the
    // trailing token is the shape the title convention check cares about.
    if let Some(product) = field(row, "product_type_specific") {
        record.product_type = product
            .split_whitespace()
            .last()
            .map(|token| token.to_ascii_lowercase());
    }

    if let Some(doi) = field(row, "doi") {
        record.doi = Some(doi.to_string());
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DoiStatus;
    use std::io::Write;

    const HEADER: &str =
        "status,title,publication_date,product_type_specific,author_last_name,author_first_name,related_resource";

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn decodes_rows_into_records() {
        let csv = format!(
            "{HEADER}\n\
             reserved,Mars Weather Bundle,2020-03-18,PDS4 Bundle,Smith,Anna,urn:nasa:pds:mars_weather::1.0\n\
             reserved,Mars Wind Collection,2020-03-18,PDS4 Collection,Jones,Ben,urn:nasa:pds:mars_wind::1.0\n"
        );
        let file = write_csv(&csv);

        let records = decode_csv(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, DoiStatus::Reserved);
        assert_eq!(records[0].product_type.as_deref(), Some("bundle"));
        assert_eq!(
            records[1].identifier.to_string(),
            "urn:nasa:pds:mars_wind::1.0"
        );
    }

    #[test]
    fn missing_mandatory_column_is_rejected() {
        let csv = "status,title\nreserved,Nameless\n";
        let file = write_csv(csv);
        let err = decode_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("publication_date"));
    }

    #[test]
    fn empty_batch_is_an_error_not_a_no_op() {
        let file = write_csv(&format!("{HEADER}\n"));
        let err = decode_csv(file.path()).unwrap_err();
        assert!(matches!(err, DoiError::InputFormat { .. }));
    }
}
