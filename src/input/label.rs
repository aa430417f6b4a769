//! Structured-label decoding.
//!
//! Reads an XML metadata label describing a data product and lifts the
//! fields the engine cares about into a canonical record. The root element
//! name carries the product type (`Product_Bundle`, `Product_Collection`,
//! ...), which later feeds the title naming-convention check.

use std::path::Path;

use chrono::NaiveDate;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::EngineConfig;
use crate::error::DoiError;
use crate::model::{DoiRecord, Lidvid};

/// Decode a label file from disk.
pub fn decode_file(path: &Path, config: &EngineConfig) -> Result<DoiRecord, DoiError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| DoiError::input_format(path.display().to_string(), err))?;
    decode_str(&content, &path.display().to_string(), config)
}

/// Decode label content already in memory (e.g. fetched from a URL).
pub fn decode_str(
    content: &str,
    origin: &str,
    config: &EngineConfig,
) -> Result<DoiRecord, DoiError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut product_type: Option<String> = None;
    let mut logical_identifier: Option<String> = None;
    let mut version_id: Option<String> = None;
    let mut title: Option<String> = None;
    let mut publication_year: Option<String> = None;
    let mut doi: Option<String> = None;

    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                if product_type.is_none() {
                    // Root element names the product shape: Product_Bundle,
                    // Product_Collection, Product_Observational, ...
                    product_type = Some(
                        name.strip_prefix("Product_")
                            .unwrap_or(name.as_str())
                            .to_ascii_lowercase(),
                    );
                }
                current_tag = name;
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|err| DoiError::input_format(origin, err))?
                    .trim()
                    .to_string();
                if value.is_empty() {
                    continue;
                }
                match current_tag.as_str() {
                    "logical_identifier" if logical_identifier.is_none() => {
                        logical_identifier = Some(value)
                    }
                    "version_id" if version_id.is_none() => version_id = Some(value),
                    "title" if title.is_none() => title = Some(value),
                    "publication_year" if publication_year.is_none() => {
                        publication_year = Some(value)
                    }
                    "doi" if doi.is_none() => doi = Some(value),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current_tag.clear(),
            Ok(Event::Eof) => break,
            Err(err) => return Err(DoiError::input_format(origin, err)),
            Ok(_) => {}
        }
    }

    let lid = logical_identifier
        .ok_or_else(|| DoiError::input_format(origin, "label has no logical_identifier"))?;
    let identifier = match &version_id {
        Some(vid) => Lidvid::parse(&format!("{lid}::{vid}"))?,
        None => Lidvid::parse(&lid)?,
    };
    let title = title.ok_or_else(|| DoiError::input_format(origin, "label has no title"))?;

    let mut record = DoiRecord::new(identifier, title);
    record.doi = doi;
    record.product_type = product_type;
    record.site_url = Some(config.landing_page_for(record.identifier.lid(), version_id.as_deref()));

    if let Some(year) = publication_year {
        let year: i32 = year
            .parse()
            .map_err(|_| DoiError::input_format(origin, format!("bad publication year '{year}'")))?;
        record.publication_date = NaiveDate::from_ymd_opt(year, 1, 1);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LABEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <Product_Bundle>
          <Identification_Area>
            <logical_identifier>urn:nasa:pds:insight_cameras</logical_identifier>
            <version_id>1.0</version_id>
            <title>InSight Cameras Bundle</title>
            <Citation_Information>
              <author_list>Smith, A.; Jones, B.</author_list>
              <publication_year>2020</publication_year>
              <description>Raw and calibrated camera products.</description>
            </Citation_Information>
          </Identification_Area>
        </Product_Bundle>"#;

    #[test]
    fn decodes_identifier_title_and_product_type() {
        let config = EngineConfig::default();
        let record = decode_str(SAMPLE_LABEL, "test", &config).unwrap();

        assert_eq!(
            record.identifier.to_string(),
            "urn:nasa:pds:insight_cameras::1.0"
        );
        assert_eq!(record.title, "InSight Cameras Bundle");
        assert_eq!(record.product_type.as_deref(), Some("bundle"));
        assert_eq!(
            record.publication_date,
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
        let site_url = record.site_url.unwrap();
        assert!(site_url.contains("urn:nasa:pds:insight_cameras"));
        assert!(site_url.contains("1.0"));
    }

    #[test]
    fn label_without_identifier_is_an_input_error() {
        let config = EngineConfig::default();
        let err = decode_str("<Product_Bundle><title>No Id</title></Product_Bundle>", "test", &config)
            .unwrap_err();
        assert!(matches!(err, DoiError::InputFormat { .. }));
    }
}
