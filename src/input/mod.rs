//! Input ingestion.
//!
//! All input polymorphism is resolved once at this boundary into a tagged
//! [`InputSource`]; nothing downstream inspects strings for extensions or
//! URL prefixes. Directory inputs expand non-recursively into per-file
//! inputs; unsupported extensions are skipped with a logged notice since
//! partial success is expected when an operator points the tool at a mixed
//! directory.

pub mod label;
pub mod tabular;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use url::Url;

use crate::config::EngineConfig;
use crate::error::DoiError;
use crate::model::DoiRecord;

/// A resolved input descriptor.
#[derive(Debug, Clone)]
pub enum InputSource {
    LocalFile(PathBuf),
    LocalDirectory(PathBuf),
    RemoteUrl(Url),
    /// Pre-parsed tabular rows handed over by a façade (column → value).
    TabularBatch(Vec<BTreeMap<String, String>>),
}

impl InputSource {
    /// Classify a caller-supplied location string exactly once.
    pub fn resolve(location: &str) -> Result<Self, DoiError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(DoiError::input_format(location, "empty input location"));
        }

        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|err| DoiError::input_format(location, err))?;
            return Ok(InputSource::RemoteUrl(url));
        }

        let path = Path::new(location);
        if path.is_dir() {
            Ok(InputSource::LocalDirectory(path.to_path_buf()))
        } else if path.is_file() {
            Ok(InputSource::LocalFile(path.to_path_buf()))
        } else {
            Err(DoiError::input_format(location, "no such file or directory"))
        }
    }

    /// Stable description recorded as a transaction's input location.
    pub fn describe(&self) -> String {
        match self {
            InputSource::LocalFile(path) | InputSource::LocalDirectory(path) => {
                path.display().to_string()
            }
            InputSource::RemoteUrl(url) => url.to_string(),
            InputSource::TabularBatch(rows) => format!("tabular batch ({} rows)", rows.len()),
        }
    }
}

/// Turns input sources into lists of canonical records.
pub struct Ingestor<'a> {
    config: &'a EngineConfig,
    http: reqwest::Client,
}

impl<'a> Ingestor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Expand a source into per-file inputs. Directories expand
    /// non-recursively, in name order; everything else passes through.
    pub fn expand(&self, source: &InputSource) -> Result<Vec<InputSource>, DoiError> {
        match source {
            InputSource::LocalDirectory(dir) => {
                let mut files = Vec::new();
                for entry in std::fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.is_file() {
                        files.push(path);
                    }
                }
                files.sort();
                Ok(files.into_iter().map(InputSource::LocalFile).collect())
            }
            other => Ok(vec![other.clone()]),
        }
    }

    /// Read one source into records. A file with an unsupported extension
    /// yields an empty list (with a logged notice), letting the caller's
    /// partial-success policy decide what that means.
    pub async fn read(&self, source: &InputSource) -> Result<Vec<DoiRecord>, DoiError> {
        match source {
            InputSource::LocalFile(path) => self.read_file(path),
            InputSource::LocalDirectory(_) => {
                // expand() only ever yields files, so no recursion is needed.
                let mut records = Vec::new();
                for file in self.expand(source)? {
                    if let InputSource::LocalFile(path) = file {
                        records.extend(self.read_file(&path)?);
                    }
                }
                Ok(records)
            }
            InputSource::RemoteUrl(url) => {
                tracing::info!(%url, "fetching remote label");
                let content = self
                    .http
                    .get(url.clone())
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                Ok(vec![label::decode_str(&content, url.as_str(), self.config)?])
            }
            InputSource::TabularBatch(rows) => tabular::records_from_rows(rows, "tabular batch"),
        }
    }

    /// Read a full source and require it to produce at least one record.
    pub async fn ingest(&self, source: &InputSource) -> Result<Vec<DoiRecord>, DoiError> {
        let records = self.read(source).await?;
        if records.is_empty() {
            return Err(DoiError::input_format(
                source.describe(),
                "input produced no records",
            ));
        }
        Ok(records)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<DoiRecord>, DoiError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("xml") => Ok(vec![label::decode_file(path, self.config)?]),
            Some("csv") => tabular::decode_csv(path),
            _ => {
                tracing::warn!(
                    path = %path.display(),
                    "file skipped, only .xml and .csv inputs are supported"
                );
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LABEL: &str = r#"<Product_Bundle>
        <Identification_Area>
          <logical_identifier>urn:nasa:pds:sample</logical_identifier>
          <version_id>1.0</version_id>
          <title>Sample Bundle</title>
        </Identification_Area>
      </Product_Bundle>"#;

    #[tokio::test]
    async fn directory_expands_and_skips_unsupported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("label.xml"), LABEL).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a label").unwrap();

        let config = EngineConfig::default();
        let ingestor = Ingestor::new(&config);
        let source = InputSource::LocalDirectory(dir.path().to_path_buf());

        let records = ingestor.ingest(&source).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Sample Bundle");
    }

    #[tokio::test]
    async fn empty_yield_is_an_error_for_ingest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a label").unwrap();

        let config = EngineConfig::default();
        let ingestor = Ingestor::new(&config);
        let source = InputSource::LocalDirectory(dir.path().to_path_buf());

        let err = ingestor.ingest(&source).await.unwrap_err();
        assert!(matches!(err, DoiError::InputFormat { .. }));
    }

    #[test]
    fn resolve_classifies_once_at_the_boundary() {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(LABEL.as_bytes()).unwrap();

        assert!(matches!(
            InputSource::resolve(file.path().to_str().unwrap()),
            Ok(InputSource::LocalFile(_))
        ));
        assert!(matches!(
            InputSource::resolve("https://example.gov/label.xml"),
            Ok(InputSource::RemoteUrl(_))
        ));
        assert!(matches!(
            InputSource::resolve("/definitely/not/here.xml"),
            Err(DoiError::InputFormat { .. })
        ));
    }
}
