//! Registration service client.
//!
//! Boundary-only: sends a wire document to the remote registration authority
//! and hands back whatever it returns. Per-entry errors from the remote side
//! are propagated in the response rather than raised, since the registry may
//! accept a submission with caveats. There is no retry here — resubmission
//! must not double-register a DOI, so a transient failure surfaces to the
//! caller.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::Credentials;
use crate::error::DoiError;
use crate::model::DoiRecord;
use crate::transcode;

/// What came back from a submission: the registry's own copy of the records
/// (the authority on assigned DOI strings), its raw document, and any
/// per-entry error messages it reported.
#[derive(Debug)]
pub struct RegistryResponse {
    pub records: Vec<DoiRecord>,
    pub document: String,
    pub errors: Vec<String>,
}

/// Submission seam between the engine and the remote registry.
#[async_trait]
pub trait RegistrationClient: Send + Sync {
    async fn submit(
        &self,
        document: &str,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<RegistryResponse, DoiError>;
}

/// HTTP implementation over the registration authority's records endpoint.
pub struct HttpRegistrationClient {
    http: reqwest::Client,
}

impl HttpRegistrationClient {
    pub fn new() -> Result<Self, DoiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RegistrationClient for HttpRegistrationClient {
    async fn submit(
        &self,
        document: &str,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<RegistryResponse, DoiError> {
        tracing::info!(endpoint, "submitting wire document to registration service");

        let response = self
            .http
            .post(endpoint)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header("Content-Type", "application/xml")
            .header("Accept", "application/xml")
            .body(document.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(DoiError::Critical(format!(
                "registration service returned {status}: {snippet}"
            )));
        }

        let (records, errors) = transcode::parse_document(&body)?;

        // Caveat messages the registry attached to individual entries count
        // as errors for the caller's aggregation, alongside parse failures.
        let mut errors = errors;
        for record in &records {
            if let Some(message) = &record.message {
                if !message.trim().is_empty() {
                    errors.push(format!("{}: {}", record.identifier, message));
                }
            }
        }

        Ok(RegistryResponse {
            records,
            document: body,
            errors,
        })
    }
}
