//! Engine configuration.
//!
//! The engine consumes this surface but does not own how it is loaded; a
//! façade may populate it from a file, environment, or request context.

use serde::{Deserialize, Serialize};

/// Credentials for the registration endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Configuration consumed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Registration service endpoint URL.
    pub endpoint: String,
    pub credentials: Credentials,
    /// Landing-page URL template; `{lid}` and `{vid}` are substituted when
    /// building records from labels.
    pub landing_page_template: String,
    /// Publisher name stamped into every record.
    pub publisher: String,
    /// Run the wire-schema pass on each draft document.
    pub validate_draft_schema: bool,
    /// Run the wire-schema pass on each reserve document.
    pub validate_reserve_schema: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://registry.example.gov/iad2/api/records".to_string(),
            credentials: Credentials::default(),
            landing_page_template:
                "https://data.example.gov/ds-view/urn?identifier={lid}&version={vid}".to_string(),
            publisher: "Scientific Data Archive".to_string(),
            validate_draft_schema: true,
            validate_reserve_schema: true,
        }
    }
}

impl EngineConfig {
    /// Populate endpoint and credentials from the environment, falling back
    /// to defaults for anything unset. Variables: `DOI_ENDPOINT`,
    /// `DOI_USERNAME`, `DOI_PASSWORD`, `DOI_PUBLISHER`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("DOI_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(username) = std::env::var("DOI_USERNAME") {
            config.credentials.username = username;
        }
        if let Ok(password) = std::env::var("DOI_PASSWORD") {
            config.credentials.password = password;
        }
        if let Ok(publisher) = std::env::var("DOI_PUBLISHER") {
            config.publisher = publisher;
        }
        config
    }

    /// Render the landing-page URL for an identifier.
    pub fn landing_page_for(&self, lid: &str, vid: Option<&str>) -> String {
        self.landing_page_template
            .replace("{lid}", lid)
            .replace("{vid}", vid.unwrap_or(""))
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn validate_draft_schema(mut self, enabled: bool) -> Self {
        self.validate_draft_schema = enabled;
        self
    }

    pub fn validate_reserve_schema(mut self, enabled: bool) -> Self {
        self.validate_reserve_schema = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_page_substitutes_both_segments() {
        let config = EngineConfig::default();
        let url = config.landing_page_for("urn:nasa:pds:thing", Some("1.0"));
        assert!(url.contains("identifier=urn:nasa:pds:thing"));
        assert!(url.contains("version=1.0"));
    }

    #[test]
    fn builder_setters_apply() {
        let config = EngineConfig::default()
            .endpoint("https://other.example.gov")
            .validate_draft_schema(false);
        assert_eq!(config.endpoint, "https://other.example.gov");
        assert!(!config.validate_draft_schema);
        assert!(config.validate_reserve_schema);
    }
}
