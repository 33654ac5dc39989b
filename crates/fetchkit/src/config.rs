//! Transport configuration.
//!
//! The controller itself takes no configuration beyond [`RequestInit`];
//! settings here only shape how the bundled transport opens exchanges.
//!
//! [`RequestInit`]: crate::RequestInit

use std::collections::BTreeMap;
use std::path::Path;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default size of upload chunks, and so the granularity of upload progress.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// Settings applied to every exchange opened by a transport provider.
///
/// # Examples
///
/// ```
/// use fetchkit::TransportConfig;
///
/// let config = TransportConfig::from_toml_str(r#"
///     user_agent = "fetchkit-demo/1.0"
///     upload_chunk_size = 4096
///
///     [default_headers]
///     Accept = "application/json"
/// "#).unwrap();
///
/// assert_eq!(config.upload_chunk_size, 4096);
/// assert_eq!(config.default_headers["Accept"], "application/json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// `User-Agent` sent with every request.
    pub user_agent: Option<String>,

    /// Headers sent before the per-request headers.
    pub default_headers: BTreeMap<String, String>,

    /// Upload chunk size in bytes. Zero is treated as one.
    pub upload_chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            default_headers: BTreeMap::new(),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

impl TransportConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.upload_chunk_size = size;
        self
    }

    /// `default_headers` as a header map, validating every name and value.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(self.default_headers.len());
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("header '{name}' value: {e}")))?;
            headers.append(name, value);
        }
        Ok(headers)
    }

    /// Chunk size with the zero case clamped.
    pub fn effective_chunk_size(&self) -> usize {
        self.upload_chunk_size.max(1)
    }
}
