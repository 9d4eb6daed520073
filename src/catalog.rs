use camino::Utf8Path;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::SyncConfig;
use crate::domain::{CatalogEntry, DownloadTarget};
use crate::error::SyncError;
use crate::http::build_client;

/// The raw catalog listing, in response order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<Value>,
}

impl Catalog {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, SyncError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|err| SyncError::CatalogParse(err.to_string()))?;
        match value {
            Value::Array(records) => Ok(Self { records }),
            other => Err(SyncError::CatalogParse(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = CatalogEntry> + '_ {
        self.records.iter().map(CatalogEntry::from_value)
    }

    pub fn eligible_entries(&self) -> Vec<CatalogEntry> {
        self.entries().filter(CatalogEntry::is_eligible).collect()
    }

    pub fn targets(&self, download_dir: &Utf8Path) -> Vec<DownloadTarget> {
        self.entries()
            .filter_map(|entry| entry.target(download_dir))
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub trait CatalogClient: Send + Sync {
    fn fetch(&self) -> Result<Catalog, SyncError>;
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    url: String,
}

impl CatalogHttpClient {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(Self {
            client: build_client(config)?,
            url: config.catalog_url.clone(),
        })
    }
}

impl CatalogClient for CatalogHttpClient {
    fn fetch(&self) -> Result<Catalog, SyncError> {
        tracing::debug!(url = %self.url, "fetching catalog");
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|err| SyncError::CatalogHttp {
                url: self.url.clone(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SyncError::CatalogStatus {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }
        let body = response.bytes().map_err(|err| SyncError::CatalogHttp {
            url: self.url.clone(),
            message: err.to_string(),
        })?;
        Catalog::from_slice(&body)
    }
}
