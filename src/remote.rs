use std::io::Read;

use reqwest::blocking::Client;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::http::{build_client, declared_length};

/// An opened download: the declared length and a reader over the body.
pub struct RemoteBody {
    pub content_length: Option<u64>,
    pub reader: Box<dyn Read + Send>,
}

impl RemoteBody {
    pub fn new(content_length: Option<u64>, reader: impl Read + Send + 'static) -> Self {
        Self {
            content_length,
            reader: Box::new(reader),
        }
    }
}

/// Access to the documents a catalog links to.
pub trait RemoteClient: Send + Sync {
    /// Metadata-only request. Returns the declared content length, if any.
    fn probe(&self, url: &str) -> Result<Option<u64>, SyncError>;
    /// Starts a GET and returns once the status line has been checked.
    fn open(&self, url: &str) -> Result<RemoteBody, SyncError>;
}

#[derive(Clone)]
pub struct RemoteHttpClient {
    client: Client,
}

impl RemoteHttpClient {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

impl RemoteClient for RemoteHttpClient {
    fn probe(&self, url: &str) -> Result<Option<u64>, SyncError> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|err| SyncError::ProbeHttp {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SyncError::ProbeStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(declared_length(response.headers()))
    }

    fn open(&self, url: &str) -> Result<RemoteBody, SyncError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SyncError::TransferHttp {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SyncError::TransferStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let content_length = declared_length(response.headers());
        Ok(RemoteBody::new(content_length, response))
    }
}
