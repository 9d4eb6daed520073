use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue, USER_AGENT};

use crate::config::SyncConfig;
use crate::error::SyncError;

pub fn build_client(config: &SyncConfig) -> Result<Client, SyncError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|err| SyncError::InvalidConfig(format!("user agent: {err}")))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(config.timeout())
        .build()
        .map_err(|err| SyncError::InvalidConfig(format!("http client: {err}")))
}

/// Reads `Content-Length` from the headers. `Response::content_length` is not
/// used because it reports the body size hint, which is 0 for HEAD responses.
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}
