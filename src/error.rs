use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("catalog request to {url} failed: {message}")]
    CatalogHttp { url: String, message: String },

    #[error("catalog {url} returned status {status}")]
    CatalogStatus { url: String, status: u16 },

    #[error("failed to parse catalog: {0}")]
    #[diagnostic(help("the catalog endpoint must return a JSON array of records"))]
    CatalogParse(String),

    #[error("HEAD request for {url} failed: {message}")]
    ProbeHttp { url: String, message: String },

    #[error("HEAD request for {url} returned status {status}")]
    ProbeStatus { url: String, status: u16 },

    #[error("download of {url} failed: {message}")]
    TransferHttp { url: String, message: String },

    #[error("download of {url} returned status {status}")]
    TransferStatus { url: String, status: u16 },

    #[error("reading body of {url} failed after {received} bytes: {message}")]
    TransferRead {
        url: String,
        received: u64,
        message: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Errors raised while obtaining the catalog; these end the run.
    pub fn is_catalog(&self) -> bool {
        matches!(
            self,
            SyncError::CatalogHttp { .. }
                | SyncError::CatalogStatus { .. }
                | SyncError::CatalogParse(_)
        )
    }
}
