use std::fmt;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_TITLE: &str = "untitled";
pub const DEFAULT_PUBLICATION_YEAR: &str = "unknown";

const PDF_MARKER: &str = ".pdf";

static RESERVED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("reserved character class is valid"));

/// One record of the remote catalog, reduced to the fields the sync needs.
///
/// `null` and wrongly typed values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub link: Option<String>,
    pub title: Option<String>,
    pub publication_year: Option<String>,
}

impl CatalogEntry {
    pub fn from_value(value: &Value) -> Self {
        let link = value
            .get("link")
            .and_then(|value| value.as_str())
            .map(|value| value.to_string());
        let title = value
            .get("title")
            .and_then(|value| value.as_str())
            .map(|value| value.to_string());
        let publication_year = value.get("publication_year").and_then(|value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        });
        Self {
            link,
            title,
            publication_year,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.link.as_deref().is_some_and(is_pdf_link)
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn publication_year_or_default(&self) -> &str {
        self.publication_year
            .as_deref()
            .unwrap_or(DEFAULT_PUBLICATION_YEAR)
    }

    /// `<sanitized title> <sanitized year>.pdf`
    pub fn file_name(&self) -> String {
        let stem = format!(
            "{} {}",
            sanitize_filename(self.title_or_default()),
            sanitize_filename(self.publication_year_or_default())
        );
        format!("{}.pdf", stem.trim())
    }

    /// Builds the download target, or `None` when the entry is not a PDF.
    pub fn target(&self, download_dir: &Utf8Path) -> Option<DownloadTarget> {
        if !self.is_eligible() {
            return None;
        }
        let remote_url = self.link.clone()?;
        let file_name = self.file_name();
        Some(DownloadTarget {
            remote_url,
            local_path: download_dir.join(&file_name),
            file_name,
        })
    }
}

pub fn is_pdf_link(link: &str) -> bool {
    !link.is_empty() && link.to_lowercase().contains(PDF_MARKER)
}

/// Removes characters that are reserved in file names and trims the result.
pub fn sanitize_filename(name: &str) -> String {
    RESERVED_CHARS.replace_all(name, "").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTarget {
    pub remote_url: String,
    pub file_name: String,
    pub local_path: Utf8PathBuf,
}

impl fmt::Display for DownloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.file_name, self.remote_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DownloadOutcome {
    Skipped,
    Downloaded { bytes: u64 },
    Failed { reason: String },
}

impl DownloadOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DownloadOutcome::Skipped => "skipped",
            DownloadOutcome::Downloaded { .. } => "downloaded",
            DownloadOutcome::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_reserved_and_trims() {
        assert_eq!(sanitize_filename("  My: Title?  "), "My Title");
        assert_eq!(sanitize_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
    }

    #[test]
    fn pdf_marker_is_case_insensitive_substring() {
        assert!(is_pdf_link("http://x/a.PDF"));
        assert!(is_pdf_link("http://x/a.pdf?download=1"));
        assert!(!is_pdf_link("http://x/a.txt"));
        assert!(!is_pdf_link(""));
    }
}
