use thiserror::Error;

/// Failures that abort a run. Numeric format errors never get here; see
/// `parser::normalize::FormatError`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unexpected page structure at {page}: {detail}")]
    Structural { page: String, detail: String },

    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("GET {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("staged batch is inconsistent: {0}")]
    Integrity(String),
}

impl PipelineError {
    pub fn structural(page: impl Into<String>, detail: impl Into<String>) -> Self {
        PipelineError::Structural {
            page: page.into(),
            detail: detail.into(),
        }
    }
}
