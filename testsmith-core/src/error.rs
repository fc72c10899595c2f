//! Error taxonomy for the pipeline.
//!
//! Collaborator implementations report [`HostingError`] and [`GenerationError`];
//! the pipeline stages translate those into [`PipelineError`], which is what the
//! HTTP layer maps onto status codes.

use crate::publish::PublishStep;

/// Failure talking to the hosting platform.
#[derive(Debug, thiserror::Error)]
pub enum HostingError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("hosting API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode hosting API response: {0}")]
    Decode(String),

    #[error("invalid hosting API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl HostingError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostingError::Status { status: 404, .. })
    }
}

/// Failure talking to the text generation service, or an unusable answer from it.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation service returned no text")]
    Empty,

    #[error("generation output rejected: {0}")]
    Malformed(String),
}

/// Every way an orchestrated operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream error: {0}")]
    Upstream(#[source] HostingError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("fetching blob {blob_id} failed: {source}")]
    PartialFetch {
        blob_id: String,
        #[source]
        source: HostingError,
    },

    #[error("publish failed at {step}: {source}")]
    PublishFailed {
        step: PublishStep,
        #[source]
        source: HostingError,
    },

    #[error("publish failed at {step} and branch {branch} could not be removed: {source}")]
    PartiallyPublished {
        branch: String,
        step: PublishStep,
        #[source]
        source: HostingError,
    },
}

impl From<HostingError> for PipelineError {
    fn from(e: HostingError) -> Self {
        PipelineError::Upstream(e)
    }
}
