use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use testsmith_core::PipelineError;

/// Error returned by HTTP handlers.
///
/// Messages here are what callers see. Internal detail (which upstream call failed
/// and why) is logged when the error is built and never serialised.
#[derive(Debug)]
pub enum AppError {
    /// No live session credential
    Unauthenticated,
    /// Missing or empty request fields
    Validation(String),
    /// Repository or default branch could not be resolved
    NotFound(String),
    /// Hosting platform call failed
    Upstream(String),
    /// Generation service failed or returned unusable output
    Generation(String),
    /// Publish failed and left a branch behind
    PartiallyPublished { message: String, branch: String },
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
    meta: ErrorMeta,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorMeta {
    request_id: String,
}

impl AppError {
    /// Converts a pipeline failure into a caller-facing error, logging the detail.
    ///
    /// `context` is the generic message used for server-side failures.
    pub fn from_pipeline(err: PipelineError, context: &str) -> Self {
        tracing::error!(error = %err, detail = ?err, context, "Request failed");
        match err {
            PipelineError::Unauthenticated => Self::Unauthenticated,
            PipelineError::InvalidRequest(msg) => Self::Validation(msg),
            PipelineError::NotFound(_) => Self::NotFound(context.to_string()),
            PipelineError::Upstream(_)
            | PipelineError::PartialFetch { .. }
            | PipelineError::PublishFailed { .. } => Self::Upstream(context.to_string()),
            PipelineError::Generation(_) => Self::Generation(context.to_string()),
            PipelineError::PartiallyPublished { branch, .. } => Self::PartiallyPublished {
                message: context.to_string(),
                branch,
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Validation(_) => "INVALID_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Generation(_) => "GENERATION_ERROR",
            Self::PartiallyPublished { .. } => "PARTIALLY_PUBLISHED",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::PartiallyPublished { branch, .. } => {
                Some(serde_json::json!({ "orphanedBranch": branch }))
            }
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Not authenticated"),
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Upstream(msg)
            | Self::Generation(msg) => write!(f, "{msg}"),
            Self::PartiallyPublished { message, branch } => {
                write!(f, "{message} Branch {branch} was left behind and must be deleted manually.")
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            error: ErrorBody {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
            meta: ErrorMeta {
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        };

        match self {
            Self::Unauthenticated => HttpResponse::Unauthorized().json(error_response),
            Self::Validation(_) => HttpResponse::BadRequest().json(error_response),
            Self::NotFound(_) => HttpResponse::NotFound().json(error_response),
            Self::Upstream(_)
            | Self::Generation(_)
            | Self::PartiallyPublished { .. } => {
                HttpResponse::InternalServerError().json(error_response)
            }
        }
    }
}
