// src/web/errors.rs
use crate::linkedin_analysis::AnalysisError;
use crate::web::types::StandardErrorResponse;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{Request, Response};
use thiserror::Error;
use tracing::error;

/// Error returned by API handlers, rendered as a `StandardErrorResponse`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("No analysis credits left")]
    InsufficientCredits,

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::InsufficientCredits => Status::PaymentRequired,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Analysis(AnalysisError::InvalidUrl(_)) => Status::BadRequest,
            ApiError::Analysis(_) => Status::BadGateway,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::InsufficientCredits => "INSUFFICIENT_CREDITS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Analysis(AnalysisError::InvalidUrl(_)) => "INVALID_PROFILE_URL",
            ApiError::Analysis(AnalysisError::Transport(_)) => "API_UNAVAILABLE",
            ApiError::Analysis(_) => "API_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        let suggestions: &[&str] = match self {
            ApiError::Validation(_) => &["Check the request fields and try again"],
            ApiError::InsufficientCredits => &[
                "Upgrade your plan to keep analyzing profiles",
                "Contact an administrator to top up your credits",
            ],
            ApiError::NotFound(_) => &["Refresh your list of analyses"],
            ApiError::Analysis(AnalysisError::InvalidUrl(_)) => &[
                "Use a profile URL like https://www.linkedin.com/in/<handle>",
                "Company and job pages are not supported",
            ],
            ApiError::Analysis(_) => &[
                "The profile analysis service is temporarily unavailable",
                "Try again in a few moments",
                "No credit was charged for this attempt",
            ],
            ApiError::Internal(_) => &[
                "Try again in a few moments",
                "Contact support if the problem persists",
            ],
        };
        suggestions.iter().map(|s| s.to_string()).collect()
    }

    /// Message shown to clients; internal details stay in the logs
    fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            ApiError::Analysis(AnalysisError::InvalidUrl(_)) => self.to_string(),
            ApiError::Analysis(_) => "Failed to analyze profile".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn to_response(&self) -> StandardErrorResponse {
        StandardErrorResponse::new(
            self.public_message(),
            self.code().to_string(),
            self.suggestions(),
        )
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            error!("{} {} failed: {:?}", req.method(), req.uri(), self);
        }

        Response::build_from(Json(self.to_response()).respond_to(req)?)
            .status(status)
            .ok()
    }
}
