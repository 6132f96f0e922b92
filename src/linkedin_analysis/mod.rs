// src/linkedin_analysis/mod.rs
use thiserror::Error;

pub mod profile_analyzer;
pub(crate) mod types;

pub use profile_analyzer::ProfileAnalyzer;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid LinkedIn profile URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to reach profile analysis API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Profile analysis API error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Unexpected profile analysis API response: {0}")]
    MalformedResponse(String),
}
