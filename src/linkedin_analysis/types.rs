use serde::{Deserialize, Serialize};

// Request body sent to the profile analysis API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProfileAnalysisApiRequest {
    pub linkedin_url: String,
}

// Only `profile_data` is required; the rest of the payload is ignored
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileAnalysisApiResponse {
    pub profile_data: String,
}

// Error body returned by the profile analysis API
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileAnalysisApiError {
    pub error: String,
}
