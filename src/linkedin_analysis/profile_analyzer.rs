use super::types::{ProfileAnalysisApiError, ProfileAnalysisApiRequest, ProfileAnalysisApiResponse};
use super::AnalysisError;
use crate::core::config_manager::ServiceConfig;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use tracing::{error, info, warn};

/// Client for the third-party LinkedIn profile analysis API
pub struct ProfileAnalyzer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl ProfileAnalyzer {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        if config.analysis_api_key.is_none() {
            warn!("No ANALYSIS_API_KEY configured, calling analysis API without credentials");
        }

        Ok(Self {
            client,
            api_url: config.analysis_api_url.clone(),
            api_key: config.analysis_api_key.clone(),
        })
    }

    /// Send a normalized profile URL and return the raw `profile_data` text
    pub async fn analyze_profile(&self, linkedin_url: &str) -> Result<String, AnalysisError> {
        let request_body = ProfileAnalysisApiRequest {
            linkedin_url: linkedin_url.to_string(),
        };

        info!("Calling profile analysis API for {}", linkedin_url);

        let mut request = self.client.post(&self.api_url).json(&request_body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        let profile_data = parse_api_response(status, &response_text)?;
        info!(
            "Received {} bytes of profile data for {}",
            profile_data.len(),
            linkedin_url
        );
        Ok(profile_data)
    }
}

pub(crate) fn parse_api_response(status: StatusCode, body: &str) -> Result<String, AnalysisError> {
    if !status.is_success() {
        let message = match serde_json::from_str::<ProfileAnalysisApiError>(body) {
            Ok(api_error) => api_error.error,
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => body.trim().to_string(),
        };

        error!("Profile analysis API error {}: {}", status, message);
        return Err(AnalysisError::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str::<ProfileAnalysisApiResponse>(body)
        .map(|response| response.profile_data)
        .map_err(|e| {
            error!("Failed to parse profile analysis response: {}", e);
            AnalysisError::MalformedResponse(e.to_string())
        })
}
