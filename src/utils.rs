// src/utils.rs
use crate::linkedin_analysis::AnalysisError;
use reqwest::Url;

/// Validate a LinkedIn profile URL and return its canonical https form.
///
/// Accepts `linkedin.com` and its subdomains with an `/in/<handle>` path;
/// query string, fragment and trailing slash are dropped.
pub fn normalize_linkedin_url(input: &str) -> Result<String, AnalysisError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::InvalidUrl("URL is empty".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| AnalysisError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AnalysisError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| AnalysisError::InvalidUrl(format!("{}: missing host", trimmed)))?;

    if host != "linkedin.com" && !host.ends_with(".linkedin.com") {
        return Err(AnalysisError::InvalidUrl(format!(
            "{} is not a LinkedIn address",
            host
        )));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["in", handle, ..] => Ok(format!("https://{}/in/{}", host, handle)),
        _ => Err(AnalysisError::InvalidUrl(format!(
            "{} is not a profile URL (expected /in/<handle>)",
            trimmed
        ))),
    }
}
