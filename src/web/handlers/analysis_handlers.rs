// src/web/handlers/analysis_handlers.rs

use crate::auth::AuthenticatedUser;
use crate::core::database::{AnalysisRepository, DatabaseConfig};
use crate::linkedin_analysis::ProfileAnalyzer;
use crate::utils::normalize_linkedin_url;
use crate::web::errors::ApiError;
use crate::web::types::{
    ActionResponse, AnalysisData, AnalysisListItem, AnalyzeRequest, DataResponse, DisplayFormat,
    ServerConfig,
};

use rocket::serde::json::Json;
use rocket::State;
use tracing::{info, warn};

pub async fn analyze_profile_handler(
    request: Json<AnalyzeRequest>,
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    analyzer: &State<ProfileAnalyzer>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<AnalysisData>>, ApiError> {
    let linkedin_url = normalize_linkedin_url(&request.linkedin_url)?;

    info!("User {} requested analysis of {}", auth.email(), linkedin_url);

    // Fail before calling the paid API
    if !auth.user().has_credits() {
        warn!("User {} has no credits left", auth.email());
        return Err(ApiError::InsufficientCredits);
    }

    let profile_data = analyzer.analyze_profile(&linkedin_url).await?;

    let pool = db_config.pool()?;
    let charged = AnalysisRepository::new(pool)
        .insert_charging_credit(auth.id(), &linkedin_url, &profile_data)
        .await?
        .ok_or(ApiError::InsufficientCredits)?;

    let record = charged.record;
    let credits_remaining = charged.credits_remaining;
    let data =
        AnalysisData::new(&record, config.section_policy).with_credits_remaining(credits_remaining);
    let display_format = DisplayFormat::lead_summary(&data.summary);

    info!(
        "Analysis {} stored for {} ({} credits left)",
        record.id,
        auth.email(),
        credits_remaining
    );

    Ok(Json(
        DataResponse::success(
            format!("Analysis of {} completed", data.summary.identity.name),
            data,
        )
        .with_display_format(display_format),
    ))
}

pub async fn list_analyses_handler(
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<AnalysisListItem>>>, ApiError> {
    let pool = db_config.pool()?;
    let items: Vec<AnalysisListItem> = AnalysisRepository::new(pool)
        .list_for_user(auth.id())
        .await?
        .iter()
        .map(|record| AnalysisListItem::new(record, config.section_policy))
        .collect();

    Ok(Json(DataResponse::success(
        format!("Found {} analyses", items.len()),
        items,
    )))
}

pub async fn get_analysis_handler(
    id: &str,
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<AnalysisData>>, ApiError> {
    let pool = db_config.pool()?;
    let record = AnalysisRepository::new(pool)
        .find_for_user(id, auth.id())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Analysis {}", id)))?;

    let data = AnalysisData::new(&record, config.section_policy);
    let display_format = DisplayFormat::lead_summary(&data.summary);

    Ok(Json(
        DataResponse::success("Analysis loaded".to_string(), data)
            .with_display_format(display_format),
    ))
}

/// Plain-text summary for "copy full summary"
pub async fn get_analysis_summary_handler(
    id: &str,
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<String, ApiError> {
    let pool = db_config.pool()?;
    let record = AnalysisRepository::new(pool)
        .find_for_user(id, auth.id())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Analysis {}", id)))?;

    Ok(AnalysisData::new(&record, config.section_policy)
        .summary
        .full_text)
}

pub async fn delete_analysis_handler(
    id: &str,
    auth: AuthenticatedUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, ApiError> {
    let pool = db_config.pool()?;
    let deleted = AnalysisRepository::new(pool)
        .delete_for_user(id, auth.id())
        .await?;

    if !deleted {
        return Err(ApiError::NotFound(format!("Analysis {}", id)));
    }

    info!("User {} deleted analysis {}", auth.email(), id);
    Ok(Json(ActionResponse::success(
        format!("Analysis {} deleted", id),
        "analysis_deleted".to_string(),
    )))
}
