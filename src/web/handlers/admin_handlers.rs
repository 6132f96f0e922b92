// src/web/handlers/admin_handlers.rs

use crate::auth::AdminUser;
use crate::core::database::{DatabaseConfig, Plan, User, UserRepository, UserRole};
use crate::web::errors::ApiError;
use crate::web::types::{DataResponse, SetCreditsRequest, SetPlanRequest, SetRoleRequest, UserInfo};

use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

pub async fn list_users_handler(
    admin: AdminUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<UserInfo>>>, ApiError> {
    let pool = db_config.pool()?;
    let users: Vec<UserInfo> = UserRepository::new(pool)
        .list()
        .await?
        .iter()
        .map(UserInfo::from)
        .collect();

    info!("Admin {} listed {} users", admin.user().email, users.len());
    Ok(Json(DataResponse::success(
        format!("Found {} users", users.len()),
        users,
    )))
}

pub async fn set_credits_handler(
    request: Json<SetCreditsRequest>,
    admin: AdminUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<UserInfo>>, ApiError> {
    if request.credits < 0 {
        return Err(ApiError::Validation(format!(
            "Credits cannot be negative: {}",
            request.credits
        )));
    }

    let pool = db_config.pool()?;
    let user = UserRepository::new(pool)
        .set_credits(&request.user_id, request.credits)
        .await?;

    updated_user(admin, &request.user_id, user, format!("credits = {}", request.credits))
}

pub async fn set_role_handler(
    request: Json<SetRoleRequest>,
    admin: AdminUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<UserInfo>>, ApiError> {
    let role: UserRole = request
        .role
        .parse()
        .map_err(|e: anyhow::Error| ApiError::Validation(e.to_string()))?;

    let pool = db_config.pool()?;
    let user = UserRepository::new(pool)
        .set_role(&request.user_id, role)
        .await?;

    updated_user(admin, &request.user_id, user, format!("role = {}", role))
}

pub async fn set_plan_handler(
    request: Json<SetPlanRequest>,
    admin: AdminUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<UserInfo>>, ApiError> {
    let plan: Plan = request
        .plan
        .parse()
        .map_err(|e: anyhow::Error| ApiError::Validation(e.to_string()))?;

    let pool = db_config.pool()?;
    let user = UserRepository::new(pool)
        .set_plan(&request.user_id, plan)
        .await?;

    updated_user(admin, &request.user_id, user, format!("plan = {}", plan))
}

fn updated_user(
    admin: AdminUser,
    user_id: &str,
    user: Option<User>,
    change: String,
) -> Result<Json<DataResponse<UserInfo>>, ApiError> {
    let user = user.ok_or_else(|| ApiError::NotFound(format!("User {}", user_id)))?;

    info!("Admin {} set {} for {}", admin.user().email, change, user.email);
    Ok(Json(DataResponse::success(
        format!("Updated {} for {}", change, user.email),
        UserInfo::from(&user),
    )))
}
