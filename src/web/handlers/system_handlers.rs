// src/web/handlers/system_handlers.rs
use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::web::types::{DataResponse, UserInfo};

use rocket::serde::json::Json;
use tracing::info;

pub async fn get_current_user_handler(auth: AuthenticatedUser) -> Json<DataResponse<UserInfo>> {
    let user = auth.user();

    Json(DataResponse::success(
        format!("{} credits available", user.credits),
        UserInfo::from(user),
    ))
}

pub async fn health_handler(auth: OptionalAuth) -> Json<&'static str> {
    if let Some(user) = auth.user {
        info!("Health check by authenticated user: {}", user.email());
    } else {
        info!("Health check by anonymous user");
    }
    Json("OK")
}
