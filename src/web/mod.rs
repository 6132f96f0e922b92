// src/web/mod.rs

pub mod errors;
pub mod handlers;
pub mod types;

pub use errors::ApiError;
pub use types::*;

use crate::auth::{AdminUser, AuthConfig, AuthenticatedUser, OptionalAuth};
use crate::core::config_manager::ConfigManager;
use crate::core::database::DatabaseConfig;
use crate::linkedin_analysis::ProfileAnalyzer;
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, delete, get, options, post, routes, Build, Request, Response, Rocket, State};
use tracing::{error, info};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

// Analysis routes

#[post("/analyze", data = "<request>")]
pub async fn analyze_profile(
    request: Json<AnalyzeRequest>,
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    analyzer: &State<ProfileAnalyzer>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<AnalysisData>>, ApiError> {
    handlers::analyze_profile_handler(request, auth, config, analyzer, db_config).await
}

#[get("/analyses")]
pub async fn list_analyses(
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<AnalysisListItem>>>, ApiError> {
    handlers::list_analyses_handler(auth, config, db_config).await
}

#[get("/analyses/<id>")]
pub async fn get_analysis(
    id: &str,
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<AnalysisData>>, ApiError> {
    handlers::get_analysis_handler(id, auth, config, db_config).await
}

#[get("/analyses/<id>/summary")]
pub async fn get_analysis_summary(
    id: &str,
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<String, ApiError> {
    handlers::get_analysis_summary_handler(id, auth, config, db_config).await
}

#[delete("/analyses/<id>")]
pub async fn delete_analysis(
    id: &str,
    auth: AuthenticatedUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::delete_analysis_handler(id, auth, db_config).await
}

// Account routes

#[get("/me")]
pub async fn get_current_user(auth: AuthenticatedUser) -> Json<DataResponse<UserInfo>> {
    handlers::get_current_user_handler(auth).await
}

#[get("/health")]
pub async fn health(auth: OptionalAuth) -> Json<&'static str> {
    handlers::health_handler(auth).await
}

// Admin routes

#[get("/admin/users")]
pub async fn list_users(
    admin: AdminUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<UserInfo>>>, ApiError> {
    handlers::list_users_handler(admin, db_config).await
}

#[post("/admin/credits", data = "<request>")]
pub async fn set_credits(
    request: Json<SetCreditsRequest>,
    admin: AdminUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<UserInfo>>, ApiError> {
    handlers::set_credits_handler(request, admin, db_config).await
}

#[post("/admin/role", data = "<request>")]
pub async fn set_role(
    request: Json<SetRoleRequest>,
    admin: AdminUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<UserInfo>>, ApiError> {
    handlers::set_role_handler(request, admin, db_config).await
}

#[post("/admin/plan", data = "<request>")]
pub async fn set_plan(
    request: Json<SetPlanRequest>,
    admin: AdminUser,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<UserInfo>>, ApiError> {
    handlers::set_plan_handler(request, admin, db_config).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
fn catcher_response(error: &str, code: &str, suggestions: &[&str]) -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        error.to_string(),
        code.to_string(),
        suggestions.iter().map(|s| s.to_string()).collect(),
    ))
}

#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    catcher_response(
        "Invalid request format",
        "BAD_REQUEST",
        &[
            "Check your request JSON format",
            "Verify all required fields are present",
        ],
    )
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<StandardErrorResponse> {
    catcher_response(
        "Authentication required",
        "AUTHENTICATION_ERROR",
        &["Sign in again to refresh your session"],
    )
}

#[rocket::catch(403)]
pub fn forbidden() -> Json<StandardErrorResponse> {
    catcher_response(
        "You are not allowed to perform this action",
        "AUTHORIZATION_ERROR",
        &["Ask an administrator for access"],
    )
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    catcher_response("Resource not found", "NOT_FOUND", &["Check the request path"])
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    catcher_response(
        "Request body could not be parsed",
        "UNPROCESSABLE_ENTITY",
        &["Verify all required fields are present and correctly typed"],
    )
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    catcher_response(
        "Internal server error",
        "INTERNAL_ERROR",
        &[
            "Try again in a few moments",
            "Contact support if the problem persists",
        ],
    )
}

/// Assemble the Rocket instance with all managed state, routes and catchers
pub fn build_rocket(
    server_config: ServerConfig,
    auth_config: AuthConfig,
    db_config: DatabaseConfig,
    analyzer: ProfileAnalyzer,
) -> Rocket<Build> {
    rocket::build()
        .attach(Cors)
        .manage(server_config)
        .manage(auth_config)
        .manage(db_config)
        .manage(analyzer)
        .register(
            "/api",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                internal_error
            ],
        )
        .mount(
            "/api",
            routes![
                analyze_profile,
                list_analyses,
                get_analysis,
                get_analysis_summary,
                delete_analysis,
                get_current_user,
                health,
                list_users,
                set_credits,
                set_role,
                set_plan,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    let auth_config = AuthConfig::from_config(&config)?;
    let analyzer = ProfileAnalyzer::new(&config.service)?;

    let mut db_config = DatabaseConfig::new(config.environment.database_path.clone());

    if let Err(e) = db_config.init_pool().await {
        error!("Failed to initialize database: {}", e);
        return Err(e);
    }

    if let Err(e) = db_config.migrate().await {
        error!("Failed to run database migrations: {}", e);
        return Err(e);
    }

    info!("Starting LeadLens API server");
    info!("Database: {}", db_config.database_path.display());
    info!("Section policy: {}", config.section_policy);
    info!("Trial credits: {}", config.credits.trial_credits);

    let server_config = ServerConfig {
        section_policy: config.section_policy,
    };

    let figment = rocket::Config::figment()
        .merge(("address", config.environment.address.clone()))
        .merge(("port", config.environment.port));

    build_rocket(server_config, auth_config, db_config, analyzer)
        .configure(figment)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket server failed: {}", e))?;

    Ok(())
}
