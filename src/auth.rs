// src/auth.rs
use crate::core::config_manager::ConfigManager;
use crate::core::database::{DatabaseConfig, User, UserService};
use anyhow::Result;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Claims of an access token issued by the hosted auth provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Provider user id
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUser {
    pub id: String,
    pub email: String,
}

pub struct AuthConfig {
    jwt_secret: String,
    audience: Option<String>,
    pub trial_credits: i64,
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn new(jwt_secret: String) -> Self {
        Self {
            jwt_secret,
            audience: None,
            trial_credits: 0,
            admin_emails: Vec::new(),
        }
    }

    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        Ok(Self::new(config.require_jwt_secret()?.to_string())
            .with_audience(config.auth.audience.clone())
            .with_trial_credits(config.credits.trial_credits)
            .with_admin_emails(config.auth.admin_emails.clone()))
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_trial_credits(mut self, trial_credits: i64) -> Self {
        self.trial_credits = trial_credits;
        self
    }

    pub fn with_admin_emails(mut self, admin_emails: Vec<String>) -> Self {
        self.admin_emails = admin_emails;
        self
    }

    /// Verify signature, expiry and audience of an HS256 access token
    pub fn verify_token(&self, token: &str) -> Result<TokenUser> {
        let mut validation = Validation::new(Algorithm::HS256);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let token_data = decode::<Claims>(token, &decoding_key, &validation)?;

        let email = token_data
            .claims
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Token has no email claim"))?;

        Ok(TokenUser {
            id: token_data.claims.sub,
            email,
        })
    }
}

/// Signed-in user with their stored account row
pub struct AuthenticatedUser {
    pub token_user: TokenUser,
    pub user: User,
}

impl AuthenticatedUser {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }
}

fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    match header {
        Some(header) => header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::InvalidToken),
        None => Err(AuthError::MissingToken),
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_config = match req.guard::<&State<AuthConfig>>().await {
            Outcome::Success(config) => config,
            Outcome::Error((status, _)) => {
                return Outcome::Error((status, AuthError::DatabaseError))
            }
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let db_config = match req.guard::<&State<DatabaseConfig>>().await {
            Outcome::Success(config) => config,
            Outcome::Error((status, _)) => {
                return Outcome::Error((status, AuthError::DatabaseError))
            }
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let token = match bearer_token(req.headers().get_one("Authorization")) {
            Ok(token) => token,
            Err(e) => {
                warn!("Rejected request: {}", e.message());
                return Outcome::Error((Status::Unauthorized, e));
            }
        };

        let token_user = match auth_config.verify_token(token) {
            Ok(user) => user,
            Err(e) => {
                warn!("Token verification failed: {}", e);
                return Outcome::Error((Status::Unauthorized, AuthError::TokenVerificationFailed));
            }
        };

        let pool = match db_config.pool() {
            Ok(pool) => pool,
            Err(e) => {
                error!("Database connection failed: {}", e);
                return Outcome::Error((Status::InternalServerError, AuthError::DatabaseError));
            }
        };

        let user = match UserService::new(pool)
            .get_or_create(
                &token_user.id,
                &token_user.email,
                auth_config.trial_credits,
                &auth_config.admin_emails,
            )
            .await
        {
            Ok(user) => user,
            Err(e) => {
                error!("Failed to load account for {}: {}", token_user.email, e);
                return Outcome::Error((Status::InternalServerError, AuthError::DatabaseError));
            }
        };

        info!("User {} authenticated ({})", user.email, user.role);

        Outcome::Success(AuthenticatedUser { token_user, user })
    }
}

/// Signed-in user holding the admin role
pub struct AdminUser(pub AuthenticatedUser);

impl AdminUser {
    pub fn user(&self) -> &User {
        self.0.user()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthenticatedUser::from_request(req).await {
            Outcome::Success(auth) if auth.user.is_admin() => Outcome::Success(AdminUser(auth)),
            Outcome::Success(auth) => {
                warn!("User {} attempted an admin action", auth.email());
                Outcome::Error((Status::Forbidden, AuthError::NotAuthorized))
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenVerificationFailed,
    NotAuthorized,
    DatabaseError,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization token required",
            AuthError::InvalidToken => "Invalid authorization token format",
            AuthError::TokenVerificationFailed => "Token verification failed",
            AuthError::NotAuthorized => "Admin role required",
            AuthError::DatabaseError => "Database error occurred",
        }
    }
}

// Optional auth guard that doesn't fail if no auth is provided
pub struct OptionalAuth {
    pub user: Option<AuthenticatedUser>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthenticatedUser::from_request(req).await {
            Outcome::Success(auth) => Outcome::Success(OptionalAuth { user: Some(auth) }),
            _ => Outcome::Success(OptionalAuth { user: None }),
        }
    }
}
