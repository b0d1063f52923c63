use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::user_repository::CreatedProfile;
use crate::application::use_cases::auth::login::{Login, LoginRequest as LoginInput};
use crate::application::use_cases::auth::password_reset::{
    RESET_REQUESTED, RequestPasswordReset, ResetPassword,
};
use crate::application::use_cases::auth::register::{Register, RegisterRequest as RegisterInput};
use crate::application::use_cases::auth::validate_session::ValidateSession;
use crate::bootstrap::app_context::AppContext;
use crate::bootstrap::config::Config;
use crate::domain::accounts::user::{User, UserType};
use crate::presentation::http::extract::{ClientMeta, JsonBody};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    /// `teacher` or `school`
    pub user_type: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub description: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    #[schema(value_type = String)]
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            user_type: u.user_type,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
    pub profile_id: Uuid,
    pub redirect_url: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
    pub redirect_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user: UserResponse,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub user_type: UserType,
    pub exp: usize,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/validate", get(validate))
        .route("/forgot-password", post(forgot_password).put(reset_password))
        .with_state(ctx)
}

pub fn issue_token(cfg: &Config, user: &User) -> anyhow::Result<String> {
    let exp = Utc::now().timestamp() + cfg.jwt_expires_secs;
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        user_type: user.user_type,
        exp: exp.max(0) as usize,
    };
    Ok(jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )?)
}

/// Turns the raw `Authorization` header value into the caller it names.
pub fn verify_token(secret: &str, authorization: Option<&str>) -> AppResult<Actor> {
    let raw = authorization.map(str::trim).unwrap_or("");
    let token = match raw {
        "" | "Bearer" => "",
        _ => raw
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid token"))?
            .trim(),
    };
    if matches!(token, "" | "null" | "undefined") {
        return Err(AppError::unauthorized("Authentication required"));
    }
    if token.split('.').count() != 3 {
        return Err(AppError::unauthorized("Invalid token"));
    }
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::unauthorized("Token expired"),
        _ => AppError::unauthorized("Invalid token"),
    })?;
    let user_id =
        Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::unauthorized("Invalid token"))?;
    Ok(Actor {
        user_id,
        email: data.claims.email,
        user_type: data.claims.user_type,
    })
}

/// The verified bearer of the request.
pub struct AuthUser(pub Actor);

#[axum::async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        verify_token(&ctx.cfg.jwt_secret, header).map(AuthUser)
    }
}

#[utoipa::path(post, path = "/api/auth/register", tag = "Auth", request_body = RegisterRequest, security(()), responses(
    (status = 201, body = RegisterResponse),
    (status = 400, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn register(
    State(ctx): State<AppContext>,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let repo = ctx.user_repo();
    let uc = Register {
        repo: repo.as_ref(),
        notifications: ctx.notifications(),
    };
    let input = RegisterInput {
        user_type: req.user_type,
        email: req.email,
        password: req.password,
        name: req.name,
        contact_name: req.contact_name,
        contact_email: req.contact_email,
        description: req.description,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        qualification: req.qualification,
        experience: req.experience,
        city: req.city,
        country: req.country,
    };
    let (user, profile) = uc.execute(&input, &meta).await?;
    let token = issue_token(&ctx.cfg, &user)?;
    let profile_id = match &profile {
        CreatedProfile::Teacher(t) => t.id,
        CreatedProfile::School(s) => s.id,
    };
    let redirect_url = user.user_type.dashboard_path().to_string();
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            token,
            user: user.into(),
            profile_id,
            redirect_url,
        }),
    ))
}

#[utoipa::path(post, path = "/api/auth/login", tag = "Auth", request_body = LoginRequest, security(()), responses(
    (status = 200, body = LoginResponse),
    (status = 401, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn login(
    State(ctx): State<AppContext>,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let repo = ctx.user_repo();
    let uc = Login {
        repo: repo.as_ref(),
        notifications: ctx.notifications(),
    };
    let input = LoginInput {
        email: req.email,
        password: req.password,
    };
    let user = uc.execute(&input, &meta).await?;
    let token = issue_token(&ctx.cfg, &user)?;
    let redirect_url = user.user_type.dashboard_path().to_string();
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
        redirect_url,
    }))
}

#[utoipa::path(get, path = "/api/auth/validate", tag = "Auth", responses((status = 200, body = ValidateResponse)))]
pub async fn validate(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<ValidateResponse>> {
    let repo = ctx.user_repo();
    let uc = ValidateSession {
        repo: repo.as_ref(),
    };
    let user = uc.execute(actor.user_id).await?;
    Ok(Json(ValidateResponse {
        valid: true,
        user: user.into(),
    }))
}

#[utoipa::path(post, path = "/api/auth/forgot-password", tag = "Auth", request_body = ForgotPasswordRequest, security(()), responses(
    (status = 200, body = MessageResponse)
))]
pub async fn forgot_password(
    State(ctx): State<AppContext>,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let users = ctx.user_repo();
    let profiles = ctx.profile_repo();
    let uc = RequestPasswordReset {
        users: users.as_ref(),
        profiles: profiles.as_ref(),
        notifications: ctx.notifications(),
    };
    uc.execute(&req.email, &meta, Utc::now()).await?;
    Ok(Json(MessageResponse {
        message: RESET_REQUESTED.into(),
    }))
}

#[utoipa::path(put, path = "/api/auth/forgot-password", tag = "Auth", request_body = ResetPasswordRequest, security(()), responses(
    (status = 200, body = MessageResponse),
    (status = 400, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn reset_password(
    State(ctx): State<AppContext>,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let users = ctx.user_repo();
    let uc = ResetPassword {
        users: users.as_ref(),
        notifications: ctx.notifications(),
    };
    uc.execute(&req.token, &req.password, &meta, Utc::now())
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset successfully".into(),
    }))
}
