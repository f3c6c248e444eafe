use actix_web::{cookie::Cookie, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    auth_token::{now_ms, AuthTokenService},
    db::MongoDbContext,
    error::{Result, TuitionServerError},
    session::SessionManager,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub admin_id: String,
    pub auth_token: String,
    pub message: String,
}

#[post("/login")]
pub async fn login(
    req: web::Json<LoginRequest>,
    db: web::Data<MongoDbContext>,
    session_manager: web::Data<SessionManager>,
    auth_tokens: web::Data<AuthTokenService>,
) -> Result<HttpResponse> {
    log::info!("Login attempt for user: {}", req.username);

    let admin = db
        .admins()
        .find_by_username(&req.username)
        .await?
        .ok_or(TuitionServerError::InvalidCredentials)?;

    if !admin.verify_password(&req.password)? {
        log::warn!("Failed login attempt for user: {}", req.username);
        return Err(TuitionServerError::InvalidCredentials);
    }

    let admin_id = admin
        .id
        .ok_or_else(|| TuitionServerError::Internal("Admin record has no id".to_string()))?;

    let session = session_manager.create_session(admin_id, admin.username.clone());

    db.admins().update_last_login(&admin_id).await?;

    let auth_token = auth_tokens
        .issue_session_token(
            admin_id.to_hex(),
            admin.username.clone(),
            session.session_id.clone(),
            now_ms(),
        )
        .map_err(|err| {
            TuitionServerError::Internal(format!("Failed to issue auth token: {err}"))
        })?;

    log::info!(
        "Successful login for user: {} (session: {})",
        req.username,
        session.session_id
    );

    let cookie = Cookie::build("session_id", session.session_id.clone())
        .path("/")
        .http_only(true)
        .same_site(actix_web::cookie::SameSite::Strict)
        .max_age(actix_web::cookie::time::Duration::hours(24))
        .finish();

    let response = LoginResponse {
        success: true,
        admin_id: admin_id.to_hex(),
        auth_token,
        message: "Login successful".to_string(),
    };

    Ok(HttpResponse::Ok().cookie(cookie).json(response))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[post("/logout")]
pub async fn logout(
    session_manager: web::Data<SessionManager>,
    session_id: web::ReqData<String>,
) -> Result<HttpResponse> {
    let session_id = session_id.into_inner();
    session_manager.invalidate_session(&session_id);

    log::info!("Admin logged out (session: {})", session_id);

    let cookie = Cookie::build("session_id", "")
        .path("/")
        .max_age(actix_web::cookie::time::Duration::seconds(0))
        .finish();

    let response = LogoutResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok(HttpResponse::Ok().cookie(cookie).json(response))
}
