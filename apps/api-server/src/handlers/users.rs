//! Users blueprint: registration, login, profile, password reset.

use actix_web::{HttpResponse, web};

use cbu_core::domain::User;
use cbu_core::error::DomainError;
use cbu_core::ports::{
    BaseRepository, MailMessage, Mailer, PasswordService, TokenPurpose, TokenService,
    UserRepository,
};
use cbu_shared::ApiResponse;
use cbu_shared::dto::{
    AuthResponse, LoginRequest, PasswordResetConfirm, PasswordResetRequest, RegisterUserRequest,
    UserResponse,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(me))
            .route("/password-reset", web::post().to(request_password_reset))
            .route(
                "/password-reset/confirm",
                web::post().to(confirm_password_reset),
            ),
    );
}

fn to_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        roles: user.roles.clone(),
        created_at: user.created_at,
    }
}

/// Look a user up by email, treating more than one match as fatal.
async fn user_by_email(state: &AppState, email: &str) -> AppResult<Option<User>> {
    let mut matches = state.users.find_by_email(email).await?;
    if matches.len() > 1 {
        return Err(DomainError::Ambiguous(email.to_string()).into());
    }
    Ok(matches.pop())
}

/// POST /api/users/register
async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if req.display_name.trim().is_empty() {
        return Err(AppError::BadRequest("Display name is required".to_string()));
    }

    if user_by_email(&state, &req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = state.passwords.hash(&req.password)?;
    let user = User::new(req.email, req.display_name, password_hash);
    let saved = state.users.save(user).await?;

    let token = state
        .tokens
        .issue_session(saved.id, &saved.email, saved.roles.clone())?;

    // Confirmation mail is best effort; the account exists either way.
    if let Err(e) = state
        .mailer
        .send(MailMessage::new(
            saved.email.clone(),
            "Welcome to Change By Us",
            format!(
                "Hi {},\n\nYour account is ready. Sign in with this address to \
                 start or join a project.",
                saved.display_name
            ),
        ))
        .await
    {
        tracing::warn!(user_id = %saved.id, "Confirmation mail failed: {e}");
    }

    tracing::info!(user_id = %saved.id, "User registered");

    Ok(HttpResponse::Created().json(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.session_seconds() as u64,
    }))
}

/// POST /api/users/login
async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = user_by_email(&state, &req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !state.passwords.verify(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let token = state
        .tokens
        .issue_session(user.id, &user.email, user.roles.clone())?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.session_seconds() as u64,
    }))
}

/// GET /api/users/me
async fn me(identity: Identity) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(to_response(&identity.user)))
}

/// POST /api/users/password-reset
///
/// Always answers 200 so the endpoint cannot be used to probe for accounts.
async fn request_password_reset(
    state: web::Data<AppState>,
    body: web::Json<PasswordResetRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if let Some(user) = user_by_email(&state, &req.email).await? {
        let token = state.tokens.issue_reset(user.id, &user.email)?;
        state
            .mailer
            .send(MailMessage::new(
                user.email.clone(),
                "Reset your password",
                format!(
                    "Hi {},\n\nUse this token to reset your password: {token}\n\n\
                     If you didn't request this, you can ignore this mail.",
                    user.display_name
                ),
            ))
            .await?;
        tracing::info!(user_id = %user.id, "Password reset mail queued");
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        (),
        "If that address has an account, a reset mail is on its way.",
    )))
}

/// POST /api/users/password-reset/confirm
async fn confirm_password_reset(
    state: web::Data<AppState>,
    body: web::Json<PasswordResetConfirm>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.new_password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let claims = state
        .tokens
        .validate(&req.token, TokenPurpose::PasswordReset)?;

    let mut user = state
        .users
        .find_by_id(claims.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    user.password_hash = state.passwords.hash(&req.new_password)?;
    user.updated_at = chrono::Utc::now();
    state.users.save(user).await?;

    tracing::info!(user_id = %claims.user_id, "Password reset completed");

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message((), "Password updated.")))
}
