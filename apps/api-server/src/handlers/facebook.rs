//! Facebook blueprint: linking a Facebook account to a user.
//!
//! Access tokens are never stored in the clear; they pass through the token
//! cipher before landing on the user record. Both the OAUTH.FACEBOOK section
//! and the ENCRYPTION section must be configured or these routes answer 503.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use cbu_core::ports::BaseRepository;
use cbu_shared::dto::{ConnectResponse, LinkedAccountResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::settings::FacebookSettings;
use crate::state::AppState;

const PROVIDER: &str = "facebook";

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/connect/facebook")
            .route("", web::get().to(connect))
            .route("", web::delete().to(unlink))
            .route("/callback", web::get().to(callback)),
    );
}

fn provider_settings(state: &AppState) -> AppResult<&FacebookSettings> {
    state.settings.oauth.facebook.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Facebook login is not configured".to_string())
    })
}

/// GET /api/connect/facebook
async fn connect(state: web::Data<AppState>, _identity: Identity) -> AppResult<HttpResponse> {
    let fb = provider_settings(&state)?;

    let authorize_url = format!(
        "https://www.facebook.com/dialog/oauth?client_id={}&redirect_uri={}&scope=email",
        fb.app_id, fb.redirect_uri
    );

    Ok(HttpResponse::Ok().json(ConnectResponse {
        provider: PROVIDER.to_string(),
        authorize_url,
    }))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
}

#[derive(Debug, Deserialize)]
struct ProviderToken {
    access_token: String,
}

/// GET /api/connect/facebook/callback
async fn callback(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<CallbackQuery>,
) -> AppResult<HttpResponse> {
    let fb = provider_settings(&state)?;
    let cipher = state.cipher.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Credential encryption is not configured".to_string())
    })?;

    let token_url = format!(
        "https://graph.facebook.com/oauth/access_token?client_id={}&client_secret={}&redirect_uri={}&code={}",
        fb.app_id, fb.app_secret, fb.redirect_uri, query.code
    );

    let response = reqwest::get(&token_url)
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Facebook is unreachable: {e}")))?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Facebook rejected the code exchange");
        return Err(AppError::BadRequest(
            "Facebook rejected the authorization code".to_string(),
        ));
    }

    let token: ProviderToken = response
        .json()
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Bad response from Facebook: {e}")))?;

    let mut user = identity.user;
    user.facebook_token = Some(cipher.encrypt(&token.access_token)?);
    user.updated_at = chrono::Utc::now();
    state.users.save(user).await?;

    tracing::info!("Facebook account linked");

    Ok(HttpResponse::Ok().json(LinkedAccountResponse {
        provider: PROVIDER.to_string(),
        linked: true,
    }))
}

/// DELETE /api/connect/facebook
async fn unlink(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let mut user = identity.user;
    user.facebook_token = None;
    user.updated_at = chrono::Utc::now();
    state.users.save(user).await?;

    Ok(HttpResponse::Ok().json(LinkedAccountResponse {
        provider: PROVIDER.to_string(),
        linked: false,
    }))
}
