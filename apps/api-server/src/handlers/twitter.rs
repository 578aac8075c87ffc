//! Twitter blueprint: linking a Twitter account to a user.
//!
//! Mirrors the Facebook flow; tokens are sealed with the token cipher before
//! being stored on the user record.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use cbu_core::ports::BaseRepository;
use cbu_shared::dto::{ConnectResponse, LinkedAccountResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::settings::TwitterSettings;
use crate::state::AppState;

const PROVIDER: &str = "twitter";

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/connect/twitter")
            .route("", web::get().to(connect))
            .route("", web::delete().to(unlink))
            .route("/callback", web::get().to(callback)),
    );
}

fn provider_settings(state: &AppState) -> AppResult<&TwitterSettings> {
    state
        .settings
        .oauth
        .twitter
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Twitter login is not configured".to_string()))
}

/// GET /api/connect/twitter
async fn connect(state: web::Data<AppState>, _identity: Identity) -> AppResult<HttpResponse> {
    let tw = provider_settings(&state)?;

    let authorize_url = format!(
        "https://twitter.com/i/oauth2/authorize?response_type=code&client_id={}&redirect_uri={}&scope=tweet.read%20users.read",
        tw.consumer_key, tw.redirect_uri
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

/// GET /api/connect/twitter/callback
async fn callback(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<CallbackQuery>,
) -> AppResult<HttpResponse> {
    let tw = provider_settings(&state)?;
    let cipher = state.cipher.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Credential encryption is not configured".to_string())
    })?;

    let client = reqwest::Client::new();
    let response = client
        .post("https://api.twitter.com/2/oauth2/token")
        .basic_auth(&tw.consumer_key, Some(&tw.consumer_secret))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", query.code.as_str()),
            ("redirect_uri", tw.redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Twitter is unreachable: {e}")))?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Twitter rejected the code exchange");
        return Err(AppError::BadRequest(
            "Twitter rejected the authorization code".to_string(),
        ));
    }

    let token: ProviderToken = response
        .json()
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Bad response from Twitter: {e}")))?;

    let mut user = identity.user;
    user.twitter_token = Some(cipher.encrypt(&token.access_token)?);
    user.updated_at = chrono::Utc::now();
    state.users.save(user).await?;

    tracing::info!("Twitter account linked");

    Ok(HttpResponse::Ok().json(LinkedAccountResponse {
        provider: PROVIDER.to_string(),
        linked: true,
    }))
}

/// DELETE /api/connect/twitter
async fn unlink(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let mut user = identity.user;
    user.twitter_token = None;
    user.updated_at = chrono::Utc::now();
    state.users.save(user).await?;

    Ok(HttpResponse::Ok().json(LinkedAccountResponse {
        provider: PROVIDER.to_string(),
        linked: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use actix_web::{App, http::StatusCode, test};
    use cbu_core::domain::User;
    use cbu_core::ports::TokenService;

    #[actix_web::test]
    async fn unlink_clears_the_stored_token() {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let mut user = User::new(
            "tweet@example.org".to_string(),
            "Tweeter".to_string(),
            "hash".to_string(),
        );
        user.twitter_token = Some("sealed".to_string());
        state.users.save(user.clone()).await.unwrap();
        let users = state.users.clone();
        let token = state
            .tokens
            .issue_session(user.id, &user.email, user.roles.clone())
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri("/api/connect/twitter")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let stored = users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.twitter_token.is_none());
    }
}
