//! Stripe blueprint: donations through payment intents.
//!
//! Answers 503 when the STRIPE section is absent so deployments without
//! payments keep a sane API surface.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use cbu_core::domain::Activity;
use cbu_core::ports::BaseRepository;
use cbu_shared::dto::{CreatePaymentRequest, PaymentResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::settings::StripeSettings;
use crate::state::AppState;

const PAYMENT_INTENTS_URL: &str = "https://api.stripe.com/v1/payment_intents";

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/payments")
            .route("", web::post().to(create_payment))
            .route("/webhook", web::post().to(webhook)),
    );
}

fn stripe_settings(state: &AppState) -> AppResult<&StripeSettings> {
    state
        .settings
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Payments are not configured".to_string()))
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
}

/// POST /api/payments
async fn create_payment(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePaymentRequest>,
) -> AppResult<HttpResponse> {
    let stripe = stripe_settings(&state)?;
    let req = body.into_inner();

    if req.amount <= 0 {
        return Err(AppError::BadRequest("Amount must be positive".to_string()));
    }

    let client = reqwest::Client::new();
    let response = client
        .post(PAYMENT_INTENTS_URL)
        .bearer_auth(&stripe.secret_key)
        .form(&[
            ("amount", req.amount.to_string()),
            ("currency", req.currency.clone()),
        ])
        .send()
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Stripe is unreachable: {e}")))?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Stripe rejected the payment intent");
        return Err(AppError::BadRequest(
            "Payment could not be created".to_string(),
        ));
    }

    let intent: PaymentIntent = response
        .json()
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Bad response from Stripe: {e}")))?;

    let mut activity = Activity::new(
        identity.user_id(),
        "made-donation",
        format!("{} made a donation", identity.user.display_name),
    );
    if let Some(project_id) = req.project_id {
        activity = activity.for_project(project_id);
    }
    state.activities.save(activity).await?;

    tracing::info!(payment_id = %intent.id, amount = req.amount, "Payment intent created");

    Ok(HttpResponse::Created().json(PaymentResponse {
        payment_id: intent.id,
        amount: req.amount,
        currency: req.currency,
        publishable_key: stripe.publishable_key.clone(),
    }))
}

/// POST /api/payments/webhook
///
/// Stripe retries until it sees a 2xx, so this acknowledges and logs; the
/// interesting state updates arrive with the payment intent itself.
async fn webhook(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> AppResult<HttpResponse> {
    stripe_settings(&state)?;

    let event_type = body
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("unknown");
    tracing::info!(event = event_type, "Stripe webhook received");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use actix_web::{App, http::StatusCode, test};
    use cbu_core::domain::User;
    use cbu_core::ports::TokenService;

    #[actix_web::test]
    async fn payments_without_configuration_are_unavailable() {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let user = User::new(
            "donor@example.org".to_string(),
            "Donor".to_string(),
            "hash".to_string(),
        );
        state.users.save(user.clone()).await.unwrap();
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
            test::TestRequest::post()
                .uri("/api/payments")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .set_json(CreatePaymentRequest {
                    amount: 500,
                    currency: "usd".to_string(),
                    project_id: None,
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
