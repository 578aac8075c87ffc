//! Frontend blueprint: landing page and health check.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::middleware::auth::OptionalIdentity;
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/api/health", web::get().to(health_check));
}

/// GET /
///
/// Anonymous visitors get the pitch; signed-in users get greeted.
async fn index(identity: OptionalIdentity) -> HttpResponse {
    let greeting = match &identity.0 {
        Some(identity) => format!("Welcome back, {}.", identity.user.display_name),
        None => "A community platform for making local change happen.".to_string(),
    };

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(format!(
            "<!DOCTYPE html><html><head><title>Change By Us</title></head>\
             <body><h1>Change By Us</h1><p>{greeting}</p></body></html>",
        ))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
}

/// GET /api/health
async fn health_check(_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use actix_web::{App, test};
    use cbu_core::domain::User;
    use cbu_core::ports::{BaseRepository, TokenService};

    #[actix_web::test]
    async fn index_serves_html_to_anonymous_visitors() {
        let app = test::init_service(App::new().configure(routes)).await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(res.status().is_success());

        let body = test::read_body(res).await;
        assert!(String::from_utf8_lossy(&body).contains("local change"));
    }

    #[actix_web::test]
    async fn index_greets_signed_in_users() {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let user = User::new(
            "greet@example.org".to_string(),
            "Greta".to_string(),
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
            test::TestRequest::get()
                .uri("/")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        let body = test::read_body(res).await;
        assert!(String::from_utf8_lossy(&body).contains("Welcome back, Greta."));
    }
}
