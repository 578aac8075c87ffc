//! Friendly HTML error pages for browser-facing routes.
//!
//! JSON routes under `/api` keep their problem-detail bodies untouched; any
//! other route gets a rendered page with a short apology. Outside of debug
//! mode a catch-all swallows every remaining server error so stack details
//! never reach a browser.

use std::sync::OnceLock;

use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{HttpMessage, HttpResponse};
use tera::{Context, Tera};

use crate::middleware::auth::CurrentUser;

fn templates() -> &'static Tera {
    static TERA: OnceLock<Tera> = OnceLock::new();
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_template("error.html", include_str!("../templates/error.html"))
            .expect("error page template is valid");
        tera
    })
}

/// User-facing message for a given error status.
pub fn message_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Sorry, we couldn't understand that request.",
        StatusCode::FORBIDDEN => "Sorry, forbidden request.",
        StatusCode::NOT_FOUND => "Sorry, this page doesn't exist.",
        StatusCode::METHOD_NOT_ALLOWED => "Sorry, you're not authorized to see this page.",
        _ => "Sorry, there was a server error.",
    }
}

fn render_page(status: StatusCode) -> String {
    let mut context = Context::new();
    context.insert("status", &status.as_u16());
    context.insert("error", message_for(status));

    templates()
        .render("error.html", &context)
        .unwrap_or_else(|e| {
            tracing::error!("Error page render failed: {e}");
            message_for(status).to_string()
        })
}

fn render<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let status = res.status();

    // Annotate the log line with the user when the request was authenticated.
    match res.request().extensions().get::<CurrentUser>() {
        Some(CurrentUser(id)) => {
            tracing::error!(path = %res.request().path(), "{} error occured user[{}]", status.as_u16(), id)
        }
        None => tracing::error!(path = %res.request().path(), "{} error occured", status.as_u16()),
    }

    // JSON API responses pass through unchanged.
    if res.request().path().starts_with("/api") {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let page = render_page(status);
    let (req, _) = res.into_parts();
    let response = HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(page);

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

/// Build the error-page handler stack.
///
/// The five well-known statuses always get pages; the server-error catch-all
/// is only active outside debug mode so development keeps full error output.
pub fn error_pages<B: 'static>(debug: bool) -> ErrorHandlers<B> {
    let handlers = ErrorHandlers::new()
        .handler(StatusCode::BAD_REQUEST, render)
        .handler(StatusCode::FORBIDDEN, render)
        .handler(StatusCode::NOT_FOUND, render)
        .handler(StatusCode::METHOD_NOT_ALLOWED, render)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, render);

    if debug {
        handlers
    } else {
        handlers.default_handler_server(render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test, web};

    #[actix_web::test]
    async fn missing_page_renders_friendly_html() {
        let app = test::init_service(
            App::new()
                .wrap(error_pages(true))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get().uri("/no-such-page").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let body = test::read_body(res).await;
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("Sorry, this page doesn't exist."));
        assert!(body.contains("404"));
    }

    #[actix_web::test]
    async fn api_routes_keep_json_bodies() {
        let app = test::init_service(
            App::new().wrap(error_pages(true)).route(
                "/api/broken",
                web::get().to(|| async {
                    HttpResponse::InternalServerError().json(serde_json::json!({
                        "title": "Internal Server Error",
                        "status": 500
                    }))
                }),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/broken").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = test::read_body(res).await;
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("\"status\":500"));
        assert!(!body.contains("<html"));
    }

    #[actix_web::test]
    async fn unlisted_server_errors_are_caught_in_production_mode() {
        let app = test::init_service(
            App::new()
                .wrap(error_pages(false))
                .route("/flaky", web::get().to(HttpResponse::BadGateway)),
        )
        .await;

        let req = test::TestRequest::get().uri("/flaky").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

        let body = test::read_body(res).await;
        assert!(String::from_utf8_lossy(&body).contains("Sorry, there was a server error."));
    }
}
