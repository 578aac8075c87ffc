//! Activity stream blueprint: the site-wide and per-project event feeds.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use cbu_core::domain::Activity;
use cbu_core::ports::ActivityRepository;
use cbu_shared::dto::ActivityResponse;

use crate::middleware::error::AppResult;
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/stream")
            .route("", web::get().to(recent))
            .route("/project/{id}", web::get().to(recent_for_project))
            .route("/user/{id}", web::get().to(recent_for_actor)),
    );
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    #[serde(default = "default_limit")]
    limit: u64,
}

fn default_limit() -> u64 {
    50
}

fn to_response(activity: &Activity) -> ActivityResponse {
    ActivityResponse {
        id: activity.id,
        actor_id: activity.actor_id,
        project_id: activity.project_id,
        verb: activity.verb.clone(),
        message: activity.message.clone(),
        created_at: activity.created_at,
    }
}

/// GET /api/stream
async fn recent(
    state: web::Data<AppState>,
    query: web::Query<StreamQuery>,
) -> AppResult<HttpResponse> {
    let activities = state.activities.recent(query.limit).await?;
    Ok(HttpResponse::Ok().json(activities.iter().map(to_response).collect::<Vec<_>>()))
}

/// GET /api/stream/project/{id}
async fn recent_for_project(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<StreamQuery>,
) -> AppResult<HttpResponse> {
    let activities = state
        .activities
        .recent_for_project(path.into_inner(), query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(activities.iter().map(to_response).collect::<Vec<_>>()))
}

/// GET /api/stream/user/{id}
async fn recent_for_actor(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<StreamQuery>,
) -> AppResult<HttpResponse> {
    let activities = state
        .activities
        .recent_for_actor(path.into_inner(), query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(activities.iter().map(to_response).collect::<Vec<_>>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use actix_web::{App, test};
    use cbu_core::ports::BaseRepository;

    #[actix_web::test]
    async fn project_feed_is_scoped() {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let actor = Uuid::new_v4();
        let project = Uuid::new_v4();

        state
            .activities
            .save(Activity::new(actor, "created-post", "site-wide event"))
            .await
            .unwrap();
        state
            .activities
            .save(Activity::new(actor, "joined-project", "project event").for_project(project))
            .await
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/stream").to_request(),
        )
        .await;
        let all: Vec<ActivityResponse> = test::read_body_json(res).await;
        assert_eq!(all.len(), 2);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/stream/project/{project}"))
                .to_request(),
        )
        .await;
        let scoped: Vec<ActivityResponse> = test::read_body_json(res).await;
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].verb, "joined-project");
    }

    #[actix_web::test]
    async fn user_feed_is_scoped() {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        state
            .activities
            .save(Activity::new(alice, "created-post", "alice wrote"))
            .await
            .unwrap();
        state
            .activities
            .save(Activity::new(bob, "created-post", "bob wrote"))
            .await
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
                .uri(&format!("/api/stream/user/{alice}"))
                .to_request(),
        )
        .await;
        let scoped: Vec<ActivityResponse> = test::read_body_json(res).await;
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].actor_id, alice);
    }
}
