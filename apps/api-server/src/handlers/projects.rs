//! Projects blueprint: community efforts users organize around.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use cbu_core::domain::{Activity, Project};
use cbu_core::ports::{BaseRepository, ProjectRepository};
use cbu_shared::dto::{CreateProjectRequest, ProjectResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/projects")
            .route("", web::get().to(list))
            .route("", web::post().to(create))
            .route("/mine", web::get().to(mine))
            .route("/{id}", web::get().to(get))
            .route("/{id}/join", web::post().to(join)),
    );
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: u64,
}

fn default_limit() -> u64 {
    20
}

fn to_response(project: &Project) -> ProjectResponse {
    ProjectResponse {
        id: project.id,
        owner_id: project.owner_id,
        name: project.name.clone(),
        description: project.description.clone(),
        member_count: project.members.len(),
        created_at: project.created_at,
    }
}

/// GET /api/projects
async fn list(state: web::Data<AppState>, query: web::Query<ListQuery>) -> AppResult<HttpResponse> {
    let projects = state.projects.list(query.limit).await?;
    Ok(HttpResponse::Ok().json(projects.iter().map(to_response).collect::<Vec<_>>()))
}

/// POST /api/projects
async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreateProjectRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Project name is required".to_string()));
    }

    let project = Project::new(identity.user_id(), req.name, req.description);
    let saved = state.projects.save(project).await?;

    state
        .activities
        .save(
            Activity::new(
                identity.user_id(),
                "created-project",
                format!("{} started \"{}\"", identity.user.display_name, saved.name),
            )
            .for_project(saved.id),
        )
        .await?;

    Ok(HttpResponse::Created().json(to_response(&saved)))
}

/// GET /api/projects/mine
async fn mine(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let projects = state.projects.find_by_member(identity.user_id()).await?;
    Ok(HttpResponse::Ok().json(projects.iter().map(to_response).collect::<Vec<_>>()))
}

/// GET /api/projects/{id}
async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let project = state
        .projects
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("project {id}")))?;
    Ok(HttpResponse::Ok().json(to_response(&project)))
}

/// POST /api/projects/{id}/join
async fn join(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let mut project = state
        .projects
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("project {id}")))?;

    if project.is_member(identity.user_id()) {
        return Err(AppError::Conflict("Already a member".to_string()));
    }

    project.members.push(identity.user_id());
    project.updated_at = chrono::Utc::now();
    let saved = state.projects.save(project).await?;

    state
        .activities
        .save(
            Activity::new(
                identity.user_id(),
                "joined-project",
                format!("{} joined \"{}\"", identity.user.display_name, saved.name),
            )
            .for_project(saved.id),
        )
        .await?;

    Ok(HttpResponse::Ok().json(to_response(&saved)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use actix_web::{App, http::StatusCode, test};
    use cbu_core::domain::User;
    use cbu_core::ports::TokenService;

    async fn user_with_token(state: &AppState, email: &str) -> (User, String) {
        let user = User::new(email.to_string(), "Member".to_string(), "hash".to_string());
        state.users.save(user.clone()).await.unwrap();
        let token = state
            .tokens
            .issue_session(user.id, &user.email, user.roles.clone())
            .unwrap();
        (user, token)
    }

    #[actix_web::test]
    async fn owner_is_the_first_member() {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let (owner, token) = user_with_token(&state, "owner@example.org").await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/projects")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .set_json(CreateProjectRequest {
                    name: "Community Garden".to_string(),
                    description: "Grow things together".to_string(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: ProjectResponse = test::read_body_json(res).await;
        assert_eq!(created.owner_id, owner.id);
        assert_eq!(created.member_count, 1);
    }

    #[actix_web::test]
    async fn joining_twice_is_a_conflict() {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let (_, owner_token) = user_with_token(&state, "owner@example.org").await;
        let (_, joiner_token) = user_with_token(&state, "joiner@example.org").await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/projects")
                .insert_header(("Authorization", format!("Bearer {owner_token}")))
                .set_json(CreateProjectRequest {
                    name: "Cleanup Crew".to_string(),
                    description: "".to_string(),
                })
                .to_request(),
        )
        .await;
        let created: ProjectResponse = test::read_body_json(res).await;

        let join_uri = format!("/api/projects/{}/join", created.id);
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&join_uri)
                .insert_header(("Authorization", format!("Bearer {joiner_token}")))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let joined: ProjectResponse = test::read_body_json(res).await;
        assert_eq!(joined.member_count, 2);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&join_uri)
                .insert_header(("Authorization", format!("Bearer {joiner_token}")))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn mine_lists_only_memberships() {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let (_, owner_token) = user_with_token(&state, "owner@example.org").await;
        let (_, outsider_token) = user_with_token(&state, "outsider@example.org").await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/projects")
                .insert_header(("Authorization", format!("Bearer {owner_token}")))
                .set_json(CreateProjectRequest {
                    name: "Tool Library".to_string(),
                    description: "".to_string(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/projects/mine")
                .insert_header(("Authorization", format!("Bearer {owner_token}")))
                .to_request(),
        )
        .await;
        let owned: Vec<ProjectResponse> = test::read_body_json(res).await;
        assert_eq!(owned.len(), 1);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/projects/mine")
                .insert_header(("Authorization", format!("Bearer {outsider_token}")))
                .to_request(),
        )
        .await;
        let none: Vec<ProjectResponse> = test::read_body_json(res).await;
        assert!(none.is_empty());
    }
}
