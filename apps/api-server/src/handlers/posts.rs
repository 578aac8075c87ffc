//! Posts blueprint: authoring and reading articles.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use cbu_core::domain::{Activity, Post};
use cbu_core::ports::{BaseRepository, PostRepository};
use cbu_shared::dto::{CreatePostRequest, PostResponse, UpdatePostRequest};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/posts")
            .route("", web::get().to(list_public))
            .route("", web::post().to(create))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::put().to(update))
            .route("/{id}", web::delete().to(delete)),
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

fn to_response(post: &Post) -> PostResponse {
    PostResponse {
        id: post.id,
        author_id: post.author_id,
        project_id: post.project_id,
        title: post.title.clone(),
        body: post.body.clone(),
        public: post.public,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

/// GET /api/posts
async fn list_public(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    let posts = state.posts.list_public(query.limit).await?;
    Ok(HttpResponse::Ok().json(posts.iter().map(to_response).collect::<Vec<_>>()))
}

/// POST /api/posts
async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }

    let mut post = Post::new(identity.user_id(), req.title, req.body);
    post.project_id = req.project_id;
    let saved = state.posts.save(post).await?;

    let mut activity = Activity::new(
        identity.user_id(),
        "created-post",
        format!("{} published \"{}\"", identity.user.display_name, saved.title),
    );
    if let Some(project_id) = saved.project_id {
        activity = activity.for_project(project_id);
    }
    state.activities.save(activity).await?;

    Ok(HttpResponse::Created().json(to_response(&saved)))
}

/// GET /api/posts/{id}
async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
    Ok(HttpResponse::Ok().json(to_response(&post)))
}

/// PUT /api/posts/{id}
async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let mut post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

    if !identity.can_edit_post(post.id) && post.author_id != identity.user_id() {
        return Err(AppError::Forbidden);
    }

    let req = body.into_inner();
    if let Some(title) = req.title {
        post.title = title;
    }
    if let Some(content) = req.body {
        post.body = content;
    }
    if let Some(public) = req.public {
        post.public = public;
    }
    post.updated_at = chrono::Utc::now();

    let saved = state.posts.save(post).await?;
    Ok(HttpResponse::Ok().json(to_response(&saved)))
}

/// DELETE /api/posts/{id}
async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

    if !identity.can_edit_post(post.id) && post.author_id != identity.user_id() {
        return Err(AppError::Forbidden);
    }

    state.posts.delete(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use actix_web::{App, http::StatusCode, test};
    use cbu_core::domain::User;
    use cbu_core::ports::TokenService;

    async fn seeded_state() -> (AppState, User, String) {
        let state = AppState::for_tests(Settings::from_yaml("DEBUG: true\n").unwrap());
        let user = User::new(
            "author@example.org".to_string(),
            "Author".to_string(),
            "hash".to_string(),
        );
        state.users.save(user.clone()).await.unwrap();
        let token = state
            .tokens
            .issue_session(user.id, &user.email, user.roles.clone())
            .unwrap();
        (state, user, token)
    }

    #[actix_web::test]
    async fn create_then_read_back() {
        let (state, user, token) = seeded_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .set_json(CreatePostRequest {
                    title: "Hello".to_string(),
                    body: "First post".to_string(),
                    project_id: None,
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: PostResponse = test::read_body_json(res).await;
        assert_eq!(created.author_id, user.id);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/posts/{}", created.id))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/posts").to_request(),
        )
        .await;
        let listed: Vec<PostResponse> = test::read_body_json(res).await;
        assert_eq!(listed.len(), 1);
    }

    #[actix_web::test]
    async fn only_the_author_may_update() {
        let (state, _, author_token) = seeded_state().await;
        let other = User::new(
            "other@example.org".to_string(),
            "Other".to_string(),
            "hash".to_string(),
        );
        state.users.save(other.clone()).await.unwrap();
        let other_token = state
            .tokens
            .issue_session(other.id, &other.email, other.roles.clone())
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
                .uri("/api/posts")
                .insert_header(("Authorization", format!("Bearer {author_token}")))
                .set_json(CreatePostRequest {
                    title: "Mine".to_string(),
                    body: "Keep out".to_string(),
                    project_id: None,
                })
                .to_request(),
        )
        .await;
        let created: PostResponse = test::read_body_json(res).await;

        let res = test::call_service(
            &app,
            test::TestRequest::put()
                .uri(&format!("/api/posts/{}", created.id))
                .insert_header(("Authorization", format!("Bearer {other_token}")))
                .set_json(UpdatePostRequest {
                    title: Some("Hijacked".to_string()),
                    body: None,
                    public: None,
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn anonymous_cannot_create() {
        let (state, _, _) = seeded_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/posts")
                .set_json(CreatePostRequest {
                    title: "Nope".to_string(),
                    body: "".to_string(),
                    project_id: None,
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
