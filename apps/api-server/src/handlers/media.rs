//! Media blueprint: photo uploads and retrieval.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::TryStreamExt;

use cbu_shared::dto::UploadResponse;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/media", web::post().to(upload))
        .route("/uploads/photos/{file}", web::get().to(serve));
}

/// POST /api/media
///
/// Takes the first multipart field that carries a filename.
async fn upload(
    state: web::Data<AppState>,
    identity: Identity,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
    {
        let Some(filename) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned)
        else {
            continue;
        };

        let mut contents = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
        {
            contents.extend_from_slice(&chunk);
        }

        let stored = state.photos.save(&filename, &contents).await?;
        tracing::info!(user_id = %identity.user_id(), file = %stored, "Photo uploaded");

        return Ok(HttpResponse::Created().json(UploadResponse {
            url: state.photos.url_for(&stored),
            filename: stored,
        }));
    }

    Err(AppError::BadRequest("No file field in upload".to_string()))
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("jpg") | Some("jpe") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// GET /uploads/photos/{file}
async fn serve(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let file = path.into_inner();

    // Stored names are sanitized on the way in; reject anything that could
    // escape the upload folder.
    if file.contains('/') || file.contains("..") {
        return Err(AppError::BadRequest("Invalid file name".to_string()));
    }

    let full = state.photos.dest().join(&file);
    match tokio::fs::read(&full).await {
        Ok(contents) => Ok(HttpResponse::Ok()
            .content_type(content_type_for(&file))
            .body(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::NotFound(format!("upload {file}")))
        }
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use actix_web::{App, http::StatusCode, test};
    use cbu_core::domain::User;
    use cbu_core::ports::{BaseRepository, TokenService};

    async fn state_with_user(folder: std::path::PathBuf) -> (AppState, String) {
        let mut settings = Settings::from_yaml("DEBUG: true\n").unwrap();
        settings.uploads.folder = folder;
        let state = AppState::for_tests(settings);

        let user = User::new(
            "snap@example.org".to_string(),
            "Snapper".to_string(),
            "hash".to_string(),
        );
        state.users.save(user.clone()).await.unwrap();
        let token = state
            .tokens
            .issue_session(user.id, &user.email, user.roles.clone())
            .unwrap();
        (state, token)
    }

    fn multipart_body(filename: &str) -> (String, Vec<u8>) {
        let boundary = "test-boundary-7351";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             fake image bytes\r\n\
             --{boundary}--\r\n"
        );
        (
            format!("multipart/form-data; boundary={boundary}"),
            body.into_bytes(),
        )
    }

    #[actix_web::test]
    async fn upload_then_fetch() {
        let folder = std::env::temp_dir().join(format!("cbu-media-{}", uuid::Uuid::new_v4()));
        let (state, token) = state_with_user(folder.clone()).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let (content_type, body) = multipart_body("garden.png");
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/media")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .insert_header(("Content-Type", content_type))
                .set_payload(body)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let uploaded: UploadResponse = test::read_body_json(res).await;
        assert_eq!(uploaded.url, format!("/uploads/photos/{}", uploaded.filename));

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri(&uploaded.url).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let served = test::read_body(res).await;
        assert_eq!(&served[..], b"fake image bytes");

        std::fs::remove_dir_all(&folder).ok();
    }

    #[actix_web::test]
    async fn non_image_extension_is_rejected() {
        let folder = std::env::temp_dir().join(format!("cbu-media-{}", uuid::Uuid::new_v4()));
        let (state, token) = state_with_user(folder.clone()).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let (content_type, body) = multipart_body("malware.exe");
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/media")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .insert_header(("Content-Type", content_type))
                .set_payload(body)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        std::fs::remove_dir_all(&folder).ok();
    }
}
