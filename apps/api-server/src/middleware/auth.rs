//! Authentication middleware and extractors.
//!
//! Identity is resolved once per request from the bearer token: the token's
//! subject is looked up through the user repository, and the resulting
//! identity carries the full permission set (user id, role names, and edit
//! rights on authored posts). Handlers declare `Identity` or
//! `OptionalIdentity` parameters; nothing here is event-driven.

use std::collections::HashSet;

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header, web};
use futures::future::LocalBoxFuture;
use uuid::Uuid;

use cbu_core::domain::User;
use cbu_core::error::RepoError;
use cbu_core::ports::{
    AuthError, BaseRepository, PostRepository, TokenPurpose, TokenService, UserRepository,
};
use cbu_shared::ErrorResponse;

use crate::state::AppState;

/// One grant in an identity's permission set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Permission {
    /// The request acts as this user.
    UserIs(Uuid),
    /// The user holds this role.
    Role(String),
    /// The user may edit this post.
    EditPost(Uuid),
}

/// Authenticated request identity.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    permissions: HashSet<Permission>,
}

impl Identity {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn can(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.can(&Permission::Role(role.to_string()))
    }

    pub fn can_edit_post(&self, post_id: Uuid) -> bool {
        self.can(&Permission::EditPost(post_id))
    }
}

/// How a token or login form names its user.
#[derive(Debug, Clone)]
pub enum IdentitySubject {
    Id(Uuid),
    Email(String),
}

/// Identity resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// More than one user record matched the subject. Fatal for the request.
    #[error("Error getting login information. Please contact an administrator")]
    Ambiguous(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Resolve a subject to an identity with its full permission set.
///
/// Zero matches is anonymous (`Ok(None)`); more than one match for an email
/// is logged and fails the request.
pub async fn resolve_identity(
    subject: IdentitySubject,
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
) -> Result<Option<Identity>, IdentityError> {
    let user = match subject {
        IdentitySubject::Id(id) => users.find_by_id(id).await?,
        IdentitySubject::Email(email) => {
            let mut matches = users.find_by_email(&email).await?;
            if matches.len() > 1 {
                tracing::error!(subject = %email, "Got more than one match for user login");
                return Err(IdentityError::Ambiguous(email));
            }
            matches.pop()
        }
    };

    let Some(user) = user else {
        return Ok(None);
    };

    let mut permissions = HashSet::new();
    permissions.insert(Permission::UserIs(user.id));
    for role in &user.roles {
        permissions.insert(Permission::Role(role.clone()));
    }
    for post in posts.find_by_author(user.id).await? {
        permissions.insert(Permission::EditPost(post.id));
    }

    Ok(Some(Identity { user, permissions }))
}

/// Error type for authentication failures at the HTTP boundary.
#[derive(Debug)]
pub struct AuthenticationError(pub IdentityError);

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match &self.0 {
            IdentityError::Auth(AuthError::InsufficientPermissions) => StatusCode::FORBIDDEN,
            IdentityError::Auth(_) => StatusCode::UNAUTHORIZED,
            IdentityError::Ambiguous(_) | IdentityError::Repo(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let error = match &self.0 {
            IdentityError::Auth(AuthError::TokenExpired) => {
                ErrorResponse::new(401, "Token Expired")
                    .with_detail("Your session has expired. Please login again.")
            }
            IdentityError::Auth(AuthError::MissingAuth) => {
                ErrorResponse::new(401, "Authentication Required")
                    .with_detail("Provide a valid Bearer token in the Authorization header.")
            }
            IdentityError::Auth(AuthError::InsufficientPermissions) => ErrorResponse::forbidden(),
            IdentityError::Auth(e) => {
                ErrorResponse::new(401, "Invalid Token").with_detail(e.to_string())
            }
            IdentityError::Ambiguous(_) => {
                ErrorResponse::internal_error().with_detail(self.0.to_string())
            }
            IdentityError::Repo(e) => {
                tracing::error!("Identity lookup failed: {e}");
                ErrorResponse::internal_error()
            }
        };

        actix_web::HttpResponse::build(self.status_code()).json(error)
    }
}

/// Marker stored in request extensions once an identity is known, so the
/// error-page handlers can annotate log lines with the user id.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("invalid authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::to_owned)
        .ok_or_else(|| AuthError::InvalidToken("expected Bearer token".to_string()))
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| {
                    tracing::error!("AppState not found in app data");
                    AuthenticationError(IdentityError::Auth(AuthError::InvalidToken(
                        "server configuration error".to_string(),
                    )))
                })?;

            let token = bearer_token(&req)
                .map_err(|e| AuthenticationError(IdentityError::Auth(e)))?;

            let claims = state
                .tokens
                .validate(&token, TokenPurpose::Session)
                .map_err(|e| AuthenticationError(IdentityError::Auth(e)))?;

            let identity = resolve_identity(
                IdentitySubject::Id(claims.user_id),
                state.users.as_ref(),
                state.posts.as_ref(),
            )
            .await
            .map_err(AuthenticationError)?
            .ok_or(AuthenticationError(IdentityError::Auth(
                AuthError::InvalidCredentials,
            )))?;

            req.extensions_mut().insert(CurrentUser(identity.user_id()));

            Ok(identity)
        })
    }
}

/// Optional identity extractor - anonymous instead of failing.
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Identity::from_request(req, payload);
        Box::pin(async move {
            match fut.await {
                Ok(identity) => Ok(OptionalIdentity(Some(identity))),
                Err(_) => Ok(OptionalIdentity(None)),
            }
        })
    }
}
