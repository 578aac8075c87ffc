//! Application state - shared across all handlers.
//!
//! Assembly order matters: the database comes before the security services
//! that read from it, and mail comes before security so password-reset
//! delivery is available when the user handlers are wired.

use std::sync::Arc;

use cbu_core::ports::{
    ActivityRepository, Mailer, PasswordService, PostRepository, ProjectRepository,
    RoleRepository, TokenService, UserRepository,
};
use cbu_infra::Argon2PasswordService;
use cbu_infra::auth::{JwtConfig, JwtTokenService};
use cbu_infra::crypto::{TokenCipher, assemble_key, derive_key};
use cbu_infra::database::memory::InMemoryStore;
use cbu_infra::mail::{LogMailer, MailConfig, SmtpMailer};
use cbu_infra::uploads::{IMAGES, UploadSet};

use crate::settings::Settings;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub activities: Arc<dyn ActivityRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    /// Token cipher over the assembled local+remote key; None when the
    /// ENCRYPTION section is absent (social/payment token storage disabled).
    pub cipher: Option<TokenCipher>,
    pub photos: Arc<UploadSet>,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    posts: Arc<dyn PostRepository>,
    projects: Arc<dyn ProjectRepository>,
    activities: Arc<dyn ActivityRepository>,
}

fn in_memory_repositories() -> Repositories {
    let store = InMemoryStore::new();
    Repositories {
        users: store.users,
        roles: store.roles,
        posts: store.posts,
        projects: store.projects,
        activities: store.activities,
    }
}

#[cfg(feature = "postgres")]
async fn build_repositories(settings: &Settings) -> Repositories {
    use cbu_infra::database::{
        DatabaseConfig, PostgresActivityRepository, PostgresPostRepository,
        PostgresProjectRepository, PostgresRoleRepository, PostgresUserRepository, connect,
    };

    let Some(db) = &settings.database else {
        tracing::warn!("DATABASE not configured. Running with in-memory repositories.");
        return in_memory_repositories();
    };

    let config = DatabaseConfig {
        url: db.url.clone(),
        max_connections: db.max_connections,
        min_connections: db.min_connections,
    };

    match connect(&config).await {
        Ok(conn) => Repositories {
            users: Arc::new(PostgresUserRepository::new(conn.clone())),
            roles: Arc::new(PostgresRoleRepository::new(conn.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn.clone())),
            projects: Arc::new(PostgresProjectRepository::new(conn.clone())),
            activities: Arc::new(PostgresActivityRepository::new(conn)),
        },
        Err(e) => {
            tracing::error!("Failed to connect to database: {e}. Using in-memory fallback.");
            in_memory_repositories()
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_repositories(_settings: &Settings) -> Repositories {
    tracing::info!("Built without postgres feature - using in-memory repositories");
    in_memory_repositories()
}

fn build_mailer(settings: &Settings) -> Arc<dyn Mailer> {
    match &settings.mail {
        Some(mail) => {
            let config = MailConfig {
                server: mail.server.clone(),
                port: mail.port,
                username: mail.username.clone(),
                password: mail.password.clone(),
                sender: mail.sender.clone(),
            };
            match SmtpMailer::new(&config) {
                Ok(mailer) => {
                    tracing::info!(server = %mail.server, "Mail transport configured");
                    Arc::new(mailer)
                }
                Err(e) => {
                    tracing::error!("Mail transport setup failed: {e}. Logging mail instead.");
                    Arc::new(LogMailer::new())
                }
            }
        }
        None => {
            tracing::warn!("MAIL not configured. Outbound mail will only be logged.");
            Arc::new(LogMailer::new())
        }
    }
}

fn build_tokens(settings: &Settings) -> Arc<dyn TokenService> {
    if settings.security.secret_key == "change-me-in-production" {
        if settings.debug {
            tracing::warn!("Using default SECRET_KEY. Set SECURITY.SECRET_KEY for production.");
        } else {
            tracing::error!(
                "SECURITY: default SECRET_KEY in production! Set SECURITY.SECRET_KEY."
            );
        }
    }

    Arc::new(JwtTokenService::new(JwtConfig {
        secret: settings.security.secret_key.clone(),
        session_hours: settings.security.session_hours,
        reset_minutes: settings.security.reset_minutes,
        issuer: "cbu-api".to_string(),
    }))
}

/// Assemble the combined local+remote encryption key.
///
/// Remote fetch failure degrades to a local-only key in debug mode; in
/// production it aborts startup.
async fn build_cipher(settings: &Settings) -> anyhow::Result<Option<TokenCipher>> {
    let Some(enc) = &settings.encryption else {
        tracing::warn!("ENCRYPTION not configured. Third-party token storage disabled.");
        return Ok(None);
    };

    match assemble_key(&enc.local_key, &enc.remote_key_url).await {
        Ok(key) => Ok(Some(TokenCipher::new(key))),
        Err(e) if settings.debug => {
            tracing::warn!("Remote key fetch failed ({e}). Using local-only key in debug mode.");
            Ok(Some(TokenCipher::new(derive_key(&enc.local_key, ""))))
        }
        Err(e) => Err(anyhow::anyhow!("remote encryption key unavailable: {e}")),
    }
}

impl AppState {
    /// Build the application state in dependency order.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let repos = build_repositories(&settings).await;
        let mailer = build_mailer(&settings);
        let tokens = build_tokens(&settings);
        let cipher = build_cipher(&settings).await?;
        let photos = Arc::new(UploadSet::new(
            "photos",
            settings.uploads.folder.clone(),
            IMAGES,
        ));

        tracing::info!("Application state initialized");

        Ok(Self {
            settings: Arc::new(settings),
            users: repos.users,
            roles: repos.roles,
            posts: repos.posts,
            projects: repos.projects,
            activities: repos.activities,
            mailer,
            tokens,
            passwords: Arc::new(Argon2PasswordService::new()),
            cipher,
            photos,
        })
    }

    /// In-memory state for handler tests: no database, no network, cipher
    /// derived from the local key only.
    #[cfg(test)]
    pub fn for_tests(settings: Settings) -> Self {
        let repos = in_memory_repositories();
        let tokens = build_tokens(&settings);
        let cipher = settings
            .encryption
            .as_ref()
            .map(|enc| TokenCipher::new(derive_key(&enc.local_key, "")));
        let photos = Arc::new(UploadSet::new(
            "photos",
            settings.uploads.folder.clone(),
            IMAGES,
        ));

        Self {
            settings: Arc::new(settings),
            users: repos.users,
            roles: repos.roles,
            posts: repos.posts,
            projects: repos.projects,
            activities: repos.activities,
            mailer: Arc::new(LogMailer::new()),
            tokens,
            passwords: Arc::new(Argon2PasswordService::new()),
            cipher,
            photos,
        }
    }
}
