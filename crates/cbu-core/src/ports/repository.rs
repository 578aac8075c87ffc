use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Activity, Post, Project, Role, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific lookups.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find every user with this email address.
    ///
    /// Email is supposed to be unique, but the store is not trusted on that:
    /// the identity layer treats more than one match as fatal, so duplicates
    /// must be surfaced here rather than collapsed to a single record.
    async fn find_by_email(&self, email: &str) -> Result<Vec<User>, RepoError>;
}

/// Role repository.
#[async_trait]
pub trait RoleRepository: BaseRepository<Role, Uuid> {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Every post authored by this user, newest first.
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError>;

    /// Public posts, newest first.
    async fn list_public(&self, limit: u64) -> Result<Vec<Post>, RepoError>;
}

/// Project repository.
#[async_trait]
pub trait ProjectRepository: BaseRepository<Project, Uuid> {
    /// Projects the user is a member of.
    async fn find_by_member(&self, user_id: Uuid) -> Result<Vec<Project>, RepoError>;

    /// All projects, newest first.
    async fn list(&self, limit: u64) -> Result<Vec<Project>, RepoError>;
}

/// Activity stream repository.
#[async_trait]
pub trait ActivityRepository: BaseRepository<Activity, Uuid> {
    /// Most recent events, newest first.
    async fn recent(&self, limit: u64) -> Result<Vec<Activity>, RepoError>;

    /// Most recent events scoped to one project, newest first.
    async fn recent_for_project(
        &self,
        project_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Activity>, RepoError>;

    /// Most recent events by one actor, newest first.
    async fn recent_for_actor(
        &self,
        actor_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Activity>, RepoError>;
}
