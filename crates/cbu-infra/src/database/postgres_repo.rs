//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use cbu_core::domain::{Activity, Post, Project, Role, User};
use cbu_core::error::RepoError;
use cbu_core::ports::{
    ActivityRepository, PostRepository, ProjectRepository, RoleRepository, UserRepository,
};

use super::entity::activity::{self, Entity as ActivityEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::project::{Entity as ProjectEntity};
use super::entity::role::{self, Entity as RoleEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::PostgresBaseRepository;

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL role repository.
pub type PostgresRoleRepository = PostgresBaseRepository<RoleEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL project repository.
pub type PostgresProjectRepository = PostgresBaseRepository<ProjectEntity>;

/// PostgreSQL activity repository.
pub type PostgresActivityRepository = PostgresBaseRepository<ActivityEntity>;

/// Mask an email address for logging to avoid PII in logs.
fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        let masked_local = if local.len() > 1 {
            format!("{}***", &local[..1])
        } else {
            "***".to_string()
        };
        format!("{masked_local}{domain}")
    } else {
        "***".to_string()
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Vec<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        // All matches, not just one: the identity layer has to see duplicates.
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepoError> {
        let result = RoleEntity::find()
            .filter(role::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .order_by_desc(post::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn list_public(&self, limit: u64) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Public.eq(true))
            .order_by_desc(post::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn find_by_member(&self, user_id: Uuid) -> Result<Vec<Project>, RepoError> {
        // Membership lives in a JSON array column; filter after fetch.
        let result = ProjectEntity::find()
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result
            .into_iter()
            .map(Project::from)
            .filter(|p| p.is_member(user_id))
            .collect())
    }

    async fn list(&self, limit: u64) -> Result<Vec<Project>, RepoError> {
        use super::entity::project;

        let result = ProjectEntity::find()
            .order_by_desc(project::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ActivityRepository for PostgresActivityRepository {
    async fn recent(&self, limit: u64) -> Result<Vec<Activity>, RepoError> {
        let result = ActivityEntity::find()
            .order_by_desc(activity::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn recent_for_project(
        &self,
        project_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Activity>, RepoError> {
        let result = ActivityEntity::find()
            .filter(activity::Column::ProjectId.eq(project_id))
            .order_by_desc(activity::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn recent_for_actor(
        &self,
        actor_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Activity>, RepoError> {
        let result = ActivityEntity::find()
            .filter(activity::Column::ActorId.eq(actor_id))
            .order_by_desc(activity::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod unit {
    use super::mask_email;

    #[test]
    fn masks_local_part() {
        assert_eq!(mask_email("alice@example.org"), "a***@example.org");
        assert_eq!(mask_email("a@example.org"), "***@example.org");
        assert_eq!(mask_email("not-an-email"), "***");
    }
}
