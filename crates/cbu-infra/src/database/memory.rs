//! In-memory repositories - used when no database is configured and as the
//! backing store in tests. Data is lost on process restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use cbu_core::domain::{Activity, Post, Project, Role, User};
use cbu_core::error::RepoError;
use cbu_core::ports::{
    ActivityRepository, BaseRepository, PostRepository, ProjectRepository, RoleRepository,
    UserRepository,
};

/// Shared table: an async RwLock around a HashMap keyed by entity id.
struct MemTable<T> {
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T: Clone> MemTable<T> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, id: Uuid) -> Option<T> {
        self.rows.read().await.get(&id).cloned()
    }

    async fn put(&self, id: Uuid, row: T) {
        self.rows.write().await.insert(id, row);
    }

    async fn remove(&self, id: Uuid) -> bool {
        self.rows.write().await.remove(&id).is_some()
    }

    async fn collect<F>(&self, mut keep: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| keep(row))
            .cloned()
            .collect()
    }
}

/// In-memory user repository.
pub struct InMemoryUsers {
    table: MemTable<User>,
}

/// In-memory role repository.
pub struct InMemoryRoles {
    table: MemTable<Role>,
}

/// In-memory post repository.
pub struct InMemoryPosts {
    table: MemTable<Post>,
}

/// In-memory project repository.
pub struct InMemoryProjects {
    table: MemTable<Project>,
}

/// In-memory activity repository.
pub struct InMemoryActivities {
    table: MemTable<Activity>,
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.table.get(id).await)
    }

    async fn save(&self, entity: User) -> Result<User, RepoError> {
        self.table.put(entity.id, entity.clone()).await;
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.table.remove(id).await {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_email(&self, email: &str) -> Result<Vec<User>, RepoError> {
        Ok(self.table.collect(|u| u.email == email).await)
    }
}

#[async_trait]
impl BaseRepository<Role, Uuid> for InMemoryRoles {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>, RepoError> {
        Ok(self.table.get(id).await)
    }

    async fn save(&self, entity: Role) -> Result<Role, RepoError> {
        self.table.put(entity.id, entity.clone()).await;
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.table.remove(id).await {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoles {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepoError> {
        Ok(self.table.collect(|r| r.name == name).await.pop())
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.table.get(id).await)
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        self.table.put(entity.id, entity.clone()).await;
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.table.remove(id).await {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPosts {
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        let mut posts = self.table.collect(|p| p.author_id == author_id).await;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn list_public(&self, limit: u64) -> Result<Vec<Post>, RepoError> {
        let mut posts = self.table.collect(|p| p.public).await;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit as usize);
        Ok(posts)
    }
}

#[async_trait]
impl BaseRepository<Project, Uuid> for InMemoryProjects {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, RepoError> {
        Ok(self.table.get(id).await)
    }

    async fn save(&self, entity: Project) -> Result<Project, RepoError> {
        self.table.put(entity.id, entity.clone()).await;
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.table.remove(id).await {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjects {
    async fn find_by_member(&self, user_id: Uuid) -> Result<Vec<Project>, RepoError> {
        Ok(self.table.collect(|p| p.is_member(user_id)).await)
    }

    async fn list(&self, limit: u64) -> Result<Vec<Project>, RepoError> {
        let mut projects = self.table.collect(|_| true).await;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects.truncate(limit as usize);
        Ok(projects)
    }
}

#[async_trait]
impl BaseRepository<Activity, Uuid> for InMemoryActivities {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Activity>, RepoError> {
        Ok(self.table.get(id).await)
    }

    async fn save(&self, entity: Activity) -> Result<Activity, RepoError> {
        self.table.put(entity.id, entity.clone()).await;
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.table.remove(id).await {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivities {
    async fn recent(&self, limit: u64) -> Result<Vec<Activity>, RepoError> {
        let mut events = self.table.collect(|_| true).await;
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit as usize);
        Ok(events)
    }

    async fn recent_for_project(
        &self,
        project_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Activity>, RepoError> {
        let mut events = self
            .table
            .collect(|a| a.project_id == Some(project_id))
            .await;
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit as usize);
        Ok(events)
    }

    async fn recent_for_actor(
        &self,
        actor_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Activity>, RepoError> {
        let mut events = self.table.collect(|a| a.actor_id == actor_id).await;
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit as usize);
        Ok(events)
    }
}

/// The full set of in-memory repositories, ready to drop into app state.
pub struct InMemoryStore {
    pub users: Arc<InMemoryUsers>,
    pub roles: Arc<InMemoryRoles>,
    pub posts: Arc<InMemoryPosts>,
    pub projects: Arc<InMemoryProjects>,
    pub activities: Arc<InMemoryActivities>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(InMemoryUsers {
                table: MemTable::new(),
            }),
            roles: Arc::new(InMemoryRoles {
                table: MemTable::new(),
            }),
            posts: Arc::new(InMemoryPosts {
                table: MemTable::new(),
            }),
            projects: Arc::new(InMemoryProjects {
                table: MemTable::new(),
            }),
            activities: Arc::new(InMemoryActivities {
                table: MemTable::new(),
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
