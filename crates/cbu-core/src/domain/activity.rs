use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Activity entity - one event in the site-wide or per-project stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub project_id: Option<Uuid>,
    /// Short verb describing the event ("created-post", "joined-project", ...).
    pub verb: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(actor_id: Uuid, verb: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            project_id: None,
            verb: verb.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn for_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }
}
