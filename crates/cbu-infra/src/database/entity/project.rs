//! Project entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Member user ids, stored as a JSON array.
    pub members: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for cbu_core::domain::Project {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            description: model.description,
            members: serde_json::from_value(model.members).unwrap_or_default(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<cbu_core::domain::Project> for ActiveModel {
    fn from(project: cbu_core::domain::Project) -> Self {
        Self {
            id: Set(project.id),
            owner_id: Set(project.owner_id),
            name: Set(project.name),
            description: Set(project.description),
            members: Set(serde_json::json!(project.members)),
            created_at: Set(project.created_at.into()),
            updated_at: Set(project.updated_at.into()),
        }
    }
}
