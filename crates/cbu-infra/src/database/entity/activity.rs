//! Activity stream entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub actor_id: Uuid,
    pub project_id: Option<Uuid>,
    pub verb: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for cbu_core::domain::Activity {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            actor_id: model.actor_id,
            project_id: model.project_id,
            verb: model.verb,
            message: model.message,
            created_at: model.created_at.into(),
        }
    }
}

impl From<cbu_core::domain::Activity> for ActiveModel {
    fn from(activity: cbu_core::domain::Activity) -> Self {
        Self {
            id: Set(activity.id),
            actor_id: Set(activity.actor_id),
            project_id: Set(activity.project_id),
            verb: Set(activity.verb),
            message: Set(activity.message),
            created_at: Set(activity.created_at.into()),
        }
    }
}
