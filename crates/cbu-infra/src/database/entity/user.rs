//! User entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    /// Role names, stored as a JSON array.
    pub roles: Json,
    pub facebook_token: Option<String>,
    pub twitter_token: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for cbu_core::domain::User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            display_name: model.display_name,
            password_hash: model.password_hash,
            roles: serde_json::from_value(model.roles).unwrap_or_default(),
            facebook_token: model.facebook_token,
            twitter_token: model.twitter_token,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<cbu_core::domain::User> for ActiveModel {
    fn from(user: cbu_core::domain::User) -> Self {
        Self {
            id: Set(user.id),
            email: Set(user.email),
            display_name: Set(user.display_name),
            password_hash: Set(user.password_hash),
            roles: Set(serde_json::json!(user.roles)),
            facebook_token: Set(user.facebook_token),
            twitter_token: Set(user.twitter_token),
            created_at: Set(user.created_at.into()),
            updated_at: Set(user.updated_at.into()),
        }
    }
}
