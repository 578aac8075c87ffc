//! Domain entities.

mod activity;
mod post;
mod project;
mod role;
mod user;

pub use activity::Activity;
pub use post::Post;
pub use project::Project;
pub use role::Role;
pub use user::User;
