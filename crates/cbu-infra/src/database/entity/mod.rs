//! SeaORM entities and their domain conversions.

pub mod activity;
pub mod post;
pub mod project;
pub mod role;
pub mod user;
