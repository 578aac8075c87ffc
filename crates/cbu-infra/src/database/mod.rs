//! Database connection management and repositories.

pub mod memory;

#[cfg(feature = "postgres")]
mod connections;

#[cfg(feature = "postgres")]
mod postgres_base;

#[cfg(feature = "postgres")]
pub mod postgres_repo;

#[cfg(feature = "postgres")]
pub mod entity;

#[cfg(feature = "postgres")]
pub use connections::{DatabaseConfig, connect};

#[cfg(feature = "postgres")]
pub use postgres_repo::{
    PostgresActivityRepository, PostgresPostRepository, PostgresProjectRepository,
    PostgresRoleRepository, PostgresUserRepository,
};
