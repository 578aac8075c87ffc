//! HTTP handlers, grouped into registerable blueprints.
//!
//! Each blueprint is a plain route-configuration function; the default set is
//! registered in a fixed order at startup so the route table is predictable
//! across deployments.

mod facebook;
mod frontend;
mod media;
mod posts;
mod projects;
mod stream;
mod stripe;
mod twitter;
mod users;

use actix_web::web;

/// One registerable group of routes.
pub type Blueprint = fn(&mut web::ServiceConfig);

/// Default blueprint set, in registration order.
pub const DEFAULT_BLUEPRINTS: &[(&str, Blueprint)] = &[
    ("frontend", frontend::routes),
    ("posts", posts::routes),
    ("projects", projects::routes),
    ("facebook", facebook::routes),
    ("twitter", twitter::routes),
    ("stripe", stripe::routes),
    ("stream", stream::routes),
    ("users", users::routes),
    ("media", media::routes),
];

/// Register every default blueprint on the application.
pub fn register_blueprints(cfg: &mut web::ServiceConfig) {
    for (name, routes) in DEFAULT_BLUEPRINTS {
        tracing::debug!(blueprint = name, "Registering blueprint");
        routes(cfg);
    }
}
