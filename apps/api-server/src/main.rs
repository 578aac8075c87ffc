//! # CBU API Server
//!
//! Entry point: loads configuration, wires logging, builds the shared state,
//! and registers every blueprint on the Actix-web server.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod handlers;
mod logging;
mod middleware;
mod observability;
mod pages;
mod settings;
mod state;

use observability::RequestIdMiddleware;
use settings::Settings;
use state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    logging::init(&settings)?;

    let debug = settings.debug;
    let host = settings.server.host.clone();
    let port = settings.server.port;

    let debug_enabled = debug;
    tracing::info!(%host, port, debug = debug_enabled, "Starting CBU API server");

    let state = AppState::new(settings).await?;

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(pages::error_pages(debug))
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::register_blueprints)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
