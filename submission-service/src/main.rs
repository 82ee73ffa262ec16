use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::filter::EnvFilter;

use submission_service::config::Config;
use submission_service::cors::build_cors;
use submission_service::handlers;
use submission_service::store::{PgSubmissionStore, SubmissionStore};

fn startup_error(err: submission_service::Error) -> std::io::Error {
    tracing::error!("Failed to initialize API server: {}", err);
    std::io::Error::other(err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().map_err(startup_error)?;

    let pg_store = Arc::new(PgSubmissionStore::connect(&config).map_err(startup_error)?);
    pg_store.initialize().await.map_err(startup_error)?;

    let store: web::Data<dyn SubmissionStore> =
        web::Data::from(pg_store.clone() as Arc<dyn SubmissionStore>);
    let allowed_origins = config.allowed_origins.clone();

    tracing::info!("Starting submission-service on port {}", config.port);

    // Resolves after SIGINT/SIGTERM once the workers have drained.
    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&allowed_origins))
            .app_data(store.clone())
            .configure(handlers::configure)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    pg_store.close().await;
    tracing::info!("Database pool closed, submission-service stopped");
    Ok(())
}
