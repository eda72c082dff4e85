use actix_web::{App, HttpServer};
use anyhow::Context;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;

use bookcatalog::app_config::{config_app, config_pages, json_config};
use bookcatalog::books_repository::init_repository;
use bookcatalog::fixtures::{default_fixtures, load_fixtures};
use bookcatalog::pages::PageRenderer;
use bookcatalog::settings::Settings;
use bookcatalog::telemetry::{init_telemetry, shutdown_telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_telemetry(&settings.telemetry)?;

    let books_repository = init_repository(&settings.store).await?;

    if settings.seed.enabled {
        let fixtures = match &settings.seed.fixtures_path {
            Some(path) => load_fixtures(path)?,
            None => default_fixtures(),
        };
        books_repository
            .seed(&fixtures)
            .await
            .context("Failed to seed fixture books")?;
    }

    let renderer = web::Data::new(PageRenderer::new(&settings.server.templates_dir)?);
    let static_dir = settings.server.static_dir.clone();

    tracing::info!(
        "starting HTTP server at http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(books_repository.clone()))
            .app_data(renderer.clone())
            .app_data(json_config())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
            .configure(config_pages)
            .service(actix_files::Files::new("/css", &static_dir))
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await?;

    shutdown_telemetry(&settings.telemetry);
    Ok(())
}
