use actix_web::error::InternalError;
use actix_web::HttpResponse;
use paperclip::actix::web;

use crate::api::ErrorResponse;
use crate::{handlers, pages};

/// Routes of the json api, described in the OpenAPI spec
pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(
                    web::resource("/books")
                        .route(web::get().to(handlers::get_all_books))
                        .route(web::post().to(handlers::add_book)),
                )
                .service(
                    web::resource("/books/{book_id}")
                        .route(web::put().to(handlers::update_book))
                        .route(web::delete().to(handlers::delete_book)),
                ),
        );
}

/// Server rendered pages
pub fn config_pages(cfg: &mut actix_web::web::ServiceConfig) {
    use actix_web::web;

    cfg.route("/", web::get().to(pages::index))
        .route("/books", web::get().to(pages::books))
        .route("/authors", web::get().to(pages::authors))
        .route("/years", web::get().to(pages::years))
        .route("/search", web::get().to(pages::search))
        .route("/create", web::get().to(pages::create));
}

/// Malformed or wrongly typed json bodies are answered with 400 and a short message
pub fn json_config() -> actix_web::web::JsonConfig {
    actix_web::web::JsonConfig::default().error_handler(|err, _req| {
        tracing::warn!("Invalid request payload {}", err);
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ErrorResponse::new("Invalid request payload")),
        )
        .into()
    })
}
