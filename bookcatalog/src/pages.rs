use std::sync::Arc;

use actix_web::http::header::ContentType;
use actix_web::web::Data;
use actix_web::HttpResponse;
use anyhow::Context;
use serde::Serialize;

use crate::books_repository::BookRepository;

pub const INDEX: &str = "index.html";
pub const BOOK_TABLE: &str = "book-table.html";
pub const AUTHOR_TABLE: &str = "author-table.html";
pub const YEAR_TABLE: &str = "year-table.html";
pub const SEARCH_BAR: &str = "search-bar.html";

/// Renders named html templates. The data handed to a template is available as `items`.
pub struct PageRenderer {
    tera: tera::Tera,
}

impl PageRenderer {
    /// Loads every `*.html` template below `templates_dir`
    pub fn new(templates_dir: &str) -> anyhow::Result<Self> {
        let tera = tera::Tera::new(&format!("{}/**/*.html", templates_dir))
            .with_context(|| format!("Failed to load templates from {}", templates_dir))?;
        tracing::info!(
            templates = ?tera.get_template_names().collect::<Vec<_>>(),
            "Loaded page templates"
        );
        Ok(Self { tera })
    }

    pub fn from_tera(tera: tera::Tera) -> Self {
        Self { tera }
    }

    pub fn render<T: Serialize + ?Sized>(
        &self,
        template: &str,
        items: &T,
    ) -> Result<String, tera::Error> {
        let mut context = tera::Context::new();
        context.insert("items", items);
        self.tera.render(template, &context)
    }
}

fn render_page<T: Serialize + ?Sized>(
    renderer: &PageRenderer,
    template: &str,
    items: &T,
) -> HttpResponse {
    match renderer.render(template, items) {
        Ok(body) => HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(body),
        Err(err) => {
            tracing::error!(template, "Rendering page failed {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn index(renderer: Data<PageRenderer>) -> HttpResponse {
    render_page(&renderer, INDEX, &serde_json::Value::Null)
}

pub async fn books(
    renderer: Data<PageRenderer>,
    books_repository: Data<Arc<dyn BookRepository>>,
) -> HttpResponse {
    match books_repository.list_all().await {
        Ok(books) => render_page(&renderer, BOOK_TABLE, &books),
        Err(err) => {
            tracing::error!("Get all books failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn authors(
    renderer: Data<PageRenderer>,
    books_repository: Data<Arc<dyn BookRepository>>,
) -> HttpResponse {
    match books_repository.list_authors().await {
        Ok(authors) => render_page(&renderer, AUTHOR_TABLE, &authors),
        Err(err) => {
            tracing::error!("Get all authors failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn years(
    renderer: Data<PageRenderer>,
    books_repository: Data<Arc<dyn BookRepository>>,
) -> HttpResponse {
    match books_repository.list_years().await {
        Ok(years) => render_page(&renderer, YEAR_TABLE, &years),
        Err(err) => {
            tracing::error!("Get all years failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn search(renderer: Data<PageRenderer>) -> HttpResponse {
    render_page(&renderer, SEARCH_BAR, &serde_json::Value::Null)
}

/// Placeholder, there is no create form yet
pub async fn create() -> HttpResponse {
    HttpResponse::NoContent().finish()
}
