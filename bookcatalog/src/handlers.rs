use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{BookDetails, BookId, BookPatch, ErrorResponse};
use crate::books_repository::{BookRepository, BookRepositoryError};

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn get_all_books(
    books_repository: Data<Arc<dyn BookRepository>>,
) -> Result<HttpResponse, Error> {
    Ok(match books_repository.list_all().await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => {
            tracing::error!("Get all books failed {}", err);
            HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to list books"))
        }
    })
}

#[api_v2_operation]
pub async fn add_book(
    books_repository: Data<Arc<dyn BookRepository>>,
    details: web::Json<BookDetails>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository.add_book(details.into_inner()).await {
            Ok(book) => HttpResponse::Created()
                .append_header((LOCATION, format!("/api/books/{}", book.details.id)))
                .json(book),
            Err(BookRepositoryError::EmptyId) => {
                HttpResponse::BadRequest().json(ErrorResponse::new("Book id must not be empty"))
            }
            Err(BookRepositoryError::AlreadyExists(book_id)) => HttpResponse::Conflict().json(
                ErrorResponse::new(format!("Book with ID {} already exists", book_id)),
            ),
            Err(err) => {
                tracing::error!("Add book failed {}", err);
                HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to create book"))
            }
        },
    )
}

#[api_v2_operation]
pub async fn update_book(
    books_repository: Data<Arc<dyn BookRepository>>,
    book_id: web::Path<BookId>,
    patch: web::Json<BookPatch>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    Ok(
        match books_repository
            .update_book(&book_id, patch.into_inner())
            .await
        {
            Ok(book) => HttpResponse::Ok().json(book),
            Err(BookRepositoryError::NoValidFields) => HttpResponse::BadRequest()
                .json(ErrorResponse::new("No valid fields provided for update")),
            Err(BookRepositoryError::NotFound(_)) => HttpResponse::NotFound().json(
                ErrorResponse::new(format!("Book not found with ID {}", book_id)),
            ),
            Err(err) => {
                tracing::error!(%book_id, "Update book failed {}", err);
                HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to update book"))
            }
        },
    )
}

#[api_v2_operation]
pub async fn delete_book(
    books_repository: Data<Arc<dyn BookRepository>>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    Ok(match books_repository.delete_book(&book_id).await {
        Ok(true) => HttpResponse::Ok().finish(),
        Ok(false) => HttpResponse::NotFound().json(ErrorResponse::new(format!(
            "Book not found with ID {}",
            book_id
        ))),
        Err(err) => {
            tracing::error!(%book_id, "Delete book failed {}", err);
            HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to delete book"))
        }
    })
}
