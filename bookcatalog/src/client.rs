use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use crate::api::{BookDetails, BookPatch, ErrorResponse, StoredBook};

/// Outcome of a create call that the api answers with a client error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddBookError {
    Invalid(String),
    AlreadyExists(String),
}

pub struct BookCatalogClient {
    url: String,
    client: ClientWithMiddleware,
}

async fn error_message(response: reqwest::Response) -> String {
    response
        .json::<ErrorResponse>()
        .await
        .map(|error| error.error)
        .unwrap_or_default()
}

impl BookCatalogClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Calls GET /api/books endpoint
    pub async fn list_books(&self) -> anyhow::Result<Vec<BookDetails>> {
        let response = self
            .client
            .get(format!("{}/api/books", self.url))
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Failed to list books {}", error_message(response).await)
        }
        Ok(response.json().await?)
    }

    /// Calls POST /api/books endpoint
    /// Returns the created book, or the reason a 400/409 was returned
    pub async fn add_book(
        &self,
        book_details: &BookDetails,
    ) -> anyhow::Result<Result<StoredBook, AddBookError>> {
        let response = self
            .client
            .post(format!("{}/api/books", self.url))
            .json(book_details)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => Ok(Ok(response.json().await?)),
            StatusCode::BAD_REQUEST => Ok(Err(AddBookError::Invalid(
                error_message(response).await,
            ))),
            StatusCode::CONFLICT => Ok(Err(AddBookError::AlreadyExists(
                error_message(response).await,
            ))),
            status => bail!(
                "Failed to add book {} {}",
                status,
                error_message(response).await
            ),
        }
    }

    /// Calls PUT /api/books/{book_id} endpoint
    /// Returns None if the book was not found
    pub async fn update_book(
        &self,
        book_id: &str,
        patch: &BookPatch,
    ) -> anyhow::Result<Option<StoredBook>> {
        let response = self
            .client
            .put(format!("{}/api/books/{}", self.url, book_id))
            .json(patch)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            bail!("Failed to update book {}", error_message(response).await)
        }
    }

    /// Calls DELETE /api/books/{book_id} endpoint
    /// Returns false if the book was not found
    pub async fn delete_book(&self, book_id: &str) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/api/books/{}", self.url, book_id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            bail!("Failed to delete book {}", error_message(response).await)
        }
    }
}
