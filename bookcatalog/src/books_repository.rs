use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use in_memory_books_repository::InMemoryBookRepository;
pub use mongo_books_repository::{MongoBooksRepository, MongoBooksRepositoryConfig};
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{AuthorEntry, BookDetails, BookId, BookPatch, StoreId, StoredBook, YearEntry};
use crate::settings::{StoreBackend, StoreSettings};

mod in_memory_books_repository;
mod mongo_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Book {0} already exists")]
    AlreadyExists(BookId),

    #[error("Book id must not be empty")]
    EmptyId,

    #[error("No valid fields provided for update")]
    NoValidFields,

    #[error("Fixture book {book_id} matched {matches} stored documents")]
    SeedIntegrity { book_id: BookId, matches: usize },

    #[error("Failed to deserialize book: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("MongoDB failure {0}")]
    MongoFailure(#[from] mongodb::error::Error),

    #[error("Failed to encode bson document: {0}")]
    BsonEncoding(#[from] mongodb::bson::ser::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Stored representation of a book. Field names differ from the wire names,
/// partial updates are expressed in these names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct BookDocument {
    pub id: BookId,
    #[serde(rename = "bookname")]
    pub title: String,
    #[serde(rename = "bookauthor")]
    pub author: String,
    #[serde(rename = "bookedition")]
    pub edition: String,
    #[serde(rename = "bookpages")]
    pub pages: String,
    #[serde(rename = "bookyear")]
    pub year: String,
}

impl From<BookDetails> for BookDocument {
    fn from(details: BookDetails) -> Self {
        Self {
            id: details.id,
            title: details.title,
            author: details.author,
            edition: details.edition,
            pages: details.pages,
            year: details.year,
        }
    }
}

impl From<BookDocument> for BookDetails {
    fn from(document: BookDocument) -> Self {
        Self {
            id: document.id,
            title: document.title,
            author: document.author,
            edition: document.edition,
            pages: document.pages,
            year: document.year,
        }
    }
}

/// Field set applied by a partial update, in stored field names
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct BookDocumentPatch {
    #[serde(rename = "bookname", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "bookauthor", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "bookedition", skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(rename = "bookpages", skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(rename = "bookyear", skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl From<BookPatch> for BookDocumentPatch {
    fn from(patch: BookPatch) -> Self {
        Self {
            title: patch.title,
            author: patch.author,
            edition: patch.edition,
            pages: patch.pages,
            year: patch.year,
        }
    }
}

/// Access to the single book collection.
///
/// Backends implement the store primitives; the catalog operations used by the
/// handlers are provided on top of them. None of the provided operations is atomic:
/// `add_book` checks for an existing id and inserts in two round trips, and
/// `update_book` writes and reads back in two round trips.
#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Returns stored documents equal to the given book on every field
    async fn find_matching(
        &self,
        details: &BookDetails,
    ) -> Result<Vec<StoredBook>, BookRepositoryError>;
    /// Full scan of the collection, order is unspecified
    async fn list_books(&self) -> Result<Vec<StoredBook>, BookRepositoryError>;
    /// Retrieves the book with given id
    async fn get_book(&self, book_id: &str) -> Result<StoredBook, BookRepositoryError>;
    /// Inserts book without any checks, returns id assigned by the store
    async fn insert_book(&self, details: BookDetails) -> Result<StoreId, BookRepositoryError>;
    /// Sets given fields on one book with given id, returns false if no book matched
    async fn set_fields(
        &self,
        book_id: &str,
        patch: &BookDocumentPatch,
    ) -> Result<bool, BookRepositoryError>;
    /// Removes one book with given id, returns false if no book was removed
    async fn delete_book(&self, book_id: &str) -> Result<bool, BookRepositoryError>;

    /// Inserts every fixture that has no fully matching document yet.
    /// More than one match means the collection is corrupted.
    async fn seed(&self, fixtures: &[BookDetails]) -> Result<(), BookRepositoryError> {
        for fixture in fixtures {
            let matching = self.find_matching(fixture).await?;
            match matching.len() {
                0 => {
                    let store_id = self.insert_book(fixture.clone()).await?;
                    tracing::info!(book_id = %fixture.id, %store_id, "Inserted fixture book");
                }
                1 => {
                    tracing::info!(book_id = %fixture.id, store_id = %matching[0].store_id, "Fixture book already present");
                }
                matches => {
                    return Err(BookRepositoryError::SeedIntegrity {
                        book_id: fixture.id.clone(),
                        matches,
                    })
                }
            }
        }
        Ok(())
    }

    /// All books in wire representation
    async fn list_all(&self) -> Result<Vec<BookDetails>, BookRepositoryError> {
        Ok(self
            .list_books()
            .await?
            .into_iter()
            .map(|book| book.details)
            .collect())
    }

    /// Distinct author names, first seen first
    async fn list_authors(&self) -> Result<Vec<AuthorEntry>, BookRepositoryError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .map(|book| book.author)
            .unique()
            .map(|author_name| AuthorEntry { author_name })
            .collect())
    }

    /// Distinct publication years, first seen first
    async fn list_years(&self) -> Result<Vec<YearEntry>, BookRepositoryError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .map(|book| book.year)
            .unique()
            .map(|year| YearEntry { year })
            .collect())
    }

    /// Adds book after checking the id is set and not taken yet
    async fn add_book(&self, details: BookDetails) -> Result<StoredBook, BookRepositoryError> {
        if details.id.is_empty() {
            return Err(BookRepositoryError::EmptyId);
        }
        match self.get_book(&details.id).await {
            Ok(_) => return Err(BookRepositoryError::AlreadyExists(details.id)),
            Err(BookRepositoryError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        let store_id = self.insert_book(details.clone()).await?;
        Ok(StoredBook { store_id, details })
    }

    /// Applies recognized fields of the patch and returns the book as stored afterwards
    async fn update_book(
        &self,
        book_id: &str,
        patch: BookPatch,
    ) -> Result<StoredBook, BookRepositoryError> {
        if patch.is_empty() {
            return Err(BookRepositoryError::NoValidFields);
        }
        if !self.set_fields(book_id, &patch.into()).await? {
            return Err(BookRepositoryError::NotFound(book_id.to_string()));
        }
        self.get_book(book_id).await
    }
}

/// Connects to the configured store and makes sure the collection exists
pub async fn init_repository(settings: &StoreSettings) -> anyhow::Result<Arc<dyn BookRepository>> {
    let repository: Arc<dyn BookRepository> = match settings.backend {
        StoreBackend::InMemory => Arc::new(InMemoryBookRepository::default()),
        StoreBackend::Postgres => Arc::new(
            PostgresBooksRepository::init(PostgresBooksRepositoryConfig {
                hostname: settings.postgres.hostname.clone(),
                username: settings.postgres.username.clone(),
                password: settings.postgres.password.clone(),
                database: settings.database.clone(),
                collection: settings.collection.clone(),
            })
            .await
            .context("Failed to init postgres")?,
        ),
        StoreBackend::Mongodb => Arc::new(
            MongoBooksRepository::init(MongoBooksRepositoryConfig {
                uri: settings.mongodb.uri.clone(),
                database: settings.database.clone(),
                collection: settings.collection.clone(),
                connect_timeout: Duration::from_secs(settings.mongodb.connect_timeout_secs),
            })
            .await
            .context("Failed to init mongodb")?,
        ),
    };
    Ok(repository)
}

#[cfg(test)]
mod book_repository_tests {
    use crate::api::{BookDetails, BookPatch};
    use crate::books_repository::{
        BookDocument, BookDocumentPatch, BookRepository, BookRepositoryError,
        InMemoryBookRepository,
    };

    fn book(id: &str, author: &str, year: &str) -> BookDetails {
        BookDetails {
            id: id.to_string(),
            title: format!("Title of {}", id),
            author: author.to_string(),
            edition: "1st".to_string(),
            pages: "100".to_string(),
            year: year.to_string(),
        }
    }

    #[test]
    fn document_uses_stored_field_names() {
        let value = serde_json::to_value(BookDocument::from(book("b1", "A", "1900"))).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["bookauthor", "bookedition", "bookname", "bookpages", "bookyear", "id"]
        );

        let patch = BookDocumentPatch::from(BookPatch {
            title: Some("New Title".to_string()),
            ..BookPatch::default()
        });
        assert_eq!(
            serde_json::to_value(patch).unwrap(),
            serde_json::json!({"bookname": "New Title"})
        );
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repo = InMemoryBookRepository::default();
        let fixtures = vec![book("f1", "A", "1900"), book("f2", "B", "1901")];

        repo.seed(&fixtures).await.expect("Failed to seed");
        repo.seed(&fixtures).await.expect("Failed to seed again");

        assert_eq!(repo.list_books().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_inserts_changed_fixture_again() {
        let repo = InMemoryBookRepository::default();
        repo.seed(&[book("f1", "A", "1900")]).await.unwrap();

        let edited = BookDetails {
            pages: "101".to_string(),
            ..book("f1", "A", "1900")
        };
        repo.seed(&[edited]).await.unwrap();

        assert_eq!(repo.list_books().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_fails_on_duplicate_matches() {
        let repo = InMemoryBookRepository::default();
        let fixture = book("f1", "A", "1900");
        repo.insert_book(fixture.clone()).await.unwrap();
        repo.insert_book(fixture.clone()).await.unwrap();

        let result = repo.seed(&[fixture]).await;
        assert!(matches!(
            result,
            Err(BookRepositoryError::SeedIntegrity { matches: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_distinct_authors_and_years() {
        let repo = InMemoryBookRepository::default();
        for details in [
            book("b1", "A", "1900"),
            book("b2", "B", "1900"),
            book("b3", "A", "1901"),
        ] {
            repo.add_book(details).await.unwrap();
        }

        let mut authors: Vec<_> = repo
            .list_authors()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.author_name)
            .collect();
        authors.sort();
        assert_eq!(authors, vec!["A".to_string(), "B".to_string()]);

        let mut years: Vec<_> = repo
            .list_years()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.year)
            .collect();
        years.sort();
        assert_eq!(years, vec!["1900".to_string(), "1901".to_string()]);
    }

    #[tokio::test]
    async fn test_add_book_validation() {
        let repo = InMemoryBookRepository::default();

        let result = repo.add_book(book("", "A", "1900")).await;
        assert!(matches!(result, Err(BookRepositoryError::EmptyId)));

        let stored = repo.add_book(book("b1", "A", "1900")).await.unwrap();
        assert_eq!(stored.details, book("b1", "A", "1900"));

        let result = repo.add_book(book("b1", "C", "2000")).await;
        assert!(matches!(result, Err(BookRepositoryError::AlreadyExists(id)) if id == "b1"));
        assert_eq!(repo.list_books().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_book() {
        let repo = InMemoryBookRepository::default();
        repo.add_book(book("b1", "A", "1900")).await.unwrap();

        let result = repo.update_book("b1", BookPatch::default()).await;
        assert!(matches!(result, Err(BookRepositoryError::NoValidFields)));

        let title_patch = BookPatch {
            title: Some("New Title".to_string()),
            ..BookPatch::default()
        };
        let result = repo.update_book("missing", title_patch.clone()).await;
        assert!(matches!(result, Err(BookRepositoryError::NotFound(..))));

        let updated = repo.update_book("b1", title_patch).await.unwrap();
        assert_eq!(
            updated.details,
            BookDetails {
                title: "New Title".to_string(),
                ..book("b1", "A", "1900")
            }
        );
        assert_eq!(repo.get_book("b1").await.unwrap(), updated);
    }
}
