use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::api::{BookDetails, StoreId, StoredBook};
use crate::books_repository::{
    BookDocument, BookDocumentPatch, BookRepository, BookRepositoryError,
};

#[derive(Default)]
pub struct InMemoryBookRepository {
    store_sequence_generator: AtomicI32,
    books: parking_lot::RwLock<HashMap<StoreId, BookDocument>>,
}

fn to_stored_book(store_id: &StoreId, document: &BookDocument) -> StoredBook {
    StoredBook {
        store_id: store_id.clone(),
        details: document.clone().into(),
    }
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn find_matching(
        &self,
        details: &BookDetails,
    ) -> Result<Vec<StoredBook>, BookRepositoryError> {
        let expected = BookDocument::from(details.clone());
        Ok(self
            .books
            .read()
            .iter()
            .filter(|(_, document)| **document == expected)
            .map(|(store_id, document)| to_stored_book(store_id, document))
            .collect())
    }

    async fn list_books(&self) -> Result<Vec<StoredBook>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .iter()
            .map(|(store_id, document)| to_stored_book(store_id, document))
            .collect())
    }

    async fn get_book(&self, book_id: &str) -> Result<StoredBook, BookRepositoryError> {
        self.books
            .read()
            .iter()
            .find(|(_, document)| document.id == book_id)
            .map(|(store_id, document)| to_stored_book(store_id, document))
            .ok_or_else(|| BookRepositoryError::NotFound(book_id.to_string()))
    }

    async fn insert_book(&self, details: BookDetails) -> Result<StoreId, BookRepositoryError> {
        let store_id = self
            .store_sequence_generator
            .fetch_add(1, Ordering::Relaxed)
            .to_string();
        self.books
            .write()
            .insert(store_id.clone(), BookDocument::from(details));
        Ok(store_id)
    }

    async fn set_fields(
        &self,
        book_id: &str,
        patch: &BookDocumentPatch,
    ) -> Result<bool, BookRepositoryError> {
        let mut locked_books = self.books.write();
        if let Some(document) = locked_books
            .values_mut()
            .find(|document| document.id == book_id)
        {
            let mut result_document = serde_json::to_value(&*document)?;
            json_patch::merge(&mut result_document, &serde_json::to_value(patch)?);
            *document = serde_json::from_value(result_document)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn delete_book(&self, book_id: &str) -> Result<bool, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let store_id = locked_books
            .iter()
            .find(|(_, document)| document.id == book_id)
            .map(|(store_id, _)| store_id.clone());
        Ok(match store_id {
            Some(store_id) => locked_books.remove(&store_id).is_some(),
            None => false,
        })
    }
}
