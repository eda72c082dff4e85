use std::time::Duration;

use anyhow::Context;
use futures_util::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use crate::api::{BookDetails, StoreId, StoredBook};
use crate::books_repository::{
    BookDocument, BookDocumentPatch, BookRepository, BookRepositoryError,
};

pub struct MongoBooksRepository {
    collection: Collection<MongoBookDocument>,
}

pub struct MongoBooksRepositoryConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoBookDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    store_id: Option<ObjectId>,
    #[serde(flatten)]
    fields: BookDocument,
}

impl TryFrom<MongoBookDocument> for StoredBook {
    type Error = BookRepositoryError;

    fn try_from(document: MongoBookDocument) -> Result<Self, Self::Error> {
        let store_id = document
            .store_id
            .ok_or_else(|| BookRepositoryError::Other("Document without _id".to_string()))?;
        Ok(StoredBook {
            store_id: store_id.to_hex(),
            details: document.fields.into(),
        })
    }
}

fn by_book_id(book_id: &str) -> Document {
    doc! { "id": book_id }
}

impl MongoBooksRepository {
    pub async fn init(config: MongoBooksRepositoryConfig) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .context("Failed to parse mongodb uri")?;
        options.app_name = Some("bookcatalog".to_string());
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);

        let client = Client::with_options(options).context("Failed to create mongodb client")?;
        let database = client.database(&config.database);

        let names = database
            .list_collection_names(None)
            .await
            .context("Failed to list collections")?;
        if !names.contains(&config.collection) {
            tracing::info!(collection = %config.collection, "Creating collection");
            database
                .create_collection(&config.collection, None)
                .await
                .context("Failed to create collection")?;
        }

        Ok(Self {
            collection: database.collection(&config.collection),
        })
    }

    async fn find_books(&self, filter: Document) -> Result<Vec<StoredBook>, BookRepositoryError> {
        let documents: Vec<MongoBookDocument> =
            self.collection.find(filter, None).await?.try_collect().await?;
        documents.into_iter().map(StoredBook::try_from).collect()
    }
}

#[async_trait::async_trait]
impl BookRepository for MongoBooksRepository {
    async fn find_matching(
        &self,
        details: &BookDetails,
    ) -> Result<Vec<StoredBook>, BookRepositoryError> {
        let filter = mongodb::bson::to_document(&BookDocument::from(details.clone()))?;
        self.find_books(filter).await
    }

    async fn list_books(&self) -> Result<Vec<StoredBook>, BookRepositoryError> {
        self.find_books(doc! {}).await
    }

    async fn get_book(&self, book_id: &str) -> Result<StoredBook, BookRepositoryError> {
        self.collection
            .find_one(by_book_id(book_id), None)
            .await?
            .ok_or_else(|| BookRepositoryError::NotFound(book_id.to_string()))?
            .try_into()
    }

    async fn insert_book(&self, details: BookDetails) -> Result<StoreId, BookRepositoryError> {
        let document = MongoBookDocument {
            store_id: None,
            fields: details.into(),
        };
        let result = self.collection.insert_one(document, None).await?;
        result
            .inserted_id
            .as_object_id()
            .map(|id| id.to_hex())
            .ok_or_else(|| BookRepositoryError::Other("Id not returned".to_string()))
    }

    async fn set_fields(
        &self,
        book_id: &str,
        patch: &BookDocumentPatch,
    ) -> Result<bool, BookRepositoryError> {
        let update = doc! { "$set": mongodb::bson::to_document(patch)? };
        let result = self
            .collection
            .update_one(by_book_id(book_id), update, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_book(&self, book_id: &str) -> Result<bool, BookRepositoryError> {
        let result = self
            .collection
            .delete_one(by_book_id(book_id), None)
            .await?;
        Ok(result.deleted_count > 0)
    }
}
