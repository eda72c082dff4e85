use anyhow::Context;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::{BookDetails, StoreId, StoredBook};
use crate::books_repository::{
    BookDocument, BookDocumentPatch, BookRepository, BookRepositoryError,
};

/// Collection stored as a table of JSONB documents keyed by a serial store id
pub struct PostgresBooksRepository {
    client: Client,
    table: String,
}

pub struct PostgresBooksRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub collection: String,
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn row_to_stored_book(row: &Row) -> Result<StoredBook, BookRepositoryError> {
    let store_id: i32 = row.try_get(0)?;
    let params: serde_json::Value = row.try_get(1)?;
    let document: BookDocument = serde_json::from_value(params)?;
    Ok(StoredBook {
        store_id: store_id.to_string(),
        details: document.into(),
    })
}

impl PostgresBooksRepository {
    pub async fn init(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}/{}",
            config.username, config.password, config.hostname, config.database
        );
        tracing::info!(
            hostname = %config.hostname,
            database = %config.database,
            "Connecting to postgres"
        );
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        Self::ensure_collection(&client, &config.collection)
            .await
            .context("Failed to setup table")?;

        Ok(Self {
            client,
            table: quote_identifier(&config.collection),
        })
    }

    async fn ensure_collection(client: &Client, collection: &str) -> anyhow::Result<()> {
        let rows = client
            .query(
                "SELECT tablename::TEXT FROM pg_catalog.pg_tables WHERE schemaname = current_schema()",
                &[],
            )
            .await
            .context("Failed to list tables")?;
        let names = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;

        if !names.iter().any(|name| name == collection) {
            tracing::info!(%collection, "Creating collection table");
            client
                .batch_execute(&format!(
                    "
            CREATE TABLE IF NOT EXISTS {} (
                id              SERIAL PRIMARY KEY,
                params          JSONB
                )
            ",
                    quote_identifier(collection)
                ))
                .await
                .context("Failed to create table")?;
        }
        Ok(())
    }

    async fn query_books(
        &self,
        stmt: &Statement,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<StoredBook>, BookRepositoryError> {
        let rows = self.client.query(stmt, params).await?;
        rows.iter().map(row_to_stored_book).collect()
    }
}

#[async_trait::async_trait]
impl BookRepository for PostgresBooksRepository {
    async fn find_matching(
        &self,
        details: &BookDetails,
    ) -> Result<Vec<StoredBook>, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT id, params FROM {} WHERE params = ($1)::JSONB",
                self.table
            ))
            .await?;
        let document = serde_json::to_value(BookDocument::from(details.clone()))?;
        self.query_books(&stmt, &[&document]).await
    }

    async fn list_books(&self) -> Result<Vec<StoredBook>, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!("SELECT id, params FROM {}", self.table))
            .await?;
        self.query_books(&stmt, &[]).await
    }

    async fn get_book(&self, book_id: &str) -> Result<StoredBook, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT id, params FROM {} WHERE params->>'id' = ($1) LIMIT 1",
                self.table
            ))
            .await?;
        self.query_books(&stmt, &[&book_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BookRepositoryError::NotFound(book_id.to_string()))
    }

    async fn insert_book(&self, details: BookDetails) -> Result<StoreId, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "INSERT INTO {} (params) VALUES ($1) RETURNING id",
                self.table
            ))
            .await?;

        let document = serde_json::to_value(BookDocument::from(details))?;
        let rows = self.client.query(&stmt, &[&document]).await?;

        let store_id: i32 = rows
            .first()
            .ok_or_else(|| BookRepositoryError::Other("Id not returned".to_string()))?
            .try_get(0)?;

        Ok(store_id.to_string())
    }

    async fn set_fields(
        &self,
        book_id: &str,
        patch: &BookDocumentPatch,
    ) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "UPDATE {table} SET params = params || ($1)::JSONB \
                 WHERE id = (SELECT id FROM {table} WHERE params->>'id' = ($2) LIMIT 1) \
                 RETURNING id",
                table = self.table
            ))
            .await?;

        let patch = serde_json::to_value(patch)?;
        let rows = self.client.query(&stmt, &[&patch, &book_id]).await?;
        Ok(!rows.is_empty())
    }

    async fn delete_book(&self, book_id: &str) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "DELETE FROM {table} \
                 WHERE id = (SELECT id FROM {table} WHERE params->>'id' = ($1) LIMIT 1) \
                 RETURNING id",
                table = self.table
            ))
            .await?;

        let rows = self.client.query(&stmt, &[&book_id]).await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(all(test, feature = "container_tests"))]
mod postgres_book_repository_tests {
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use crate::api::{BookDetails, BookPatch};
    use crate::books_repository::{BookRepository, BookRepositoryError};

    async fn start_postgres_container_and_init_repo() -> (
        ContainerAsync<GenericImage>,
        crate::books_repository::PostgresBooksRepository,
    ) {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = crate::books_repository::PostgresBooksRepository::init(
                crate::books_repository::PostgresBooksRepositoryConfig {
                    hostname: "127.0.0.1".to_string(),
                    username: "postgres".to_string(),
                    password: "postgres".to_string(),
                    database: "postgres".to_string(),
                    collection: "information".to_string(),
                },
            )
            .await
            {
                return (_pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn vortex() -> BookDetails {
        BookDetails {
            id: "example1".to_string(),
            title: "The Vortex".to_string(),
            author: "José Eustasio Rivera".to_string(),
            edition: "958-30-0804-4".to_string(),
            pages: "292".to_string(),
            year: "1924".to_string(),
        }
    }

    #[tokio::test]
    #[file_serial(key, path => "../.containertestslock")]
    /// Goes through the whole book lifecycle against a real postgres
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_book_lifecycle() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        assert!(matches!(
            repo.get_book("example1").await,
            Err(BookRepositoryError::NotFound(..))
        ));

        repo.seed(&[vortex()]).await.expect("Failed to seed");
        repo.seed(&[vortex()]).await.expect("Failed to seed again");
        assert_eq!(repo.list_books().await.unwrap().len(), 1);

        let stored = repo.get_book("example1").await.expect("Failed to get book");
        assert_eq!(stored.details, vortex());

        let result = repo.add_book(vortex()).await;
        assert!(matches!(result, Err(BookRepositoryError::AlreadyExists(..))));

        let updated = repo
            .update_book(
                "example1",
                BookPatch {
                    title: Some("La vorágine".to_string()),
                    ..BookPatch::default()
                },
            )
            .await
            .expect("Failed to update");
        assert_eq!(
            updated.details,
            BookDetails {
                title: "La vorágine".to_string(),
                ..vortex()
            }
        );
        assert_eq!(updated.store_id, stored.store_id);

        assert!(repo.delete_book("example1").await.unwrap());
        assert!(!repo.delete_book("example1").await.unwrap());
        assert!(repo.list_books().await.unwrap().is_empty());
    }
}
