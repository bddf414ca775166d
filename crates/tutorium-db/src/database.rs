//! Database connection and table management.
//!
//! Provides a unified interface for LanceDB operations.

use crate::error::Result;
use crate::schema::{EMBEDDING_DIM, TABLE_SOURCES, TABLE_SUMMARIES};
use crate::schema_arrow::{source_schema, summary_schema};
use arrow_array::RecordBatchIterator;
use lancedb::connection::Connection;
use std::path::Path;

/// Main database handle.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    path: String,
}

impl Database {
    /// Open or create a database at the specified path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if !path.as_ref().exists() {
            std::fs::create_dir_all(path.as_ref())?;
        }

        let conn = lancedb::connect(&path_str)
            .execute()
            .await?;

        Ok(Self {
            conn,
            path: path_str,
        })
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Initialize all tables with schemas.
    ///
    /// LanceDB requires an (empty) record iterator to create a table with a
    /// schema, so each table is created from its Arrow schema when absent.
    pub async fn initialize(&self) -> Result<()> {
        if !self.table_exists(TABLE_SOURCES).await? {
            let schema = source_schema();
            let empty_iter = RecordBatchIterator::new(vec![], schema);
            self.conn
                .create_table(TABLE_SOURCES, empty_iter)
                .execute()
                .await?;
        }

        if !self.table_exists(TABLE_SUMMARIES).await? {
            let schema = summary_schema();
            let empty_iter = RecordBatchIterator::new(vec![], schema);
            self.conn
                .create_table(TABLE_SUMMARIES, empty_iter)
                .execute()
                .await?;
        }

        tracing::debug!(path = %self.path, dim = EMBEDDING_DIM, "Database initialized");
        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let tables = self.conn.table_names().execute().await?;
        Ok(tables.contains(&name.to_string()))
    }

    /// Create a vector index on the summaries table for embedding search.
    ///
    /// LanceDB needs a minimum amount of data before an index helps; callers
    /// treat a failure here as non-fatal.
    pub async fn create_vector_index(&self) -> Result<()> {
        let table = self.conn
            .open_table(TABLE_SUMMARIES)
            .execute()
            .await?;

        table
            .create_index(
                &["embedding"],
                lancedb::index::Index::Auto,
            )
            .execute()
            .await?;

        Ok(())
    }
}
