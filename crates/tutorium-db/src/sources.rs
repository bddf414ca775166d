//! Source repository.
//!
//! CRUD operations for ingested textbook sources.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{SourceDoc, TABLE_SOURCES};
use crate::schema_arrow::{record_to_source, source_to_record};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

/// Repository for source-document operations.
#[derive(Clone)]
pub struct SourceRepository {
    db: Arc<Database>,
}

impl SourceRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new source.
    pub async fn insert(&self, source: &SourceDoc) -> Result<()> {
        let table = self.db.connection()
            .open_table(TABLE_SOURCES)
            .execute()
            .await?;

        let record = source_to_record(source)?;
        let schema = record.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(record)], schema);

        table.add(iter).execute().await?;
        Ok(())
    }

    /// Find a source by ID.
    pub async fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<SourceDoc>> {
        let table = self.db.connection()
            .open_table(TABLE_SOURCES)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!("id = '{}'", id))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                return Ok(Some(record_to_source(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Find a source by its PDF path (ingest-time dedup key).
    pub async fn find_by_path(&self, path: &str) -> Result<Option<SourceDoc>> {
        let table = self.db.connection()
            .open_table(TABLE_SOURCES)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!("path = '{}'", path.replace('\'', "''")))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                return Ok(Some(record_to_source(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Update a source's parse status.
    ///
    /// LanceDB rows are immutable, so this deletes and reinserts the row.
    pub async fn set_parse_status(&self, id: uuid::Uuid, status: &str) -> Result<()> {
        let existing = self.find_by_id(id).await?
            .ok_or_else(|| DbError::NotFound(format!("Source {} not found", id)))?;

        let table = self.db.connection()
            .open_table(TABLE_SOURCES)
            .execute()
            .await?;
        table.delete(&format!("id = '{}'", id)).await?;

        let updated = SourceDoc {
            parse_status: status.to_string(),
            ..existing
        };
        self.insert(&updated).await?;
        Ok(())
    }

    /// Count total sources.
    pub async fn count(&self) -> Result<u64> {
        let table = self.db.connection()
            .open_table(TABLE_SOURCES)
            .execute()
            .await?;
        Ok(table.count_rows(None).await? as u64)
    }

    /// List sources with pagination.
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<SourceDoc>> {
        let table = self.db.connection()
            .open_table(TABLE_SOURCES)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .limit(limit)
            .offset(offset)
            .execute()
            .await?;

        let mut sources = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                sources.push(record_to_source(&batch, i)?);
            }
        }

        Ok(sources)
    }
}
