//! Summary repository.
//!
//! CRUD operations for modality-tagged summaries with vector search.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{SummaryRecord, EMBEDDING_DIM, TABLE_SUMMARIES};
use crate::schema_arrow::{record_to_summary, summary_to_record};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;
use tutorium_common::Modality;

/// Repository for summary operations.
#[derive(Clone)]
pub struct SummaryRepository {
    db: Arc<Database>,
}

impl SummaryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a single summary.
    pub async fn insert(&self, summary: &SummaryRecord) -> Result<()> {
        self.check_dimension(summary)?;

        let table = self.db.connection()
            .open_table(TABLE_SUMMARIES)
            .execute()
            .await?;

        let record = summary_to_record(summary)?;
        let schema = record.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(record)], schema);

        table.add(iter).execute().await?;
        Ok(())
    }

    /// Insert multiple summaries in bulk.
    pub async fn insert_batch(&self, summaries: &[SummaryRecord]) -> Result<()> {
        if summaries.is_empty() {
            return Ok(());
        }
        for summary in summaries {
            self.check_dimension(summary)?;
        }

        let table = self.db.connection()
            .open_table(TABLE_SUMMARIES)
            .execute()
            .await?;

        let records: Vec<arrow_array::RecordBatch> = summaries
            .iter()
            .map(summary_to_record)
            .collect::<Result<_>>()?;

        let schema = records[0].schema();
        let iter = arrow_array::RecordBatchIterator::new(
            records.into_iter().map(Ok),
            schema,
        );

        table.add(iter).execute().await?;
        Ok(())
    }

    /// Delete all summaries belonging to a source (re-ingest reset).
    pub async fn delete_by_source_id(&self, source_id: uuid::Uuid) -> Result<()> {
        let table = self.db.connection()
            .open_table(TABLE_SUMMARIES)
            .execute()
            .await?;
        table.delete(&format!("source_id = '{}'", source_id)).await?;
        Ok(())
    }

    /// Count total summaries.
    pub async fn count(&self) -> Result<u64> {
        let table = self.db.connection()
            .open_table(TABLE_SUMMARIES)
            .execute()
            .await?;
        Ok(table.count_rows(None).await? as u64)
    }

    /// Count summaries of one modality.
    pub async fn count_by_modality(&self, modality: Modality) -> Result<u64> {
        let table = self.db.connection()
            .open_table(TABLE_SUMMARIES)
            .execute()
            .await?;
        let count = table
            .count_rows(Some(format!("modality = '{}'", modality)))
            .await?;
        Ok(count as u64)
    }

    /// List summaries with pagination (most useful for inspection pages).
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<SummaryRecord>> {
        let table = self.db.connection()
            .open_table(TABLE_SUMMARIES)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .limit(limit)
            .offset(offset)
            .execute()
            .await?;

        let mut summaries = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                summaries.push(record_to_summary(&batch, i)?);
            }
        }

        Ok(summaries)
    }

    /// Search for the top-k summaries most similar to the query vector.
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<SummaryRecord>> {
        if query_vector.len() != EMBEDDING_DIM {
            return Err(DbError::InvalidEmbeddingDimension {
                expected: EMBEDDING_DIM,
                actual: query_vector.len(),
            });
        }

        let table = self.db.connection()
            .open_table(TABLE_SUMMARIES)
            .execute()
            .await?;

        let mut stream = table
            .vector_search(query_vector.to_vec())?
            .limit(k)
            .execute()
            .await?;

        let mut summaries = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                summaries.push(record_to_summary(&batch, i)?);
            }
        }

        Ok(summaries)
    }

    fn check_dimension(&self, summary: &SummaryRecord) -> Result<()> {
        if let Some(ref emb) = summary.embedding {
            if emb.len() != EMBEDDING_DIM {
                return Err(DbError::InvalidEmbeddingDimension {
                    expected: EMBEDDING_DIM,
                    actual: emb.len(),
                });
            }
        }
        Ok(())
    }
}
