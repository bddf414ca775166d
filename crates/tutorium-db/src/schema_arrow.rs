//! Arrow schema and conversion utilities for LanceDB.
//!
//! Record batch conversions between the Rust record structs and the Arrow
//! rows LanceDB stores.

use crate::error::{DbError, Result};
use crate::schema::{SourceDoc, SummaryRecord, EMBEDDING_DIM};
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

// =============================================================================
// Source Arrow Conversion
// =============================================================================

pub fn source_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("path", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("page_count", DataType::Int64, false),
        Field::new("parse_status", DataType::Utf8, false),
        Field::new("ingested_at", DataType::Utf8, false),
    ]))
}

pub fn source_to_record(source: &SourceDoc) -> Result<RecordBatch> {
    let schema = source_schema();

    let id = StringArray::from(vec![source.id.to_string()]);
    let path = StringArray::from(vec![source.path.as_str()]);
    let title = StringArray::from(vec![source.title.as_deref()]);
    let page_count = Int64Array::from(vec![source.page_count]);
    let parse_status = StringArray::from(vec![source.parse_status.as_str()]);
    let ingested_at = StringArray::from(vec![source.ingested_at.to_rfc3339()]);

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(id) as Arc<dyn Array>,
            Arc::new(path),
            Arc::new(title),
            Arc::new(page_count),
            Arc::new(parse_status),
            Arc::new(ingested_at),
        ],
    ).map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_source(batch: &RecordBatch, row: usize) -> Result<SourceDoc> {
    let get_string = |col: usize| -> String {
        batch.column(col).as_any().downcast_ref::<StringArray>().unwrap().value(row).to_string()
    };

    let get_opt_string = |col: usize| -> Option<String> {
        let arr = batch.column(col).as_any().downcast_ref::<StringArray>().unwrap();
        if arr.is_null(row) { None } else { Some(arr.value(row).to_string()) }
    };

    let get_i64 = |col: usize| -> i64 {
        batch.column(col).as_any().downcast_ref::<Int64Array>().unwrap().value(row)
    };

    Ok(SourceDoc {
        id: uuid::Uuid::parse_str(&get_string(0)).map_err(|e| DbError::InvalidRecord(e.to_string()))?,
        path: get_string(1),
        title: get_opt_string(2),
        page_count: get_i64(3),
        parse_status: get_string(4),
        ingested_at: chrono::DateTime::parse_from_rfc3339(&get_string(5))
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
    })
}

// =============================================================================
// Summary Arrow Conversion
// =============================================================================

pub fn summary_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("source_id", DataType::Utf8, false),
        Field::new("source_path", DataType::Utf8, false),
        Field::new("modality", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("raw_ref", DataType::Utf8, false),
        Field::new("page", DataType::Int64, true),
        Field::new("created_at", DataType::Utf8, false),
        Field::new("embedding", DataType::FixedSizeList(
            Arc::new(Field::new("item", DataType::Float32, false)),
            EMBEDDING_DIM as i32,
        ), true),
    ]))
}

pub fn summary_to_record(summary: &SummaryRecord) -> Result<RecordBatch> {
    let schema = summary_schema();

    let id = StringArray::from(vec![summary.id.to_string()]);
    let source_id = StringArray::from(vec![summary.source_id.to_string()]);
    let source_path = StringArray::from(vec![summary.source_path.as_str()]);
    let modality = StringArray::from(vec![summary.modality.to_string()]);
    let content = StringArray::from(vec![summary.content.as_str()]);
    let raw_ref = StringArray::from(vec![summary.raw_ref.as_str()]);
    let page = Int64Array::from(vec![summary.page]);
    let created_at = StringArray::from(vec![summary.created_at.to_rfc3339()]);

    let embedding: Arc<dyn Array> = if let Some(ref emb) = summary.embedding {
        if emb.len() != EMBEDDING_DIM {
            return Err(DbError::InvalidEmbeddingDimension {
                expected: EMBEDDING_DIM,
                actual: emb.len(),
            });
        }
        let values = Float32Array::from(emb.clone());
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        Arc::new(FixedSizeListArray::try_new(field, EMBEDDING_DIM as i32, Arc::new(values), None)
            .map_err(|e| DbError::Arrow(e.to_string()))?)
    } else {
        Arc::new(FixedSizeListArray::new_null(
            Arc::new(Field::new("item", DataType::Float32, false)),
            EMBEDDING_DIM as i32,
            1,
        ))
    };

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(id) as Arc<dyn Array>,
            Arc::new(source_id),
            Arc::new(source_path),
            Arc::new(modality),
            Arc::new(content),
            Arc::new(raw_ref),
            Arc::new(page),
            Arc::new(created_at),
            embedding,
        ],
    ).map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_summary(batch: &RecordBatch, row: usize) -> Result<SummaryRecord> {
    let get_string = |col: usize| -> String {
        batch.column(col).as_any().downcast_ref::<StringArray>().unwrap().value(row).to_string()
    };

    let get_opt_i64 = |col: usize| -> Option<i64> {
        let arr = batch.column(col).as_any().downcast_ref::<Int64Array>().unwrap();
        if arr.is_null(row) { None } else { Some(arr.value(row)) }
    };

    let get_embedding = |col: usize| -> Option<Vec<f32>> {
        let arr = batch.column(col);
        if arr.is_null(row) { return None; }
        let list_arr = arr.as_any().downcast_ref::<FixedSizeListArray>().unwrap();
        if list_arr.is_null(row) { return None; }
        let values = list_arr.value(row);
        let float_arr = values.as_any().downcast_ref::<Float32Array>().unwrap();
        Some(float_arr.values().to_vec())
    };

    Ok(SummaryRecord {
        id: uuid::Uuid::parse_str(&get_string(0)).map_err(|e| DbError::InvalidRecord(e.to_string()))?,
        source_id: uuid::Uuid::parse_str(&get_string(1)).map_err(|e| DbError::InvalidRecord(e.to_string()))?,
        source_path: get_string(2),
        modality: get_string(3).parse().map_err(DbError::InvalidRecord)?,
        content: get_string(4),
        raw_ref: get_string(5),
        page: get_opt_i64(6),
        created_at: chrono::DateTime::parse_from_rfc3339(&get_string(7))
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        embedding: get_embedding(8),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorium_common::Modality;

    fn sample_summary(embedding: Option<Vec<f32>>) -> SummaryRecord {
        let mut s = SummaryRecord::new(
            uuid::Uuid::new_v4(),
            "data/class10_science.pdf".to_string(),
            Modality::Text,
            "Photosynthesis converts light energy into chemical energy.".to_string(),
            "Photosynthesis is the process by which green plants...".to_string(),
        ).with_page(Some(42));
        s.embedding = embedding;
        s
    }

    #[test]
    fn test_summary_round_trip_without_embedding() {
        let summary = sample_summary(None);
        let batch = summary_to_record(&summary).unwrap();
        let back = record_to_summary(&batch, 0).unwrap();
        assert_eq!(back.id, summary.id);
        assert_eq!(back.modality, Modality::Text);
        assert_eq!(back.content, summary.content);
        assert_eq!(back.page, Some(42));
        assert!(back.embedding.is_none());
    }

    #[test]
    fn test_summary_round_trip_with_embedding() {
        let emb: Vec<f32> = (0..EMBEDDING_DIM).map(|i| i as f32 / EMBEDDING_DIM as f32).collect();
        let summary = sample_summary(Some(emb.clone()));
        let batch = summary_to_record(&summary).unwrap();
        let back = record_to_summary(&batch, 0).unwrap();
        assert_eq!(back.embedding.unwrap(), emb);
    }

    #[test]
    fn test_wrong_embedding_dimension_is_rejected() {
        let summary = sample_summary(Some(vec![0.1, 0.2, 0.3]));
        match summary_to_record(&summary) {
            Err(DbError::InvalidEmbeddingDimension { expected, actual }) => {
                assert_eq!(expected, EMBEDDING_DIM);
                assert_eq!(actual, 3);
            }
            other => panic!("expected dimension error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_source_round_trip() {
        let source = SourceDoc::new(
            "data/class10_maths.pdf".to_string(),
            Some("Mathematics — Standard Ten".to_string()),
            280,
        );
        let batch = source_to_record(&source).unwrap();
        let back = record_to_source(&batch, 0).unwrap();
        assert_eq!(back.id, source.id);
        assert_eq!(back.title.as_deref(), Some("Mathematics — Standard Ten"));
        assert_eq!(back.page_count, 280);
    }
}
