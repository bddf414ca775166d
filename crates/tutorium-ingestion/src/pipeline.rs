//! End-to-end ingestion pipeline.
//!
//! Orchestrates the full flow for a single ingestion job:
//!   1. Load the summary cache
//!   2. Partition each PDF in page batches (text, tables, images)
//!   3. Chunk narrative text by title
//!   4. Skip content already in the cache
//!   5. Summarize new chunks (batched) and images (vision, skip-on-failure)
//!   6. Embed summaries and insert modality-tagged records
//!   7. Save the cache and emit progress events via broadcast channel
//!
//! The pipeline is non-destructive: per-source errors are logged and the run
//! continues with the next source.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use tutorium_common::{Config, Modality};
use tutorium_db::{SourceDoc, SourceRepository, SummaryRecord, SummaryRepository};
use tutorium_llm::{l2_normalize, LlmBackend};

use crate::cache::SummaryCache;
use crate::chunker::{chunk_by_title, ChunkerConfig};
use crate::elements::ContentItem;
use crate::partition::{PartitionConfig, PdfPartitioner};
use crate::summarize::Summarizer;

// ── Job config ────────────────────────────────────────────────────────────────

/// Parameters for a single ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionJob {
    pub pdf_paths: Vec<PathBuf>,
    pub image_dir: PathBuf,
    pub cache_path: PathBuf,
    pub pages_per_batch: usize,
    /// Text/table summarization flush size.
    pub summary_batch_size: usize,
    pub chunker: ChunkerConfig,
    /// Delete a source's previous summaries before re-ingesting it.
    pub reset: bool,
}

impl IngestionJob {
    pub fn from_config(config: &Config) -> Self {
        let ing = &config.ingestion;
        Self {
            pdf_paths: ing.pdf_paths.iter().map(PathBuf::from).collect(),
            image_dir: PathBuf::from(&ing.image_dir),
            cache_path: PathBuf::from(&ing.cache_file),
            pages_per_batch: ing.pages_per_batch,
            summary_batch_size: ing.summary_batch_size,
            chunker: ChunkerConfig {
                max_characters: ing.max_characters,
                combine_text_under: ing.combine_text_under,
                new_after: ing.new_after,
            },
            reset: false,
        }
    }
}

// ── Progress events ───────────────────────────────────────────────────────────

/// Progress event emitted during a pipeline run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct IngestionProgress {
    pub job_id: Uuid,
    pub stage: String,
    pub message: String,
    pub sources_done: usize,
    pub records_inserted: usize,
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct IngestionResult {
    pub job_id: Uuid,
    pub sources_processed: usize,
    pub elements_parsed: usize,
    pub text_summaries: usize,
    pub table_summaries: usize,
    pub image_summaries: usize,
    pub images_skipped: usize,
    pub cached_hits: usize,
    pub records_inserted: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl IngestionResult {
    fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            sources_processed: 0,
            elements_parsed: 0,
            text_summaries: 0,
            table_summaries: 0,
            image_summaries: 0,
            images_skipped: 0,
            cached_hits: 0,
            records_inserted: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Runs the end-to-end ingestion pipeline for one job.
///
/// Progress events are sent via `progress_tx` if provided.
#[instrument(skip(job, sources, summaries, backend, progress_tx), fields(n_pdfs = job.pdf_paths.len()))]
pub async fn run_ingestion(
    job: IngestionJob,
    sources: Arc<SourceRepository>,
    summaries: Arc<SummaryRepository>,
    backend: Arc<dyn LlmBackend>,
    progress_tx: Option<broadcast::Sender<IngestionProgress>>,
) -> IngestionResult {
    let job_id = Uuid::new_v4();
    let t0 = std::time::Instant::now();
    let mut result = IngestionResult::new(job_id);

    info!(job_id = %job_id, n_pdfs = job.pdf_paths.len(), "Starting ingestion pipeline");

    let emit = |stage: &str, message: String, result: &IngestionResult| {
        if let Some(ref tx) = progress_tx {
            let _ = tx.send(IngestionProgress {
                job_id,
                stage: stage.to_string(),
                message,
                sources_done: result.sources_processed,
                records_inserted: result.records_inserted,
            });
        }
    };

    let mut cache = match SummaryCache::load(&job.cache_path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %job.cache_path.display(), error = %e, "Cache load failed, starting empty");
            SummaryCache::default()
        }
    };
    info!(entries = cache.len(), "Summary cache loaded");

    let summarizer = Summarizer::new(backend.clone(), job.summary_batch_size);

    for pdf_path in &job.pdf_paths {
        emit("partition", format!("Loading {}", pdf_path.display()), &result);
        info!(path = %pdf_path.display(), "Processing PDF");

        let partition_cfg = PartitionConfig {
            pages_per_batch: job.pages_per_batch,
            image_dir: job.image_dir.clone(),
        };
        let path_for_task = pdf_path.clone();
        let mut partitioner = match tokio::task::spawn_blocking(move || {
            PdfPartitioner::open(&path_for_task, &partition_cfg)
        })
        .await
        {
            Ok(Ok(p)) => p,
            Ok(Err(e)) => {
                let msg = format!("partition failed for {}: {e}", pdf_path.display());
                warn!("{}", &msg);
                result.errors.push(msg);
                continue;
            }
            Err(e) => {
                let msg = format!("partition task failed for {}: {e}", pdf_path.display());
                warn!("{}", &msg);
                result.errors.push(msg);
                continue;
            }
        };

        // ── Upsert source ─────────────────────────────────────────────────────
        let path_str = pdf_path.to_string_lossy().to_string();
        let source = match sources.find_by_path(&path_str).await {
            Ok(Some(existing)) => {
                if job.reset {
                    match summaries.delete_by_source_id(existing.id).await {
                        Ok(()) => info!(source_id = %existing.id, "Previous summaries deleted"),
                        Err(e) => {
                            let msg = format!("reset failed for {}: {e}", path_str);
                            warn!("{}", &msg);
                            result.errors.push(msg);
                        }
                    }
                }
                existing
            }
            Ok(None) => {
                let doc = SourceDoc::new(
                    path_str.clone(),
                    partitioner.title_guess(),
                    partitioner.page_count() as i64,
                );
                if let Err(e) = sources.insert(&doc).await {
                    let msg = format!("source insert failed for {}: {e}", path_str);
                    warn!("{}", &msg);
                    result.errors.push(msg);
                    continue;
                }
                doc
            }
            Err(e) => {
                let msg = format!("source lookup failed for {}: {e}", path_str);
                warn!("{}", &msg);
                result.errors.push(msg);
                continue;
            }
        };

        // ── Page batches ──────────────────────────────────────────────────────
        let mut source_failed = false;
        loop {
            let (returned, batch) = match tokio::task::spawn_blocking(move || {
                let mut p = partitioner;
                let batch = p.next_batch();
                (p, batch)
            })
            .await
            {
                Ok(pair) => pair,
                Err(e) => {
                    let msg = format!("partition task failed for {}: {e}", path_str);
                    warn!("{}", &msg);
                    result.errors.push(msg);
                    source_failed = true;
                    break;
                }
            };
            partitioner = returned;

            let Some(elements) = batch else { break };
            if elements.is_empty() {
                continue;
            }
            result.elements_parsed += elements.len();

            let items = chunk_by_title(elements, &job.chunker);

            // Split new work from cache hits.
            let mut new_chunks: Vec<ContentItem> = Vec::new();
            let mut new_images: Vec<ContentItem> = Vec::new();
            for item in items {
                if cache.contains(item.modality, &item.raw) {
                    result.cached_hits += 1;
                } else if item.modality == Modality::Image {
                    new_images.push(item);
                } else {
                    new_chunks.push(item);
                }
            }

            // ── Texts & tables ────────────────────────────────────────────────
            if !new_chunks.is_empty() {
                match process_chunks(
                    &new_chunks,
                    &source,
                    &summarizer,
                    backend.as_ref(),
                    summaries.as_ref(),
                    &mut cache,
                    &mut result,
                )
                .await
                {
                    Ok(()) => {}
                    Err(msg) => {
                        warn!("{}", &msg);
                        result.errors.push(msg);
                        source_failed = true;
                    }
                }
            }

            // ── Images ────────────────────────────────────────────────────────
            for item in &new_images {
                let summary = match summarizer.summarize_image(Path::new(&item.raw)).await {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(image = %item.raw, error = %e, "Image summarization failed, skipping");
                        result.images_skipped += 1;
                        continue;
                    }
                };

                let vector = match backend.embed(vec![summary.clone()]).await {
                    Ok(mut v) if !v.is_empty() => v.remove(0),
                    Ok(_) => {
                        warn!(image = %item.raw, "Empty embedding response, skipping");
                        result.images_skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(image = %item.raw, error = %e, "Image embedding failed, skipping");
                        result.images_skipped += 1;
                        continue;
                    }
                };

                let record = SummaryRecord::new(
                    source.id,
                    source.path.clone(),
                    Modality::Image,
                    summary.clone(),
                    item.raw.clone(),
                )
                .with_page(item.page.map(i64::from))
                .with_embedding(l2_normalize(&vector));

                match summaries.insert(&record).await {
                    Ok(()) => {
                        result.image_summaries += 1;
                        result.records_inserted += 1;
                        cache.insert(Modality::Image, item.raw.clone(), summary);
                        debug!(image = %item.raw, "Image summary stored");
                    }
                    Err(e) => {
                        let msg = format!("image record insert failed for {}: {e}", item.raw);
                        warn!("{}", &msg);
                        result.errors.push(msg);
                        source_failed = true;
                    }
                }
            }

            emit(
                "summarize",
                format!("{} records stored so far", result.records_inserted),
                &result,
            );
        }

        let status = if source_failed { "failed" } else { "parsed" };
        if let Err(e) = sources.set_parse_status(source.id, status).await {
            warn!(source_id = %source.id, error = %e, "Parse status update failed");
        }
        result.sources_processed += 1;
        emit("source_done", format!("Finished {}", pdf_path.display()), &result);
    }

    if let Err(e) = cache.save(&job.cache_path) {
        let msg = format!("cache save failed: {e}");
        warn!("{}", &msg);
        result.errors.push(msg);
    }

    result.duration_ms = t0.elapsed().as_millis() as u64;

    info!(
        job_id = %job_id,
        sources   = result.sources_processed,
        elements  = result.elements_parsed,
        inserted  = result.records_inserted,
        cached    = result.cached_hits,
        skipped   = result.images_skipped,
        errors    = result.errors.len(),
        duration_ms = result.duration_ms,
        "Ingestion pipeline complete"
    );

    emit(
        "complete",
        format!(
            "Done. {} records inserted ({} cache hits, {} errors).",
            result.records_inserted,
            result.cached_hits,
            result.errors.len()
        ),
        &result,
    );

    result
}

/// Summarize, embed, and store a batch of new text/table chunks.
/// Returns an error message string on storage failure (the caller records it).
async fn process_chunks(
    new_chunks: &[ContentItem],
    source: &SourceDoc,
    summarizer: &Summarizer,
    backend: &dyn LlmBackend,
    summaries: &SummaryRepository,
    cache: &mut SummaryCache,
    result: &mut IngestionResult,
) -> std::result::Result<(), String> {
    let chunk_summaries = summarizer
        .summarize_chunks(new_chunks)
        .await
        .map_err(|e| format!("summarization failed for {}: {e}", source.path))?;

    let vectors = backend
        .embed(chunk_summaries.clone())
        .await
        .map_err(|e| format!("embedding failed for {}: {e}", source.path))?;

    if vectors.len() != new_chunks.len() {
        return Err(format!(
            "embedding count mismatch for {}: {} chunks, {} vectors",
            source.path,
            new_chunks.len(),
            vectors.len()
        ));
    }

    let records: Vec<SummaryRecord> = new_chunks
        .iter()
        .zip(&chunk_summaries)
        .zip(&vectors)
        .map(|((item, summary), vector)| {
            SummaryRecord::new(
                source.id,
                source.path.clone(),
                item.modality,
                summary.clone(),
                item.raw.clone(),
            )
            .with_page(item.page.map(i64::from))
            .with_embedding(l2_normalize(vector))
        })
        .collect();

    summaries
        .insert_batch(&records)
        .await
        .map_err(|e| format!("chunk insert failed for {}: {e}", source.path))?;

    for (item, summary) in new_chunks.iter().zip(&chunk_summaries) {
        match item.modality {
            Modality::Text => result.text_summaries += 1,
            Modality::Table => result.table_summaries += 1,
            Modality::Image => {}
        }
        cache.insert(item.modality, item.raw.clone(), summary.clone());
    }
    result.records_inserted += records.len();

    debug!(source = %source.path, n = records.len(), "Chunk summaries stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_from_config_carries_pipeline_constants() {
        let config = Config::default();
        let job = IngestionJob::from_config(&config);
        assert_eq!(job.pages_per_batch, 25);
        assert_eq!(job.summary_batch_size, 8);
        assert_eq!(job.chunker.max_characters, 10_000);
        assert_eq!(job.cache_path, PathBuf::from("data/cache.json"));
        assert!(!job.reset);
    }
}
