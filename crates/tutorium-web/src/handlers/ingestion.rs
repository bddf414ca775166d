//! Ingestion monitor and trigger — wired to the real pipeline.

use axum::{extract::State, response::Html, Form};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use tutorium_common::Modality;
use tutorium_ingestion::pipeline::{run_ingestion, IngestionJob, IngestionProgress};

use crate::handlers::{escape_html, NAV_HTML};
use crate::state::{AppEvent, SharedState};

// ── Form input ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IngestionForm {
    /// Optional single PDF path; configured paths are used when empty.
    pub pdf_path: Option<String>,
    /// Checkbox: delete a source's previous summaries first.
    pub reset: Option<String>,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

pub async fn ingestion_page(State(state): State<SharedState>) -> Html<String> {
    let stats = load_stats(&state).await;
    Html(render_page(&stats, None))
}

pub async fn ingestion_run(
    State(state): State<SharedState>,
    Form(form): Form<IngestionForm>,
) -> Html<String> {
    let mut job = IngestionJob::from_config(&state.config);
    job.reset = form.reset.is_some();
    if let Some(path) = form.pdf_path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        job.pdf_paths = vec![PathBuf::from(path)];
    }

    if job.pdf_paths.is_empty() {
        let stats = load_stats(&state).await;
        return Html(render_page(
            &stats,
            Some("⚠️ No PDFs configured. Enter a path above or set [ingestion].pdf_paths in tutorium.toml."),
        ));
    }

    let summary = format!(
        "🔄 Ingestion started for {} PDF(s). Watch the live feed for progress.",
        job.pdf_paths.len()
    );
    info!(n_pdfs = job.pdf_paths.len(), reset = job.reset, "Ingestion triggered from web UI");

    // Bridge pipeline progress into the app-wide SSE event stream.
    let (progress_tx, mut progress_rx) = broadcast::channel::<IngestionProgress>(64);
    let event_tx = state.event_tx.clone();
    tokio::spawn(async move {
        while let Ok(progress) = progress_rx.recv().await {
            let _ = event_tx.send(AppEvent::PipelineStatus {
                stage: progress.stage,
                message: progress.message,
                count: progress.records_inserted as u64,
            });
        }
    });

    // Run the pipeline in the background so the page returns immediately.
    let sources = Arc::new(state.sources.clone());
    let summaries = Arc::new(state.summaries.clone());
    let backend = state.llm.clone();
    let event_tx = state.event_tx.clone();
    tokio::spawn(async move {
        let result = run_ingestion(job, sources, summaries, backend, Some(progress_tx)).await;
        let _ = event_tx.send(AppEvent::Notification {
            level: if result.errors.is_empty() { "info" } else { "warning" }.to_string(),
            message: format!(
                "Ingestion finished: {} records inserted, {} cache hits, {} errors.",
                result.records_inserted,
                result.cached_hits,
                result.errors.len()
            ),
        });
    });

    let stats = load_stats(&state).await;
    Html(render_page(&stats, Some(&summary)))
}

// ── Stats loader ──────────────────────────────────────────────────────────────

struct PageStats {
    sources: u64,
    summaries: u64,
    texts: u64,
    tables: u64,
    images: u64,
    recent: Vec<(String, String)>,          // (modality, summary snippet)
    books: Vec<(String, String, i64, String)>, // (path, title, pages, status)
}

async fn load_stats(state: &SharedState) -> PageStats {
    let sources = state.sources.count().await.unwrap_or(0);
    let summaries = state.summaries.count().await.unwrap_or(0);
    let texts = state.summaries.count_by_modality(Modality::Text).await.unwrap_or(0);
    let tables = state.summaries.count_by_modality(Modality::Table).await.unwrap_or(0);
    let images = state.summaries.count_by_modality(Modality::Image).await.unwrap_or(0);

    let recent = state.summaries.list(0, 5).await.unwrap_or_default()
        .into_iter()
        .map(|s| {
            let snippet: String = s.content.chars().take(160).collect();
            (s.modality.to_string(), snippet)
        })
        .collect();

    let books = state.sources.list(0, 20).await.unwrap_or_default()
        .into_iter()
        .map(|s| {
            (
                s.path,
                s.title.unwrap_or_else(|| "—".to_string()),
                s.page_count,
                s.parse_status,
            )
        })
        .collect();

    PageStats { sources, summaries, texts, tables, images, recent, books }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn render_page(stats: &PageStats, banner: Option<&str>) -> String {
    let banner_html = banner
        .map(|b| format!(r#"<div class="banner">{}</div>"#, escape_html(b)))
        .unwrap_or_default();

    let books_html: String = if stats.books.is_empty() {
        r#"<tr><td colspan="4" class="text-muted">No textbooks ingested yet.</td></tr>"#.to_string()
    } else {
        stats.books.iter().map(|(path, title, pages, status)| {
            format!(
                r#"<tr><td><code>{}</code></td><td>{}</td><td>{}</td><td><span class="badge badge-{}">{}</span></td></tr>"#,
                escape_html(path), escape_html(title), pages, status, status,
            )
        }).collect()
    };

    let recent_html: String = if stats.recent.is_empty() {
        r#"<li class="text-muted">Nothing stored yet.</li>"#.to_string()
    } else {
        stats.recent.iter().map(|(modality, snippet)| {
            format!(
                r#"<li><span class="badge badge-{}">{}</span> {}</li>"#,
                modality, modality, escape_html(snippet),
            )
        }).collect()
    };

    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Tutorium — Ingestion</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
{nav}
<main class="main-content">
    <div class="page-header">
        <div>
            <h1 class="page-title">📥 Ingestion</h1>
            <p class="page-subtitle">Partition textbooks, summarize each modality, and populate the vector store.</p>
        </div>
    </div>

    {banner}

    <div class="stat-row">
        <div class="stat-card"><div class="stat-value">{sources}</div><div class="stat-label">Textbooks</div></div>
        <div class="stat-card"><div class="stat-value">{summaries}</div><div class="stat-label">Summaries</div></div>
        <div class="stat-card"><div class="stat-value">{texts}</div><div class="stat-label">Text</div></div>
        <div class="stat-card"><div class="stat-value">{tables}</div><div class="stat-label">Tables</div></div>
        <div class="stat-card"><div class="stat-value">{images}</div><div class="stat-label">Images</div></div>
    </div>

    <div class="card">
        <form method="POST" action="/ingestion/run" class="ingest-form">
            <label>PDF path (optional — defaults to configured paths)</label>
            <input type="text" name="pdf_path" placeholder="data/class10_science.pdf">
            <label class="checkbox-label">
                <input type="checkbox" name="reset"> Re-ingest from scratch (delete previous summaries)
            </label>
            <button type="submit" class="btn btn-primary">▶ Run Ingestion</button>
        </form>
    </div>

    <div class="card">
        <h2>Ingested textbooks</h2>
        <table class="table">
            <thead><tr><th>Path</th><th>Title</th><th>Pages</th><th>Status</th></tr></thead>
            <tbody>{books}</tbody>
        </table>
    </div>

    <div class="card">
        <h2>Stored summaries (sample)</h2>
        <ul class="recent-list">{recent}</ul>
    </div>

    <div class="card">
        <h2>Live activity</h2>
        <ul id="activity" class="recent-list"><li class="text-muted">Waiting for events…</li></ul>
    </div>

    <script>
    const feed = document.getElementById('activity');
    const source = new EventSource('/api/events');
    source.onmessage = (e) => {{
        const evt = JSON.parse(e.data);
        const li = document.createElement('li');
        li.textContent = evt.message || JSON.stringify(evt);
        if (feed.firstChild && feed.firstChild.classList && feed.firstChild.classList.contains('text-muted')) {{
            feed.innerHTML = '';
        }}
        feed.prepend(li);
    }};
    </script>
</main>
</body>
</html>"#,
        nav = NAV_HTML,
        banner = banner_html,
        sources = stats.sources,
        summaries = stats.summaries,
        texts = stats.texts,
        tables = stats.tables,
        images = stats.images,
        books = books_html,
        recent = recent_html,
    )
}
