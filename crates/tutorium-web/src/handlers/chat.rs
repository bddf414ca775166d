//! Chat interface — question in, retrieval-grounded answer out.

use axum::{
    extract::State,
    response::{Html, Redirect},
    Form,
};
use serde::Deserialize;
use tracing::error;

use crate::handlers::{escape_html, NAV_HTML};
use crate::state::{AppEvent, ChatTurn, SharedState};

/// Shown instead of the real error so backend failures never leak into chat.
const GENERIC_ERROR: &str =
    "Something went wrong while answering. Please check the server logs and try again.";

#[derive(Deserialize)]
pub struct ChatForm {
    pub question: String,
}

pub async fn chat_page(State(state): State<SharedState>) -> Html<String> {
    let history = state.history.lock().await.clone();
    Html(render_chat_page(&history))
}

pub async fn chat_submit(
    State(state): State<SharedState>,
    Form(form): Form<ChatForm>,
) -> Html<String> {
    let question = form.question.trim().to_string();
    if question.is_empty() {
        let history = state.history.lock().await.clone();
        return Html(render_chat_page(&history));
    }

    let reply = match run_chain(&state, &question).await {
        Ok(answer) => answer,
        Err(e) => {
            error!(error = %e, question = %question, "RAG chain failed");
            let _ = state.event_tx.send(AppEvent::Notification {
                level: "error".to_string(),
                message: format!("Chat request failed: {e}"),
            });
            GENERIC_ERROR.to_string()
        }
    };

    let mut history = state.history.lock().await;
    history.push(ChatTurn { role: "user".to_string(), content: question });
    history.push(ChatTurn { role: "assistant".to_string(), content: reply });
    let snapshot = history.clone();
    drop(history);

    Html(render_chat_page(&snapshot))
}

pub async fn chat_clear(State(state): State<SharedState>) -> Redirect {
    state.history.lock().await.clear();
    Redirect::to("/")
}

async fn run_chain(state: &SharedState, question: &str) -> anyhow::Result<String> {
    let ctx = tutorium_rag::retrieve(
        &state.summaries,
        state.llm.as_ref(),
        question,
        state.config.retrieval.top_k,
    )
    .await?;

    tutorium_rag::answer(state.llm.as_ref(), &ctx, question).await
}

fn render_chat_page(history: &[ChatTurn]) -> String {
    let messages_html: String = if history.is_empty() {
        r#"<div class="chat-empty">Ask a question from your textbooks. Answers are grounded in text, table, and image summaries.</div>"#.to_string()
    } else {
        history.iter().map(|turn| {
            let class = if turn.role == "user" { "bubble bubble-user" } else { "bubble bubble-assistant" };
            format!(
                r#"<div class="{}"><div class="bubble-role">{}</div><div class="bubble-content">{}</div></div>"#,
                class,
                if turn.role == "user" { "You" } else { "Tutorium" },
                escape_html(&turn.content).replace('\n', "<br>"),
            )
        }).collect()
    };

    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Tutorium — Textbook Assistant</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
{nav}
<main class="main-content">
    <div class="page-header">
        <div>
            <h1 class="page-title">📚 Textbook Assistant</h1>
            <p class="page-subtitle">Ask questions based on your ingested textbooks.</p>
        </div>
        <form method="POST" action="/clear">
            <button type="submit" class="btn btn-outline">🧹 Clear Chat</button>
        </form>
    </div>

    <div class="chat-window">{messages}</div>

    <form method="POST" action="/chat" class="chat-input-row">
        <input type="text" name="question" class="chat-input"
            placeholder="Ask a question from the textbook…" autofocus required>
        <button type="submit" class="btn btn-primary">Ask</button>
    </form>
</main>
</body>
</html>"#,
        nav = NAV_HTML,
        messages = messages_html,
    )
}
