//! tutorium-web — browser chat UI and ingestion trigger for Tutorium.

pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;
