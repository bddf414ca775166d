//! tutorium-rag — query-time retrieval and multimodal answer assembly.
//!
//! `retrieve` embeds the question and pulls the top-k summaries from the
//! vector store, split by modality; `answer` assembles the QA prompts and
//! merges the text and vision answers.

pub mod answer;
pub mod retrieve;

pub use answer::answer;
pub use retrieve::{retrieve, split_by_modality, ImageContext, RetrievedContext};
