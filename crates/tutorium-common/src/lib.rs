//! tutorium-common — Shared types, errors, and configuration used across all Tutorium crates.

pub mod config;
pub mod error;
pub mod modality;

pub use config::Config;
pub use error::{Result, TutoriumError};
pub use modality::Modality;
