//! Gemini API client and wire types

mod client;
mod error;
pub mod types;

pub use client::GeminiClient;
pub use error::{LlmError, LlmResult};
