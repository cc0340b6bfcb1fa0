pub mod client;
pub mod gemini;
pub mod prompts;
pub mod repair;

pub use client::{ErrorBody, GenerationClient, GenerationError};
