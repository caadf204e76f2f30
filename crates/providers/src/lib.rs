//! Provider adapters for the try-on generation pipeline.
//!
//! Each adapter hides one provider's wire format behind the [`Provider`]
//! trait and normalizes every response and error into the uniform
//! `GenerationResult` taxonomy from `espelho-core`. Nothing above this crate
//! ever sees a raw provider payload.

pub mod adapter;
pub mod gemini;
pub mod groq;

pub use adapter::{Provider, ProviderConfig, ProviderKind};
pub use gemini::GeminiClient;
pub use groq::GroqClient;
