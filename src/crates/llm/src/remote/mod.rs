//! Remote provider implementations.
//!
//! # Providers
//!
//! - **Gemini** - Google's Gemini models, optionally with URL-context and search tools

pub mod gemini;

pub use gemini::GeminiClient;
