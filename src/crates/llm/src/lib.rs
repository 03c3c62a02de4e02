//! Text generation clients for the review analysis pipeline.
//!
//! The pipeline only needs one capability from a model: turn a prompt into
//! text. That capability is the [`TextGenerator`] trait; [`remote::GeminiClient`]
//! is the production implementation.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use llm::config::{RemoteLlmConfig, GEMINI_BASE_URL};
//! use llm::remote::GeminiClient;
//! use llm::TextGenerator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env("GEMINI_API_KEY", GEMINI_BASE_URL, "gemini-2.5-flash-lite")?;
//!     let client = GeminiClient::new(config)?;
//!
//!     let reply = client.generate("What do users say about this app?").await?;
//!     println!("{}", reply);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod remote;

// Re-export commonly used types
pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use generator::TextGenerator;
pub use remote::GeminiClient;
