//! The text generation seam.

use crate::error::Result;
use async_trait::async_trait;

/// Turns a prompt into text.
///
/// Implementations may be slow, may fail, and may return text that does not
/// follow the instructions in the prompt. Callers are expected to validate
/// whatever comes back.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Identifier of the model behind this generator, for logging.
    fn model_name(&self) -> &str;
}
