//! Generation provider trait for grounded answer synthesis.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates answer text from a system instruction and a
/// single user prompt.
///
/// The core performs exactly one generation call per answered query and
/// never retries; generation parameters (model, max tokens, temperature)
/// are configuration of the concrete provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion for `prompt` under the given system
    /// instruction, returning the provider's text verbatim.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;
}
