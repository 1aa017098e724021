//! Question generation: the generator contract, its HTTP adapter and the
//! background task that turns a pending set into a playable one.

mod chat;
mod task;

use async_trait::async_trait;
use quiz_core::model::GeneratedQuestionSet;

use crate::error::GenerationError;

pub use chat::{ChatCompletionGenerator, GeneratorConfig, build_user_prompt};
pub use task::GenerationTask;

/// Source of generated question sets.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce `count` multiple-choice questions about `prompt`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the backend is unavailable or its
    /// output cannot be parsed.
    async fn generate(
        &self,
        prompt: &str,
        count: u8,
    ) -> Result<GeneratedQuestionSet, GenerationError>;

    /// Model identifier recorded on the question set, if known.
    fn model_name(&self) -> Option<&str>;
}
