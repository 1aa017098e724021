use std::sync::Arc;

use quiz_core::model::{
    DEFAULT_QUESTIONS, GenerationRequest, GenerationStatus, Question, QuestionSet, QuestionSetId,
    UserId,
};
use storage::repository::{
    NewQuestionSetRecord, QuestionRepository, QuestionSetRepository, StorageError,
};
use tokio::task::JoinHandle;

use crate::Clock;
use crate::error::QuestionSetServiceError;
use crate::generation::GenerationTask;

/// A question set together with its questions, in storage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSetDetail {
    pub question_set: QuestionSet,
    pub questions: Vec<Question>,
}

/// Handle to a generation started by `QuestionSetService::request_generation`.
///
/// Dropping it leaves the generation running in the background.
#[derive(Debug)]
pub struct GenerationTicket {
    pub question_set: QuestionSet,
    handle: JoinHandle<GenerationStatus>,
}

impl GenerationTicket {
    /// Wait for the background generation to settle.
    pub async fn wait(self) -> GenerationStatus {
        self.handle.await.unwrap_or_else(|err| {
            tracing::error!(question_set_id = %self.question_set.id, error = %err, "generation task aborted");
            GenerationStatus::Error
        })
    }
}

/// Owner-scoped operations on question sets and their generation lifecycle.
#[derive(Clone)]
pub struct QuestionSetService {
    clock: Clock,
    question_sets: Arc<dyn QuestionSetRepository>,
    questions: Arc<dyn QuestionRepository>,
    generation: GenerationTask,
}

impl QuestionSetService {
    #[must_use]
    pub fn new(
        clock: Clock,
        question_sets: Arc<dyn QuestionSetRepository>,
        questions: Arc<dyn QuestionRepository>,
        generation: GenerationTask,
    ) -> Self {
        Self {
            clock,
            question_sets,
            questions,
            generation,
        }
    }

    /// Validate the request, store a pending set and start generating it.
    ///
    /// `count` defaults to `DEFAULT_QUESTIONS`. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::Invalid` for bad input and
    /// `QuestionSetServiceError::GenerationInProgress` while another set of the
    /// same user is still pending.
    pub async fn request_generation(
        &self,
        user_id: UserId,
        prompt: &str,
        count: Option<u8>,
    ) -> Result<GenerationTicket, QuestionSetServiceError> {
        let request = GenerationRequest::new(prompt, count.unwrap_or(DEFAULT_QUESTIONS))?;
        if self.question_sets.has_pending(user_id).await? {
            return Err(QuestionSetServiceError::GenerationInProgress);
        }

        let record = NewQuestionSetRecord::pending(user_id, &request, self.clock.now());
        let question_set = match self.question_sets.insert_pending(record).await {
            Ok(set) => set,
            Err(StorageError::Conflict) => {
                tracing::warn!(user_id = %user_id, "concurrent generation request rejected");
                return Err(QuestionSetServiceError::GenerationInProgress);
            }
            Err(err) => return Err(err.into()),
        };

        let handle = self.generation.spawn(
            question_set.id,
            request.prompt().to_owned(),
            request.question_count(),
        );
        Ok(GenerationTicket {
            question_set,
            handle,
        })
    }

    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::Storage` on backend failures.
    pub async fn has_pending(&self, user_id: UserId) -> Result<bool, QuestionSetServiceError> {
        Ok(self.question_sets.has_pending(user_id).await?)
    }

    /// The user's sets, pinned first then newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::Storage` on backend failures.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<QuestionSet>, QuestionSetServiceError> {
        Ok(self.question_sets.list_question_sets(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::NotFound` if the user does not own the set.
    pub async fn get(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<QuestionSetDetail, QuestionSetServiceError> {
        let question_set = self.owned(user_id, id).await?;
        let questions = self.questions.list_questions(id).await?;
        Ok(QuestionSetDetail {
            question_set,
            questions,
        })
    }

    /// Current generation status, for polling.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::NotFound` if the user does not own the set.
    pub async fn status(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<GenerationStatus, QuestionSetServiceError> {
        Ok(self.owned(user_id, id).await?.status)
    }

    /// Delete the set with its questions and practice history.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::NotFound` if the user does not own the set.
    pub async fn delete(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<(), QuestionSetServiceError> {
        self.question_sets.delete_question_set(user_id, id).await?;
        tracing::info!(question_set_id = %id, "question set deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::NotFound` if the user does not own the set.
    pub async fn pin(&self, user_id: UserId, id: QuestionSetId) -> Result<(), QuestionSetServiceError> {
        Ok(self
            .question_sets
            .set_pinned(user_id, id, Some(self.clock.now()))
            .await?)
    }

    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::NotFound` if the user does not own the set.
    pub async fn unpin(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<(), QuestionSetServiceError> {
        Ok(self.question_sets.set_pinned(user_id, id, None).await?)
    }

    async fn owned(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<QuestionSet, QuestionSetServiceError> {
        self.question_sets
            .get_question_set(user_id, id)
            .await?
            .ok_or(QuestionSetServiceError::NotFound)
    }
}
