use std::sync::Arc;

use quiz_core::RandomSource;
use quiz_core::balance::balance_choices;
use quiz_core::model::{GenerationStatus, QuestionSetId};
use storage::repository::{QuestionSetRepository, StorageError};
use tokio::task::JoinHandle;

use super::QuestionGenerator;
use crate::error::GenerationError;

/// Background job for one pending question set.
///
/// Runs once with no retries. Whatever happens, the set leaves `pending`.
#[derive(Clone)]
pub struct GenerationTask {
    question_sets: Arc<dyn QuestionSetRepository>,
    generator: Arc<dyn QuestionGenerator>,
    random: RandomSource,
}

impl GenerationTask {
    #[must_use]
    pub fn new(
        question_sets: Arc<dyn QuestionSetRepository>,
        generator: Arc<dyn QuestionGenerator>,
        random: RandomSource,
    ) -> Self {
        Self {
            question_sets,
            generator,
            random,
        }
    }

    /// Run on the tokio runtime without waiting for the result.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        &self,
        set_id: QuestionSetId,
        prompt: String,
        count: u8,
    ) -> JoinHandle<GenerationStatus> {
        let task = self.clone();
        tokio::spawn(async move { task.run(set_id, &prompt, count).await })
    }

    /// Generate, balance and persist questions, then report the final status.
    pub async fn run(&self, set_id: QuestionSetId, prompt: &str, count: u8) -> GenerationStatus {
        tracing::info!(question_set_id = %set_id, count, "generating question set");

        match self.generate_and_store(set_id, prompt, count).await {
            Ok(()) => {
                tracing::info!(question_set_id = %set_id, "question set generated");
                GenerationStatus::Success
            }
            Err(err) => {
                tracing::error!(question_set_id = %set_id, error = %err, "question set generation failed");
                self.mark_failed(set_id).await
            }
        }
    }

    async fn generate_and_store(
        &self,
        set_id: QuestionSetId,
        prompt: &str,
        count: u8,
    ) -> Result<(), GenerationError> {
        let mut generated = self.generator.generate(prompt, count).await?;
        generated.questions.truncate(usize::from(count));
        self.random
            .with_rng(|rng| balance_choices(&mut generated.questions, rng))?;

        self.question_sets
            .complete_generation(set_id, &generated, self.generator.model_name())
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, set_id: QuestionSetId) -> GenerationStatus {
        match self.question_sets.fail_generation(set_id).await {
            Ok(()) => GenerationStatus::Error,
            Err(StorageError::Conflict) => {
                // Already left pending, report whatever status it holds now.
                tracing::warn!(question_set_id = %set_id, "question set already settled");
                self.question_sets
                    .load_question_set(set_id)
                    .await
                    .ok()
                    .flatten()
                    .map_or(GenerationStatus::Error, |set| set.status)
            }
            Err(err) => {
                tracing::error!(question_set_id = %set_id, error = %err, "could not mark generation as failed");
                GenerationStatus::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::{
        ChoiceDraft, GeneratedQuestionSet, GenerationRequest, QuestionDraft, UserId,
    };
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, NewQuestionSetRecord, QuestionRepository};

    struct Canned(Option<GeneratedQuestionSet>);

    #[async_trait]
    impl QuestionGenerator for Canned {
        async fn generate(
            &self,
            _prompt: &str,
            _count: u8,
        ) -> Result<GeneratedQuestionSet, GenerationError> {
            self.0.clone().ok_or(GenerationError::EmptyResponse)
        }

        fn model_name(&self) -> Option<&str> {
            Some("canned")
        }
    }

    fn payload(n: usize) -> GeneratedQuestionSet {
        GeneratedQuestionSet {
            title: "Iterators".into(),
            description: None,
            questions: (0..n)
                .map(|i| QuestionDraft {
                    text: format!("Q{i}"),
                    choices: vec![
                        ChoiceDraft::new("right", true),
                        ChoiceDraft::new("wrong a", false),
                        ChoiceDraft::new("wrong b", false),
                        ChoiceDraft::new("wrong c", false),
                    ],
                    explanation: String::new(),
                })
                .collect(),
        }
    }

    async fn pending(repo: &InMemoryRepository) -> QuestionSetId {
        let request = GenerationRequest::new("iterator adapters", 8).unwrap();
        repo.insert_pending(NewQuestionSetRecord::pending(
            UserId::new(1),
            &request,
            fixed_now(),
        ))
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn success_balances_and_stores_questions() {
        let repo = InMemoryRepository::new();
        let id = pending(&repo).await;
        let task = GenerationTask::new(
            Arc::new(repo.clone()),
            Arc::new(Canned(Some(payload(8)))),
            RandomSource::seeded(5),
        );

        assert_eq!(task.run(id, "iterator adapters", 8).await, GenerationStatus::Success);

        let set = repo.load_question_set(id).await.unwrap().unwrap();
        assert_eq!(set.model.as_deref(), Some("canned"));
        let questions = repo.list_questions(id).await.unwrap();
        let mut per_index = [0usize; 4];
        for q in &questions {
            let pos = q.choices.iter().position(|c| c.is_correct).unwrap();
            per_index[pos] += 1;
        }
        assert_eq!(per_index, [2, 2, 2, 2]);
    }

    #[tokio::test]
    async fn generator_failure_marks_error() {
        let repo = InMemoryRepository::new();
        let id = pending(&repo).await;
        let task = GenerationTask::new(
            Arc::new(repo.clone()),
            Arc::new(Canned(None)),
            RandomSource::seeded(5),
        );

        let handle = task.spawn(id, "iterator adapters".into(), 8);
        assert_eq!(handle.await.unwrap(), GenerationStatus::Error);
        let set = repo.load_question_set(id).await.unwrap().unwrap();
        assert_eq!(set.status, GenerationStatus::Error);
        assert!(repo.list_questions(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unbalanceable_payload_marks_error() {
        let repo = InMemoryRepository::new();
        let id = pending(&repo).await;
        let mut bad = payload(3);
        bad.questions[1].choices[1].is_correct = true;
        let task = GenerationTask::new(
            Arc::new(repo.clone()),
            Arc::new(Canned(Some(bad))),
            RandomSource::seeded(5),
        );

        assert_eq!(task.run(id, "iterator adapters", 3).await, GenerationStatus::Error);
    }
}
