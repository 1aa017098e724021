use std::sync::Arc;

use quiz_core::RandomSource;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::generation::{ChatCompletionGenerator, GenerationTask, QuestionGenerator};
use crate::practice::PracticeService;
use crate::question_set_service::QuestionSetService;
use crate::stats_service::StatsService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    question_sets: Arc<QuestionSetService>,
    practice: Arc<PracticeService>,
    stats: Arc<StatsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the environment-configured generator.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let generator = ChatCompletionGenerator::from_env();
        if !generator.enabled() {
            tracing::warn!("QUIZ_AI_API_KEY is not set; generation requests will fail");
        }
        Ok(Self::from_storage(
            &storage,
            Arc::new(generator),
            clock,
            RandomSource::from_entropy(),
        ))
    }

    /// Wire services over an existing storage aggregate.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        generator: Arc<dyn QuestionGenerator>,
        clock: Clock,
        random: RandomSource,
    ) -> Self {
        let generation = GenerationTask::new(
            Arc::clone(&storage.question_sets),
            generator,
            random.clone(),
        );
        let question_sets = Arc::new(QuestionSetService::new(
            clock,
            Arc::clone(&storage.question_sets),
            Arc::clone(&storage.questions),
            generation,
        ));
        let practice = Arc::new(PracticeService::new(
            clock,
            random,
            Arc::clone(&storage.question_sets),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.practice),
        ));
        let stats = Arc::new(StatsService::new(
            Arc::clone(&storage.questions),
            Arc::clone(&storage.practice),
        ));

        Self {
            question_sets,
            practice,
            stats,
        }
    }

    #[must_use]
    pub fn question_sets(&self) -> Arc<QuestionSetService> {
        Arc::clone(&self.question_sets)
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }
}
