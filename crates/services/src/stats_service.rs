use std::sync::Arc;

use chrono::Duration;
use quiz_core::model::UserId;
use storage::repository::{PracticeRepository, QuestionRepository};

use crate::error::StatsServiceError;

/// Dashboard counters for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub questions_count: u64,
    pub practices_count: usize,
    /// Sum of `finished_at - created_at` over finished sessions.
    pub practice_time: Duration,
}

#[derive(Clone)]
pub struct StatsService {
    questions: Arc<dyn QuestionRepository>,
    practice: Arc<dyn PracticeRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>, practice: Arc<dyn PracticeRepository>) -> Self {
        Self {
            questions,
            practice,
        }
    }

    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` on backend failures.
    pub async fn dashboard(&self, user_id: UserId) -> Result<DashboardStats, StatsServiceError> {
        let questions_count = self.questions.count_questions_for_user(user_id).await?;
        let sessions = self.practice.list_sessions_for_user(user_id).await?;
        let practice_time = sessions
            .iter()
            .filter_map(|s| s.duration())
            .fold(Duration::zero(), |total, d| total + d);

        Ok(DashboardStats {
            questions_count,
            practices_count: sessions.len(),
            practice_time,
        })
    }
}
