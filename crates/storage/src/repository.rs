use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Choice, ChoiceId, Direction, GeneratedQuestionSet, GenerationRequest, GenerationStatus,
    PracticeAnswer, PracticeSession, PracticeSessionId, Question, QuestionId, QuestionSet,
    QuestionSetId, UserId, sort_for_listing, truncate_title,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for a question set that is waiting on generation.
#[derive(Debug, Clone)]
pub struct NewQuestionSetRecord {
    pub user_id: UserId,
    pub title: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl NewQuestionSetRecord {
    #[must_use]
    pub fn pending(user_id: UserId, request: &GenerationRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            title: request.provisional_title(),
            prompt: request.prompt().to_owned(),
            created_at,
        }
    }
}

/// Insert shape for a practice session; ids are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewPracticeSessionRecord {
    pub question_set_id: QuestionSetId,
    pub questions_order: Vec<QuestionId>,
    pub created_at: DateTime<Utc>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for question sets and their generation lifecycle.
#[async_trait]
pub trait QuestionSetRepository: Send + Sync {
    /// Insert a `pending` question set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already has a pending set.
    async fn insert_pending(&self, record: NewQuestionSetRecord)
    -> Result<QuestionSet, StorageError>;

    /// Whether the user has a question set still being generated.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn has_pending(&self, user_id: UserId) -> Result<bool, StorageError>;

    /// Fetch a question set owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_question_set(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<Option<QuestionSet>, StorageError>;

    /// Fetch a question set without an ownership filter. Only for background work
    /// that already holds a trusted id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_question_set(&self, id: QuestionSetId)
    -> Result<Option<QuestionSet>, StorageError>;

    /// All sets owned by the user, pinned first then newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_question_sets(&self, user_id: UserId) -> Result<Vec<QuestionSet>, StorageError>;

    /// Attach generated questions and flip `pending` to `success` atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown ids and
    /// `StorageError::Conflict` if the set already left `pending`.
    async fn complete_generation(
        &self,
        id: QuestionSetId,
        generated: &GeneratedQuestionSet,
        model: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Flip `pending` to `error`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown ids and
    /// `StorageError::Conflict` if the set already left `pending`.
    async fn fail_generation(&self, id: QuestionSetId) -> Result<(), StorageError>;

    /// Set or clear the pin timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not own the set.
    async fn set_pinned(
        &self,
        user_id: UserId,
        id: QuestionSetId,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError>;

    /// Delete a set together with its questions, sessions and answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not own the set.
    async fn delete_question_set(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Question ids of a set in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn question_ids(&self, set_id: QuestionSetId) -> Result<Vec<QuestionId>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_question(
        &self,
        set_id: QuestionSetId,
        question_id: QuestionId,
    ) -> Result<Option<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(&self, set_id: QuestionSetId) -> Result<Vec<Question>, StorageError>;

    /// Number of questions across every set the user owns.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_questions_for_user(&self, user_id: UserId) -> Result<u64, StorageError>;
}

/// Persistence for practice sessions and their answers.
///
/// Every mutating call is a single atomic read-modify-write so that two
/// requests against the same session cannot lose each other's updates.
#[async_trait]
pub trait PracticeRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_unfinished_session(
        &self,
        set_id: QuestionSetId,
    ) -> Result<Option<PracticeSession>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the set already has an unfinished session.
    async fn insert_session(
        &self,
        record: NewPracticeSessionRecord,
    ) -> Result<PracticeSession, StorageError>;

    /// Fetch a session through its ownership chain (session -> set -> user).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_session(
        &self,
        user_id: UserId,
        set_id: QuestionSetId,
        session_id: PracticeSessionId,
    ) -> Result<Option<PracticeSession>, StorageError>;

    /// Move the pointer one step, clamped to the order, and return the new index.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown sessions and
    /// `StorageError::Conflict` for finished ones.
    async fn step_index(
        &self,
        session_id: PracticeSessionId,
        direction: Direction,
    ) -> Result<usize, StorageError>;

    /// Jump the pointer to `index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown sessions or out-of-range
    /// indexes and `StorageError::Conflict` for finished sessions.
    async fn set_index(
        &self,
        session_id: PracticeSessionId,
        index: usize,
    ) -> Result<(), StorageError>;

    /// Insert or overwrite the answer for `(session, question)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session is finished or missing.
    async fn upsert_answer(&self, answer: &PracticeAnswer) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_answers(
        &self,
        session_id: PracticeSessionId,
    ) -> Result<Vec<PracticeAnswer>, StorageError>;

    /// Set `finished_at` once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session is already finished or missing.
    async fn mark_finished(
        &self,
        session_id: PracticeSessionId,
        finished_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Every session across the user's question sets.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PracticeSession>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    sets: BTreeMap<QuestionSetId, QuestionSet>,
    questions: BTreeMap<QuestionId, Question>,
    sessions: BTreeMap<PracticeSessionId, PracticeSession>,
    answers: BTreeMap<(PracticeSessionId, QuestionId), PracticeAnswer>,
}

impl MemoryState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn owned_set(&self, user_id: UserId, id: QuestionSetId) -> Option<&QuestionSet> {
        self.sets.get(&id).filter(|s| s.is_owned_by(user_id))
    }

    fn pending_set(&mut self, id: QuestionSetId) -> Result<&mut QuestionSet, StorageError> {
        let set = self.sets.get_mut(&id).ok_or(StorageError::NotFound)?;
        if set.status != GenerationStatus::Pending {
            return Err(StorageError::Conflict);
        }
        Ok(set)
    }

    fn open_session(
        &mut self,
        id: PracticeSessionId,
    ) -> Result<&mut PracticeSession, StorageError> {
        let session = self.sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
        if session.is_finished() {
            return Err(StorageError::Conflict);
        }
        Ok(session)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// One mutex guards all tables, so each call is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuestionSetRepository for InMemoryRepository {
    async fn insert_pending(
        &self,
        record: NewQuestionSetRecord,
    ) -> Result<QuestionSet, StorageError> {
        let mut state = self.lock()?;
        let busy = state
            .sets
            .values()
            .any(|s| s.is_owned_by(record.user_id) && s.status == GenerationStatus::Pending);
        if busy {
            return Err(StorageError::Conflict);
        }
        let set = QuestionSet {
            id: QuestionSetId::new(state.allocate()),
            user_id: record.user_id,
            title: record.title,
            description: None,
            prompt: record.prompt,
            model: None,
            status: GenerationStatus::Pending,
            pinned_at: None,
            created_at: record.created_at,
        };
        state.sets.insert(set.id, set.clone());
        Ok(set)
    }

    async fn has_pending(&self, user_id: UserId) -> Result<bool, StorageError> {
        let state = self.lock()?;
        Ok(state
            .sets
            .values()
            .any(|s| s.is_owned_by(user_id) && s.status == GenerationStatus::Pending))
    }

    async fn get_question_set(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<Option<QuestionSet>, StorageError> {
        Ok(self.lock()?.owned_set(user_id, id).cloned())
    }

    async fn load_question_set(
        &self,
        id: QuestionSetId,
    ) -> Result<Option<QuestionSet>, StorageError> {
        Ok(self.lock()?.sets.get(&id).cloned())
    }

    async fn list_question_sets(&self, user_id: UserId) -> Result<Vec<QuestionSet>, StorageError> {
        let mut sets: Vec<QuestionSet> = self
            .lock()?
            .sets
            .values()
            .filter(|s| s.is_owned_by(user_id))
            .cloned()
            .collect();
        sort_for_listing(&mut sets);
        Ok(sets)
    }

    async fn complete_generation(
        &self,
        id: QuestionSetId,
        generated: &GeneratedQuestionSet,
        model: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.pending_set(id)?;

        let mut questions = Vec::with_capacity(generated.questions.len());
        for draft in &generated.questions {
            let question_id = QuestionId::new(state.allocate());
            let choices = draft
                .choices
                .iter()
                .map(|c| Choice {
                    id: ChoiceId::new(state.allocate()),
                    text: c.text.clone(),
                    is_correct: c.is_correct,
                })
                .collect();
            questions.push(Question {
                id: question_id,
                question_set_id: id,
                text: draft.text.clone(),
                explanation: draft.explanation.clone(),
                choices,
            });
        }
        for question in questions {
            state.questions.insert(question.id, question);
        }

        let set = state.pending_set(id)?;
        set.title = truncate_title(&generated.title);
        set.description = generated.description.clone();
        set.model = model.map(str::to_owned);
        set.status = GenerationStatus::Success;
        Ok(())
    }

    async fn fail_generation(&self, id: QuestionSetId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.pending_set(id)?.status = GenerationStatus::Error;
        Ok(())
    }

    async fn set_pinned(
        &self,
        user_id: UserId,
        id: QuestionSetId,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let set = state
            .sets
            .get_mut(&id)
            .filter(|s| s.is_owned_by(user_id))
            .ok_or(StorageError::NotFound)?;
        set.pinned_at = pinned_at;
        Ok(())
    }

    async fn delete_question_set(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state.owned_set(user_id, id).is_none() {
            return Err(StorageError::NotFound);
        }
        state.sets.remove(&id);
        state.questions.retain(|_, q| q.question_set_id != id);
        let dropped: Vec<PracticeSessionId> = state
            .sessions
            .values()
            .filter(|s| s.question_set_id() == id)
            .map(PracticeSession::id)
            .collect();
        state.sessions.retain(|_, s| s.question_set_id() != id);
        state.answers.retain(|(sid, _), _| !dropped.contains(sid));
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn question_ids(&self, set_id: QuestionSetId) -> Result<Vec<QuestionId>, StorageError> {
        Ok(self
            .lock()?
            .questions
            .values()
            .filter(|q| q.question_set_id == set_id)
            .map(|q| q.id)
            .collect())
    }

    async fn get_question(
        &self,
        set_id: QuestionSetId,
        question_id: QuestionId,
    ) -> Result<Option<Question>, StorageError> {
        Ok(self
            .lock()?
            .questions
            .get(&question_id)
            .filter(|q| q.question_set_id == set_id)
            .cloned())
    }

    async fn list_questions(&self, set_id: QuestionSetId) -> Result<Vec<Question>, StorageError> {
        Ok(self
            .lock()?
            .questions
            .values()
            .filter(|q| q.question_set_id == set_id)
            .cloned()
            .collect())
    }

    async fn count_questions_for_user(&self, user_id: UserId) -> Result<u64, StorageError> {
        let state = self.lock()?;
        let count = state
            .questions
            .values()
            .filter(|q| {
                state
                    .sets
                    .get(&q.question_set_id)
                    .is_some_and(|s| s.is_owned_by(user_id))
            })
            .count();
        u64::try_from(count).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl PracticeRepository for InMemoryRepository {
    async fn find_unfinished_session(
        &self,
        set_id: QuestionSetId,
    ) -> Result<Option<PracticeSession>, StorageError> {
        Ok(self
            .lock()?
            .sessions
            .values()
            .find(|s| s.question_set_id() == set_id && !s.is_finished())
            .cloned())
    }

    async fn insert_session(
        &self,
        record: NewPracticeSessionRecord,
    ) -> Result<PracticeSession, StorageError> {
        let mut state = self.lock()?;
        if !state.sets.contains_key(&record.question_set_id) {
            return Err(StorageError::NotFound);
        }
        let open = state
            .sessions
            .values()
            .any(|s| s.question_set_id() == record.question_set_id && !s.is_finished());
        if open {
            return Err(StorageError::Conflict);
        }
        let session = PracticeSession::from_persisted(
            PracticeSessionId::new(state.allocate()),
            record.question_set_id,
            record.questions_order,
            0,
            record.created_at,
            None,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.sessions.insert(session.id(), session.clone());
        Ok(session)
    }

    async fn get_session(
        &self,
        user_id: UserId,
        set_id: QuestionSetId,
        session_id: PracticeSessionId,
    ) -> Result<Option<PracticeSession>, StorageError> {
        let state = self.lock()?;
        if state.owned_set(user_id, set_id).is_none() {
            return Ok(None);
        }
        Ok(state
            .sessions
            .get(&session_id)
            .filter(|s| s.question_set_id() == set_id)
            .cloned())
    }

    async fn step_index(
        &self,
        session_id: PracticeSessionId,
        direction: Direction,
    ) -> Result<usize, StorageError> {
        let mut state = self.lock()?;
        let session = state.open_session(session_id)?;
        let target = session.target_index(direction);
        session
            .set_current_index(target)
            .map_err(|_| StorageError::Conflict)?;
        Ok(target)
    }

    async fn set_index(
        &self,
        session_id: PracticeSessionId,
        index: usize,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let session = state.open_session(session_id)?;
        if index >= session.total_questions() {
            return Err(StorageError::NotFound);
        }
        session
            .set_current_index(index)
            .map_err(|_| StorageError::Conflict)
    }

    async fn upsert_answer(&self, answer: &PracticeAnswer) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let open = state
            .sessions
            .get(&answer.session_id)
            .is_some_and(|s| !s.is_finished());
        if !open {
            return Err(StorageError::Conflict);
        }
        state
            .answers
            .insert((answer.session_id, answer.question_id), answer.clone());
        Ok(())
    }

    async fn list_answers(
        &self,
        session_id: PracticeSessionId,
    ) -> Result<Vec<PracticeAnswer>, StorageError> {
        Ok(self
            .lock()?
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn mark_finished(
        &self,
        session_id: PracticeSessionId,
        finished_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(StorageError::Conflict)?;
        session
            .mark_finished(finished_at)
            .map_err(|_| StorageError::Conflict)
    }

    async fn list_sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PracticeSession>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .values()
            .filter(|s| {
                state
                    .sets
                    .get(&s.question_set_id())
                    .is_some_and(|set| set.is_owned_by(user_id))
            })
            .cloned()
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub question_sets: Arc<dyn QuestionSetRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub practice: Arc<dyn PracticeRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Share one repository value across all three contracts.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: QuestionSetRepository + QuestionRepository + PracticeRepository + Clone + 'static,
    {
        let question_sets: Arc<dyn QuestionSetRepository> = Arc::new(repo.clone());
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let practice: Arc<dyn PracticeRepository> = Arc::new(repo);
        Self {
            question_sets,
            questions,
            practice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{ChoiceDraft, QuestionDraft};
    use quiz_core::time::fixed_now;

    fn generated(n: usize) -> GeneratedQuestionSet {
        GeneratedQuestionSet {
            title: "Borrowing".into(),
            description: Some("references and lifetimes".into()),
            questions: (0..n)
                .map(|i| QuestionDraft {
                    text: format!("Q{i}"),
                    choices: vec![ChoiceDraft::new("yes", true), ChoiceDraft::new("no", false)],
                    explanation: String::new(),
                })
                .collect(),
        }
    }

    async fn ready_set(repo: &InMemoryRepository, user: UserId, n: usize) -> QuestionSet {
        let request = GenerationRequest::new("ownership and borrowing", 5).unwrap();
        let set = repo
            .insert_pending(NewQuestionSetRecord::pending(user, &request, fixed_now()))
            .await
            .unwrap();
        repo.complete_generation(set.id, &generated(n), Some("test-model"))
            .await
            .unwrap();
        repo.get_question_set(user, set.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn one_pending_set_per_user() {
        let repo = InMemoryRepository::new();
        let request = GenerationRequest::new("ownership and borrowing", 5).unwrap();
        let user = UserId::new(1);
        repo.insert_pending(NewQuestionSetRecord::pending(user, &request, fixed_now()))
            .await
            .unwrap();
        assert!(repo.has_pending(user).await.unwrap());

        let err = repo
            .insert_pending(NewQuestionSetRecord::pending(user, &request, fixed_now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let other = UserId::new(2);
        assert!(!repo.has_pending(other).await.unwrap());
        repo.insert_pending(NewQuestionSetRecord::pending(other, &request, fixed_now()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn generation_completes_exactly_once() {
        let repo = InMemoryRepository::new();
        let set = ready_set(&repo, UserId::new(1), 3).await;
        assert_eq!(set.status, GenerationStatus::Success);
        assert_eq!(set.title, "Borrowing");
        assert_eq!(set.model.as_deref(), Some("test-model"));
        assert_eq!(repo.question_ids(set.id).await.unwrap().len(), 3);

        let again = repo.complete_generation(set.id, &generated(1), None).await;
        assert!(matches!(again, Err(StorageError::Conflict)));
        assert!(matches!(repo.fail_generation(set.id).await, Err(StorageError::Conflict)));
    }

    #[tokio::test]
    async fn sessions_are_scoped_to_owner() {
        let repo = InMemoryRepository::new();
        let owner = UserId::new(1);
        let set = ready_set(&repo, owner, 2).await;
        let order = repo.question_ids(set.id).await.unwrap();
        let session = repo
            .insert_session(NewPracticeSessionRecord {
                question_set_id: set.id,
                questions_order: order,
                created_at: fixed_now(),
            })
            .await
            .unwrap();

        assert!(repo.get_session(owner, set.id, session.id()).await.unwrap().is_some());
        assert!(
            repo.get_session(UserId::new(2), set.id, session.id())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_cascades_to_sessions_and_answers() {
        let repo = InMemoryRepository::new();
        let owner = UserId::new(1);
        let set = ready_set(&repo, owner, 1).await;
        let question = repo.list_questions(set.id).await.unwrap().remove(0);
        let session = repo
            .insert_session(NewPracticeSessionRecord {
                question_set_id: set.id,
                questions_order: vec![question.id],
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        repo.upsert_answer(&PracticeAnswer {
            session_id: session.id(),
            question_id: question.id,
            choice_id: question.choices[0].id,
            answered_at: fixed_now(),
        })
        .await
        .unwrap();

        assert!(matches!(
            repo.delete_question_set(UserId::new(2), set.id).await,
            Err(StorageError::NotFound)
        ));
        repo.delete_question_set(owner, set.id).await.unwrap();
        assert!(repo.list_questions(set.id).await.unwrap().is_empty());
        assert!(repo.list_answers(session.id()).await.unwrap().is_empty());
        assert!(repo.list_sessions_for_user(owner).await.unwrap().is_empty());
    }
}
