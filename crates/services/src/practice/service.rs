use std::collections::HashSet;
use std::sync::Arc;

use quiz_core::RandomSource;
use quiz_core::model::{
    ChoiceId, Direction, PracticeAnswer, PracticeError, PracticeProgress, PracticeResults,
    PracticeSession, PracticeSessionId, Question, QuestionId, QuestionSetId, UserId,
};
use rand::seq::SliceRandom;
use storage::repository::{
    NewPracticeSessionRecord, PracticeRepository, QuestionRepository, QuestionSetRepository,
    StorageError,
};

use crate::Clock;
use crate::error::PracticeServiceError;

/// Drives practice sessions: start or resume, answer, navigate, finish, score.
///
/// Sessions are passed around as snapshots. Storage holds the authoritative
/// state and every mutation is a single atomic repository call; the snapshot
/// is updated from what the repository reports.
#[derive(Clone)]
pub struct PracticeService {
    clock: Clock,
    random: RandomSource,
    question_sets: Arc<dyn QuestionSetRepository>,
    questions: Arc<dyn QuestionRepository>,
    practice: Arc<dyn PracticeRepository>,
}

/// Storage reports a finished (or vanished) session as `Conflict`.
fn finished_on_conflict(err: StorageError) -> PracticeServiceError {
    match err {
        StorageError::Conflict => PracticeError::AlreadyFinished.into(),
        other => other.into(),
    }
}

impl PracticeService {
    #[must_use]
    pub fn new(
        clock: Clock,
        random: RandomSource,
        question_sets: Arc<dyn QuestionSetRepository>,
        questions: Arc<dyn QuestionRepository>,
        practice: Arc<dyn PracticeRepository>,
    ) -> Self {
        Self {
            clock,
            random,
            question_sets,
            questions,
            practice,
        }
    }

    /// Resume the set's unfinished session, or start one over a fresh shuffle.
    ///
    /// # Errors
    ///
    /// Returns `PracticeServiceError::NotFound` if the user does not own the set,
    /// `PracticeError::NotReady` while the set is not generated and
    /// `PracticeError::Empty` when it has no questions.
    pub async fn start_or_resume(
        &self,
        user_id: UserId,
        set_id: QuestionSetId,
    ) -> Result<PracticeSession, PracticeServiceError> {
        let question_set = self
            .question_sets
            .get_question_set(user_id, set_id)
            .await?
            .ok_or(PracticeServiceError::NotFound)?;
        if !question_set.is_ready() {
            return Err(PracticeError::NotReady.into());
        }

        if let Some(session) = self.practice.find_unfinished_session(set_id).await? {
            tracing::debug!(session_id = %session.id(), "resuming practice session");
            return Ok(session);
        }

        let mut order = self.questions.question_ids(set_id).await?;
        if order.is_empty() {
            return Err(PracticeError::Empty.into());
        }
        self.random.with_rng(|rng| order.shuffle(rng));

        let record = NewPracticeSessionRecord {
            question_set_id: set_id,
            questions_order: order,
            created_at: self.clock.now(),
        };
        match self.practice.insert_session(record).await {
            Ok(session) => {
                tracing::info!(session_id = %session.id(), question_set_id = %set_id, "practice session started");
                Ok(session)
            }
            Err(StorageError::Conflict) => {
                // Another request opened a session first; join it.
                tracing::warn!(question_set_id = %set_id, "lost race to open practice session");
                self.practice
                    .find_unfinished_session(set_id)
                    .await?
                    .ok_or(PracticeServiceError::Storage(StorageError::Conflict))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a session through `(user, set, session)`.
    ///
    /// # Errors
    ///
    /// Returns `PracticeServiceError::NotFound` on any ownership mismatch.
    pub async fn session(
        &self,
        user_id: UserId,
        set_id: QuestionSetId,
        session_id: PracticeSessionId,
    ) -> Result<PracticeSession, PracticeServiceError> {
        self.practice
            .get_session(user_id, set_id, session_id)
            .await?
            .ok_or(PracticeServiceError::NotFound)
    }

    /// The question under the session pointer.
    ///
    /// # Errors
    ///
    /// Returns `PracticeServiceError::NotFound` when the session is not the
    /// user's or the question disappeared, and `PracticeError::IndexOutOfBounds`
    /// for a broken pointer.
    pub async fn current_question(
        &self,
        user_id: UserId,
        session: &PracticeSession,
    ) -> Result<Question, PracticeServiceError> {
        let stored = self.authorize(user_id, session).await?;
        let question_id = stored.current_question_id()?;
        self.questions
            .get_question(stored.question_set_id(), question_id)
            .await?
            .ok_or(PracticeServiceError::NotFound)
    }

    /// Record or overwrite the answer for `question_id`. `None` leaves things as they are.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::AlreadyFinished` on finished sessions and
    /// `PracticeServiceError::NotFound` when the session is not the user's,
    /// the question is not part of it or the choice is not one of its options.
    pub async fn submit_answer(
        &self,
        user_id: UserId,
        session: &PracticeSession,
        question_id: QuestionId,
        choice_id: Option<ChoiceId>,
    ) -> Result<(), PracticeServiceError> {
        let stored = self.authorize(user_id, session).await?;
        stored.ensure_in_progress()?;
        let Some(choice_id) = choice_id else {
            return Ok(());
        };
        if !stored.contains(question_id) {
            return Err(PracticeServiceError::NotFound);
        }

        let question = self
            .questions
            .get_question(stored.question_set_id(), question_id)
            .await?
            .ok_or(PracticeServiceError::NotFound)?;
        if question.choice(choice_id).is_none() {
            return Err(PracticeServiceError::NotFound);
        }

        let answer = PracticeAnswer {
            session_id: stored.id(),
            question_id,
            choice_id,
            answered_at: self.clock.now(),
        };
        self.practice
            .upsert_answer(&answer)
            .await
            .map_err(finished_on_conflict)
    }

    /// Step the pointer one question, clamped at both ends. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns `PracticeServiceError::NotFound` when the session is not the
    /// user's and `PracticeError::AlreadyFinished` on finished sessions.
    pub async fn advance(
        &self,
        user_id: UserId,
        session: &mut PracticeSession,
        direction: Direction,
    ) -> Result<usize, PracticeServiceError> {
        let stored = self.authorize(user_id, session).await?;
        stored.ensure_in_progress()?;
        let index = self
            .practice
            .step_index(stored.id(), direction)
            .await
            .map_err(finished_on_conflict)?;
        *session = stored;
        session.set_current_index(index)?;
        Ok(index)
    }

    /// First position in the session order without an answer.
    ///
    /// # Errors
    ///
    /// Returns `PracticeServiceError::NotFound` when the session is not the user's.
    pub async fn next_unanswered_index(
        &self,
        user_id: UserId,
        session: &PracticeSession,
    ) -> Result<Option<usize>, PracticeServiceError> {
        let stored = self.authorize(user_id, session).await?;
        let answered = self.answered(stored.id()).await?;
        Ok(stored.next_unanswered_index(&answered))
    }

    /// Close the session once every question has an answer.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Incomplete` naming the first unanswered position
    /// (the session stays open), `PracticeError::AlreadyFinished` when it
    /// was closed before and `PracticeServiceError::NotFound` when it is not
    /// the user's.
    pub async fn finish(
        &self,
        user_id: UserId,
        session: &mut PracticeSession,
    ) -> Result<(), PracticeServiceError> {
        let stored = self.authorize(user_id, session).await?;
        stored.ensure_in_progress()?;
        let answered = self.answered(stored.id()).await?;
        stored.check_finishable(&answered)?;

        let now = self.clock.now();
        self.practice
            .mark_finished(stored.id(), now)
            .await
            .map_err(finished_on_conflict)?;
        *session = stored;
        session.mark_finished(now)?;
        tracing::info!(session_id = %session.id(), "practice session finished");
        Ok(())
    }

    /// Score a finished session in session order.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::NotFinished` for open sessions and
    /// `PracticeServiceError::NotFound` when the session is not the user's.
    pub async fn results(
        &self,
        user_id: UserId,
        session: &PracticeSession,
    ) -> Result<PracticeResults, PracticeServiceError> {
        let stored = self.authorize(user_id, session).await?;
        if !stored.is_finished() {
            return Err(PracticeError::NotFinished.into());
        }
        let questions = self.questions.list_questions(stored.question_set_id()).await?;
        let answers = self.practice.list_answers(stored.id()).await?;
        Ok(PracticeResults::compute(&stored, &questions, &answers)?)
    }

    #[must_use]
    pub fn progress(&self, session: &PracticeSession) -> PracticeProgress {
        session.progress()
    }

    /// Answers recorded so far.
    ///
    /// # Errors
    ///
    /// Returns `PracticeServiceError::NotFound` when the session is not the user's.
    pub async fn answers(
        &self,
        user_id: UserId,
        session: &PracticeSession,
    ) -> Result<Vec<PracticeAnswer>, PracticeServiceError> {
        let stored = self.authorize(user_id, session).await?;
        Ok(self.practice.list_answers(stored.id()).await?)
    }

    /// Jump the pointer to `index`; used to send the user back to a gap.
    /// Callers authorize the session first.
    pub(crate) async fn jump_to(
        &self,
        session: &mut PracticeSession,
        index: usize,
    ) -> Result<(), PracticeServiceError> {
        self.practice
            .set_index(session.id(), index)
            .await
            .map_err(finished_on_conflict)?;
        session.set_current_index(index)?;
        Ok(())
    }

    /// The stored copy of `session`, looked up through `(user, set, session)`.
    async fn authorize(
        &self,
        user_id: UserId,
        session: &PracticeSession,
    ) -> Result<PracticeSession, PracticeServiceError> {
        self.session(user_id, session.question_set_id(), session.id())
            .await
    }

    async fn answered(
        &self,
        session_id: PracticeSessionId,
    ) -> Result<HashSet<QuestionId>, PracticeServiceError> {
        Ok(self
            .practice
            .list_answers(session_id)
            .await?
            .into_iter()
            .map(|a| a.question_id)
            .collect())
    }
}
