use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::ids::{ChoiceId, PracticeSessionId, QuestionId, QuestionSetId};
use crate::model::question::{Choice, Question};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("question set has no questions to practice")]
    Empty,

    #[error("question set is not ready for practice")]
    NotReady,

    #[error("current index {index} is out of bounds for {len} questions")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("question at position {index} has not been answered")]
    Incomplete { index: usize },

    #[error("practice session is not finished")]
    NotFinished,

    #[error("practice session is already finished")]
    AlreadyFinished,

    #[error("question {0} has no recorded answer")]
    MissingAnswer(QuestionId),

    #[error("choice {choice} does not belong to question {question}")]
    UnknownChoice {
        question: QuestionId,
        choice: ChoiceId,
    },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where a persisted session sits in its lifecycle. `NotStarted` is the absence of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    #[must_use]
    pub fn delta(self) -> i64 {
        match self {
            Self::Next => 1,
            Self::Previous => -1,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a question set, walking a fixed shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeSession {
    id: PracticeSessionId,
    question_set_id: QuestionSetId,
    questions_order: Vec<QuestionId>,
    current_index: usize,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl PracticeSession {
    /// Rehydrate a session from storage.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Empty` for an empty order and
    /// `PracticeError::IndexOutOfBounds` if the stored pointer is invalid.
    pub fn from_persisted(
        id: PracticeSessionId,
        question_set_id: QuestionSetId,
        questions_order: Vec<QuestionId>,
        current_index: usize,
        created_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<Self, PracticeError> {
        if questions_order.is_empty() {
            return Err(PracticeError::Empty);
        }
        if current_index >= questions_order.len() {
            return Err(PracticeError::IndexOutOfBounds {
                index: current_index,
                len: questions_order.len(),
            });
        }
        Ok(Self {
            id,
            question_set_id,
            questions_order,
            current_index,
            created_at,
            finished_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> PracticeSessionId {
        self.id
    }

    #[must_use]
    pub fn question_set_id(&self) -> QuestionSetId {
        self.question_set_id
    }

    #[must_use]
    pub fn questions_order(&self) -> &[QuestionId] {
        &self.questions_order
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions_order.len()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.finished_at.is_some() {
            SessionState::Finished
        } else {
            SessionState::InProgress
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state() == SessionState::Finished
    }

    #[must_use]
    pub fn contains(&self, question_id: QuestionId) -> bool {
        self.questions_order.contains(&question_id)
    }

    /// Identifier of the question under the pointer.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::IndexOutOfBounds` if the pointer left the order.
    pub fn current_question_id(&self) -> Result<QuestionId, PracticeError> {
        self.questions_order
            .get(self.current_index)
            .copied()
            .ok_or(PracticeError::IndexOutOfBounds {
                index: self.current_index,
                len: self.questions_order.len(),
            })
    }

    /// Index reached by one step in `direction`, clamped to the order.
    #[must_use]
    pub fn target_index(&self, direction: Direction) -> usize {
        let last = self.questions_order.len().saturating_sub(1);
        match direction {
            Direction::Next => (self.current_index + 1).min(last),
            Direction::Previous => self.current_index.saturating_sub(1),
        }
    }

    /// Move the pointer to `index`.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::AlreadyFinished` on a finished session and
    /// `PracticeError::IndexOutOfBounds` for an index outside the order.
    pub fn set_current_index(&mut self, index: usize) -> Result<(), PracticeError> {
        self.ensure_in_progress()?;
        if index >= self.questions_order.len() {
            return Err(PracticeError::IndexOutOfBounds {
                index,
                len: self.questions_order.len(),
            });
        }
        self.current_index = index;
        Ok(())
    }

    /// First position in the order whose question has no answer.
    #[must_use]
    pub fn next_unanswered_index(&self, answered: &HashSet<QuestionId>) -> Option<usize> {
        self.questions_order
            .iter()
            .position(|id| !answered.contains(id))
    }

    /// Validate that the session can be closed with the given answers.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::AlreadyFinished` or `PracticeError::Incomplete`.
    pub fn check_finishable(&self, answered: &HashSet<QuestionId>) -> Result<(), PracticeError> {
        self.ensure_in_progress()?;
        match self.next_unanswered_index(answered) {
            Some(index) => Err(PracticeError::Incomplete { index }),
            None => Ok(()),
        }
    }

    /// Record completion.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::AlreadyFinished` if already closed.
    pub fn mark_finished(&mut self, at: DateTime<Utc>) -> Result<(), PracticeError> {
        self.ensure_in_progress()?;
        self.finished_at = Some(at);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PracticeError::AlreadyFinished` once `finished_at` is set.
    pub fn ensure_in_progress(&self) -> Result<(), PracticeError> {
        if self.is_finished() {
            return Err(PracticeError::AlreadyFinished);
        }
        Ok(())
    }

    /// Time between creation and completion, if finished.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at.map(|end| end - self.created_at)
    }

    #[must_use]
    pub fn progress(&self) -> PracticeProgress {
        PracticeProgress::new(self.current_index, self.questions_order.len())
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeAnswer {
    pub session_id: PracticeSessionId,
    pub question_id: QuestionId,
    pub choice_id: ChoiceId,
    pub answered_at: DateTime<Utc>,
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Position of an in-progress session, for progress bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeProgress {
    /// 1-based position of the current question.
    pub position: usize,
    pub total: usize,
    pub percent: u8,
}

impl PracticeProgress {
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn new(current_index: usize, total: usize) -> Self {
        let position = current_index + 1;
        let percent = if total == 0 {
            0
        } else {
            ((position as f64 / total as f64) * 100.0).round().min(100.0) as u8
        };
        Self {
            position,
            total,
            percent,
        }
    }
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsweredQuestion {
    pub question: Question,
    pub selected_choice: Choice,
    pub is_correct: bool,
}

/// Scored outcome of a finished session, in session order.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeResults {
    pub answers: Vec<AnsweredQuestion>,
    pub correct_count: usize,
    pub total_count: usize,
    pub percent: f64,
    pub duration: Duration,
}

impl PracticeResults {
    /// Score a finished session.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::NotFinished` for open sessions,
    /// `PracticeError::MissingAnswer` when a question in the order has no
    /// answer or was removed, and `PracticeError::UnknownChoice` when the
    /// stored choice no longer belongs to its question.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(
        session: &PracticeSession,
        questions: &[Question],
        answers: &[PracticeAnswer],
    ) -> Result<Self, PracticeError> {
        let finished_at = session.finished_at().ok_or(PracticeError::NotFinished)?;

        let by_id: HashMap<QuestionId, &Question> = questions.iter().map(|q| (q.id, q)).collect();
        let chosen: HashMap<QuestionId, ChoiceId> = answers
            .iter()
            .filter(|a| a.session_id == session.id())
            .map(|a| (a.question_id, a.choice_id))
            .collect();

        let mut scored = Vec::with_capacity(session.total_questions());
        for question_id in session.questions_order() {
            let question = by_id
                .get(question_id)
                .ok_or(PracticeError::MissingAnswer(*question_id))?;
            let choice_id = chosen
                .get(question_id)
                .ok_or(PracticeError::MissingAnswer(*question_id))?;
            let selected = question
                .choice(*choice_id)
                .ok_or(PracticeError::UnknownChoice {
                    question: *question_id,
                    choice: *choice_id,
                })?;
            scored.push(AnsweredQuestion {
                question: (*question).clone(),
                selected_choice: selected.clone(),
                is_correct: selected.is_correct,
            });
        }

        let correct_count = scored.iter().filter(|a| a.is_correct).count();
        let total_count = scored.len();
        let percent = if total_count == 0 {
            0.0
        } else {
            correct_count as f64 / total_count as f64 * 100.0
        };

        Ok(Self {
            answers: scored,
            correct_count,
            total_count,
            percent,
            duration: finished_at - session.created_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn session(len: u64, index: usize) -> PracticeSession {
        PracticeSession::from_persisted(
            PracticeSessionId::new(1),
            QuestionSetId::new(1),
            (1..=len).map(QuestionId::new).collect(),
            index,
            fixed_now(),
            None,
        )
        .unwrap()
    }

    fn question(id: u64) -> Question {
        Question {
            id: QuestionId::new(id),
            question_set_id: QuestionSetId::new(1),
            text: format!("Q{id}"),
            explanation: String::new(),
            choices: vec![
                Choice { id: ChoiceId::new(id * 10), text: "right".into(), is_correct: true },
                Choice { id: ChoiceId::new(id * 10 + 1), text: "wrong".into(), is_correct: false },
            ],
        }
    }

    fn answer(question: u64, choice: u64) -> PracticeAnswer {
        PracticeAnswer {
            session_id: PracticeSessionId::new(1),
            question_id: QuestionId::new(question),
            choice_id: ChoiceId::new(choice),
            answered_at: fixed_now(),
        }
    }

    #[test]
    fn rejects_empty_order_and_bad_index() {
        let empty = PracticeSession::from_persisted(
            PracticeSessionId::new(1),
            QuestionSetId::new(1),
            Vec::new(),
            0,
            fixed_now(),
            None,
        );
        assert_eq!(empty.unwrap_err(), PracticeError::Empty);

        let bad = PracticeSession::from_persisted(
            PracticeSessionId::new(1),
            QuestionSetId::new(1),
            vec![QuestionId::new(1)],
            1,
            fixed_now(),
            None,
        );
        assert_eq!(bad.unwrap_err(), PracticeError::IndexOutOfBounds { index: 1, len: 1 });
    }

    #[test]
    fn target_index_clamps_at_edges() {
        assert_eq!(session(3, 0).target_index(Direction::Previous), 0);
        assert_eq!(session(3, 0).target_index(Direction::Next), 1);
        assert_eq!(session(3, 2).target_index(Direction::Next), 2);
        assert_eq!(session(3, 2).target_index(Direction::Previous), 1);
    }

    #[test]
    fn next_unanswered_scans_in_order() {
        let s = session(4, 0);
        let answered: HashSet<_> = [QuestionId::new(1), QuestionId::new(3)].into_iter().collect();
        assert_eq!(s.next_unanswered_index(&answered), Some(1));

        let all: HashSet<_> = (1..=4).map(QuestionId::new).collect();
        assert_eq!(s.next_unanswered_index(&all), None);
    }

    #[test]
    fn finish_guards_completeness_and_repeats() {
        let mut s = session(2, 0);
        let partial: HashSet<_> = [QuestionId::new(1)].into_iter().collect();
        assert_eq!(s.check_finishable(&partial), Err(PracticeError::Incomplete { index: 1 }));

        let all: HashSet<_> = (1..=2).map(QuestionId::new).collect();
        s.check_finishable(&all).unwrap();
        s.mark_finished(fixed_now()).unwrap();
        assert_eq!(s.state(), SessionState::Finished);
        assert_eq!(s.mark_finished(fixed_now()), Err(PracticeError::AlreadyFinished));
        assert_eq!(s.check_finishable(&all), Err(PracticeError::AlreadyFinished));
        assert_eq!(s.set_current_index(0), Err(PracticeError::AlreadyFinished));
    }

    #[test]
    fn progress_rounds_to_whole_percent() {
        assert_eq!(PracticeProgress::new(0, 3).percent, 33);
        assert_eq!(PracticeProgress::new(1, 3).percent, 67);
        assert_eq!(PracticeProgress::new(2, 3).percent, 100);
        assert_eq!(session(4, 1).progress().position, 2);
    }

    #[test]
    fn results_require_finish() {
        let s = session(1, 0);
        let err = PracticeResults::compute(&s, &[question(1)], &[answer(1, 10)]).unwrap_err();
        assert_eq!(err, PracticeError::NotFinished);
    }

    #[test]
    fn results_score_in_session_order() {
        let mut s = session(3, 0);
        s.mark_finished(fixed_now() + Duration::minutes(4)).unwrap();
        let questions = vec![question(3), question(1), question(2)];
        let answers = vec![answer(2, 21), answer(1, 10), answer(3, 30)];

        let results = PracticeResults::compute(&s, &questions, &answers).unwrap();
        let order: Vec<u64> = results.answers.iter().map(|a| a.question.id.value()).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(results.correct_count, 2);
        assert_eq!(results.total_count, 3);
        assert!((results.percent - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(results.duration, Duration::minutes(4));
        assert!(!results.answers[1].is_correct);
    }

    #[test]
    fn results_flag_missing_answers_and_foreign_choices() {
        let mut s = session(2, 0);
        s.mark_finished(fixed_now()).unwrap();
        let questions = vec![question(1), question(2)];

        let missing = PracticeResults::compute(&s, &questions, &[answer(1, 10)]).unwrap_err();
        assert_eq!(missing, PracticeError::MissingAnswer(QuestionId::new(2)));

        let foreign =
            PracticeResults::compute(&s, &questions, &[answer(1, 10), answer(2, 10)]).unwrap_err();
        assert_eq!(
            foreign,
            PracticeError::UnknownChoice { question: QuestionId::new(2), choice: ChoiceId::new(10) }
        );
    }
}
