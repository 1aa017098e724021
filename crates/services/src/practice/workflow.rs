use quiz_core::model::{
    ChoiceId, Direction, PracticeError, PracticeSession, QuestionId, UserId,
};

use super::service::PracticeService;
use crate::error::PracticeServiceError;

/// What the user asked for after answering the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeAction {
    Next,
    Previous,
    Finish,
}

/// Where a `respond` call left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeOutcome {
    /// Pointer now at `index`.
    Moved { index: usize },
    /// Session closed; results are available.
    Finished,
    /// Finish refused; pointer moved to the first unanswered position.
    Incomplete { index: usize },
}

impl PracticeService {
    /// Save the (optional) answer, then navigate or finish.
    ///
    /// # Errors
    ///
    /// Propagates `submit_answer`, `advance` and `finish` failures, except an
    /// incomplete finish, which is reported as `PracticeOutcome::Incomplete`.
    pub async fn respond(
        &self,
        user_id: UserId,
        session: &mut PracticeSession,
        question_id: QuestionId,
        choice_id: Option<ChoiceId>,
        action: PracticeAction,
    ) -> Result<PracticeOutcome, PracticeServiceError> {
        self.submit_answer(user_id, session, question_id, choice_id).await?;

        match action {
            PracticeAction::Next => Ok(PracticeOutcome::Moved {
                index: self.advance(user_id, session, Direction::Next).await?,
            }),
            PracticeAction::Previous => Ok(PracticeOutcome::Moved {
                index: self.advance(user_id, session, Direction::Previous).await?,
            }),
            PracticeAction::Finish => match self.finish(user_id, session).await {
                Ok(()) => Ok(PracticeOutcome::Finished),
                Err(PracticeServiceError::Practice(PracticeError::Incomplete { index })) => {
                    self.jump_to(session, index).await?;
                    Ok(PracticeOutcome::Incomplete { index })
                }
                Err(err) => Err(err),
            },
        }
    }
}
