mod ids;
mod practice;
mod question;
mod question_set;

pub use ids::{ChoiceId, ParseIdError, PracticeSessionId, QuestionId, QuestionSetId, UserId};

pub use practice::{
    AnsweredQuestion, Direction, PracticeAnswer, PracticeError, PracticeProgress, PracticeResults,
    PracticeSession, SessionState,
};
pub use question::{Choice, ChoiceDraft, GeneratedQuestionSet, Question, QuestionDraft, choice_label};
pub use question_set::{
    DEFAULT_QUESTIONS, GenerationRequest, GenerationStatus, MAX_QUESTIONS, MIN_QUESTIONS,
    PROMPT_MAX_CHARS, PROMPT_MIN_CHARS, QuestionSet, QuestionSetError, TITLE_MAX_CHARS,
    sort_for_listing, truncate_title,
};
