use serde::{Deserialize, Serialize};

use crate::model::ids::{ChoiceId, QuestionId, QuestionSetId};

//
// ─── GENERATED DRAFTS ──────────────────────────────────────────────────────────
//

/// A choice as produced by the question generator, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDraft {
    pub text: String,
    pub is_correct: bool,
}

impl ChoiceDraft {
    #[must_use]
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

/// A generated multiple-choice question. Choice order is what gets persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub choices: Vec<ChoiceDraft>,
    #[serde(default)]
    pub explanation: String,
}

impl QuestionDraft {
    /// Index of the first choice flagged correct.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        self.choices.iter().position(|c| c.is_correct)
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.choices.iter().filter(|c| c.is_correct).count()
    }
}

/// Payload returned by a question generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestionSet {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<QuestionDraft>,
}

//
// ─── PERSISTED QUESTIONS ───────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: ChoiceId,
    pub text: String,
    pub is_correct: bool,
}

/// A persisted question with its choices in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub question_set_id: QuestionSetId,
    pub text: String,
    pub explanation: String,
    pub choices: Vec<Choice>,
}

impl Question {
    #[must_use]
    pub fn choice(&self, id: ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn correct_choice(&self) -> Option<&Choice> {
        self.choices.iter().find(|c| c.is_correct)
    }
}

/// Letter shown next to a choice: 0 -> 'A', 1 -> 'B', ...
#[must_use]
pub fn choice_label(index: usize) -> Option<char> {
    let offset = u8::try_from(index).ok().filter(|i| *i < 26)?;
    Some(char::from(b'A' + offset))
}
