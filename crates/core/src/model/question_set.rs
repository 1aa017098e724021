use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionSetId, UserId};

pub const PROMPT_MIN_CHARS: usize = 10;
pub const PROMPT_MAX_CHARS: usize = 2048;
pub const TITLE_MAX_CHARS: usize = 128;
pub const MIN_QUESTIONS: u8 = 2;
pub const MAX_QUESTIONS: u8 = 10;
pub const DEFAULT_QUESTIONS: u8 = 5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("prompt must be between {min} and {max} characters (got {len})")]
    PromptLength { len: usize, min: usize, max: usize },

    #[error("question count must be between {min} and {max} (got {count})")]
    QuestionCount { count: u8, min: u8, max: u8 },

    #[error("unknown generation status: {0}")]
    UnknownStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of the asynchronous generation behind a question set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Success,
    Error,
}

impl GenerationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError::UnknownStatus` for anything other than the three states.
    pub fn parse(s: &str) -> Result<Self, QuestionSetError> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(QuestionSetError::UnknownStatus(other.to_owned())),
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

//
// ─── REQUEST ───────────────────────────────────────────────────────────────────
//

/// Validated input for generating a new question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    question_count: u8,
}

impl GenerationRequest {
    /// Trim and validate a user-submitted prompt and question count.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError` when the prompt length or count is out of range.
    pub fn new(prompt: &str, question_count: u8) -> Result<Self, QuestionSetError> {
        let prompt = prompt.trim();
        let len = prompt.chars().count();
        if !(PROMPT_MIN_CHARS..=PROMPT_MAX_CHARS).contains(&len) {
            return Err(QuestionSetError::PromptLength {
                len,
                min: PROMPT_MIN_CHARS,
                max: PROMPT_MAX_CHARS,
            });
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&question_count) {
            return Err(QuestionSetError::QuestionCount {
                count: question_count,
                min: MIN_QUESTIONS,
                max: MAX_QUESTIONS,
            });
        }
        Ok(Self {
            prompt: prompt.to_owned(),
            question_count,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn question_count(&self) -> u8 {
        self.question_count
    }

    /// Placeholder title shown while generation is pending.
    #[must_use]
    pub fn provisional_title(&self) -> String {
        truncate_title(&self.prompt)
    }
}

/// Clamp a title to `TITLE_MAX_CHARS` characters.
#[must_use]
pub fn truncate_title(raw: &str) -> String {
    raw.trim().chars().take(TITLE_MAX_CHARS).collect()
}

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub id: QuestionSetId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub prompt: String,
    pub model: Option<String>,
    pub status: GenerationStatus,
    pub pinned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl QuestionSet {
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pinned_at.is_some()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == GenerationStatus::Success
    }
}

/// Listing order: pinned sets first (most recently pinned on top), then newest ids first.
pub fn sort_for_listing(sets: &mut [QuestionSet]) {
    sets.sort_by(|a, b| {
        b.pinned_at
            .cmp(&a.pinned_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
