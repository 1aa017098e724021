use chrono::{DateTime, Utc};
use quiz_core::model::{
    Choice, ChoiceId, GenerationStatus, PracticeAnswer, PracticeSession, PracticeSessionId,
    QuestionId, QuestionSet, QuestionSetId, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Unique-index violations become `Conflict`; everything else is a connection error.
pub(crate) fn conflict_or_conn(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => conn(e),
    }
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn id_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn get_id(row: &SqliteRow, column: &'static str) -> Result<u64, StorageError> {
    id_from_i64(column, row.try_get::<i64, _>(column).map_err(ser)?)
}

pub(crate) fn index_to_i64(index: usize) -> Result<i64, StorageError> {
    i64::try_from(index).map_err(|_| StorageError::Serialization("index overflow".into()))
}

pub(crate) fn encode_order(order: &[QuestionId]) -> Result<String, StorageError> {
    serde_json::to_string(order).map_err(ser)
}

pub(crate) fn decode_order(raw: &str) -> Result<Vec<QuestionId>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_question_set_row(row: &SqliteRow) -> Result<QuestionSet, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(QuestionSet {
        id: QuestionSetId::new(get_id(row, "id")?),
        user_id: UserId::new(get_id(row, "user_id")?),
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        model: row.try_get("model").map_err(ser)?,
        status: GenerationStatus::parse(&status).map_err(ser)?,
        pinned_at: row.try_get("pinned_at").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

/// Maps a choice row, also returning the owning question id for grouping.
pub(crate) fn map_choice_row(row: &SqliteRow) -> Result<(QuestionId, Choice), StorageError> {
    let question_id = QuestionId::new(get_id(row, "question_id")?);
    let choice = Choice {
        id: ChoiceId::new(get_id(row, "id")?),
        text: row.try_get("text").map_err(ser)?,
        is_correct: row.try_get("is_correct").map_err(ser)?,
    };
    Ok((question_id, choice))
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<PracticeSession, StorageError> {
    let order: String = row.try_get("questions_order").map_err(ser)?;
    let current_index: i64 = row.try_get("current_index").map_err(ser)?;
    let current_index = usize::try_from(current_index)
        .map_err(|_| StorageError::Serialization(format!("invalid current_index: {current_index}")))?;
    let finished_at: Option<DateTime<Utc>> = row.try_get("finished_at").map_err(ser)?;

    PracticeSession::from_persisted(
        PracticeSessionId::new(get_id(row, "id")?),
        QuestionSetId::new(get_id(row, "question_set_id")?),
        decode_order(&order)?,
        current_index,
        row.try_get("created_at").map_err(ser)?,
        finished_at,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<PracticeAnswer, StorageError> {
    Ok(PracticeAnswer {
        session_id: PracticeSessionId::new(get_id(row, "session_id")?),
        question_id: QuestionId::new(get_id(row, "question_id")?),
        choice_id: ChoiceId::new(get_id(row, "choice_id")?),
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}
