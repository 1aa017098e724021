use chrono::{DateTime, Utc};
use quiz_core::model::{
    Direction, PracticeAnswer, PracticeSession, PracticeSessionId, QuestionSetId, UserId,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conflict_or_conn, conn, encode_order, id_to_i64, index_to_i64, map_answer_row,
    map_session_row, ser,
};
use crate::repository::{NewPracticeSessionRecord, PracticeRepository, StorageError};

const SESSION_COLUMNS: &str =
    "id, question_set_id, questions_order, current_index, created_at, finished_at";

impl SqliteRepository {
    /// Explains why a guarded session update touched no rows.
    async fn session_violation(&self, session_id: i64) -> StorageError {
        let row = sqlx::query(
            "SELECT finished_at IS NOT NULL AS finished FROM practice_sessions WHERE id = ?1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await;
        match row {
            Ok(Some(row)) => match row.try_get::<i64, _>("finished") {
                Ok(0) => StorageError::NotFound,
                Ok(_) => StorageError::Conflict,
                Err(e) => ser(e),
            },
            Ok(None) => StorageError::NotFound,
            Err(e) => conn(e),
        }
    }
}

#[async_trait::async_trait]
impl PracticeRepository for SqliteRepository {
    async fn find_unfinished_session(
        &self,
        set_id: QuestionSetId,
    ) -> Result<Option<PracticeSession>, StorageError> {
        let sql = format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM practice_sessions
            WHERE question_set_id = ?1 AND finished_at IS NULL
            ORDER BY id DESC
            LIMIT 1
            "
        );
        let row = sqlx::query(&sql)
            .bind(id_to_i64("question_set_id", set_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_session_row).transpose()
    }

    async fn insert_session(
        &self,
        record: NewPracticeSessionRecord,
    ) -> Result<PracticeSession, StorageError> {
        let sql = format!(
            r"
            INSERT INTO practice_sessions (question_set_id, questions_order, current_index, created_at)
            VALUES (?1, ?2, 0, ?3)
            RETURNING {SESSION_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(id_to_i64("question_set_id", record.question_set_id.value())?)
            .bind(encode_order(&record.questions_order)?)
            .bind(record.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
                _ => conflict_or_conn(e),
            })?;

        map_session_row(&row)
    }

    async fn get_session(
        &self,
        user_id: UserId,
        set_id: QuestionSetId,
        session_id: PracticeSessionId,
    ) -> Result<Option<PracticeSession>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT p.id, p.question_set_id, p.questions_order, p.current_index,
                   p.created_at, p.finished_at
            FROM practice_sessions p
            JOIN question_sets s ON s.id = p.question_set_id
            WHERE p.id = ?1 AND p.question_set_id = ?2 AND s.user_id = ?3
            ",
        )
        .bind(id_to_i64("session_id", session_id.value())?)
        .bind(id_to_i64("question_set_id", set_id.value())?)
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_session_row).transpose()
    }

    async fn step_index(
        &self,
        session_id: PracticeSessionId,
        direction: Direction,
    ) -> Result<usize, StorageError> {
        let id = id_to_i64("session_id", session_id.value())?;
        // Clamp inside the statement so concurrent steps never race a read.
        let row = sqlx::query(
            r"
            UPDATE practice_sessions
            SET current_index = MAX(0, MIN(current_index + ?2, json_array_length(questions_order) - 1))
            WHERE id = ?1 AND finished_at IS NULL
            RETURNING current_index
            ",
        )
        .bind(id)
        .bind(direction.delta())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Err(self.session_violation(id).await);
        };
        let index: i64 = row.try_get("current_index").map_err(ser)?;
        usize::try_from(index).map_err(ser)
    }

    async fn set_index(
        &self,
        session_id: PracticeSessionId,
        index: usize,
    ) -> Result<(), StorageError> {
        let id = id_to_i64("session_id", session_id.value())?;
        let updated = sqlx::query(
            r"
            UPDATE practice_sessions
            SET current_index = ?2
            WHERE id = ?1 AND finished_at IS NULL
              AND ?2 < json_array_length(questions_order)
            ",
        )
        .bind(id)
        .bind(index_to_i64(index)?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            return Err(self.session_violation(id).await);
        }
        Ok(())
    }

    async fn upsert_answer(&self, answer: &PracticeAnswer) -> Result<(), StorageError> {
        let written = sqlx::query(
            r"
            INSERT INTO practice_answers (session_id, question_id, choice_id, answered_at)
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (
                SELECT 1 FROM practice_sessions WHERE id = ?1 AND finished_at IS NULL
            )
            ON CONFLICT(session_id, question_id) DO UPDATE SET
                choice_id = excluded.choice_id,
                answered_at = excluded.answered_at
            ",
        )
        .bind(id_to_i64("session_id", answer.session_id.value())?)
        .bind(id_to_i64("question_id", answer.question_id.value())?)
        .bind(id_to_i64("choice_id", answer.choice_id.value())?)
        .bind(answer.answered_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if written.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn list_answers(
        &self,
        session_id: PracticeSessionId,
    ) -> Result<Vec<PracticeAnswer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT session_id, question_id, choice_id, answered_at
            FROM practice_answers
            WHERE session_id = ?1
            ORDER BY question_id ASC
            ",
        )
        .bind(id_to_i64("session_id", session_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_answer_row).collect()
    }

    async fn mark_finished(
        &self,
        session_id: PracticeSessionId,
        finished_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let updated = sqlx::query(
            "UPDATE practice_sessions SET finished_at = ?2 WHERE id = ?1 AND finished_at IS NULL",
        )
        .bind(id_to_i64("session_id", session_id.value())?)
        .bind(finished_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn list_sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PracticeSession>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT p.id, p.question_set_id, p.questions_order, p.current_index,
                   p.created_at, p.finished_at
            FROM practice_sessions p
            JOIN question_sets s ON s.id = p.question_set_id
            WHERE s.user_id = ?1
            ORDER BY p.id ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_session_row).collect()
    }
}
