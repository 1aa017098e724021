use chrono::{DateTime, Utc};
use quiz_core::model::{GeneratedQuestionSet, QuestionSet, QuestionSetId, UserId, truncate_title};

use super::SqliteRepository;
use super::mapping::{conflict_or_conn, conn, id_to_i64, index_to_i64, map_question_set_row};
use crate::repository::{NewQuestionSetRecord, QuestionSetRepository, StorageError};

const SET_COLUMNS: &str =
    "id, user_id, title, description, prompt, model, status, pinned_at, created_at";

impl SqliteRepository {
    /// Distinguishes a missing set from one that already left `pending`.
    async fn pending_violation(&self, id: i64) -> StorageError {
        let exists = sqlx::query("SELECT 1 FROM question_sets WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        match exists {
            Ok(Some(_)) => StorageError::Conflict,
            Ok(None) => StorageError::NotFound,
            Err(e) => conn(e),
        }
    }
}

#[async_trait::async_trait]
impl QuestionSetRepository for SqliteRepository {
    async fn insert_pending(
        &self,
        record: NewQuestionSetRecord,
    ) -> Result<QuestionSet, StorageError> {
        let sql = format!(
            r"
            INSERT INTO question_sets (user_id, title, prompt, status, created_at)
            VALUES (?1, ?2, ?3, 'pending', ?4)
            RETURNING {SET_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(id_to_i64("user_id", record.user_id.value())?)
            .bind(record.title)
            .bind(record.prompt)
            .bind(record.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_or_conn)?;

        map_question_set_row(&row)
    }

    async fn has_pending(&self, user_id: UserId) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM question_sets WHERE user_id = ?1 AND status = 'pending' LIMIT 1",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn get_question_set(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<Option<QuestionSet>, StorageError> {
        let sql = format!("SELECT {SET_COLUMNS} FROM question_sets WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("question_set_id", id.value())?)
            .bind(id_to_i64("user_id", user_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_question_set_row).transpose()
    }

    async fn load_question_set(
        &self,
        id: QuestionSetId,
    ) -> Result<Option<QuestionSet>, StorageError> {
        let sql = format!("SELECT {SET_COLUMNS} FROM question_sets WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("question_set_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_question_set_row).transpose()
    }

    async fn list_question_sets(&self, user_id: UserId) -> Result<Vec<QuestionSet>, StorageError> {
        let sql = format!(
            r"
            SELECT {SET_COLUMNS}
            FROM question_sets
            WHERE user_id = ?1
            ORDER BY pinned_at IS NULL, pinned_at DESC, id DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("user_id", user_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_set_row(&row)?);
        }
        Ok(out)
    }

    async fn complete_generation(
        &self,
        id: QuestionSetId,
        generated: &GeneratedQuestionSet,
        model: Option<&str>,
    ) -> Result<(), StorageError> {
        let set_id = id_to_i64("question_set_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // The status write comes first so the transaction holds the write lock
        // before any question rows exist.
        let updated = sqlx::query(
            r"
            UPDATE question_sets
            SET title = ?2, description = ?3, model = ?4, status = 'success'
            WHERE id = ?1 AND status = 'pending'
            ",
        )
        .bind(set_id)
        .bind(truncate_title(&generated.title))
        .bind(generated.description.as_deref())
        .bind(model)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            drop(tx);
            return Err(self.pending_violation(set_id).await);
        }

        for draft in &generated.questions {
            let question_id = sqlx::query(
                r"
                INSERT INTO questions (question_set_id, text, explanation)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(set_id)
            .bind(&draft.text)
            .bind(&draft.explanation)
            .execute(&mut *tx)
            .await
            .map_err(conn)?
            .last_insert_rowid();

            for (position, choice) in draft.choices.iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO choices (question_id, position, text, is_correct)
                    VALUES (?1, ?2, ?3, ?4)
                    ",
                )
                .bind(question_id)
                .bind(index_to_i64(position)?)
                .bind(&choice.text)
                .bind(choice.is_correct)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn fail_generation(&self, id: QuestionSetId) -> Result<(), StorageError> {
        let set_id = id_to_i64("question_set_id", id.value())?;
        let updated = sqlx::query(
            "UPDATE question_sets SET status = 'error' WHERE id = ?1 AND status = 'pending'",
        )
        .bind(set_id)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            return Err(self.pending_violation(set_id).await);
        }
        Ok(())
    }

    async fn set_pinned(
        &self,
        user_id: UserId,
        id: QuestionSetId,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let updated =
            sqlx::query("UPDATE question_sets SET pinned_at = ?3 WHERE id = ?1 AND user_id = ?2")
                .bind(id_to_i64("question_set_id", id.value())?)
                .bind(id_to_i64("user_id", user_id.value())?)
                .bind(pinned_at)
                .execute(&self.pool)
                .await
                .map_err(conn)?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_question_set(
        &self,
        user_id: UserId,
        id: QuestionSetId,
    ) -> Result<(), StorageError> {
        // foreign keys cascade to questions, choices, sessions and answers
        let deleted = sqlx::query("DELETE FROM question_sets WHERE id = ?1 AND user_id = ?2")
            .bind(id_to_i64("question_set_id", id.value())?)
            .bind(id_to_i64("user_id", user_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if deleted.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
