use std::collections::HashMap;

use quiz_core::model::{Choice, Question, QuestionId, QuestionSetId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, get_id, id_to_i64, map_choice_row, ser};
use crate::repository::{QuestionRepository, StorageError};

fn question_shell(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    Ok(Question {
        id: QuestionId::new(get_id(row, "id")?),
        question_set_id: QuestionSetId::new(get_id(row, "question_set_id")?),
        text: row.try_get("text").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        choices: Vec::new(),
    })
}

impl SqliteRepository {
    async fn choices_for_set(
        &self,
        set_id: i64,
    ) -> Result<HashMap<QuestionId, Vec<Choice>>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.question_id, c.text, c.is_correct
            FROM choices c
            JOIN questions q ON q.id = c.question_id
            WHERE q.question_set_id = ?1
            ORDER BY c.question_id ASC, c.position ASC
            ",
        )
        .bind(set_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut grouped: HashMap<QuestionId, Vec<Choice>> = HashMap::new();
        for row in rows {
            let (question_id, choice) = map_choice_row(&row)?;
            grouped.entry(question_id).or_default().push(choice);
        }
        Ok(grouped)
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn question_ids(&self, set_id: QuestionSetId) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query("SELECT id FROM questions WHERE question_set_id = ?1 ORDER BY id")
            .bind(id_to_i64("question_set_id", set_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| get_id(row, "id").map(QuestionId::new))
            .collect()
    }

    async fn get_question(
        &self,
        set_id: QuestionSetId,
        question_id: QuestionId,
    ) -> Result<Option<Question>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, question_set_id, text, explanation
            FROM questions
            WHERE id = ?1 AND question_set_id = ?2
            ",
        )
        .bind(id_to_i64("question_id", question_id.value())?)
        .bind(id_to_i64("question_set_id", set_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut question = question_shell(&row)?;

        let choice_rows = sqlx::query(
            r"
            SELECT id, question_id, text, is_correct
            FROM choices
            WHERE question_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(id_to_i64("question_id", question_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        for row in choice_rows {
            let (_, choice) = map_choice_row(&row)?;
            question.choices.push(choice);
        }
        Ok(Some(question))
    }

    async fn list_questions(&self, set_id: QuestionSetId) -> Result<Vec<Question>, StorageError> {
        let set = id_to_i64("question_set_id", set_id.value())?;
        let rows = sqlx::query(
            r"
            SELECT id, question_set_id, text, explanation
            FROM questions
            WHERE question_set_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(set)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut choices = self.choices_for_set(set).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut question = question_shell(&row)?;
            question.choices = choices.remove(&question.id).unwrap_or_default();
            out.push(question);
        }
        Ok(out)
    }

    async fn count_questions_for_user(&self, user_id: UserId) -> Result<u64, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS total
            FROM questions q
            JOIN question_sets s ON s.id = q.question_set_id
            WHERE s.user_id = ?1
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let total: i64 = row.try_get("total").map_err(ser)?;
        u64::try_from(total).map_err(ser)
    }
}
