use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS question_sets (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            prompt TEXT NOT NULL,
            model TEXT,
            status TEXT NOT NULL CHECK (status IN ('pending', 'success', 'error')),
            pinned_at TEXT,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            question_set_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            explanation TEXT NOT NULL,
            FOREIGN KEY (question_set_id) REFERENCES question_sets(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS choices (
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            text TEXT NOT NULL,
            is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
            FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS practice_sessions (
            id INTEGER PRIMARY KEY,
            question_set_id INTEGER NOT NULL,
            questions_order TEXT NOT NULL,
            current_index INTEGER NOT NULL DEFAULT 0 CHECK (current_index >= 0),
            created_at TEXT NOT NULL,
            finished_at TEXT,
            FOREIGN KEY (question_set_id) REFERENCES question_sets(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS practice_answers (
            id INTEGER PRIMARY KEY,
            session_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            choice_id INTEGER NOT NULL,
            answered_at TEXT NOT NULL,
            UNIQUE (session_id, question_id),
            FOREIGN KEY (session_id) REFERENCES practice_sessions(id) ON DELETE CASCADE,
            FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE,
            FOREIGN KEY (choice_id) REFERENCES choices(id) ON DELETE CASCADE
        );
    ",
    // one generation in flight per user
    r"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_question_sets_one_pending
            ON question_sets (user_id) WHERE status = 'pending';
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_question_sets_user_listing
            ON question_sets (user_id, pinned_at, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_set
            ON questions (question_set_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_choices_question_position
            ON choices (question_id, position);
    ",
    // one unfinished session per question set
    r"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_practice_sessions_one_open
            ON practice_sessions (question_set_id) WHERE finished_at IS NULL;
    ",
];

/// Runs versioned migrations for the current schema.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: question sets, questions, choices, practice sessions and answers.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
