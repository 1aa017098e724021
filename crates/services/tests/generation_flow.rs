use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use quiz_core::model::{
    ChoiceDraft, GeneratedQuestionSet, GenerationStatus, QuestionDraft, QuestionSetError, UserId,
};
use quiz_core::time::fixed_now;
use services::{
    AppServices, Clock, GenerationError, PracticeAction, QuestionGenerator,
    QuestionSetServiceError, RandomSource,
};
use storage::repository::Storage;
use tokio::sync::Notify;

const USER: UserId = UserId::new(1);

/// Generator that answers only after the test releases it.
struct GatedGenerator {
    gate: Arc<Notify>,
    fail: bool,
}

#[async_trait]
impl QuestionGenerator for GatedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        count: u8,
    ) -> Result<GeneratedQuestionSet, GenerationError> {
        self.gate.notified().await;
        if self.fail {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(GeneratedQuestionSet {
            title: format!("About {prompt}"),
            description: Some("generated for tests".into()),
            questions: (0..count)
                .map(|i| QuestionDraft {
                    text: format!("Question {i}"),
                    choices: vec![
                        ChoiceDraft::new("correct", true),
                        ChoiceDraft::new("incorrect", false),
                    ],
                    explanation: String::new(),
                })
                .collect(),
        })
    }

    fn model_name(&self) -> Option<&str> {
        Some("gated-model")
    }
}

fn app(fail: bool) -> (AppServices, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let generator = Arc::new(GatedGenerator {
        gate: Arc::clone(&gate),
        fail,
    });
    let services = AppServices::from_storage(
        &Storage::in_memory(),
        generator,
        Clock::fixed(fixed_now()),
        RandomSource::seeded(9),
    );
    (services, gate)
}

#[tokio::test]
async fn generation_moves_pending_set_to_success() {
    let (app, gate) = app(false);
    let sets = app.question_sets();

    let ticket = sets
        .request_generation(USER, "  pattern matching  ", Some(4))
        .await
        .unwrap();
    let id = ticket.question_set.id;
    assert_eq!(ticket.question_set.status, GenerationStatus::Pending);
    assert_eq!(ticket.question_set.title, "pattern matching");
    assert_eq!(sets.status(USER, id).await.unwrap(), GenerationStatus::Pending);
    assert!(sets.has_pending(USER).await.unwrap());

    let blocked = sets.request_generation(USER, "another topic here", None).await;
    assert!(matches!(
        blocked,
        Err(QuestionSetServiceError::GenerationInProgress)
    ));

    gate.notify_one();
    assert_eq!(ticket.wait().await, GenerationStatus::Success);

    let detail = sets.get(USER, id).await.unwrap();
    assert_eq!(detail.question_set.title, "About pattern matching");
    assert_eq!(detail.question_set.model.as_deref(), Some("gated-model"));
    assert_eq!(detail.questions.len(), 4);
    assert!(!sets.has_pending(USER).await.unwrap());
}

#[tokio::test]
async fn failed_generation_is_recorded_and_unblocks_user() {
    let (app, gate) = app(true);
    let sets = app.question_sets();

    let ticket = sets
        .request_generation(USER, "ownership rules", None)
        .await
        .unwrap();
    let id = ticket.question_set.id;
    gate.notify_one();
    assert_eq!(ticket.wait().await, GenerationStatus::Error);
    assert_eq!(sets.status(USER, id).await.unwrap(), GenerationStatus::Error);
    assert!(sets.get(USER, id).await.unwrap().questions.is_empty());

    assert!(matches!(
        app.practice().start_or_resume(USER, id).await,
        Err(services::PracticeServiceError::Practice(_))
    ));
    sets.request_generation(USER, "ownership rules again", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_storage() {
    let (app, _gate) = app(false);
    let sets = app.question_sets();

    assert!(matches!(
        sets.request_generation(USER, "short", None).await,
        Err(QuestionSetServiceError::Invalid(
            QuestionSetError::PromptLength { .. }
        ))
    ));
    assert!(matches!(
        sets.request_generation(USER, "a perfectly fine prompt", Some(11))
            .await,
        Err(QuestionSetServiceError::Invalid(
            QuestionSetError::QuestionCount { .. }
        ))
    ));
    assert!(sets.list(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_pinning_and_deleting_are_owner_scoped() {
    let (app, gate) = app(false);
    let sets = app.question_sets();

    let mut ids = Vec::new();
    for topic in ["first topic here", "second topic here", "third topic here"] {
        let ticket = sets.request_generation(USER, topic, Some(2)).await.unwrap();
        gate.notify_one();
        ids.push(ticket.question_set.id);
        assert_eq!(ticket.wait().await, GenerationStatus::Success);
    }

    sets.pin(USER, ids[0]).await.unwrap();
    let listed: Vec<_> = sets.list(USER).await.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(listed, vec![ids[0], ids[2], ids[1]]);

    sets.unpin(USER, ids[0]).await.unwrap();
    let listed: Vec<_> = sets.list(USER).await.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(listed, vec![ids[2], ids[1], ids[0]]);

    let stranger = UserId::new(2);
    assert!(sets.list(stranger).await.unwrap().is_empty());
    assert!(matches!(
        sets.get(stranger, ids[1]).await,
        Err(QuestionSetServiceError::NotFound)
    ));
    assert!(matches!(
        sets.pin(stranger, ids[1]).await,
        Err(QuestionSetServiceError::NotFound)
    ));
    assert!(matches!(
        sets.delete(stranger, ids[1]).await,
        Err(QuestionSetServiceError::NotFound)
    ));

    sets.delete(USER, ids[1]).await.unwrap();
    assert!(matches!(
        sets.status(USER, ids[1]).await,
        Err(QuestionSetServiceError::NotFound)
    ));
}

#[tokio::test]
async fn dashboard_counts_questions_sessions_and_time() {
    let gate = Arc::new(Notify::new());
    let storage = Storage::in_memory();
    let generator: Arc<dyn QuestionGenerator> = Arc::new(GatedGenerator {
        gate: Arc::clone(&gate),
        fail: false,
    });
    let start = AppServices::from_storage(
        &storage,
        Arc::clone(&generator),
        Clock::fixed(fixed_now()),
        RandomSource::seeded(1),
    );
    let later = AppServices::from_storage(
        &storage,
        generator,
        Clock::fixed(fixed_now() + Duration::minutes(3)),
        RandomSource::seeded(2),
    );

    let ticket = start
        .question_sets()
        .request_generation(USER, "error handling in rust", Some(3))
        .await
        .unwrap();
    let set_id = ticket.question_set.id;
    gate.notify_one();
    ticket.wait().await;

    let practice = start.practice();
    let mut session = practice.start_or_resume(USER, set_id).await.unwrap();
    let finishing = later.practice();
    for i in 0..3 {
        let question = practice.current_question(USER, &session).await.unwrap();
        let action = if i == 2 {
            PracticeAction::Finish
        } else {
            PracticeAction::Next
        };
        finishing
            .respond(
                USER,
                &mut session,
                question.id,
                Some(question.choices[0].id),
                action,
            )
            .await
            .unwrap();
    }
    practice.start_or_resume(USER, set_id).await.unwrap();

    let stats = start.stats().dashboard(USER).await.unwrap();
    assert_eq!(stats.questions_count, 3);
    assert_eq!(stats.practices_count, 2);
    assert_eq!(stats.practice_time, Duration::minutes(3));

    let empty = start.stats().dashboard(UserId::new(5)).await.unwrap();
    assert_eq!(empty.questions_count, 0);
    assert_eq!(empty.practices_count, 0);
    assert_eq!(empty.practice_time, Duration::zero());
}
