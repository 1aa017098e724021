use chrono::Duration;
use quiz_core::model::{
    ChoiceDraft, Direction, GeneratedQuestionSet, GenerationRequest, GenerationStatus,
    PracticeAnswer, QuestionDraft, QuestionSet, UserId,
};
use quiz_core::time::fixed_now;
use storage::repository::{
    NewPracticeSessionRecord, NewQuestionSetRecord, PracticeRepository, QuestionRepository,
    QuestionSetRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn generated(n: usize) -> GeneratedQuestionSet {
    GeneratedQuestionSet {
        title: "Tokio basics".into(),
        description: Some("tasks and runtimes".into()),
        questions: (0..n)
            .map(|i| QuestionDraft {
                text: format!("Question {i}"),
                choices: vec![
                    ChoiceDraft::new("first", i % 2 == 0),
                    ChoiceDraft::new("second", i % 2 == 1),
                    ChoiceDraft::new("third", false),
                ],
                explanation: format!("because {i}"),
            })
            .collect(),
    }
}

async fn ready_set(repo: &SqliteRepository, user: UserId, n: usize) -> QuestionSet {
    let request = GenerationRequest::new("async rust with tokio", 5).unwrap();
    let set = repo
        .insert_pending(NewQuestionSetRecord::pending(user, &request, fixed_now()))
        .await
        .unwrap();
    repo.complete_generation(set.id, &generated(n), Some("gpt-test"))
        .await
        .unwrap();
    repo.get_question_set(user, set.id).await.unwrap().unwrap()
}

async fn open_session(
    repo: &SqliteRepository,
    set: &QuestionSet,
) -> quiz_core::model::PracticeSession {
    let order = repo.question_ids(set.id).await.unwrap();
    repo.insert_session(NewPracticeSessionRecord {
        question_set_id: set.id,
        questions_order: order,
        created_at: fixed_now(),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn generation_lifecycle_persists_questions_in_choice_order() {
    let repo = connect("memdb_generation").await;
    let user = UserId::new(1);
    let request = GenerationRequest::new("async rust with tokio", 3).unwrap();
    let pending = repo
        .insert_pending(NewQuestionSetRecord::pending(user, &request, fixed_now()))
        .await
        .unwrap();
    assert_eq!(pending.status, GenerationStatus::Pending);
    assert!(repo.has_pending(user).await.unwrap());

    let second = repo
        .insert_pending(NewQuestionSetRecord::pending(user, &request, fixed_now()))
        .await;
    assert!(matches!(second, Err(StorageError::Conflict)));

    repo.complete_generation(pending.id, &generated(3), Some("gpt-test"))
        .await
        .unwrap();
    assert!(!repo.has_pending(user).await.unwrap());

    let set = repo.load_question_set(pending.id).await.unwrap().unwrap();
    assert_eq!(set.status, GenerationStatus::Success);
    assert_eq!(set.title, "Tokio basics");
    assert_eq!(set.description.as_deref(), Some("tasks and runtimes"));
    assert_eq!(set.model.as_deref(), Some("gpt-test"));

    let questions = repo.list_questions(set.id).await.unwrap();
    assert_eq!(questions.len(), 3);
    for (i, question) in questions.iter().enumerate() {
        let texts: Vec<&str> = question.choices.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(question.explanation, format!("because {i}"));
        assert_eq!(question.choices.iter().filter(|c| c.is_correct).count(), 1);
    }

    let single = repo
        .get_question(set.id, questions[1].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(single, questions[1]);
    assert_eq!(repo.count_questions_for_user(user).await.unwrap(), 3);

    let again = repo.complete_generation(set.id, &generated(1), None).await;
    assert!(matches!(again, Err(StorageError::Conflict)));
    let missing = repo
        .fail_generation(quiz_core::model::QuestionSetId::new(999))
        .await;
    assert!(matches!(missing, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn failed_generation_releases_pending_slot() {
    let repo = connect("memdb_failed").await;
    let user = UserId::new(7);
    let request = GenerationRequest::new("sqlite query planner", 4).unwrap();
    let set = repo
        .insert_pending(NewQuestionSetRecord::pending(user, &request, fixed_now()))
        .await
        .unwrap();
    repo.fail_generation(set.id).await.unwrap();

    let stored = repo.get_question_set(user, set.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GenerationStatus::Error);
    assert!(!repo.has_pending(user).await.unwrap());
    repo.insert_pending(NewQuestionSetRecord::pending(user, &request, fixed_now()))
        .await
        .unwrap();
}

#[tokio::test]
async fn listing_puts_pinned_sets_first() {
    let repo = connect("memdb_listing").await;
    let user = UserId::new(1);
    let a = ready_set(&repo, user, 2).await;
    let b = ready_set(&repo, user, 2).await;
    let c = ready_set(&repo, user, 2).await;

    repo.set_pinned(user, a.id, Some(fixed_now())).await.unwrap();
    let ids: Vec<_> = repo
        .list_question_sets(user)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![a.id, c.id, b.id]);

    repo.set_pinned(user, b.id, Some(fixed_now() + Duration::minutes(1)))
        .await
        .unwrap();
    repo.set_pinned(user, a.id, None).await.unwrap();
    let ids: Vec<_> = repo
        .list_question_sets(user)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![b.id, c.id, a.id]);

    let foreign = repo.set_pinned(UserId::new(2), a.id, Some(fixed_now())).await;
    assert!(matches!(foreign, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn step_index_clamps_at_both_ends() {
    let repo = connect("memdb_step").await;
    let set = ready_set(&repo, UserId::new(1), 3).await;
    let session = open_session(&repo, &set).await;

    assert_eq!(repo.step_index(session.id(), Direction::Previous).await.unwrap(), 0);
    assert_eq!(repo.step_index(session.id(), Direction::Next).await.unwrap(), 1);
    assert_eq!(repo.step_index(session.id(), Direction::Next).await.unwrap(), 2);
    assert_eq!(repo.step_index(session.id(), Direction::Next).await.unwrap(), 2);

    repo.set_index(session.id(), 0).await.unwrap();
    let out_of_range = repo.set_index(session.id(), 3).await;
    assert!(matches!(out_of_range, Err(StorageError::NotFound)));

    let stored = repo
        .get_session(UserId::new(1), set.id, session.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_index(), 0);
}

#[tokio::test]
async fn answers_upsert_and_lock_after_finish() {
    let repo = connect("memdb_answers").await;
    let user = UserId::new(1);
    let set = ready_set(&repo, user, 2).await;
    let questions = repo.list_questions(set.id).await.unwrap();
    let session = open_session(&repo, &set).await;

    let mut answer = PracticeAnswer {
        session_id: session.id(),
        question_id: questions[0].id,
        choice_id: questions[0].choices[0].id,
        answered_at: fixed_now(),
    };
    repo.upsert_answer(&answer).await.unwrap();
    answer.choice_id = questions[0].choices[2].id;
    repo.upsert_answer(&answer).await.unwrap();

    let stored = repo.list_answers(session.id()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].choice_id, questions[0].choices[2].id);

    let second_open = repo
        .insert_session(NewPracticeSessionRecord {
            question_set_id: set.id,
            questions_order: vec![questions[0].id],
            created_at: fixed_now(),
        })
        .await;
    assert!(matches!(second_open, Err(StorageError::Conflict)));

    let finished_at = fixed_now() + Duration::seconds(90);
    repo.mark_finished(session.id(), finished_at).await.unwrap();
    assert!(matches!(
        repo.mark_finished(session.id(), finished_at).await,
        Err(StorageError::Conflict)
    ));
    assert!(matches!(
        repo.upsert_answer(&answer).await,
        Err(StorageError::Conflict)
    ));
    assert!(matches!(
        repo.step_index(session.id(), Direction::Next).await,
        Err(StorageError::Conflict)
    ));

    let sessions = repo.list_sessions_for_user(user).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].finished_at(), Some(finished_at));
    assert!(repo.find_unfinished_session(set.id).await.unwrap().is_none());

    // a finished session frees the slot for a new attempt
    open_session(&repo, &set).await;
}

#[tokio::test]
async fn sessions_resolve_only_through_owner() {
    let repo = connect("memdb_owner").await;
    let owner = UserId::new(1);
    let set = ready_set(&repo, owner, 2).await;
    let session = open_session(&repo, &set).await;

    assert!(
        repo.get_session(owner, set.id, session.id())
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        repo.get_session(UserId::new(2), set.id, session.id())
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.list_sessions_for_user(UserId::new(2)).await.unwrap().is_empty());

    repo.delete_question_set(owner, set.id).await.unwrap();
    assert!(repo.list_sessions_for_user(owner).await.unwrap().is_empty());
    assert_eq!(repo.count_questions_for_user(owner).await.unwrap(), 0);
}
