use std::sync::Arc;

use services::{AppServices, ScriptedRandom, SessionError};
use vocab_core::model::{LearningSettings, UserId};
use vocab_core::time::fixed_clock;

fn app() -> AppServices {
    AppServices::in_memory(
        LearningSettings::default(),
        fixed_clock(),
        Arc::new(ScriptedRandom::default()),
    )
}

#[tokio::test]
async fn quiz_loop_records_every_answer() {
    let app = app();
    let user = app.users().ensure_user("alice").await.unwrap();
    for (source, target) in [
        ("cat", "кошка"),
        ("dog", "собака"),
        ("sun", "солнце"),
        ("sea", "море"),
    ] {
        app.catalog().import_global_pair(source, target, None).await.unwrap();
    }
    let quiz = app.quiz();

    let session = quiz.start_session(user).await.unwrap();
    assert_eq!(session.total(), 4);

    let mut answered = 0;
    loop {
        let question = match quiz.current_question(user).await {
            Ok(question) => question,
            Err(SessionError::Completed) => break,
            Err(err) => panic!("unexpected error: {err}"),
        };
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.number, answered + 1);

        // answer the first question wrong, the rest right
        let choice = if answered == 0 {
            question
                .options
                .iter()
                .find(|o| **o != question.options[question.correct_option])
                .unwrap()
                .clone()
        } else {
            question.options[question.correct_option].to_uppercase()
        };
        let feedback = quiz.answer(user, &choice).await.unwrap();
        assert_eq!(feedback.correct, answered != 0);
        assert_eq!(feedback.pair_id, question.pair_id);
        answered += 1;
        assert_eq!(feedback.is_complete, answered == 4);
    }

    let summary = quiz.finish(user).unwrap();
    assert_eq!(summary.correct, 3);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.accuracy_percent, 75.0);

    let stats = app.stats().user_stats(user).await.unwrap();
    assert_eq!(stats.total_attempts, 4);
    assert_eq!(stats.in_progress_count, 3);
    assert!(matches!(quiz.finish(user), Err(SessionError::NoActiveSession)));
}

#[tokio::test]
async fn empty_catalog_cannot_start() {
    let app = app();
    let err = app.quiz().start_session(UserId::new(1)).await.unwrap_err();
    assert!(matches!(err, SessionError::Empty));
    assert!(matches!(
        app.quiz().current_question(UserId::new(1)).await,
        Err(SessionError::NoActiveSession)
    ));
}

#[tokio::test]
async fn restarting_replaces_the_previous_session() {
    let app = app();
    let user = app.users().ensure_user("alice").await.unwrap();
    app.catalog().import_global_pair("cat", "кошка", None).await.unwrap();
    app.catalog().import_global_pair("dog", "собака", None).await.unwrap();
    let quiz = app.quiz();

    quiz.start_session(user).await.unwrap();
    let first = quiz.current_question(user).await.unwrap();
    let correct = first.options[first.correct_option].clone();
    quiz.answer(user, &correct).await.unwrap();

    quiz.start_session(user).await.unwrap();
    let question = quiz.current_question(user).await.unwrap();
    assert_eq!(question.number, 1);
    assert_eq!(question.total, 2);
}

#[tokio::test]
async fn deleted_pair_is_dropped_from_the_session() {
    let app = app();
    let user = app.users().ensure_user("alice").await.unwrap();
    let own = app
        .catalog()
        .add_personal_or_favorite_global(user, "owl", "сова", None)
        .await
        .unwrap()
        .pair_id
        .unwrap();
    let quiz = app.quiz();
    quiz.start_session(user).await.unwrap();

    app.catalog().remove_from_user_list(user, own).await.unwrap();
    let err = quiz.answer(user, "сова").await.unwrap_err();
    assert!(matches!(err, SessionError::Progress(_)));

    assert!(matches!(
        quiz.current_question(user).await,
        Err(SessionError::Completed)
    ));
    let summary = quiz.finish(user).unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.accuracy_percent, 0.0);
}
