use chrono::Duration;
use storage::repository::{
    AttemptRecord, CatalogRepository, FavoriteRepository, ProgressRepository, StorageError,
    UserRepository,
};
use storage::sqlite::SqliteRepository;
use vocab_core::model::{
    AttemptResult, Language, OutcomeReason, Progress, UserId, WordPairDraft, WordPairId, WordText,
};
use vocab_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn draft(source: &str, target: &str, hint: Option<&str>) -> WordPairDraft {
    WordPairDraft::new(source, target, hint).unwrap()
}

fn attempt(user: UserId, pair: WordPairId, correct: bool) -> AttemptRecord {
    AttemptRecord {
        id: None,
        user_id: user,
        pair_id: pair,
        correct,
        attempted_at: fixed_now(),
    }
}

fn apply(correct: bool) -> impl Fn(&mut Progress) -> AttemptResult + Send + Sync {
    move |p: &mut Progress| p.apply_attempt(correct, fixed_now(), 5)
}

async fn row_count(repo: &SqliteRepository, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(repo.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
    assert_eq!(repo.ensure_user("alice", fixed_now()).await.unwrap(), user);
}

#[tokio::test]
async fn sqlite_resolve_word_is_insert_or_fetch() {
    let repo = connect("memdb_resolve_word").await;
    let first = repo
        .resolve_word(
            Language::Source,
            &WordText::new(Language::Source, " House ").unwrap(),
            None,
        )
        .await
        .unwrap();
    let second = repo
        .resolve_word(
            Language::Source,
            &WordText::new(Language::Source, "HOUSE").unwrap(),
            Some("haʊs"),
        )
        .await
        .unwrap();
    assert_eq!(first, second);

    let words = repo.words_by_ids(&[first]).await.unwrap();
    assert_eq!(words[0].text().as_str(), "house");
    assert_eq!(words[0].hint(), Some("haʊs"));
}

#[tokio::test]
async fn sqlite_global_pairs_are_unique_despite_null_owner() {
    let repo = connect("memdb_global_unique").await;
    let (first, created) = repo
        .import_global_pair(&draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap();
    assert!(created);
    let (second, created_again) = repo
        .import_global_pair(&draft("Cat", "КОШКА", None), fixed_now())
        .await
        .unwrap();
    assert!(!created_again);
    assert_eq!(first, second);
    assert_eq!(repo.global_pair_ids().await.unwrap(), vec![first]);
}

#[tokio::test]
async fn sqlite_tiered_add_favorites_known_pairs_and_shadows_nothing() {
    let repo = connect("memdb_tiered_add").await;
    let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
    let (global, _) = repo
        .import_global_pair(&draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap();

    let added = repo
        .add_user_pair(user, &draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap();
    assert_eq!(added.reason, OutcomeReason::AddedAsFavorite);
    assert_eq!(added.pair_id, Some(global));
    assert!(repo.is_favorite(user, global).await.unwrap());

    let again = repo
        .add_user_pair(user, &draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap();
    assert_eq!(again.reason, OutcomeReason::AlreadyFavorite);

    let personal = repo
        .add_user_pair(user, &draft("dog", "собака", Some("dɒɡ")), fixed_now())
        .await
        .unwrap();
    assert_eq!(personal.reason, OutcomeReason::CreatedPersonal);
    let dup = repo
        .add_user_pair(user, &draft("dog", "собака", None), fixed_now())
        .await
        .unwrap();
    assert_eq!(dup.reason, OutcomeReason::AlreadyOwned);
    assert_eq!(dup.pair_id, personal.pair_id);

    let pairs = repo.personal_pairs(user).await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].hint(), Some("dɒɡ"));
    assert_eq!(repo.favorite_pairs(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_record_attempt_commits_progress_and_log_together() {
    let repo = connect("memdb_record_attempt").await;
    let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
    let pair = repo
        .add_user_pair(user, &draft("dog", "собака", None), fixed_now())
        .await
        .unwrap()
        .pair_id
        .unwrap();

    let mut last = None;
    for _ in 0..5 {
        let (_, result) = repo
            .record_attempt(&attempt(user, pair, true), &apply(true))
            .await
            .unwrap();
        last = Some(result);
    }
    let last = last.unwrap();
    assert!(last.memorized);
    assert!(last.just_memorized);

    let (_, after_miss) = repo
        .record_attempt(&attempt(user, pair, false), &apply(false))
        .await
        .unwrap();
    assert_eq!(after_miss.streak, 0);
    assert!(after_miss.memorized);

    let progress = repo.get_progress(user, pair).await.unwrap().unwrap();
    assert_eq!(progress.correct_streak(), 0);
    assert!(progress.is_memorized());
    assert_eq!(progress.last_attempt_at(), Some(fixed_now()));
    assert_eq!(repo.attempts_for_pair(user, pair).await.unwrap().len(), 6);
    assert_eq!(repo.memorized_pair_ids(user).await.unwrap(), vec![pair]);

    let counts = repo.user_counts(user).await.unwrap();
    assert_eq!(counts.total_attempts, 6);
    assert_eq!(counts.correct_attempts, 5);
    assert_eq!(counts.memorized, 1);
    assert_eq!(counts.in_progress, 0);
    assert_eq!(counts.personal_words, 1);
}

#[tokio::test]
async fn sqlite_record_attempt_on_missing_pair_leaves_no_trace() {
    let repo = connect("memdb_missing_pair").await;
    let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
    let missing = WordPairId::new(4242);

    let err = repo
        .record_attempt(&attempt(user, missing, true), &apply(true))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert_eq!(repo.user_counts(user).await.unwrap().total_attempts, 0);
    assert!(repo.get_progress(user, missing).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_add_for_unknown_user_rolls_back_resolved_words() {
    let repo = connect("memdb_unknown_user_add").await;
    let ghost = UserId::new(777);

    // both words are inserted before the pair insert trips the user foreign key
    let err = repo
        .add_user_pair(ghost, &draft("ghost", "призрак", None), fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UnknownUser(id) if id == ghost));
    assert_eq!(row_count(&repo, "words").await, 0);
    assert_eq!(row_count(&repo, "word_pairs").await, 0);

    let (global, _) = repo
        .import_global_pair(&draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap();
    let err = repo
        .add_user_pair(ghost, &draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UnknownUser(_)));
    assert!(matches!(
        repo.add_favorite(ghost, global, fixed_now()).await,
        Err(StorageError::UnknownUser(_))
    ));
    assert_eq!(row_count(&repo, "favorites").await, 0);
}

#[tokio::test]
async fn sqlite_attempt_for_unknown_user_leaves_no_trace() {
    let repo = connect("memdb_unknown_user_attempt").await;
    let ghost = UserId::new(777);
    let (pair, _) = repo
        .import_global_pair(&draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap();

    let err = repo
        .record_attempt(&attempt(ghost, pair, true), &apply(true))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UnknownUser(id) if id == ghost));
    assert_eq!(row_count(&repo, "attempts").await, 0);
    assert_eq!(row_count(&repo, "progress").await, 0);

    assert!(matches!(
        repo.ensure_progress(ghost, pair).await,
        Err(StorageError::UnknownUser(_))
    ));
    assert_eq!(row_count(&repo, "progress").await, 0);
}

#[tokio::test]
async fn sqlite_decay_resets_only_stale_unmastered_streaks() {
    let repo = connect("memdb_decay").await;
    let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
    let stale = repo
        .add_user_pair(user, &draft("dog", "собака", None), fixed_now())
        .await
        .unwrap()
        .pair_id
        .unwrap();
    let recent = repo
        .add_user_pair(user, &draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap()
        .pair_id
        .unwrap();

    for _ in 0..3 {
        repo.record_attempt(&attempt(user, stale, true), &apply(true))
            .await
            .unwrap();
    }
    let later = AttemptRecord {
        attempted_at: fixed_now() + Duration::days(4),
        ..attempt(user, recent, true)
    };
    repo.record_attempt(&later, &move |p: &mut Progress| {
        p.apply_attempt(true, fixed_now() + Duration::days(4), 5)
    })
    .await
    .unwrap();

    let now = fixed_now() + Duration::days(6);
    let reset = repo.decay_stale(user, now, Duration::days(5)).await.unwrap();
    assert_eq!(reset, 1);

    let stale_progress = repo.get_progress(user, stale).await.unwrap().unwrap();
    assert_eq!(stale_progress.correct_streak(), 0);
    let recent_progress = repo.get_progress(user, recent).await.unwrap().unwrap();
    assert_eq!(recent_progress.correct_streak(), 1);

    assert_eq!(
        repo.decay_stale(user, now, Duration::days(5)).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn sqlite_remove_personal_pair_cascades() {
    let repo = connect("memdb_remove_personal").await;
    let alice = repo.ensure_user("alice", fixed_now()).await.unwrap();
    let bob = repo.ensure_user("bob", fixed_now()).await.unwrap();
    let pair = repo
        .add_user_pair(alice, &draft("dog", "собака", None), fixed_now())
        .await
        .unwrap()
        .pair_id
        .unwrap();
    repo.record_attempt(&attempt(alice, pair, true), &apply(true))
        .await
        .unwrap();

    let denied = repo.remove_from_user_list(bob, pair).await.unwrap();
    assert_eq!(denied.reason, OutcomeReason::NotOwner);

    let removed = repo.remove_from_user_list(alice, pair).await.unwrap();
    assert_eq!(removed.reason, OutcomeReason::DeletedPersonal);
    assert!(repo.get_pair(pair).await.unwrap().is_none());
    assert!(repo.get_progress(alice, pair).await.unwrap().is_none());
    assert!(repo.attempts_for_pair(alice, pair).await.unwrap().is_empty());

    let gone = repo.remove_from_user_list(alice, pair).await.unwrap();
    assert_eq!(gone.reason, OutcomeReason::PairNotFound);
}

#[tokio::test]
async fn sqlite_favorites_reject_personal_pairs() {
    let repo = connect("memdb_favorites").await;
    let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
    let personal = repo
        .add_user_pair(user, &draft("dog", "собака", None), fixed_now())
        .await
        .unwrap()
        .pair_id
        .unwrap();
    let (global, _) = repo
        .import_global_pair(&draft("cat", "кошка", None), fixed_now())
        .await
        .unwrap();

    let not_global = repo.add_favorite(user, personal, fixed_now()).await.unwrap();
    assert_eq!(not_global.reason, OutcomeReason::NotGlobal);

    assert!(repo.add_favorite(user, global, fixed_now()).await.unwrap().success());
    let dup = repo.add_favorite(user, global, fixed_now()).await.unwrap();
    assert_eq!(dup.reason, OutcomeReason::AlreadyFavorite);

    let unlinked = repo.remove_from_user_list(user, global).await.unwrap();
    assert_eq!(unlinked.reason, OutcomeReason::RemovedFavorite);
    assert!(repo.get_pair(global).await.unwrap().is_some());
    let nothing = repo.remove_favorite(user, global).await.unwrap();
    assert_eq!(nothing.reason, OutcomeReason::NotFavorite);
}

#[tokio::test]
async fn sqlite_distractor_pool_excludes_correct_word() {
    let repo = connect("memdb_answer_words").await;
    let mut target_ids = Vec::new();
    for (source, target) in [
        ("cat", "кошка"),
        ("dog", "собака"),
        ("sun", "солнце"),
    ] {
        let (id, _) = repo
            .import_global_pair(&draft(source, target, None), fixed_now())
            .await
            .unwrap();
        let pair = repo.get_pair(id).await.unwrap().unwrap();
        target_ids.push(pair.target().id());
    }

    let pool = repo
        .answer_word_ids(Language::Target, target_ids[0])
        .await
        .unwrap();
    assert_eq!(pool.len(), 2);
    assert!(!pool.contains(&target_ids[0]));
}

#[tokio::test]
async fn sqlite_search_is_scoped_to_caller() {
    let repo = connect("memdb_search").await;
    let alice = repo.ensure_user("alice", fixed_now()).await.unwrap();
    let bob = repo.ensure_user("bob", fixed_now()).await.unwrap();
    repo.import_global_pair(&draft("house", "дом", None), fixed_now())
        .await
        .unwrap();
    repo.add_user_pair(alice, &draft("household", "хозяйство", None), fixed_now())
        .await
        .unwrap();

    assert_eq!(
        repo.search_pairs(alice, Language::Source, "HOUSE", 10)
            .await
            .unwrap()
            .len(),
        2
    );
    let for_bob = repo
        .search_pairs(bob, Language::Source, "house", 10)
        .await
        .unwrap();
    assert_eq!(for_bob.len(), 1);
    assert!(for_bob[0].is_global());
    assert!(
        repo.search_pairs(bob, Language::Source, "%", 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn sqlite_delete_user_cascades_everything() {
    let repo = connect("memdb_delete_user").await;
    let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
    let pair = repo
        .add_user_pair(user, &draft("dog", "собака", None), fixed_now())
        .await
        .unwrap()
        .pair_id
        .unwrap();
    repo.record_attempt(&attempt(user, pair, true), &apply(true))
        .await
        .unwrap();

    assert!(repo.delete_user(user).await.unwrap());
    assert!(repo.get_pair(pair).await.unwrap().is_none());
    assert_eq!(repo.user_counts(user).await.unwrap().total_attempts, 0);
    assert!(!repo.delete_user(user).await.unwrap());
}
