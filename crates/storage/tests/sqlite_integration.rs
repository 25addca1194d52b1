use chrono::Duration;
use quiz_core::model::{AuthProvider, UserId};
use quiz_core::time::fixed_now;
use storage::repository::{
    AccountRepository, GameResultRecord, GameResultRepository, LocalAccount,
    LoginAttemptRepository, LoginAttempts, Storage, StorageError, StoredAnswer, UserProfile,
    UserRepository,
};
use storage::sqlite::SqliteRepository;

fn answers() -> Vec<StoredAnswer> {
    vec![
        StoredAnswer {
            question_id: 1,
            selected: Some(1),
            correct: true,
            points: 150,
            seconds_remaining: 15,
        },
        StoredAnswer {
            question_id: 9,
            selected: None,
            correct: false,
            points: 0,
            seconds_remaining: 0,
        },
    ]
}

#[tokio::test]
async fn sqlite_profile_roundtrip_and_conflicts() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_profiles?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // second run is a no-op
    repo.migrate().await.expect("migrate again");

    let id = UserId::generate();
    let mut profile = UserProfile::new(id, "ana@example.com", Some("Ana"), fixed_now());
    repo.insert_user(&profile).await.unwrap();
    assert!(matches!(
        repo.insert_user(&profile).await,
        Err(StorageError::Conflict)
    ));

    profile.name = Some("Ana María".into());
    profile.points = 410;
    profile.updated_at = fixed_now() + Duration::minutes(5);
    repo.update_user(&profile).await.unwrap();

    let fetched = repo.get_user(id).await.unwrap().expect("profile");
    assert_eq!(fetched, profile);

    let missing = UserProfile::new(UserId::generate(), "nobody@example.com", None, fixed_now());
    assert!(matches!(
        repo.update_user(&missing).await,
        Err(StorageError::NotFound)
    ));
    assert!(repo.get_user(missing.id).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_results_keep_answers_and_order() {
    let storage = Storage::sqlite("sqlite:file:memdb_results?mode=memory&cache=shared")
        .await
        .expect("storage");

    let id = UserId::generate();
    storage
        .users
        .insert_user(&UserProfile::new(id, "luis@example.com", None, fixed_now()))
        .await
        .unwrap();

    for (score, minutes) in [(150_u32, 0_i64), (420, 10), (90, 5)] {
        storage
            .results
            .append_result(&GameResultRecord {
                id: None,
                user_id: id,
                score,
                correct_answers: 1,
                total_questions: 2,
                answers: answers(),
                completed_at: fixed_now() + Duration::minutes(minutes),
            })
            .await
            .unwrap();
    }

    let listed = storage.results.list_results(id).await.unwrap();
    let scores: Vec<_> = listed.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![420, 90, 150]);
    assert_eq!(listed[0].answers, answers());
    assert!(listed.iter().all(|r| r.id.is_some()));

    let other = storage.results.list_results(UserId::generate()).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn sqlite_rejects_results_for_unknown_accounts() {
    let storage = Storage::sqlite("sqlite:file:memdb_fk?mode=memory&cache=shared")
        .await
        .expect("storage");

    let err = storage
        .results
        .append_result(&GameResultRecord {
            id: None,
            user_id: UserId::generate(),
            score: 10,
            correct_answers: 0,
            total_questions: 1,
            answers: Vec::new(),
            completed_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Connection(_)));
}

#[tokio::test]
async fn sqlite_login_attempts_survive_a_new_connection() {
    let url = "sqlite:file:memdb_attempts?mode=memory&cache=shared";
    let first = Storage::sqlite(url).await.expect("storage");

    let mut row = LoginAttempts {
        key: "ana@example.com".into(),
        failures: 1,
        window_start: fixed_now(),
        locked_until: None,
    };
    first.attempts.save_attempts(&row).await.unwrap();
    row.failures = 5;
    row.locked_until = Some(fixed_now() + Duration::minutes(15));
    first.attempts.save_attempts(&row).await.unwrap();

    let second = Storage::sqlite(url).await.expect("reopen");
    let stored = second
        .attempts
        .get_attempts("ana@example.com")
        .await
        .unwrap()
        .expect("attempts");
    assert_eq!(stored, row);

    second.attempts.clear_attempts("ana@example.com").await.unwrap();
    assert!(
        first
            .attempts
            .get_attempts("ana@example.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn sqlite_accounts_roundtrip_and_conflicts() {
    let storage = Storage::sqlite("sqlite:file:memdb_accounts?mode=memory&cache=shared")
        .await
        .expect("storage");

    let mut account = LocalAccount {
        id: UserId::generate(),
        email: "luis@example.com".into(),
        name: None,
        password_hash: None,
        provider: AuthProvider::Google,
        google_linked: true,
        created_at: fixed_now(),
    };
    storage.accounts.insert_account(&account).await.unwrap();
    assert!(matches!(
        storage.accounts.insert_account(&account).await,
        Err(StorageError::Conflict)
    ));

    account.password_hash = Some("salt$digest".into());
    account.name = Some("Luis".into());
    storage.accounts.update_account(&account).await.unwrap();
    let stored = storage
        .accounts
        .get_account("luis@example.com")
        .await
        .unwrap()
        .expect("account");
    assert_eq!(stored, account);

    let missing = LocalAccount {
        email: "nobody@example.com".into(),
        ..account
    };
    assert!(matches!(
        storage.accounts.update_account(&missing).await,
        Err(StorageError::NotFound)
    ));
}
