use cube_core::model::{AccountError, StageProgress};
use cube_core::time::{fixed_clock, fixed_now};
use services::{AccountServiceError, AppServices};

#[tokio::test]
async fn registration_seeds_progress_and_statistic() {
    let services = AppServices::in_memory(fixed_clock());
    let accounts = services.accounts();

    let record = accounts.register("  cuber ", "secret1").await.unwrap();

    assert_eq!(record.username, "cuber");
    assert_eq!(record.created_at, fixed_now());
    assert_eq!(
        record.stages_progress.as_deref(),
        Some(StageProgress::initial().encode().as_str())
    );

    let statistic = record.statistic.as_deref().unwrap();
    let log = cube_core::document::decode_session_log(statistic).unwrap();
    assert_eq!(log.len(), 7);
    assert_eq!(log.sessions().last().unwrap().date(), fixed_clock().today());
    assert_ne!(record.password_hash, "secret1");
}

#[tokio::test]
async fn registration_rejects_taken_and_invalid_names() {
    let services = AppServices::in_memory(fixed_clock());
    let accounts = services.accounts();
    accounts.register("cuber", "secret1").await.unwrap();

    let err = accounts.register("cuber", "another1").await.unwrap_err();
    assert!(matches!(err, AccountServiceError::UsernameTaken(name) if name == "cuber"));

    let err = accounts.register("ab", "secret1").await.unwrap_err();
    assert!(matches!(
        err,
        AccountServiceError::Credentials(AccountError::UsernameTooShort { min: 3 })
    ));

    let err = accounts.register("abcd", "short").await.unwrap_err();
    assert!(matches!(
        err,
        AccountServiceError::Credentials(AccountError::PasswordTooShort { min: 6 })
    ));
}

#[tokio::test]
async fn login_checks_password() {
    let services = AppServices::in_memory(fixed_clock());
    let accounts = services.accounts();
    let registered = accounts.register("cuber", "secret1").await.unwrap();

    let record = accounts.login("cuber", "secret1").await.unwrap();
    assert_eq!(record.id, registered.id);

    let err = accounts.login("cuber", "secret2").await.unwrap_err();
    assert!(matches!(err, AccountServiceError::WrongPassword));

    let err = accounts.login("ghost", "secret1").await.unwrap_err();
    assert!(matches!(err, AccountServiceError::UnknownUser(name) if name == "ghost"));

    let err = accounts.login("cuber", "").await.unwrap_err();
    assert!(matches!(
        err,
        AccountServiceError::Credentials(AccountError::MissingFields)
    ));
}
