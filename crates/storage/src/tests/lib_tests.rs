use super::*;

#[tokio::test]
async fn empty_database_has_no_session() {
    let storage = SessionStorage::new("sqlite::memory:").await.expect("db");
    assert!(storage.load_session().await.expect("load").is_none());
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = SessionStorage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn save_overwrites_previous_session() {
    let storage = SessionStorage::new("sqlite::memory:").await.expect("db");
    storage
        .save_session("token-a", r#"{"email":"a@example.com"}"#)
        .await
        .expect("save a");
    storage
        .save_session("token-b", r#"{"email":"b@example.com"}"#)
        .await
        .expect("save b");

    let session = storage.load_session().await.expect("load").expect("session");
    assert_eq!(session.token, "token-b");
    assert_eq!(session.user_json, r#"{"email":"b@example.com"}"#);
}

#[tokio::test]
async fn clear_removes_session() {
    let storage = SessionStorage::new("sqlite::memory:").await.expect("db");
    storage.save_session("t", "{}").await.expect("save");
    storage.clear_session().await.expect("clear");
    assert!(storage.load_session().await.expect("load").is_none());
}

#[tokio::test]
async fn session_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("session.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = SessionStorage::new(&database_url).await.expect("db");
    storage.save_session("persisted", "{}").await.expect("save");
    storage.pool().close().await;
    drop(storage);

    assert!(db_path.exists(), "database file should exist: {}", db_path.display());

    let reopened = SessionStorage::new(&database_url).await.expect("reopen");
    let session = reopened.load_session().await.expect("load").expect("session");
    assert_eq!(session.token, "persisted");
}

#[test]
fn memory_url_has_no_path() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/session.db?mode=rwc"),
        Some(PathBuf::from("./data/session.db"))
    );
}
