use std::sync::Arc;

use exam_core::model::{SessionPosition, SubjectId};
use storage::repository::KeyValueStore;
use storage::sqlite::SqliteRepository;
use storage::{PositionStore, Storage};

#[tokio::test]
async fn sqlite_kv_set_get_remove() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("token").await.unwrap(), None);

    repo.set("token", "first").await.unwrap();
    repo.set("token", "second").await.unwrap();
    assert_eq!(repo.get("token").await.unwrap().as_deref(), Some("second"));

    repo.remove("token").await.unwrap();
    assert_eq!(repo.get("token").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_migrate_is_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.set("k", "v").await.unwrap();
    repo.migrate().await.expect("second migrate");
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn position_survives_reopening_the_store() {
    let url = "sqlite:file:memdb_reload?mode=memory&cache=shared";
    // Hold one connection open so the shared in-memory database outlives the
    // first `Storage`.
    let keep_alive = SqliteRepository::connect(url).await.expect("connect");

    let before = Storage::sqlite(url).await.expect("open");
    PositionStore::new(Arc::clone(&before.kv))
        .set(SessionPosition::new(SubjectId::new(5), 3))
        .await
        .unwrap();
    drop(before);

    let after = Storage::sqlite(url).await.expect("reopen");
    let restored = PositionStore::new(after.kv)
        .get(SubjectId::new(5))
        .await
        .unwrap()
        .expect("persisted position");
    assert_eq!(restored.current_index(), 3);

    drop(keep_alive);
}
