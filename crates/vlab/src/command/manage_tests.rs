use std::sync::Arc;

use vlabstore::fake_store::FakeStore;

use super::*;

async fn lease_with_one_board() -> Lease {
    let store = Arc::new(FakeStore::new());
    store.sadd(keys::USERS, "alice").await.unwrap();
    store.set(&keys::user_overlord("alice"), "1").await.unwrap();
    store.set(&keys::user_allowedclasses("alice"), "vlab_zybo").await.unwrap();
    store.sadd(keys::KNOWNBOARDS, "B1").await.unwrap();
    store.set(&keys::board_class("B1"), "vlab_zybo").await.unwrap();
    store.set(&keys::board_type("B1"), "zybo-z7").await.unwrap();
    store.sadd(&keys::class_available("vlab_zybo"), "B1").await.unwrap();
    Lease::new(store)
}

#[tokio::test]
async fn list_boards_projects_available_status() {
    let lease = lease_with_one_board().await;
    let rows = list_boards(lease.store().as_ref(), &lease).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].serial, "B1");
    assert_eq!(rows[0].status, BoardStatus::Available);
}

#[tokio::test]
async fn list_users_reports_overlord_and_allowed_classes() {
    let lease = lease_with_one_board().await;
    let rows = list_users(lease.store().as_ref()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "alice");
    assert!(rows[0].overlord);
    assert_eq!(rows[0].allowed_classes, vec!["vlab_zybo".to_owned()]);
}

#[tokio::test]
async fn unlock_clears_a_held_lock() {
    let lease = lease_with_one_board().await;
    let store = lease.store();
    store.srem(&keys::class_available("vlab_zybo"), "B1").await.unwrap();
    lease.lock_board("B1", "vlab_zybo", "alice", 0).await.unwrap();

    unlock(store.as_ref(), &lease, "B1").await.unwrap();

    assert!(lease.read_lock("B1").await.unwrap().is_none());
}

#[tokio::test]
async fn unlock_rejects_an_unknown_board() {
    let lease = lease_with_one_board().await;
    let store = lease.store();
    let err = unlock(store.as_ref(), &lease, "nonexistent").await.unwrap_err();
    assert!(matches!(err, VlabError::UnknownBoard(_)));
}

#[tokio::test]
async fn hwtest_fail_marks_the_board_failed() {
    let lease = lease_with_one_board().await;
    let store = lease.store();
    hwtest_fail(store.as_ref(), "B1", "uart silent").await.unwrap();

    let row = board_row(store.as_ref(), &lease, "B1").await.unwrap();
    assert_eq!(row.status, BoardStatus::HwTestFailed);
}
