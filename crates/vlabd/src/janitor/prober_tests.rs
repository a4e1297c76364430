use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use vlabstore::fake_store::FakeStore;
use vlabstore::{Lease, ProcessHostAgentClient, ProcessHwTestRunner, ProcessResetCommand};

use super::*;
use crate::config::VlabdConfig;

fn state_with(store: Arc<FakeStore>) -> Arc<VlabdState> {
    let config = VlabdConfig::parse_from([
        "vlabd",
        "--config-path",
        "/tmp/vlab-prober-test-config.conf",
        "--access-log-path",
        "/tmp/vlab-prober-test-access.log",
    ]);
    let lease = Lease::new(store.clone() as Arc<dyn vlabstore::Store>);
    let access_log = vlabstore::access_log::AccessLogReader::new(config.access_log_path.clone());
    Arc::new(VlabdState {
        store: store as Arc<dyn vlabstore::Store>,
        lease,
        host_agent: Arc::new(ProcessHostAgentClient { binary: config.vlab_binary_path.clone() }),
        reset_command: Arc::new(ProcessResetCommand { binary: config.vlab_binary_path.clone() }),
        hwtest_runner: Arc::new(ProcessHwTestRunner { binary: config.vlab_binary_path.clone() }),
        config,
        access_log,
        shutdown: CancellationToken::new(),
    })
}

#[tokio::test]
async fn reachable_board_is_left_alone() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let _ = listener.accept().await;
        }
    });

    let store = Arc::new(FakeStore::default());
    store.sadd(keys::BOARDCLASSES, "fpga-a").await.unwrap();
    store.sadd(&keys::class_boards("fpga-a"), "s1").await.unwrap();
    store.set(&keys::board_server("s1"), "127.0.0.1").await.unwrap();
    store.set(&keys::board_port("s1"), &port.to_string()).await.unwrap();
    let state = state_with(store.clone());

    probe_once(&state).await;

    assert!(store.sismember(&keys::class_boards("fpga-a"), "s1").await.unwrap());
}

#[tokio::test]
async fn unreachable_board_is_removed_after_two_failures() {
    let store = Arc::new(FakeStore::default());
    store.sadd(keys::BOARDCLASSES, "fpga-a").await.unwrap();
    store.sadd(&keys::class_boards("fpga-a"), "s1").await.unwrap();
    store.set(&keys::board_server("s1"), "127.0.0.1").await.unwrap();
    store.set(&keys::board_port("s1"), "1").await.unwrap();
    let state = state_with(store.clone());

    probe_once(&state).await;

    assert!(!store.sismember(&keys::class_boards("fpga-a"), "s1").await.unwrap());
}

#[tokio::test]
async fn a_board_with_no_server_recorded_yet_is_skipped() {
    let store = Arc::new(FakeStore::default());
    store.sadd(keys::BOARDCLASSES, "fpga-a").await.unwrap();
    store.sadd(&keys::class_boards("fpga-a"), "s1").await.unwrap();
    let state = state_with(store.clone());

    probe_once(&state).await;

    assert!(store.sismember(&keys::class_boards("fpga-a"), "s1").await.unwrap());
}
