use std::sync::Mutex;

use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use vlabstore::fake_store::FakeStore;
use vlabstore::{HostAgentClient, HwTestRunner, Lease, ResetCommand, VlabError};

use super::*;
use crate::config::VlabdConfig;

struct FixedOutcome {
    outcome: Result<String, VlabError>,
    resets: Mutex<Vec<String>>,
}

#[async_trait]
impl HostAgentClient for FixedOutcome {
    async fn restart(&self, _serial: &str) -> Result<(), VlabError> {
        Ok(())
    }
}

#[async_trait]
impl ResetCommand for FixedOutcome {
    async fn reset(&self, serial: &str) -> Result<(), VlabError> {
        self.resets.lock().unwrap().push(serial.to_owned());
        Ok(())
    }
}

#[async_trait]
impl HwTestRunner for FixedOutcome {
    async fn run_self_test(&self, _serial: &str, _timeout: Duration) -> Result<String, VlabError> {
        match &self.outcome {
            Ok(s) => Ok(s.clone()),
            Err(e) => Err(e.clone()),
        }
    }
}

fn state_with(outcome: Result<String, VlabError>) -> (Arc<VlabdState>, Arc<FixedOutcome>, Arc<FakeStore>) {
    let config = VlabdConfig::parse_from([
        "vlabd",
        "--config-path",
        "/tmp/vlab-hwtest-test-config.conf",
        "--access-log-path",
        "/tmp/vlab-hwtest-test-access.log",
        "--hwtest-magic-string",
        "OK_MAGIC",
    ]);
    let store = Arc::new(FakeStore::default());
    let capability = Arc::new(FixedOutcome { outcome, resets: Mutex::new(Vec::new()) });
    let lease = Lease::new(store.clone() as Arc<dyn vlabstore::Store>);
    let access_log = vlabstore::access_log::AccessLogReader::new(config.access_log_path.clone());
    let state = Arc::new(VlabdState {
        store: store.clone() as Arc<dyn vlabstore::Store>,
        lease,
        config,
        access_log,
        host_agent: capability.clone() as Arc<dyn HostAgentClient>,
        reset_command: capability.clone() as Arc<dyn ResetCommand>,
        hwtest_runner: capability.clone() as Arc<dyn HwTestRunner>,
        shutdown: CancellationToken::new(),
    });
    (state, capability, store)
}

#[tokio::test]
async fn passing_board_is_returned_to_both_pools() {
    let (state, capability, store) = state_with(Ok("booting...OK_MAGIC...done".to_owned()));
    store.sadd(keys::BOARDCLASSES, "fpga-a").await.unwrap();
    store.sadd(&keys::class_boards("fpga-a"), "s1").await.unwrap();

    test_board(&state, "fpga-a", "s1").await.unwrap();

    assert_eq!(store.get(&keys::board_hwtest_status("s1")).await.unwrap().as_deref(), Some("pass"));
    assert!(store.zscore(&keys::class_available("fpga-a"), "s1").await.unwrap().is_some());
    assert!(store.zscore(&keys::class_unlocked("fpga-a"), "s1").await.unwrap().is_some());
    assert_eq!(capability.resets.lock().unwrap().as_slice(), ["s1"]);
}

#[tokio::test]
async fn failing_board_is_left_out_of_both_pools() {
    let (state, _capability, store) = state_with(Ok("booting...nothing interesting".to_owned()));
    store.sadd(keys::BOARDCLASSES, "fpga-a").await.unwrap();
    store.sadd(&keys::class_boards("fpga-a"), "s1").await.unwrap();

    test_board(&state, "fpga-a", "s1").await.unwrap();

    assert_eq!(store.get(&keys::board_hwtest_status("s1")).await.unwrap().as_deref(), Some("fail"));
    assert!(store.zscore(&keys::class_available("fpga-a"), "s1").await.unwrap().is_none());
    assert!(store.zscore(&keys::class_unlocked("fpga-a"), "s1").await.unwrap().is_none());
}

#[tokio::test]
async fn locked_board_is_skipped() {
    let (state, capability, store) = state_with(Ok("OK_MAGIC".to_owned()));
    store.sadd(keys::BOARDCLASSES, "fpga-a").await.unwrap();
    store.sadd(&keys::class_boards("fpga-a"), "s1").await.unwrap();
    state.lease.lock_board("s1", "fpga-a", "alice", now_epoch()).await.unwrap();

    test_board(&state, "fpga-a", "s1").await.unwrap();

    assert!(store.get(&keys::board_hwtest_status("s1")).await.unwrap().is_none());
    assert!(capability.resets.lock().unwrap().is_empty());
}
