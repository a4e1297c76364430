// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vlabstore::{
    HostAgentClient, HwTestRunner, Lease, ProcessHostAgentClient, ProcessHwTestRunner, ProcessResetCommand,
    ResetCommand, Store,
};

use crate::config::VlabdConfig;

/// Shared daemon state: the control store, the lease primitives built on top
/// of it, the access log, and the process-spawn capabilities the janitors
/// recover boards through — everything C5's janitors and C6's HTTP handlers
/// need, behind one `Arc` the way the teacher's `MuxState` bundles its
/// session map and config.
pub struct VlabdState {
    pub store: Arc<dyn Store>,
    pub lease: Lease,
    pub config: VlabdConfig,
    pub access_log: vlabstore::access_log::AccessLogReader,
    pub host_agent: Arc<dyn HostAgentClient>,
    pub reset_command: Arc<dyn ResetCommand>,
    pub hwtest_runner: Arc<dyn HwTestRunner>,
    pub shutdown: CancellationToken,
}

impl VlabdState {
    pub fn new(store: Arc<dyn Store>, config: VlabdConfig, shutdown: CancellationToken) -> Self {
        let lease = Lease::new(Arc::clone(&store));
        let access_log = vlabstore::access_log::AccessLogReader::new(config.access_log_path.clone());
        let host_agent = Arc::new(ProcessHostAgentClient { binary: config.vlab_binary_path.clone() });
        let reset_command = Arc::new(ProcessResetCommand { binary: config.vlab_binary_path.clone() });
        let hwtest_runner = Arc::new(ProcessHwTestRunner { binary: config.vlab_binary_path.clone() });
        Self { store, lease, config, access_log, host_agent, reset_command, hwtest_runner, shutdown }
    }
}
