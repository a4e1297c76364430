// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis key-namespacing convention (SPEC_FULL.md §1-3). Centralized here so
//! every component builds keys the same way instead of hand-formatting them.

pub const BOARDCLASSES: &str = "vlab:boardclasses";
pub const USERS: &str = "vlab:users";
pub const PORTCOUNTER: &str = "vlab:portcounter";
pub const HWTEST_RUNNING: &str = "vlab:hwtest:running";
pub const HWTEST_TRIGGER: &str = "vlab:hwtest:trigger";
pub const CONFIG_RELOAD: &str = "vlab:config:reload";
/// Global registry of serials owned by the config-reload operation,
/// distinct from `boards[C]`'s attach/detach-driven membership.
pub const KNOWNBOARDS: &str = "vlab:knownboards";

pub fn class_boards(class: &str) -> String {
    format!("vlab:boardclass:{class}:boards")
}

pub fn class_available(class: &str) -> String {
    format!("vlab:boardclass:{class}:available")
}

pub fn class_unlocked(class: &str) -> String {
    format!("vlab:boardclass:{class}:unlocked")
}

pub fn class_locking(class: &str) -> String {
    format!("vlab:boardclass:{class}:locking")
}

pub fn board_class(serial: &str) -> String {
    format!("vlab:board:{serial}:class")
}

pub fn board_type(serial: &str) -> String {
    format!("vlab:board:{serial}:type")
}

pub fn board_reset(serial: &str) -> String {
    format!("vlab:board:{serial}:reset")
}

pub fn board_server(serial: &str) -> String {
    format!("vlab:board:{serial}:server")
}

pub fn board_port(serial: &str) -> String {
    format!("vlab:board:{serial}:port")
}

pub fn board_lock_user(serial: &str) -> String {
    format!("vlab:board:{serial}:lock:user")
}

pub fn board_lock_time(serial: &str) -> String {
    format!("vlab:board:{serial}:lock:time")
}

pub fn board_session_user(serial: &str) -> String {
    format!("vlab:board:{serial}:session:user")
}

pub fn board_session_start(serial: &str) -> String {
    format!("vlab:board:{serial}:session:start")
}

pub fn board_session_ping(serial: &str) -> String {
    format!("vlab:board:{serial}:session:ping")
}

pub fn board_hwtest_status(serial: &str) -> String {
    format!("vlab:board:{serial}:hwtest:status")
}

pub fn board_hwtest_time(serial: &str) -> String {
    format!("vlab:board:{serial}:hwtest:time")
}

pub fn board_hwtest_message(serial: &str) -> String {
    format!("vlab:board:{serial}:hwtest:message")
}

pub fn board_hwtest_testing(serial: &str) -> String {
    format!("vlab:board:{serial}:hwtest:testing")
}

pub fn user_overlord(user: &str) -> String {
    format!("vlab:user:{user}:overlord")
}

pub fn user_allowedclasses(user: &str) -> String {
    format!("vlab:user:{user}:allowedclasses")
}

/// All per-board instance keys, for `removeBoard`'s "delete all instance
/// keys" step.
pub fn board_instance_keys(serial: &str) -> Vec<String> {
    vec![
        board_class(serial),
        board_type(serial),
        board_reset(serial),
        board_server(serial),
        board_port(serial),
        board_lock_user(serial),
        board_lock_time(serial),
        board_session_user(serial),
        board_session_start(serial),
        board_session_ping(serial),
        board_hwtest_status(serial),
        board_hwtest_time(serial),
        board_hwtest_message(serial),
        board_hwtest_testing(serial),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_instance_keys_covers_every_field() {
        let keys = board_instance_keys("s1");
        assert_eq!(keys.len(), 14);
        assert!(keys.contains(&"vlab:board:s1:lock:user".to_owned()));
        assert!(keys.contains(&"vlab:board:s1:hwtest:testing".to_owned()));
    }
}
