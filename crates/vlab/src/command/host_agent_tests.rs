use super::*;

#[test]
fn reassert_command_bakes_in_serial_and_port() {
    assert_eq!(reassert_command("vlab", "B1", 32768), "vlab host-agent reassert B1 --port 32768");
}

#[test]
fn resolve_server_prefers_the_explicit_override() {
    assert_eq!(resolve_server(Some("board-host-3".to_owned())).unwrap(), "board-host-3");
}

#[test]
fn acquire_serial_lock_is_exclusive_within_one_process() {
    let dir = tempfile::tempdir().unwrap();
    let first = acquire_serial_lock(dir.path(), "B1").unwrap();
    drop(first);
    // Re-acquiring after the first guard drops must succeed.
    let second = acquire_serial_lock(dir.path(), "B1").unwrap();
    drop(second);
}
