use std::time::Duration;

use super::*;

fn transport() -> ProcessSshTransport {
    ProcessSshTransport { identity: PathBuf::from("/home/alice/.ssh/vlab_key"), connect_timeout: Duration::from_secs(5) }
}

#[test]
fn exec_args_targets_user_at_host_port_with_the_identity_file() {
    let args = transport().exec_args("alice", "relay.example", 2201, "vlab reset B1");
    assert!(args.contains(&"-i".to_owned()));
    assert!(args.contains(&"/home/alice/.ssh/vlab_key".to_owned()));
    assert!(args.contains(&"-p".to_owned()));
    assert!(args.contains(&"2201".to_owned()));
    assert!(args.contains(&"alice@relay.example".to_owned()));
    assert_eq!(args.last(), Some(&"vlab reset B1".to_owned()));
}

#[test]
fn interactive_args_prepends_local_forwards_before_the_destination() {
    let args = transport().interactive_args(
        "alice",
        "relay.example",
        2201,
        &[(30000, "localhost", 3121), (9001, "localhost", 9001)],
        "screen -x vlab-B1",
    );
    assert_eq!(args[0], "-L");
    assert_eq!(args[1], "30000:localhost:3121");
    assert_eq!(args[2], "-L");
    assert_eq!(args[3], "9001:localhost:9001");
    assert!(args.contains(&"-p".to_owned()));
    assert!(args.contains(&"2201".to_owned()));
    assert_eq!(args.last(), Some(&"screen -x vlab-B1".to_owned()));
}
