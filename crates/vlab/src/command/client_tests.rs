use super::*;

#[test]
fn parse_vlabport_reads_the_allocated_port() {
    assert_eq!(parse_vlabport("VLABPORT:30000\n").unwrap(), 30000);
}

#[test]
fn parse_vlabport_rejects_unexpected_output() {
    assert!(parse_vlabport("nope").is_err());
}

#[test]
fn allocation_arg_omits_serial_when_absent() {
    assert_eq!(allocation_arg("vlab_zybo", 30000, None), "vlab_zybo:30000");
}

#[test]
fn allocation_arg_includes_serial_when_present() {
    assert_eq!(allocation_arg("vlab_zybo", 30000, Some("B2")), "vlab_zybo:30000:B2");
}

#[test]
fn refuse_if_bound_rejects_a_port_already_in_use() {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    assert!(refuse_if_bound(port).is_err());
}
