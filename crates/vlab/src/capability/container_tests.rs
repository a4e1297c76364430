use super::*;

#[test]
fn parse_mapped_port_reads_the_last_field_of_the_first_line() {
    assert_eq!(parse_mapped_port("0.0.0.0:32768\n:::32768\n").unwrap(), 32768);
}

#[test]
fn parse_mapped_port_rejects_garbage() {
    assert!(parse_mapped_port("").is_err());
    assert!(parse_mapped_port("not-a-port").is_err());
}

#[test]
fn container_name_is_namespaced() {
    assert_eq!(container_name("B1"), "cnt-B1");
}
