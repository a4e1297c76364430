// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;
use super::*;

proptest! {
    /// A line with no `#` anywhere has nothing to strip, regardless of how
    /// its quotes balance.
    #[test]
    fn lines_without_a_hash_pass_through_unchanged(line in "[^#\n]{0,40}") {
        let stripped = strip_comments(&line);
        prop_assert_eq!(stripped, format!("{line}\n"));
    }
}

#[test]
fn parses_users_and_boards() {
    let doc = parse(
        r#"{
            "users": {
                "alice": { "overlord": true },
                "bob": { "allowedboards": ["fpga-a", "fpga-b"] }
            },
            "boards": {
                "s1": { "class": "fpga-a", "type": "xilinx-zcu102", "reset": "true" },
                "s2": { "class": "fpga-a", "type": "xilinx-zcu102" }
            }
        }"#,
    )
    .unwrap();

    assert_eq!(doc.users.len(), 2);
    let alice = doc.users.iter().find(|u| u.name == "alice").unwrap();
    assert!(alice.overlord);
    let bob = doc.users.iter().find(|u| u.name == "bob").unwrap();
    assert!(!bob.overlord);
    assert_eq!(bob.allowed_classes, vec!["fpga-a".to_owned(), "fpga-b".to_owned()]);

    assert_eq!(doc.boards.len(), 2);
    let s1 = doc.boards.iter().find(|b| b.serial == "s1").unwrap();
    assert!(s1.reset);
    let s2 = doc.boards.iter().find(|b| b.serial == "s2").unwrap();
    assert!(!s2.reset);

    assert_eq!(doc.classes(), vec!["fpga-a".to_owned()]);
}

#[test]
fn strips_full_line_and_trailing_comments() {
    let doc = parse(
        "{\n  # a leading comment\n  \"users\": {},\n  \"boards\": {} # trailing comment\n}\n",
    )
    .unwrap();
    assert!(doc.users.is_empty());
    assert!(doc.boards.is_empty());
}

#[test]
fn does_not_strip_a_hash_inside_a_string_value() {
    let doc = parse(
        r#"{
            "users": {},
            "boards": { "s1": { "class": "fpga-a", "type": "rev#2" } }
        }"#,
    )
    .unwrap();
    assert_eq!(doc.boards[0].r#type, "rev#2");
}

#[test]
fn rejects_unknown_fields_on_users() {
    let err = parse(r#"{"users": {"alice": {"admin": true}}, "boards": {}}"#).unwrap_err();
    assert!(matches!(err, VlabError::Internal(_)));
}

#[test]
fn rejects_boards_missing_required_fields() {
    let err = parse(r#"{"users": {}, "boards": {"s1": {"class": "fpga-a"}}}"#).unwrap_err();
    assert!(matches!(err, VlabError::Internal(_)));
}
