// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    available = { true, false, None, None, false, BoardStatus::Available },
    hwtest_failed_wins = { true, false, None, None, true, BoardStatus::HwTestFailed },
    locked = { false, false, Some(Lock{user:"alice".into(),time:1}), None, false, BoardStatus::InUseLocked{user:"alice".into()} },
    unlocked_with_session = {
        false, true, None, Some(Session{user:"bob".into(),start:1,ping:2}), false,
        BoardStatus::InUseUnlocked{user:"bob".into()}
    },
    unknown = { false, false, None, None, false, BoardStatus::Unknown },
)]
fn projects_expected_status(
    in_available: bool,
    in_unlocked: bool,
    lock: Option<Lock>,
    session: Option<Session>,
    hwtest_failed: bool,
    expected: BoardStatus,
) {
    let got =
        project_status(in_available, in_unlocked, lock.as_ref(), session.as_ref(), hwtest_failed);
    assert_eq!(got, expected);
}

#[test]
fn overlord_bypasses_allowed_classes() {
    let u = User { name: "root".into(), overlord: true, allowed_classes: vec![] };
    assert!(u.may_use_class("vlab_zybo"));
}

#[test]
fn non_overlord_requires_membership() {
    let u = User {
        name: "alice".into(),
        overlord: false,
        allowed_classes: vec!["vlab_zybo".into()],
    };
    assert!(u.may_use_class("vlab_zybo"));
    assert!(!u.may_use_class("vlab_arty"));
}
