// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vlab manage` — a thin operator CLI built on the same C2 lease
//! primitives the janitors use: list boards/users, force-unlock a board,
//! print the live configuration, and inject a hardware-test failure for
//! drills. Grounded in the original's `manage.py`/`fakefail.py`, carried
//! forward since they're ambient operability tooling rather than a
//! distinct invariant.

use clap::Args;
use serde::Serialize;
use vlabstore::types::{project_status, BoardStatus};
use vlabstore::{keys, Lease, Store, VlabError};

use crate::config::StoreArgs;

#[derive(Debug, Clone, Args)]
pub struct ManageArgs {
    #[command(subcommand)]
    pub action: ManageAction,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Clone, clap::Subcommand)]
pub enum ManageAction {
    /// List every known board with its live status.
    Boards,
    /// List every configured user.
    Users,
    /// Force-unlock a board and end its session, regardless of owner.
    Unlock { serial: String },
    /// Print the live users/boards registries as JSON.
    ShowConfig,
    /// Mark a board's hardware self-test as failed, for drills.
    HwtestFail { serial: String, reason: String },
}

#[derive(Debug, Serialize)]
struct BoardRow {
    serial: String,
    class: String,
    r#type: String,
    status: BoardStatus,
}

#[derive(Debug, Serialize)]
struct UserRow {
    name: String,
    overlord: bool,
    allowed_classes: Vec<String>,
}

async fn board_row(store: &dyn Store, lease: &Lease, serial: &str) -> Result<BoardRow, VlabError> {
    let class = store.get(&keys::board_class(serial)).await?.unwrap_or_default();
    let r#type = store.get(&keys::board_type(serial)).await?.unwrap_or_default();
    let in_available = store.sismember(&keys::class_available(&class), serial).await?;
    let in_unlocked = store.zscore(&keys::class_unlocked(&class), serial).await?.is_some();
    let lock = lease.read_lock(serial).await?;
    let session = lease.read_session(serial).await?;
    let hwtest_failed = store.get(&keys::board_hwtest_status(serial)).await?.as_deref() == Some("fail");
    let status = project_status(in_available, in_unlocked, lock.as_ref(), session.as_ref(), hwtest_failed);
    Ok(BoardRow { serial: serial.to_owned(), class, r#type, status })
}

async fn list_boards(store: &dyn Store, lease: &Lease) -> Result<Vec<BoardRow>, VlabError> {
    let serials = store.smembers(keys::KNOWNBOARDS).await?;
    let mut rows = Vec::with_capacity(serials.len());
    for serial in serials {
        rows.push(board_row(store, lease, &serial).await?);
    }
    rows.sort_by(|a, b| a.serial.cmp(&b.serial));
    Ok(rows)
}

async fn list_users(store: &dyn Store) -> Result<Vec<UserRow>, VlabError> {
    let names = store.smembers(keys::USERS).await?;
    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let overlord = store.get(&keys::user_overlord(&name)).await?.is_some();
        let allowed = store.get(&keys::user_allowedclasses(&name)).await?.unwrap_or_default();
        let allowed_classes = allowed.split(',').filter(|c| !c.is_empty()).map(str::to_owned).collect();
        rows.push(UserRow { name, overlord, allowed_classes });
    }
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(rows)
}

async fn unlock(store: &dyn Store, lease: &Lease, serial: &str) -> Result<(), VlabError> {
    let class = store.get(&keys::board_class(serial)).await?.ok_or_else(|| VlabError::UnknownBoard(serial.to_owned()))?;
    lease.unlock_board(serial, &class).await?;
    lease.end_session(serial, &class).await?;
    Ok(())
}

async fn hwtest_fail(store: &dyn Store, serial: &str, reason: &str) -> Result<(), VlabError> {
    if store.get(&keys::board_class(serial)).await?.is_none() {
        return Err(VlabError::UnknownBoard(serial.to_owned()));
    }
    store.set(&keys::board_hwtest_status(serial), "fail").await?;
    store.set(&keys::board_hwtest_time(serial), &vlabstore::lease::now_epoch().to_string()).await?;
    store.set(&keys::board_hwtest_message(serial), reason).await?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => println!("{pretty}"),
        Err(e) => eprintln!("error: could not serialize output: {e}"),
    }
}

pub async fn run(args: ManageArgs) -> i32 {
    let lease = match args.store.connect().await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e:#}");
            return 1;
        }
    };
    let store = lease.store();

    let result = match &args.action {
        ManageAction::Boards => list_boards(store.as_ref(), &lease).await.map(|rows| print_json(&rows)),
        ManageAction::Users => list_users(store.as_ref()).await.map(|rows| print_json(&rows)),
        ManageAction::Unlock { serial } => unlock(store.as_ref(), &lease, serial).await,
        ManageAction::ShowConfig => {
            match (list_users(store.as_ref()).await, list_boards(store.as_ref(), &lease).await) {
                (Ok(users), Ok(boards)) => {
                    print_json(&serde_json::json!({ "users": users, "boards": boards }));
                    Ok(())
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            }
        }
        ManageAction::HwtestFail { serial, reason } => hwtest_fail(store.as_ref(), serial, reason).await,
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

#[cfg(test)]
#[path = "manage_tests.rs"]
mod tests;
