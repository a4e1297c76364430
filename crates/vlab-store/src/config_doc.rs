// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk configuration document (spec §6): users and known boards,
//! `#`-commented JSON. Parsing doubles as validation — unknown fields and
//! missing required fields are both rejected before a single key is
//! written, so a bad document can never partially apply (spec §6 "Invalid
//! -> reload is rejected... current state is preserved").

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::VlabError;
use crate::types::{KnownBoard, User};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUser {
    #[serde(default)]
    overlord: bool,
    #[serde(default)]
    allowedboards: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBoard {
    class: String,
    r#type: String,
    #[serde(default)]
    reset: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfigDocument {
    #[serde(default)]
    users: HashMap<String, RawUser>,
    #[serde(default)]
    boards: HashMap<String, RawBoard>,
}

/// Parsed, validated configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    pub users: Vec<User>,
    pub boards: Vec<KnownBoard>,
}

impl ConfigDocument {
    pub fn classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self.boards.iter().map(|b| b.class.clone()).collect();
        classes.sort();
        classes.dedup();
        classes
    }
}

/// Strip `#`-to-end-of-line comments, respecting (non-escaped) quoted
/// strings so a `#` inside a JSON string value is never treated as a
/// comment marker.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut in_string = false;
        let mut escaped = false;
        let mut cut = line.len();
        for (i, ch) in line.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' if in_string => escaped = true,
                '"' => in_string = !in_string,
                '#' if !in_string => {
                    cut = i;
                    break;
                }
                _ => {}
            }
        }
        out.push_str(&line[..cut]);
        out.push('\n');
    }
    out
}

/// Parse and validate a configuration document from its on-disk text.
pub fn parse(text: &str) -> Result<ConfigDocument, VlabError> {
    let stripped = strip_comments(text);
    let raw: RawConfigDocument = serde_json::from_str(&stripped)
        .map_err(|e| VlabError::Internal(format!("invalid configuration document: {e}")))?;

    let users = raw
        .users
        .into_iter()
        .map(|(name, u)| User { name, overlord: u.overlord, allowed_classes: u.allowedboards })
        .collect();

    let boards = raw
        .boards
        .into_iter()
        .map(|(serial, b)| KnownBoard {
            serial,
            class: b.class,
            r#type: b.r#type,
            reset: b.reset.as_deref() == Some("true"),
        })
        .collect();

    Ok(ConfigDocument { users, boards })
}

#[cfg(test)]
#[path = "config_doc_tests.rs"]
mod tests;
