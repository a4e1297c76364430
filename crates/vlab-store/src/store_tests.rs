// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn connect_with_retry_succeeds_on_first_try() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = connect_with_retry(5, Duration::from_millis(1), move || {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, VlabError>(42)
        }
    })
    .await;
    assert_eq!(result, Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connect_with_retry_gives_up_after_budget() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result: Result<i32, VlabError> = connect_with_retry(3, Duration::from_millis(1), move || {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err(VlabError::StoreUnavailable)
        }
    })
    .await;
    assert_eq!(result, Err(VlabError::StoreUnavailable));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn connect_with_retry_succeeds_after_transient_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = connect_with_retry(5, Duration::from_millis(1), move || {
        let c = Arc::clone(&c);
        async move {
            let n = c.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(VlabError::StoreUnavailable)
            } else {
                Ok(7)
            }
        }
    })
    .await;
    assert_eq!(result, Ok(7));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
