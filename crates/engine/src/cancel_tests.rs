// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn check_raises_cancelled_only_after_stop() {
    let flag = StopFlag::new();
    assert!(flag.check().is_ok());
    flag.stop();
    assert!(flag.check().unwrap_err().is_cancelled());
}

#[test]
fn child_stops_with_parent() {
    let parent = StopFlag::new();
    let child = parent.child();
    parent.stop();
    assert!(child.is_stopped());
}

#[test]
fn child_stop_leaves_parent_running() {
    let parent = StopFlag::new();
    let child = parent.child();
    child.stop();
    assert!(child.is_stopped());
    assert!(!parent.is_stopped());
}

#[tokio::test]
async fn cancelled_future_resolves_on_stop() {
    let flag = StopFlag::new();
    let waiter = flag.clone();
    let handle = tokio::spawn(async move { waiter.cancelled().await });
    flag.stop();
    handle.await.unwrap();
}
