// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn cancelled_is_not_a_failure_class() {
    assert!(KernelError::Cancelled.is_cancelled());
    assert!(!KernelError::Tool("boom".into()).is_cancelled());
}

#[test]
fn transient_classification() {
    assert!(KernelError::ProviderTransient("timeout".into()).is_transient());
    assert!(!KernelError::ProviderPermanent("bad request".into()).is_transient());
    assert!(!KernelError::Cancelled.is_transient());
}

#[test]
fn display_messages_name_the_class() {
    let e = KernelError::ScopeViolation("../escape".into());
    assert_eq!(e.to_string(), "scope violation: ../escape");
    let e = KernelError::MaxIterations(30);
    assert_eq!(e.to_string(), "max iterations (30) exceeded");
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let e: KernelError = io.into();
    assert!(matches!(e, KernelError::Io(_)));
}
