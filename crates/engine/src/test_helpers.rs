// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::config::Config;
use crate::runtime::AgentRuntime;
use crate::triggers::TriggerScheduler;
use agiraph_core::{AgentConfig, AgentId, FakeClock};
use agiraph_provider::FakeProvider;
use agiraph_store::TriggerStore;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct TestAgent {
    pub _dir: tempfile::TempDir,
    pub rt: Arc<AgentRuntime>,
    pub provider: Arc<FakeProvider>,
    pub clock: Arc<FakeClock>,
}

/// A composed runtime over a scripted provider in a scratch directory.
pub(crate) fn test_runtime() -> TestAgent {
    test_runtime_with_config(|_| {})
}

/// Same, with a hook to tweak the configuration before the build.
pub(crate) fn test_runtime_with_config(tweak: impl FnOnce(&mut Config)) -> TestAgent {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let mut config = Config::for_test(dir.path());
    tweak(&mut config);
    let clock = Arc::new(FakeClock::new());
    let provider = Arc::new(FakeProvider::new());
    let agent = AgentConfig::new("test goal");
    let rt = AgentRuntime::build(
        AgentId::new("test-agent"),
        &agent,
        config,
        clock.clone(),
        provider.clone(),
    )
    .unwrap_or_else(|e| panic!("runtime build: {e}"));
    let scheduler = TriggerScheduler::new(TriggerStore::new(rt.store.agent_dir()), clock.clone());
    scheduler.bind(&rt);
    rt.attach_triggers(scheduler);
    TestAgent { _dir: dir, rt, provider, clock }
}

/// Wait until `predicate` holds or the timeout passes; asserts on timeout.
pub(crate) async fn wait_until(label: &str, mut predicate: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !predicate() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {label}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Count journaled events of one kind.
pub(crate) fn count_events(rt: &AgentRuntime, kind: &str) -> usize {
    rt.journal
        .recent(10_000)
        .map(|records| records.iter().filter(|r| r.event.kind() == kind).count())
        .unwrap_or(0)
}
