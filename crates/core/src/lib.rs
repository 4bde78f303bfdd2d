// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agiraph-core: data model for the Agiraph orchestration runtime.
//!
//! Everything here is a plain serde value. Ownership of the mutable state
//! built from these types lives in `agiraph-engine`; this crate only defines
//! the vocabulary shared by the store, the providers, and the kernel.

pub mod macros;

pub mod agent;
pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod interval;
pub mod message;
pub mod node;
pub mod trigger;
pub mod worker;

pub use agent::{AgentConfig, AgentId, AgentMode, AgentStatus, ModelRef};
pub use clock::{Clock, FakeClock, SharedClock, SystemClock};
pub use error::KernelError;
pub use event::{Event, EventRecord};
pub use id::{short, IdBuf};
pub use interval::parse_interval;
pub use message::{Message, BROADCAST, COORDINATOR, HUMAN, SYSTEM};
pub use node::{NodeId, NodeStatus, RunId, WorkNode};
pub use trigger::{Trigger, TriggerAction, TriggerId, TriggerKind, TriggerStatus};
pub use worker::{Worker, WorkerId, WorkerKind, WorkerSpec, WorkerStatus};
