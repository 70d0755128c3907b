//! Starnav Navigation Enforcement Engine
//!
//! Gates which operations an agentic workflow tool may invoke, binds each
//! flight-config execution to exactly one tracked session, and lets nested
//! flight configs reuse the active session instead of creating a new one.
//!
//! Two layers are composed in order for every gated request:
//! 1. [`StepGate`]: waypoint setup (`check` → `orient` → `start_starlog` → unlocked)
//! 2. [`PhaseGate`]: session substance (no `end_starlog` without recorded work)
//!
//! The engine performs no I/O. Transports feed it [`Operation`]s and relay
//! the returned [`Decision`]s.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod conversation;
pub mod diary;
pub mod engine;
pub mod error;
pub mod gate;
pub mod nesting;
pub mod operation;
pub mod session;
pub mod stack;

pub use conversation::{ConversationEngine, ConversationId, ConversationRegistry};
pub use diary::{DiaryObserver, NullDiary};
pub use engine::{Decision, DecisionRecord, EngineSnapshot, EnforcementEngine, GuardError};
pub use error::{Denial, ReasonCode};
pub use gate::{Gate, PhaseGate, StepGate};
pub use nesting::{FrameExit, NestingCoordinator};
pub use operation::{InvalidFlightConfig, Operation, ToolResolver};
pub use session::{Phase, SessionId, SessionState, WaypointStep};
pub use stack::{FrameId, InvocationFrame, SessionStack};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
