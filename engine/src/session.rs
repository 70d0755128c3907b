//! Session state: waypoint step, lifecycle phase, and the work flag.
//!
//! Step and phase only move forward. The mutators are crate-private and
//! refuse to go backwards, so no gate can regress a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::operation::Operation;

/// Opaque session identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Waypoint setup steps, in strict order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointStep {
    Check,
    Orient,
    Start,
    Unlocked,
}

impl WaypointStep {
    pub fn all() -> [Self; 4] {
        [Self::Check, Self::Orient, Self::Start, Self::Unlocked]
    }

    /// The single operation this step permits, or `None` once unlocked.
    pub fn permitted_operation(&self) -> Option<Operation> {
        match self {
            Self::Check => Some(Operation::Check),
            Self::Orient => Some(Operation::Orient),
            Self::Start => Some(Operation::StartStarlog),
            Self::Unlocked => None,
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Check => Some(Self::Orient),
            Self::Orient => Some(Self::Start),
            Self::Start => Some(Self::Unlocked),
            Self::Unlocked => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Check => "Step1_Check",
            Self::Orient => "Step2_Orient",
            Self::Start => "Step3_Start",
            Self::Unlocked => "Step4_Unlocked",
        }
    }
}

/// Session lifecycle phases.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    Jumping,
    Ended,
}

impl Phase {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NotStarted => "Phase1_NotStarted",
            Self::Jumping => "Phase2_Jumping",
            Self::Ended => "Phase3_Ended",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// Persisted state of one session.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    id: SessionId,
    /// Flight config whose entry created this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flight_config: Option<String>,
    step: WaypointStep,
    phase: Phase,
    work_done_this_phase: bool,
    retired: bool,
    created_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(flight_config: Option<String>) -> Self {
        Self {
            id: SessionId::new(),
            flight_config,
            step: WaypointStep::Check,
            phase: Phase::NotStarted,
            work_done_this_phase: false,
            retired: false,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn flight_config(&self) -> Option<&str> {
        self.flight_config.as_deref()
    }

    pub fn step(&self) -> WaypointStep {
        self.step
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn work_done_this_phase(&self) -> bool {
        self.work_done_this_phase
    }

    /// Whether the owning frame has been popped.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Ended or retired: no further gated operation is accepted.
    pub fn is_closed(&self) -> bool {
        self.retired || self.phase.is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn advance_step(&mut self, next: WaypointStep) {
        if next > self.step {
            self.step = next;
        }
    }

    pub(crate) fn advance_phase(&mut self, next: Phase) {
        if next > self.phase {
            self.phase = next;
        }
    }

    pub(crate) fn record_work(&mut self) {
        self.work_done_this_phase = true;
    }

    pub(crate) fn reset_work(&mut self) {
        self.work_done_this_phase = false;
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }
}
