//! Enforcement engine: composes the nesting coordinator, step gate and
//! phase gate into one decision function for the transport.
//!
//! Decisions are a pure function of the current stack top and the request.
//! Gate state moves only when an operation is committed, which
//! [`EnforcementEngine::handle_with`] does only after the underlying
//! operation succeeded.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::diary::{DiaryObserver, NullDiary};
use crate::error::{Denial, ReasonCode};
use crate::gate::{Gate, PhaseGate, StepGate};
use crate::nesting::NestingCoordinator;
use crate::operation::Operation;
use crate::session::{SessionId, SessionState};
use crate::stack::{InvocationFrame, SessionStack};

/// Answer returned to the transport.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny { reason: ReasonCode, message: String },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::Allow => None,
            Self::Deny { reason, .. } => Some(*reason),
        }
    }
}

impl From<Denial> for Decision {
    fn from(denial: Denial) -> Self {
        Self::Deny {
            reason: denial.code(),
            message: denial.to_string(),
        }
    }
}

impl From<Result<(), Denial>> for Decision {
    fn from(result: Result<(), Denial>) -> Self {
        match result {
            Ok(()) => Self::Allow,
            Err(denial) => denial.into(),
        }
    }
}

/// Failure of a guarded operation.
#[derive(Debug, thiserror::Error)]
pub enum GuardError<E> {
    /// The engine refused the operation; it was never run.
    #[error(transparent)]
    Denied(Denial),
    /// The operation ran and failed; gate state is unchanged.
    #[error("operation failed: {0}")]
    Failed(E),
}

/// One entry of the decision history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
    /// Stack depth after the decision took effect
    pub depth: usize,
    pub decision: Decision,
    /// False when the operation was allowed but its underlying call failed
    pub committed: bool,
}

/// Point-in-time view of the engine for diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub depth: usize,
    pub frames: Vec<InvocationFrame>,
    pub current: Option<SessionState>,
}

#[derive(Debug)]
pub struct EnforcementEngine {
    stack: SessionStack,
    coordinator: NestingCoordinator,
    step_gate: StepGate,
    phase_gate: PhaseGate,
    diary: Arc<dyn DiaryObserver>,
    history: VecDeque<DecisionRecord>,
    history_capacity: usize,
    sequence: u64,
}

impl EnforcementEngine {
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            stack: SessionStack::new(config.retired_session_capacity),
            coordinator: NestingCoordinator,
            step_gate: StepGate,
            phase_gate: PhaseGate,
            diary: Arc::new(NullDiary),
            history: VecDeque::new(),
            history_capacity: config.history_capacity,
            sequence: 0,
        }
    }

    /// Builder: set the diary observer
    pub fn with_diary(mut self, diary: Arc<dyn DiaryObserver>) -> Self {
        self.diary = diary;
        self
    }

    pub fn stack(&self) -> &SessionStack {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn current_session(&self) -> Option<&SessionState> {
        self.stack.current()
    }

    /// Live or retired session by id.
    pub fn session(&self, id: &SessionId) -> Option<&SessionState> {
        self.stack.session(id)
    }

    pub fn history(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.history.iter()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            depth: self.stack.depth(),
            frames: self.stack.frames().to_vec(),
            current: self.stack.current().cloned(),
        }
    }

    /// Allow or deny without touching any state.
    pub fn evaluate(&self, operation: &Operation) -> Result<(), Denial> {
        let canonical = operation.canonical();
        let operation = &*canonical;
        match operation {
            Operation::StartFlight { .. } => Ok(()),
            Operation::ExitFlight { frame } => self.stack.check_top(*frame),
            _ => {
                let session =
                    self.stack
                        .current()
                        .ok_or_else(|| Denial::NoActiveSession {
                            operation: operation.clone(),
                        })?;
                self.evaluate_gates(session, operation)
            }
        }
    }

    /// Re-evaluate and apply the transitions for `operation`.
    pub fn commit(&mut self, operation: &Operation) -> Result<(), Denial> {
        self.evaluate(operation)?;
        let canonical = operation.canonical();
        let operation = &*canonical;

        match operation {
            Operation::StartFlight { config } => {
                self.coordinator.enter(&mut self.stack, config.clone());
            }
            Operation::ExitFlight { frame } => {
                self.coordinator.exit(&mut self.stack, *frame)?;
            }
            _ => {
                let Some(session) = self.stack.current_mut() else {
                    return Err(Denial::NoActiveSession {
                        operation: operation.clone(),
                    });
                };
                self.step_gate.apply(session, operation);
                self.phase_gate.apply(session, operation);
                if *operation == Operation::UpdateDebugDiary {
                    self.diary.diary_updated(session);
                }
            }
        }
        Ok(())
    }

    /// Evaluate and, if allowed, commit immediately.
    pub fn handle(&mut self, operation: Operation) -> Decision {
        let session = self.stack.current().map(SessionState::id);
        let result = self.commit(&operation);
        self.record(&operation, session, result, true)
    }

    /// Like [`handle`](Self::handle), but pinned to a session the caller
    /// names. A retired or ended session yields `session_closed`; a session
    /// that is not the current one yields `no_active_session`.
    pub fn handle_in(&mut self, session: &SessionId, operation: Operation) -> Decision {
        let result = self
            .check_pinned(session, &operation)
            .and_then(|()| self.commit(&operation));
        self.record(&operation, Some(*session), result, true)
    }

    /// Evaluate, run the underlying operation, and commit only on success.
    pub fn handle_with<T, E>(
        &mut self,
        operation: Operation,
        run: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, GuardError<E>> {
        self.begin(&operation).map_err(GuardError::Denied)?;
        match run() {
            Ok(value) => self
                .complete(&operation)
                .map(|()| value)
                .map_err(GuardError::Denied),
            Err(err) => {
                self.abandon(&operation);
                Err(GuardError::Failed(err))
            }
        }
    }

    /// First half of a guarded call: evaluate, recording a denial.
    pub(crate) fn begin(&mut self, operation: &Operation) -> Result<(), Denial> {
        match self.evaluate(operation) {
            Ok(()) => Ok(()),
            Err(denial) => {
                let session = self.stack.current().map(SessionState::id);
                self.record(operation, session, Err(denial.clone()), false);
                Err(denial)
            }
        }
    }

    /// Second half after the underlying operation succeeded.
    pub(crate) fn complete(&mut self, operation: &Operation) -> Result<(), Denial> {
        let session = self.stack.current().map(SessionState::id);
        let result = self.commit(operation);
        self.record(operation, session, result.clone(), true);
        result
    }

    /// Second half after the underlying operation failed.
    pub(crate) fn abandon(&mut self, operation: &Operation) {
        let session = self.stack.current().map(SessionState::id);
        tracing::debug!(
            operation = %operation,
            "Underlying operation failed, gate state unchanged"
        );
        self.record(operation, session, Ok(()), false);
    }

    fn evaluate_gates(&self, session: &SessionState, operation: &Operation) -> Result<(), Denial> {
        if session.is_closed() {
            return Err(Denial::SessionClosed {
                session: session.id(),
            });
        }
        let gates: [&dyn Gate; 2] = [&self.step_gate, &self.phase_gate];
        for gate in gates {
            if let Err(denial) = gate.evaluate(session, operation) {
                tracing::trace!(gate = gate.name(), operation = %operation, "Gate denied");
                return Err(denial);
            }
        }
        Ok(())
    }

    fn check_pinned(&self, session: &SessionId, operation: &Operation) -> Result<(), Denial> {
        if operation.is_structural() {
            return Ok(());
        }
        match self.stack.session(session) {
            Some(state) if state.is_closed() => Err(Denial::SessionClosed { session: *session }),
            Some(_) if self.stack.current().map(SessionState::id) == Some(*session) => Ok(()),
            _ => Err(Denial::NoActiveSession {
                operation: operation.clone(),
            }),
        }
    }

    fn record(
        &mut self,
        operation: &Operation,
        session: Option<SessionId>,
        result: Result<(), Denial>,
        committed: bool,
    ) -> Decision {
        let depth = self.stack.depth();
        match &result {
            Ok(()) => tracing::debug!(operation = %operation, depth, "Operation allowed"),
            Err(denial @ Denial::StackMismatch { .. }) => {
                tracing::error!(operation = %operation, depth, "{denial}");
            }
            Err(denial) => tracing::warn!(
                operation = %operation,
                reason = %denial.code(),
                depth,
                "{denial}"
            ),
        }

        let committed = committed && result.is_ok();
        let decision = Decision::from(result);
        self.sequence += 1;
        self.history.push_back(DecisionRecord {
            sequence: self.sequence,
            at: Utc::now(),
            operation: operation.tool_name().to_string(),
            session,
            depth,
            decision: decision.clone(),
            committed,
        });
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
        decision
    }
}

impl Default for EnforcementEngine {
    fn default() -> Self {
        Self::new()
    }
}
