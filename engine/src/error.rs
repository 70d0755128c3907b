//! Policy denials returned to the tool-invocation transport.
//!
//! Every denial is a value, never a panic. The transport relays the
//! [`ReasonCode`] and the human message; retry policy belongs to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operation::Operation;
use crate::session::SessionId;
use crate::stack::FrameId;

/// Machine-readable denial category.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Operation does not match the single one the current waypoint permits
    WrongStep,
    /// `end_starlog` before any `fly` / `update_debug_diary`
    NoWorkRecorded,
    /// Session already ended or retired
    SessionClosed,
    /// Nothing on the stack and the operation is not a flight entry
    NoActiveSession,
    /// Exit requested for a frame that is not the stack top
    StackMismatch,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrongStep => "wrong_step",
            Self::NoWorkRecorded => "no_work_recorded",
            Self::SessionClosed => "session_closed",
            Self::NoActiveSession => "no_active_session",
            Self::StackMismatch => "stack_mismatch",
        }
    }

    /// Whether the caller can fix this by issuing a different operation on
    /// the same session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::WrongStep | Self::NoWorkRecorded | Self::NoActiveSession
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A policy denial with the context needed to correct the call sequence.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Denial {
    #[error("wrong step: expected `{expected}`, got `{got}`")]
    WrongStep { expected: Operation, got: Operation },

    #[error(
        "session {session} has no recorded work; call `fly` or `update_debug_diary` before `end_starlog`"
    )]
    NoWorkRecorded { session: SessionId },

    #[error("session {session} is closed; start a new top-level flight config")]
    SessionClosed { session: SessionId },

    #[error("no active session for `{operation}`; call `start` first")]
    NoActiveSession { operation: Operation },

    #[error("stack mismatch: exit requested for frame {got}, current top is {}", describe_top(.expected))]
    StackMismatch {
        expected: Option<FrameId>,
        got: FrameId,
    },
}

fn describe_top(top: &Option<FrameId>) -> String {
    match top {
        Some(frame) => format!("frame {frame}"),
        None => "empty".to_string(),
    }
}

impl Denial {
    pub fn code(&self) -> ReasonCode {
        match self {
            Self::WrongStep { .. } => ReasonCode::WrongStep,
            Self::NoWorkRecorded { .. } => ReasonCode::NoWorkRecorded,
            Self::SessionClosed { .. } => ReasonCode::SessionClosed,
            Self::NoActiveSession { .. } => ReasonCode::NoActiveSession,
            Self::StackMismatch { .. } => ReasonCode::StackMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrong_step_message_names_both_operations() {
        let denial = Denial::WrongStep {
            expected: Operation::Orient,
            got: Operation::StartStarlog,
        };
        assert_eq!(
            denial.to_string(),
            "wrong step: expected `orient`, got `start_starlog`"
        );
        assert_eq!(denial.code(), ReasonCode::WrongStep);
    }

    #[test]
    fn stack_mismatch_on_empty_stack() {
        let denial = Denial::StackMismatch {
            expected: None,
            got: FrameId::new(3),
        };
        assert_eq!(
            denial.to_string(),
            "stack mismatch: exit requested for frame 3, current top is empty"
        );
        assert!(!denial.code().is_recoverable());
    }

    #[test]
    fn reason_codes_serialize_snake_case() {
        let json = serde_json::to_string(&ReasonCode::NoWorkRecorded).expect("serialize");
        assert_eq!(json, "\"no_work_recorded\"");
        assert_eq!(ReasonCode::SessionClosed.as_str(), "session_closed");
    }
}
