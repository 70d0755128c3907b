//! Nesting coordinator: flight-config entry and exit.
//!
//! A top-level entry creates a session; a nested entry reuses the current
//! one. Only the creating frame retires the session when it exits.

use serde::{Deserialize, Serialize};

use crate::error::Denial;
use crate::session::{SessionId, SessionState};
use crate::stack::{FrameId, InvocationFrame, SessionStack};

/// Result of a successful frame exit.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FrameExit {
    pub frame: InvocationFrame,
    /// Set when the popped frame owned its session
    pub retired: Option<SessionId>,
    pub depth: usize,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NestingCoordinator;

impl NestingCoordinator {
    pub fn enter(&self, stack: &mut SessionStack, flight_config: Option<String>) -> InvocationFrame {
        if let Some(top) = stack.top() {
            let session = top.session;
            let frame = stack.push(session, false, flight_config);
            tracing::debug!(
                session = %session,
                frame = %frame.id,
                depth = stack.depth(),
                "Nested flight config reuses active session"
            );
            return frame;
        }

        let session = stack.insert_session(SessionState::new(flight_config.clone()));
        let frame = stack.push(session, true, flight_config);
        tracing::info!(
            session = %session,
            frame = %frame.id,
            flight_config = frame.flight_config.as_deref().unwrap_or("-"),
            "Session created"
        );
        frame
    }

    pub fn exit(&self, stack: &mut SessionStack, frame: FrameId) -> Result<FrameExit, Denial> {
        let popped = stack.pop(frame)?;
        let retired = if popped.created_session {
            stack.retire(&popped.session)
        } else {
            None
        };

        match retired {
            Some(session) => tracing::info!(
                session = %session,
                frame = %popped.id,
                "Owning frame exited, session retired"
            ),
            None => tracing::debug!(
                frame = %popped.id,
                depth = stack.depth(),
                "Nested frame exited"
            ),
        }

        Ok(FrameExit {
            frame: popped,
            retired,
            depth: stack.depth(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn top_level_entry_creates_session() {
        let mut stack = SessionStack::default();
        let frame = NestingCoordinator.enter(&mut stack, Some("outer".into()));
        assert!(frame.created_session);
        assert_eq!(stack.depth(), 1);
        assert_eq!(
            stack.current().and_then(SessionState::flight_config),
            Some("outer")
        );
    }

    #[test]
    fn nested_entry_reuses_session() {
        let mut stack = SessionStack::default();
        let outer = NestingCoordinator.enter(&mut stack, None);
        let inner = NestingCoordinator.enter(&mut stack, Some("inner".into()));
        assert!(!inner.created_session);
        assert_eq!(inner.session, outer.session);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn only_owning_frame_retires() {
        let mut stack = SessionStack::default();
        let outer = NestingCoordinator.enter(&mut stack, None);
        let inner = NestingCoordinator.enter(&mut stack, None);

        let nested_exit = NestingCoordinator
            .exit(&mut stack, inner.id)
            .expect("inner exit");
        assert_eq!(nested_exit.retired, None);
        assert!(stack.current().is_some_and(|s| !s.is_closed()));

        let outer_exit = NestingCoordinator
            .exit(&mut stack, outer.id)
            .expect("outer exit");
        assert_eq!(outer_exit.retired, Some(outer.session));
        assert_eq!(outer_exit.depth, 0);
        assert!(stack.session(&outer.session).is_some_and(SessionState::is_retired));
    }

    #[test]
    fn exit_out_of_order_is_mismatch() {
        let mut stack = SessionStack::default();
        let outer = NestingCoordinator.enter(&mut stack, None);
        let _inner = NestingCoordinator.enter(&mut stack, None);
        let err = NestingCoordinator.exit(&mut stack, outer.id).unwrap_err();
        assert!(matches!(err, Denial::StackMismatch { .. }));
        assert_eq!(stack.depth(), 2);
    }
}
