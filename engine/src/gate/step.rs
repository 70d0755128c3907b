use crate::error::Denial;
use crate::gate::Gate;
use crate::operation::Operation;
use crate::session::SessionState;

/// Waypoint progression: `check` → `orient` → `start_starlog` → unlocked.
///
/// Until unlocked exactly one operation is permitted. There is no skip-ahead,
/// and a request alone never advances the step.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepGate;

impl Gate for StepGate {
    fn name(&self) -> &'static str {
        "step"
    }

    fn evaluate(&self, session: &SessionState, operation: &Operation) -> Result<(), Denial> {
        match session.step().permitted_operation() {
            None => Ok(()),
            Some(expected) if expected == *operation => Ok(()),
            Some(expected) => Err(Denial::WrongStep {
                expected,
                got: operation.clone(),
            }),
        }
    }

    fn apply(&self, session: &mut SessionState, operation: &Operation) {
        let step = session.step();
        if step.permitted_operation().as_ref() != Some(operation) {
            return;
        }
        if let Some(next) = step.next() {
            session.advance_step(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::WaypointStep;
    use pretty_assertions::assert_eq;

    fn advanced(ops: &[Operation]) -> SessionState {
        let mut session = SessionState::new(None);
        for op in ops {
            StepGate.evaluate(&session, op).expect("allowed");
            StepGate.apply(&mut session, op);
        }
        session
    }

    #[test]
    fn full_progression_unlocks() {
        let session = advanced(&[Operation::Check, Operation::Orient, Operation::StartStarlog]);
        assert_eq!(session.step(), WaypointStep::Unlocked);
        assert!(
            StepGate
                .evaluate(&session, &Operation::Other { tool: "grep".into() })
                .is_ok()
        );
    }

    #[test]
    fn orient_before_check_is_denied() {
        let session = SessionState::new(None);
        let err = StepGate.evaluate(&session, &Operation::Orient).unwrap_err();
        assert_eq!(
            err,
            Denial::WrongStep {
                expected: Operation::Check,
                got: Operation::Orient,
            }
        );
    }

    #[test]
    fn start_starlog_before_orient_is_denied() {
        let session = advanced(&[Operation::Check]);
        let err = StepGate
            .evaluate(&session, &Operation::StartStarlog)
            .unwrap_err();
        assert_eq!(
            err,
            Denial::WrongStep {
                expected: Operation::Orient,
                got: Operation::StartStarlog,
            }
        );
    }

    #[test]
    fn repeated_setup_after_advance_is_denied() {
        let session = advanced(&[Operation::Check]);
        assert!(StepGate.evaluate(&session, &Operation::Check).is_err());
    }

    #[test]
    fn unlocked_step_ignores_setup_replays() {
        let mut session = advanced(&[Operation::Check, Operation::Orient, Operation::StartStarlog]);
        StepGate.apply(&mut session, &Operation::Check);
        assert_eq!(session.step(), WaypointStep::Unlocked);
    }

    #[test]
    fn apply_without_match_does_not_advance() {
        let mut session = SessionState::new(None);
        StepGate.apply(&mut session, &Operation::Fly);
        assert_eq!(session.step(), WaypointStep::Check);
    }
}
