use crate::error::Denial;
use crate::gate::Gate;
use crate::operation::Operation;
use crate::session::{Phase, SessionState};

/// Session lifecycle: not started → jumping → ended.
///
/// While not started only the setup operations pass (their order belongs to
/// the step gate). While jumping everything passes except an `end_starlog`
/// with no recorded work. Ended is terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseGate;

impl Gate for PhaseGate {
    fn name(&self) -> &'static str {
        "phase"
    }

    fn evaluate(&self, session: &SessionState, operation: &Operation) -> Result<(), Denial> {
        if session.is_retired() {
            return Err(Denial::SessionClosed {
                session: session.id(),
            });
        }

        match session.phase() {
            Phase::NotStarted if operation.is_setup() => Ok(()),
            Phase::NotStarted => Err(Denial::WrongStep {
                expected: Operation::StartStarlog,
                got: operation.clone(),
            }),
            Phase::Jumping => match operation {
                Operation::EndStarlog if !session.work_done_this_phase() => {
                    Err(Denial::NoWorkRecorded {
                        session: session.id(),
                    })
                }
                _ => Ok(()),
            },
            Phase::Ended => Err(Denial::SessionClosed {
                session: session.id(),
            }),
        }
    }

    fn apply(&self, session: &mut SessionState, operation: &Operation) {
        match (session.phase(), operation) {
            (Phase::NotStarted, Operation::StartStarlog) => {
                session.advance_phase(Phase::Jumping);
                session.reset_work();
            }
            (Phase::Jumping, Operation::StartStarlog) => session.reset_work(),
            (Phase::Jumping, op) if op.is_work() => session.record_work(),
            (Phase::Jumping, Operation::EndStarlog) if session.work_done_this_phase() => {
                session.advance_phase(Phase::Ended);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReasonCode;
    use pretty_assertions::assert_eq;

    fn jumping() -> SessionState {
        let mut session = SessionState::new(None);
        PhaseGate.apply(&mut session, &Operation::StartStarlog);
        session
    }

    #[test]
    fn start_starlog_enters_jumping() {
        let session = jumping();
        assert_eq!(session.phase(), Phase::Jumping);
        assert!(!session.work_done_this_phase());
    }

    #[test]
    fn not_started_rejects_work() {
        let session = SessionState::new(None);
        assert!(PhaseGate.evaluate(&session, &Operation::Check).is_ok());
        let err = PhaseGate.evaluate(&session, &Operation::Fly).unwrap_err();
        assert_eq!(err.code(), ReasonCode::WrongStep);
    }

    #[test]
    fn end_without_work_is_denied() {
        let session = jumping();
        let err = PhaseGate
            .evaluate(&session, &Operation::EndStarlog)
            .unwrap_err();
        assert_eq!(
            err,
            Denial::NoWorkRecorded {
                session: session.id()
            }
        );
    }

    #[test]
    fn diary_update_counts_as_work() {
        let mut session = jumping();
        PhaseGate.apply(&mut session, &Operation::UpdateDebugDiary);
        assert!(session.work_done_this_phase());
        assert!(PhaseGate.evaluate(&session, &Operation::EndStarlog).is_ok());
        PhaseGate.apply(&mut session, &Operation::EndStarlog);
        assert_eq!(session.phase(), Phase::Ended);
    }

    #[test]
    fn other_tools_are_not_work() {
        let mut session = jumping();
        PhaseGate.apply(&mut session, &Operation::Other { tool: "grep".into() });
        assert!(!session.work_done_this_phase());
    }

    #[test]
    fn restarting_starlog_clears_work() {
        let mut session = jumping();
        PhaseGate.apply(&mut session, &Operation::Fly);
        PhaseGate.apply(&mut session, &Operation::StartStarlog);
        assert!(!session.work_done_this_phase());
        assert!(PhaseGate.evaluate(&session, &Operation::EndStarlog).is_err());
    }

    #[test]
    fn ended_session_is_closed() {
        let mut session = jumping();
        PhaseGate.apply(&mut session, &Operation::Fly);
        PhaseGate.apply(&mut session, &Operation::EndStarlog);
        let err = PhaseGate.evaluate(&session, &Operation::Fly).unwrap_err();
        assert_eq!(err.code(), ReasonCode::SessionClosed);
    }
}
