//! Enforcement gates.
//!
//! Gates are orthogonal layers composed by the engine, not merged: the step
//! gate governs the setup sequence, the phase gate governs whether a session
//! may close. Evaluation is pure; transitions happen in [`Gate::apply`] only
//! after the underlying operation succeeded.

mod phase;
mod step;

pub use phase::PhaseGate;
pub use step::StepGate;

use crate::error::Denial;
use crate::operation::Operation;
use crate::session::SessionState;

pub trait Gate {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Allow or deny `operation` against `session`. Must not mutate.
    fn evaluate(&self, session: &SessionState, operation: &Operation) -> Result<(), Denial>;

    /// Apply this gate's transitions for an operation that was allowed and
    /// succeeded.
    fn apply(&self, session: &mut SessionState, operation: &Operation);
}
