//! Drive a parsed script through one conversation engine.

use std::io::Write;

use serde::Serialize;
use starnav_engine::{
    ConversationEngine, Decision, EngineSnapshot, FrameId, Operation, ReasonCode,
};

use crate::script::{ScriptLine, ScriptStep};

/// Placeholder sent when `exit` runs on an empty stack. Real frames start
/// at 1, so the engine answers `stack_mismatch`.
const NO_FRAME: FrameId = FrameId::new(0);

#[derive(Clone, Debug, Serialize)]
pub struct StepOutcome {
    pub line: usize,
    pub operation: Operation,
    pub decision: Decision,
    /// Stack depth after the step
    pub depth: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepOutcome>,
    pub stack_mismatches: usize,
    pub snapshot: EngineSnapshot,
}

impl ReplayReport {
    pub fn allowed(&self) -> usize {
        self.steps.iter().filter(|s| s.decision.is_allow()).count()
    }

    pub fn denied(&self) -> usize {
        self.steps.len() - self.allowed()
    }

    pub fn write_text(&self, out: &mut impl Write) -> std::io::Result<()> {
        for step in &self.steps {
            match &step.decision {
                Decision::Allow => writeln!(
                    out,
                    "{:>4}  {:<22} allow  depth={}",
                    step.line,
                    step.operation.tool_name(),
                    step.depth
                )?,
                Decision::Deny { reason, message } => writeln!(
                    out,
                    "{:>4}  {:<22} deny   {reason}: {message}",
                    step.line,
                    step.operation.tool_name()
                )?,
            }
        }
        writeln!(
            out,
            "{} allowed, {} denied, {} stack mismatch(es), final depth {}",
            self.allowed(),
            self.denied(),
            self.stack_mismatches,
            self.snapshot.depth
        )
    }

    /// One JSON object per step, then a summary object with the snapshot.
    pub fn write_json(&self, out: &mut impl Write) -> anyhow::Result<()> {
        for step in &self.steps {
            serde_json::to_writer(&mut *out, step)?;
            writeln!(out)?;
        }
        let summary = serde_json::json!({
            "stack_mismatches": self.stack_mismatches,
            "snapshot": self.snapshot,
        });
        serde_json::to_writer(&mut *out, &summary)?;
        writeln!(out)?;
        Ok(())
    }
}

pub async fn replay(script: &[ScriptLine], conversation: &ConversationEngine) -> ReplayReport {
    let mut steps = Vec::with_capacity(script.len());
    let mut stack_mismatches = 0;

    for line in script {
        let operation = match &line.step {
            ScriptStep::Op(op) => op.clone(),
            ScriptStep::ExitTop => {
                let top = conversation
                    .inspect(|engine| engine.stack().top().map(|frame| frame.id))
                    .await;
                Operation::ExitFlight {
                    frame: top.unwrap_or(NO_FRAME),
                }
            }
        };

        let decision = conversation.handle(operation.clone()).await;
        if decision.reason() == Some(ReasonCode::StackMismatch) {
            stack_mismatches += 1;
        }
        steps.push(StepOutcome {
            line: line.number,
            operation,
            decision,
            depth: conversation.depth().await,
        });
    }

    ReplayReport {
        steps,
        stack_mismatches,
        snapshot: conversation.snapshot().await,
    }
}
