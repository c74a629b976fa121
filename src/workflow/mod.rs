//! Pipeline orchestration
//!
//! Both flows are fixed, ordered sequences of stages. A stage consumes the
//! previous stage's typed output and either continues with a payload for
//! the next stage or stops the whole run with an exit reason. The
//! StepResult sum type is the backbone contract: a stage cannot continue
//! without a payload and cannot exit without a reason.

mod add;
mod update;

pub use add::AddWorkflow;
pub use update::UpdateWorkflow;

use crate::domain::ExitReason;
use crate::error::{PromptError, WorkflowError};
use crate::prompt::ConfirmationGate;
use crate::tools::{Installer, ScriptRunner, SecurityScanner, UpdateChecker};
use std::sync::Arc;

/// Outcome of one pipeline stage
#[derive(Debug)]
pub enum StepResult<T> {
    /// Feed the payload to the next stage
    Continue(T),
    /// Stop the run with this reason
    Exit(ExitReason),
}

impl<T> StepResult<T> {
    pub fn is_exit(&self) -> bool {
        matches!(self, StepResult::Exit(_))
    }
}

/// The injected capabilities a pipeline run needs
#[derive(Clone)]
pub struct WorkflowServices {
    pub checker: Arc<dyn UpdateChecker>,
    pub scanner: Arc<dyn SecurityScanner>,
    pub installer: Arc<dyn Installer>,
    pub scripts: Arc<dyn ScriptRunner>,
    pub gate: Arc<dyn ConfirmationGate>,
}

/// Run a prompt, mapping an aborted prompt onto the UserCancelled exit.
///
/// The match is on the error's identity, so Ctrl-C during a prompt and a
/// signal between prompts end a run the same way.
fn confirm_or_cancel(
    gate: &dyn ConfirmationGate,
    message: &str,
) -> Result<StepResult<bool>, WorkflowError> {
    match gate.confirm(message) {
        Ok(answer) => Ok(StepResult::Continue(answer)),
        Err(PromptError::Aborted) => Ok(StepResult::Exit(ExitReason::UserCancelled)),
        Err(e) => Err(e.into()),
    }
}
