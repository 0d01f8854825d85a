//! Minimal saga runner
//!
//! A saga is an ordered list of steps, each pairing a forward action with a
//! compensating action. Steps run in order. When a forward action fails,
//! the compensations of the steps that already completed run in reverse
//! order and the failure is returned. Compensation is best-effort: its
//! errors are logged and collected, never raised over the original failure.
//!
//! The failing step itself is not compensated; a forward action is expected
//! to leave nothing behind when it returns an error.

use std::fmt;

use tracing::{debug, error, warn};

/// One step of a saga
#[async_trait::async_trait]
pub trait SagaStep: Send {
    /// Short name used in logs and failure reports
    fn name(&self) -> &'static str;

    /// Forward action
    async fn execute(&mut self) -> anyhow::Result<()>;

    /// Undo for a completed forward action
    async fn compensate(&mut self) -> anyhow::Result<()>;
}

/// Failure of a saga run
pub struct SagaFailure {
    /// Saga name
    pub saga: &'static str,
    /// Name of the step whose forward action failed
    pub step: &'static str,
    /// Error returned by that step
    pub error: anyhow::Error,
    /// Errors raised by compensations, formatted as `step: error`
    pub compensation_errors: Vec<String>,
}

impl fmt::Debug for SagaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaFailure")
            .field("saga", &self.saga)
            .field("step", &self.step)
            .field("error", &format_args!("{:#}", self.error))
            .field("compensation_errors", &self.compensation_errors)
            .finish()
    }
}

impl fmt::Display for SagaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed at step '{}': {:#}",
            self.saga, self.step, self.error
        )?;
        if !self.compensation_errors.is_empty() {
            write!(
                f,
                " (compensation errors: {})",
                self.compensation_errors.join("; ")
            )?;
        }
        Ok(())
    }
}

/// Ordered list of steps run as one unit
pub struct Saga<'a> {
    name: &'static str,
    steps: Vec<Box<dyn SagaStep + 'a>>,
}

impl<'a> Saga<'a> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Appends a step
    #[must_use]
    pub fn step(mut self, step: impl SagaStep + 'a) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step, compensating completed steps on failure
    pub async fn run(mut self) -> Result<(), SagaFailure> {
        for idx in 0..self.steps.len() {
            let step = &mut self.steps[idx];
            let step_name = step.name();

            match step.execute().await {
                Ok(()) => {
                    debug!(saga = self.name, step = step_name, "Saga step completed");
                }
                Err(err) => {
                    warn!(
                        saga = self.name,
                        step = step_name,
                        error = %format!("{err:#}"),
                        "Saga step failed, compensating"
                    );
                    let compensation_errors = self.compensate(idx).await;
                    return Err(SagaFailure {
                        saga: self.name,
                        step: step_name,
                        error: err,
                        compensation_errors,
                    });
                }
            }
        }
        Ok(())
    }

    /// Compensates the first `completed` steps in reverse order
    async fn compensate(&mut self, completed: usize) -> Vec<String> {
        let mut errors = Vec::new();
        for step in self.steps[..completed].iter_mut().rev() {
            let step_name = step.name();
            if let Err(err) = step.compensate().await {
                error!(
                    saga = self.name,
                    step = step_name,
                    error = %format!("{err:#}"),
                    "Compensation failed"
                );
                errors.push(format!("{step_name}: {err:#}"));
            } else {
                debug!(saga = self.name, step = step_name, "Step compensated");
            }
        }
        errors
    }
}
