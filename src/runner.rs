use std::fmt::Display;

use crate::output::PluginOutput;
use crate::ServiceState;

/// Runs a check and turns an error into a plugin line of its own.
///
/// Errors end the run before any threshold is evaluated, so by default they are reported as
/// [ServiceState::Unknown]. Use [Runner::on_error] to pick the state per error.
pub struct Runner<E> {
    on_error: Option<Box<dyn FnOnce(&E) -> ServiceState>>,
}

impl<E: Display> Runner<E> {
    pub fn new() -> Self {
        Self { on_error: None }
    }

    pub fn on_error(mut self, f: impl FnOnce(&E) -> ServiceState + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn safe_run(self, f: impl FnOnce() -> Result<PluginOutput, E>) -> RunnerResult<E> {
        match f() {
            Ok(output) => RunnerResult::Ok(output),
            Err(err) => {
                let state = self
                    .on_error
                    .map(|f| f(&err))
                    .unwrap_or(ServiceState::Unknown);

                tracing::error!(%state, error = %err, "check aborted");
                RunnerResult::Err(state, err)
            }
        }
    }
}

impl<E: Display> Default for Runner<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub enum RunnerResult<E> {
    Ok(PluginOutput),
    Err(ServiceState, E),
}

impl<E: Display> RunnerResult<E> {
    pub fn into_output(self) -> PluginOutput {
        match self {
            RunnerResult::Ok(output) => output,
            RunnerResult::Err(state, err) => PluginOutput::from_state(state, &err.to_string()),
        }
    }

    pub fn print_and_exit(self) -> ! {
        self.into_output().print_and_exit()
    }
}
