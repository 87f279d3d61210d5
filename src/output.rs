//! Renders the single line a plugin prints and picks its exit code.

use std::process;

use crate::aggregate::AggregateOutcome;
use crate::{PerfDatum, ServiceState, ToPerfString};

/// The final status line of a plugin together with the state it exits with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginOutput {
    state: ServiceState,
    text: String,
}

impl PluginOutput {
    /// Output for runs that never got to evaluate anything, e.g. `UNKNOWN: no status rows`.
    pub fn from_state(state: ServiceState, message: &str) -> Self {
        PluginOutput {
            state,
            text: format!("{}: {}", state, sanitize(message)),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }

    /// Will print the status line and exit with the exit code from Self::exit_code
    pub fn print_and_exit(&self) -> ! {
        tracing::debug!(state = %self.state, "check finished");
        println!("{}", self.text);
        process::exit(self.exit_code());
    }
}

/// Builds `<STATE>: <clauses joined by "; ">, <baseline> | <perfdata>`.
///
/// Without clauses only the baseline follows the state word. The ` | ` separator is always
/// written, followed by nothing when there is no perf data.
pub fn render(outcome: AggregateOutcome, baseline: &str, perfdata: &[PerfDatum]) -> PluginOutput {
    let state = ServiceState::from(outcome.severity());

    let mut message = outcome.clauses().map(sanitize).collect::<Vec<_>>().join("; ");
    let baseline = sanitize(baseline);
    if !baseline.is_empty() {
        if !message.is_empty() {
            message.push_str(", ");
        }
        message.push_str(&baseline);
    }

    let perfdata = perfdata
        .iter()
        .map(|d| d.to_perf_string())
        .collect::<Vec<_>>()
        .join(" ");
    let text = format!("{}: {} | {}", state, message, perfdata);

    PluginOutput { state, text }
}

// `|` would start the perf data and anything after a newline counts as long output
fn sanitize(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '|' => '/',
            '\n' | '\r' => ' ',
            c => c,
        })
        .collect()
}
