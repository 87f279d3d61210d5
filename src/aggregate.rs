//! Collects the results of all checks run against one target.

use crate::threshold::{CheckResult, Evaluate};
use crate::Severity;

/// Everything recorded during one run, in evaluation order, plus the most severe state seen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateOutcome {
    severity: Severity,
    results: Vec<CheckResult>,
}

impl AggregateOutcome {
    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// Clauses of all non-OK results, in the order they were recorded.
    pub fn clauses(&self) -> impl Iterator<Item = &str> {
        self.results.iter().filter_map(CheckResult::clause)
    }
}

/// Accumulates [CheckResult]s. The overall severity only ever goes up.
///
/// Owned by the single code path running the checks and passed by `&mut` to whatever evaluates
/// them.
#[derive(Debug, Default)]
pub struct Aggregator {
    outcome: AggregateOutcome,
}

impl Aggregator {
    pub fn new() -> Self {
        Aggregator::default()
    }

    pub fn record(&mut self, result: CheckResult) {
        tracing::debug!(
            severity = %result.severity(),
            clause = result.clause().unwrap_or_default(),
            "recorded check result"
        );

        self.outcome.severity = self.outcome.severity.max(result.severity());
        self.outcome.results.push(result);
    }

    /// Evaluates `spec` and records the result. Returns the severity of this single spec.
    pub fn evaluate<S: Evaluate + ?Sized>(&mut self, spec: &S) -> Severity {
        let result = spec.evaluate();
        let severity = result.severity();
        self.record(result);
        severity
    }

    pub fn severity(&self) -> Severity {
        self.outcome.severity
    }

    /// Returns a snapshot of everything recorded so far. Calling it repeatedly without recording
    /// in between returns equal outcomes.
    pub fn finalize(&self) -> AggregateOutcome {
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::{NumericSpec, TriggerIf};

    fn result(severity: Severity) -> CheckResult {
        CheckResult::new(severity, format!("{:?}", severity))
    }

    #[test]
    fn test_empty_is_ok() {
        let outcome = Aggregator::new().finalize();
        assert_eq!(outcome.severity(), Severity::Ok);
        assert!(outcome.results().is_empty());
        assert_eq!(outcome.clauses().count(), 0);
    }

    #[test]
    fn test_monotonic_escalation() {
        let mut aggregator = Aggregator::new();
        let mut seen = Vec::new();
        for severity in [
            Severity::Ok,
            Severity::Warning,
            Severity::Ok,
            Severity::Critical,
            Severity::Warning,
        ] {
            aggregator.record(result(severity));
            seen.push(aggregator.severity());
        }

        assert_eq!(
            seen,
            [
                Severity::Ok,
                Severity::Warning,
                Severity::Warning,
                Severity::Critical,
                Severity::Critical
            ]
        );
        assert_eq!(aggregator.finalize().severity(), Severity::Critical);
    }

    #[test]
    fn test_order_independent_severity() {
        let orders = [
            [Severity::Critical, Severity::Ok, Severity::Warning, Severity::Ok, Severity::Warning],
            [Severity::Ok, Severity::Ok, Severity::Warning, Severity::Warning, Severity::Critical],
            [Severity::Warning, Severity::Critical, Severity::Ok, Severity::Warning, Severity::Ok],
        ];
        for order in orders {
            let mut aggregator = Aggregator::new();
            order.iter().for_each(|s| aggregator.record(result(*s)));
            assert_eq!(aggregator.severity(), Severity::Critical);
        }
    }

    #[test]
    fn test_clauses_keep_evaluation_order() {
        let mut aggregator = Aggregator::new();
        aggregator.record(CheckResult::new(Severity::Critical, "first"));
        aggregator.record(CheckResult::ok());
        aggregator.record(CheckResult::new(Severity::Warning, "second"));

        let outcome = aggregator.finalize();
        assert_eq!(outcome.clauses().collect::<Vec<_>>(), ["first", "second"]);
        assert_eq!(outcome.results().len(), 3);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut aggregator = Aggregator::new();
        aggregator.record(result(Severity::Warning));

        assert_eq!(aggregator.finalize(), aggregator.finalize());
    }

    #[test]
    fn test_same_check_suppression_only() {
        // a critical size result does not hide a later file count warning
        let mut aggregator = Aggregator::new();
        let size =
            NumericSpec::new("size", 2000, TriggerIf::Less).with_thresholds(Some(5000), Some(3000));
        let files =
            NumericSpec::new("files", 8, TriggerIf::Less).with_thresholds(Some(10), Some(5));

        assert_eq!(aggregator.evaluate(&size), Severity::Critical);
        assert_eq!(aggregator.evaluate(&files), Severity::Warning);

        let outcome = aggregator.finalize();
        assert_eq!(outcome.severity(), Severity::Critical);
        assert_eq!(
            outcome.clauses().collect::<Vec<_>>(),
            [
                "size=2000 is below critical threshold 3000",
                "files=8 is below warning threshold 10"
            ]
        );
    }
}
