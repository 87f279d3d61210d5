//! Turns single measurements into [CheckResult]s.
//!
//! Thresholds are opt-in: a spec without bounds (or without an expected value) always evaluates
//! to OK, no matter what was measured.

use std::fmt::Display;

use crate::{Severity, Unit};

/// Direction in which a numeric value becomes worse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerIf {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl TriggerIf {
    pub fn fires<T: PartialOrd>(&self, value: &T, bound: &T) -> bool {
        match self {
            TriggerIf::Less => value < bound,
            TriggerIf::LessOrEqual => value <= bound,
            TriggerIf::Greater => value > bound,
            TriggerIf::GreaterOrEqual => value >= bound,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            TriggerIf::Less => "is below",
            TriggerIf::LessOrEqual => "is at or below",
            TriggerIf::Greater => "exceeds",
            TriggerIf::GreaterOrEqual => "is at or above",
        }
    }
}

/// Severity of one evaluated spec plus the reason for it. OK results never carry a clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    severity: Severity,
    clause: Option<String>,
}

impl CheckResult {
    pub fn ok() -> Self {
        CheckResult {
            severity: Severity::Ok,
            clause: None,
        }
    }

    pub fn new(severity: Severity, clause: impl Into<String>) -> Self {
        if severity == Severity::Ok {
            return CheckResult::ok();
        }

        CheckResult {
            severity,
            clause: Some(clause.into()),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn clause(&self) -> Option<&str> {
        self.clause.as_deref()
    }
}

/// Anything that can be judged on its own. Calls should not query the measured service again.
pub trait Evaluate {
    fn evaluate(&self) -> CheckResult;
}

pub fn evaluate<S: Evaluate + ?Sized>(spec: &S) -> CheckResult {
    spec.evaluate()
}

/// A numeric measurement with optional warning and critical bounds.
///
/// Critical is always checked first, so a value past both bounds is only reported as critical.
///
/// ```rust
/// # use monplug::threshold::{Evaluate, NumericSpec, TriggerIf};
/// # use monplug::{Severity, Unit};
/// let spec = NumericSpec::new("size", 600000, TriggerIf::Greater)
///     .with_thresholds(Some(512000), Some(1048576))
///     .with_unit(Unit::KiloBytes);
/// let result = spec.evaluate();
/// assert_eq!(result.severity(), Severity::Warning);
/// assert_eq!(result.clause(), Some("size=600000KB exceeds warning threshold 512000KB"));
/// ```
#[derive(Clone, Debug)]
pub struct NumericSpec<T> {
    label: String,
    value: T,
    trigger: TriggerIf,
    warning: Option<T>,
    critical: Option<T>,
    unit: Unit,
}

impl<T> NumericSpec<T>
where
    T: PartialOrd + Display,
{
    pub fn new(label: &str, value: T, trigger: TriggerIf) -> Self {
        NumericSpec {
            label: label.to_owned(),
            value,
            trigger,
            warning: None,
            critical: None,
            unit: Unit::None,
        }
    }

    pub fn with_thresholds(mut self, warning: Option<T>, critical: Option<T>) -> Self {
        self.warning = warning;
        self.critical = critical;
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    fn clause(&self, level: &str, bound: &T) -> String {
        format!(
            "{}={}{unit} {} {} threshold {}{unit}",
            self.label,
            self.value,
            self.trigger.verb(),
            level,
            bound,
            unit = self.unit
        )
    }
}

impl<T> Evaluate for NumericSpec<T>
where
    T: PartialOrd + Display,
{
    fn evaluate(&self) -> CheckResult {
        if let Some(ref critical) = self.critical {
            if self.trigger.fires(&self.value, critical) {
                return CheckResult::new(Severity::Critical, self.clause("critical", critical));
            }
        }

        if let Some(ref warning) = self.warning {
            if self.trigger.fires(&self.value, warning) {
                return CheckResult::new(Severity::Warning, self.clause("warning", warning));
            }
        }

        CheckResult::ok()
    }
}

/// How a reported string is compared against the expected one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Matching {
    /// Byte for byte, for state names like `Synced` or `Primary`.
    Exact,
    /// ASCII case-insensitive, for values whose spelling varies between servers.
    IgnoreCase,
    /// Both sides are read as on/off switches, see [flag_enabled].
    Flag,
}

impl Matching {
    fn matches(&self, value: &str, expected: &str) -> bool {
        match self {
            Matching::Exact => value == expected,
            Matching::IgnoreCase => value.eq_ignore_ascii_case(expected),
            Matching::Flag => flag_enabled(value) == flag_enabled(expected),
        }
    }
}

/// Reads server style switches: empty, `0`, `OFF`, `NO` and `FALSE` (any case) are off,
/// everything else is on.
pub fn flag_enabled(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || value == "0"
        || ["off", "no", "false"]
            .iter()
            .any(|off| value.eq_ignore_ascii_case(off)))
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Expectation {
    Equals(String),
    NotEquals(String),
}

/// A string measurement that must (or must not) match a given value.
///
/// A violation is reported with the severity chosen by the caller, not derived from bounds.
///
/// ```rust
/// # use monplug::threshold::{Evaluate, ExpectSpec, Matching};
/// # use monplug::Severity;
/// let spec = ExpectSpec::new("wsrep_connected", "OFF", Severity::Critical)
///     .expecting("ON", Matching::Flag);
/// assert_eq!(spec.evaluate().severity(), Severity::Critical);
/// ```
#[derive(Clone, Debug)]
pub struct ExpectSpec {
    label: String,
    value: String,
    expectation: Option<Expectation>,
    matching: Matching,
    on_violation: Severity,
}

impl ExpectSpec {
    pub fn new(label: &str, value: impl Into<String>, on_violation: Severity) -> Self {
        ExpectSpec {
            label: label.to_owned(),
            value: value.into(),
            expectation: None,
            matching: Matching::Exact,
            on_violation,
        }
    }

    pub fn expecting(mut self, expected: impl Into<String>, matching: Matching) -> Self {
        self.expectation = Some(Expectation::Equals(expected.into()));
        self.matching = matching;
        self
    }

    pub fn rejecting(mut self, rejected: impl Into<String>, matching: Matching) -> Self {
        self.expectation = Some(Expectation::NotEquals(rejected.into()));
        self.matching = matching;
        self
    }

    fn reported(&self) -> String {
        if self.value.is_empty() {
            format!("{} not reported", self.label)
        } else {
            format!("{}={}", self.label, self.value)
        }
    }
}

impl Evaluate for ExpectSpec {
    fn evaluate(&self) -> CheckResult {
        let clause = match self.expectation {
            None => return CheckResult::ok(),
            Some(Expectation::Equals(ref expected)) => {
                if self.matching.matches(&self.value, expected) {
                    return CheckResult::ok();
                }
                format!("{} (expected {})", self.reported(), expected)
            }
            Some(Expectation::NotEquals(ref rejected)) => {
                if !self.matching.matches(&self.value, rejected) {
                    return CheckResult::ok();
                }
                format!("{} (must not be {})", self.reported(), rejected)
            }
        };

        CheckResult::new(self.on_violation, clause)
    }
}
