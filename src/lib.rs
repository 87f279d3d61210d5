//! Building blocks for Nagios/Icinga checks plus two plugins built on them: a directory size
//! check and a Galera cluster node check.
//!
//! A check run goes through the same steps in both plugins:
//!
//! 1. measure something (a directory, a database node),
//! 2. turn every measurement into a [threshold::Evaluate] spec and feed it to an
//!    [aggregate::Aggregator],
//! 3. [output::render] the finalized outcome together with its performance data.
//!
//! ```rust
//! # #[macro_use]
//! # extern crate monplug;
//! # use monplug::threshold::{NumericSpec, TriggerIf, Evaluate};
//! # use monplug::{output, PerfDatum};
//! # fn main() {
//! let load = NumericSpec::new("load", 7, TriggerIf::Greater).with_thresholds(Some(4), Some(8));
//! let aggregator = aggregate![load.evaluate()];
//! let perfdata = [PerfDatum::new("load", 7)];
//! let out = output::render(aggregator.finalize(), "load average 7", &perfdata);
//!
//! assert_eq!(
//!     out.text(),
//!     "WARNING: load=7 exceeds warning threshold 4, load average 7 | load=7;;;;"
//! );
//! assert_eq!(out.exit_code(), 1);
//! # }
//! ```

use std::fmt;

#[macro_use]
mod macros;

pub mod aggregate;
pub mod config_generator;
pub mod dirsize;
pub mod galera;
pub mod output;
pub mod threshold;

mod helper;
pub use crate::helper::{init_logging, normalize_legacy_flags, parse_args_or_exit, try_parse_args};

mod runner;
pub use crate::runner::{Runner, RunnerResult};

/// Outcome of evaluating measurements. Ordered so that the most severe one wins: `Ok` is the
/// minimum, `Critical` the maximum.
///
/// There is no unknown variant here, see [ServiceState].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Critical,
}

impl Severity {
    pub fn exit_code(&self) -> i32 {
        ServiceState::from(*self).exit_code()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ServiceState::from(*self).fmt(f)
    }
}

/// Represents a service state from nagios.
///
/// `Unknown` only comes out of failures that happen before any threshold is evaluated, e.g. bad
/// arguments or an unreachable measurement source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    /// Returns the corresponding nagios exit code to signal the service state of self.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }
}

impl From<Severity> for ServiceState {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Ok => ServiceState::Ok,
            Severity::Warning => ServiceState::Warning,
            Severity::Critical => ServiceState::Critical,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
        };
        f.write_str(word)
    }
}

/// The purpose of ToPerfString is only so one can define custom representations of custom types
/// without using the ToString trait so we don't interfere with that.
///
/// Also used internally for generation of the final output.
pub trait ToPerfString {
    fn to_perf_string(&self) -> String;
}

impl_to_perf_string_on_to_string!(bool, usize);
impl_to_perf_string_on_to_string!(u8, u16, u32, u64, u128);
impl_to_perf_string_on_to_string!(i8, i16, i32, i64, i128);
impl_to_perf_string_on_to_string!(f32, f64);
impl_to_perf_string_on_to_string!(String);

impl<'a> ToPerfString for &'a str {
    fn to_perf_string(&self) -> String {
        self.to_string()
    }
}

impl<T> ToPerfString for Option<T>
where
    T: ToPerfString,
{
    fn to_perf_string(&self) -> String {
        match self {
            Some(ref s) => s.to_perf_string(),
            None => String::new(),
        }
    }
}

/// Unit of measurement appended to values in clauses and performance data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Unit {
    #[default]
    None,
    Seconds,
    Milliseconds,
    Percentage,
    Bytes,
    KiloBytes,
    MegaBytes,
    Counter,
    Other(String),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::None => "",
            Unit::Seconds => "s",
            Unit::Milliseconds => "ms",
            Unit::Percentage => "%",
            Unit::Bytes => "B",
            Unit::KiloBytes => "KB",
            Unit::MegaBytes => "MB",
            Unit::Counter => "c",
            Unit::Other(s) => s,
        };
        f.write_str(s)
    }
}

/// One performance data token, rendered as `label=value[unit];warn;crit;min;max`.
///
/// Fields that were never set stay empty, the semicolons are always written so every field keeps
/// its position.
///
/// ```rust
/// # use monplug::{PerfDatum, ToPerfString, Unit};
/// let datum = PerfDatum::new("size", 600000u64)
///     .with_unit(Unit::KiloBytes)
///     .with_thresholds(Some(512000u64), None)
///     .with_range(Some(0u64), None);
/// assert_eq!(datum.to_perf_string(), "size=600000KB;512000;;0;");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PerfDatum {
    label: String,
    value: String,
    unit: Unit,
    warning: Option<String>,
    critical: Option<String>,
    min: Option<String>,
    max: Option<String>,
}

impl PerfDatum {
    pub fn new<T: ToPerfString>(label: &str, value: T) -> Self {
        PerfDatum {
            label: label.to_owned(),
            value: value.to_perf_string(),
            unit: Unit::None,
            warning: None,
            critical: None,
            min: None,
            max: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_thresholds<T: ToPerfString>(
        mut self,
        warning: Option<T>,
        critical: Option<T>,
    ) -> Self {
        self.warning = warning.map(|w| w.to_perf_string());
        self.critical = critical.map(|c| c.to_perf_string());
        self
    }

    pub fn with_range<T: ToPerfString>(mut self, min: Option<T>, max: Option<T>) -> Self {
        self.min = min.map(|m| m.to_perf_string());
        self.max = max.map(|m| m.to_perf_string());
        self
    }
}

impl ToPerfString for PerfDatum {
    fn to_perf_string(&self) -> String {
        // replace `=`
        let label = self.label.replace('=', "_");

        // quote `'`
        let label = label.replace('\'', "''");

        // quote if contains spaces
        let label = if label.contains(' ') {
            format!("'{}'", label)
        } else {
            label
        };

        perf_token!(
            label,
            format!("{}{}", self.value, self.unit),
            self.warning,
            self.critical,
            self.min,
            self.max
        )
    }
}
