macro_rules! impl_to_perf_string_on_to_string {
    ($($t:ty), *) => {
        $(
            impl ToPerfString for $t {
                fn to_perf_string(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

/// Lets you create an [Aggregator](crate::aggregate::Aggregator) from multiple check results.
/// It's a bit like the vec! macro. Results are recorded in the order they are given.
/// ```rust
/// # #[macro_use]
/// # extern crate monplug;
/// #
/// # use monplug::Severity;
/// # use monplug::threshold::CheckResult;
/// #
/// # fn main() {
/// let aggregator = aggregate![
///     CheckResult::ok(),
///     CheckResult::new(Severity::Warning, "disk almost full"),
/// ];
/// assert_eq!(aggregator.severity(), Severity::Warning);
/// # }
/// ```
#[macro_export]
macro_rules! aggregate {
    ($( $r:expr ),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut a = $crate::aggregate::Aggregator::new();
            $(
                a.record($r);
            )*
            a
        }
    };
}

macro_rules! perf_token {
    ($label:expr, $value:expr, $( $field:expr ), *) => {
        {
            let mut s = format!("{}={}", $label, $value);
            $(
                s.push(';');
                s.push_str(&$field.to_perf_string());
            )*
            s
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::threshold::CheckResult;
    use crate::Severity;

    #[test]
    fn test_aggregate_macro() {
        let empty = aggregate![];
        assert_eq!(empty.severity(), Severity::Ok);

        let critical = CheckResult::new(Severity::Critical, "down");
        let aggregator = aggregate![CheckResult::ok(), critical.clone()];
        assert_eq!(aggregator.severity(), Severity::Critical);
        assert_eq!(aggregator.finalize().results(), &[CheckResult::ok(), critical]);
    }
}
