use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::output::PluginOutput;
use crate::ServiceState;

/// Sets up logging to stderr, stdout belongs to the plugin line.
///
/// `RUST_LOG` wins over `verbosity`. Without either only warnings and errors are shown.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    // a subscriber may already be installed, e.g. by tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Rewrites old single dash long options (`-wsize 10`, `-lt`, `-cfiles=5`) to the spelling clap
/// understands. `aliases` maps the old spelling to the new one. Nothing after `--` is touched.
pub fn normalize_legacy_flags<I, T>(args: I, aliases: &[(&str, &str)]) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;

    args.into_iter()
        .map(Into::into)
        .map(|arg: OsString| {
            if passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }

            let rewritten = arg.to_str().and_then(|s| {
                let (flag, value) = match s.split_once('=') {
                    Some((flag, value)) => (flag, Some(value)),
                    None => (s, None),
                };

                aliases
                    .iter()
                    .find(|(old, _)| *old == flag)
                    .map(|(_, new)| match value {
                        Some(value) => OsString::from(format!("{}={}", new, value)),
                        None => OsString::from(*new),
                    })
            });

            rewritten.unwrap_or(arg)
        })
        .collect()
}

/// Parses the command line. Every way of not getting arguments, including `--help`, ends up as
/// an [ServiceState::Unknown] output, which is what a monitoring system should see for a run
/// that checked nothing.
pub fn try_parse_args<C, I, T>(args: I) -> Result<C, PluginOutput>
where
    C: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    C::try_parse_from(args).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            PluginOutput::from_state(ServiceState::Unknown, e.to_string().trim())
        }
        _ => PluginOutput::from_state(ServiceState::Unknown, &error_summary(&e)),
    })
}

/// Like [try_parse_args], but prints and exits on error. Help and version text are printed as
/// they are, not squeezed into one status line.
pub fn parse_args_or_exit<C, I, T>(args: I) -> C
where
    C: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match C::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            println!("{}", e.to_string().trim_end());
            std::process::exit(ServiceState::Unknown.exit_code());
        }
        Err(e) => {
            PluginOutput::from_state(ServiceState::Unknown, &error_summary(&e)).print_and_exit()
        }
    }
}

// clap spreads one error over several lines and appends usage, keep only the error itself
fn error_summary(e: &clap::Error) -> String {
    let rendered = e.to_string();

    rendered
        .lines()
        .map(str::trim)
        .take_while(|l| !l.starts_with("Usage:") && !l.starts_with("For more information"))
        .filter(|l| !l.is_empty() && !l.starts_with("tip:"))
        .map(|l| l.strip_prefix("error: ").unwrap_or(l))
        .collect::<Vec<_>>()
        .join(" ")
}
