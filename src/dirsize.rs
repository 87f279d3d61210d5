//! Directory size and file count check.
//!
//! Both values are compared in the same direction: with `--greater-than` a growing directory is
//! the problem (spool, log or cache directories), with `--less-than` a shrinking one is (backup
//! targets, mirrors).

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::{ArgAction, ArgGroup, Parser};

use crate::aggregate::Aggregator;
use crate::output::{render, PluginOutput};
use crate::threshold::{NumericSpec, TriggerIf};
use crate::{PerfDatum, ServiceState, Unit};

/// Single dash spellings accepted for compatibility with existing service definitions.
pub const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("-lt", "--less-than"),
    ("-gt", "--greater-than"),
    ("-wsize", "--wsize"),
    ("-csize", "--csize"),
    ("-wfiles", "--wfiles"),
    ("-cfiles", "--cfiles"),
];

#[derive(Debug, Parser)]
#[command(
    name = "check_dirsize",
    version,
    about = "Checks size (KB) and number of files of a directory."
)]
#[command(group(ArgGroup::new("mode").required(true).args(["less_than", "greater_than"])))]
pub struct Cli {
    /// Directory to measure
    #[arg(short = 'd', long = "dir")]
    pub dir: PathBuf,

    /// Alert when size or file count drop below the thresholds
    #[arg(long = "less-than")]
    pub less_than: bool,

    /// Alert when size or file count rise above the thresholds
    #[arg(long = "greater-than")]
    pub greater_than: bool,

    /// Warning threshold for the size in KB
    #[arg(long)]
    pub wsize: Option<u64>,

    /// Critical threshold for the size in KB
    #[arg(long)]
    pub csize: Option<u64>,

    /// Warning threshold for the number of files
    #[arg(long)]
    pub wfiles: Option<u64>,

    /// Critical threshold for the number of files
    #[arg(long)]
    pub cfiles: Option<u64>,

    /// Log to stderr, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn trigger(&self) -> TriggerIf {
        if self.less_than {
            TriggerIf::Less
        } else {
            TriggerIf::Greater
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirUsage {
    pub size_kb: u64,
    pub files: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum DirSizeError {
    #[error("{} does not exist or is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("could not run {command}: {source}")]
    Spawn {
        command: &'static str,
        source: io::Error,
    },
    #[error("{command} failed ({status}): {stderr}")]
    CommandFailed {
        command: &'static str,
        status: String,
        stderr: String,
    },
    #[error("unexpected output from {command}: {output:?}")]
    UnexpectedOutput {
        command: &'static str,
        output: String,
    },
}

impl DirSizeError {
    /// A missing directory is a finding about the monitored host, everything else means the
    /// check itself could not do its job.
    pub fn service_state(&self) -> ServiceState {
        match self {
            DirSizeError::NotADirectory(_) => ServiceState::Critical,
            _ => ServiceState::Unknown,
        }
    }
}

/// Where size and file count come from.
pub trait DirectoryProbe {
    fn measure(&self, dir: &Path) -> Result<DirUsage, DirSizeError>;
}

/// Measures with `du -sk` and `find -type f`, like an administrator would.
#[derive(Debug, Default)]
pub struct DuFindProbe;

impl DuFindProbe {
    fn size_kb(&self, dir: &Path) -> Result<u64, DirSizeError> {
        let stdout = run("du", Command::new("du").arg("-sk").arg(dir))?;
        parse_du_output(&stdout)
    }

    fn file_count(&self, dir: &Path) -> Result<u64, DirSizeError> {
        // NUL separated so that names containing newlines are counted once
        let stdout = run(
            "find",
            Command::new("find").arg(dir).args(["-type", "f", "-print0"]),
        )?;

        Ok(stdout.bytes().filter(|b| *b == 0).count() as u64)
    }
}

impl DirectoryProbe for DuFindProbe {
    fn measure(&self, dir: &Path) -> Result<DirUsage, DirSizeError> {
        if !dir.is_dir() {
            return Err(DirSizeError::NotADirectory(dir.to_owned()));
        }

        let usage = DirUsage {
            size_kb: self.size_kb(dir)?,
            files: self.file_count(dir)?,
        };

        tracing::info!(
            dir = %dir.display(),
            size_kb = usage.size_kb,
            files = usage.files,
            "measured directory"
        );
        Ok(usage)
    }
}

/// `du -sk` prints `<kilobytes>\t<path>`.
fn parse_du_output(stdout: &str) -> Result<u64, DirSizeError> {
    stdout
        .split_whitespace()
        .next()
        .and_then(|kb| kb.parse().ok())
        .ok_or_else(|| DirSizeError::UnexpectedOutput {
            command: "du",
            output: stdout.trim().to_owned(),
        })
}

fn run(name: &'static str, command: &mut Command) -> Result<String, DirSizeError> {
    tracing::debug!(?command, "running");

    let output = command.output().map_err(|source| DirSizeError::Spawn {
        command: name,
        source,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DirSizeError::CommandFailed {
            command: name,
            status: output.status.to_string(),
            stderr: stderr.lines().next().unwrap_or_default().to_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Measures `cli.dir` through `probe` and evaluates size and file count.
pub fn check<P: DirectoryProbe>(cli: &Cli, probe: &P) -> Result<PluginOutput, DirSizeError> {
    let usage = probe.measure(&cli.dir)?;
    let trigger = cli.trigger();

    let mut aggregator = Aggregator::new();
    aggregator.evaluate(
        &NumericSpec::new("size", usage.size_kb, trigger)
            .with_thresholds(cli.wsize, cli.csize)
            .with_unit(Unit::KiloBytes),
    );
    aggregator.evaluate(
        &NumericSpec::new("files", usage.files, trigger).with_thresholds(cli.wfiles, cli.cfiles),
    );

    let baseline = format!(
        "{}: {}KB in {} files",
        cli.dir.display(),
        usage.size_kb,
        usage.files
    );
    let perfdata = [
        PerfDatum::new("size", usage.size_kb)
            .with_unit(Unit::KiloBytes)
            .with_thresholds(cli.wsize, cli.csize)
            .with_range(Some(0u64), None),
        PerfDatum::new("files", usage.files)
            .with_thresholds(cli.wfiles, cli.cfiles)
            .with_range(Some(0u64), None),
    ];

    Ok(render(aggregator.finalize(), &baseline, &perfdata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalize_legacy_flags, try_parse_args, Runner};

    struct FixedProbe(DirUsage);

    impl DirectoryProbe for FixedProbe {
        fn measure(&self, _dir: &Path) -> Result<DirUsage, DirSizeError> {
            Ok(self.0)
        }
    }

    fn cli(args: &[&str]) -> Cli {
        let args = std::iter::once("check_dirsize").chain(args.iter().copied());
        try_parse_args(normalize_legacy_flags(args, LEGACY_FLAGS)).unwrap()
    }

    fn run_with(size_kb: u64, files: u64, args: &[&str]) -> PluginOutput {
        check(&cli(args), &FixedProbe(DirUsage { size_kb, files })).unwrap()
    }

    #[test]
    fn test_size_warning() {
        let args = ["-d", "/data", "-gt", "-wsize", "512000", "-csize", "1048576"];
        let out = run_with(600000, 42, &args);
        assert_eq!(
            out.text(),
            "WARNING: size=600000KB exceeds warning threshold 512000KB, \
             /data: 600000KB in 42 files \
             | size=600000KB;512000;1048576;0; files=42;;;0;"
        );
        assert_eq!(out.exit_code(), 1);
    }

    #[test]
    fn test_size_critical() {
        let args = ["-d", "/data", "-gt", "-wsize", "512000", "-csize", "1048576"];
        let out = run_with(2000000, 42, &args);
        assert_eq!(out.state(), ServiceState::Critical);
        assert_eq!(out.exit_code(), 2);
        assert!(out
            .text()
            .starts_with("CRITICAL: size=2000000KB exceeds critical threshold 1048576KB, "));
    }

    #[test]
    fn test_file_count_critical_below() {
        let out = run_with(100, 3, &["--dir", "/backup", "-lt", "-wfiles", "10", "-cfiles", "5"]);
        assert_eq!(out.exit_code(), 2);
        assert_eq!(
            out.text(),
            "CRITICAL: files=3 is below critical threshold 5, /backup: 100KB in 3 files \
             | size=100KB;;;0; files=3;10;5;0;"
        );
    }

    #[test]
    fn test_both_checks_report() {
        let out = run_with(
            100,
            8,
            &["-d", "/backup", "--less-than", "--wsize", "500", "--csize", "200", "--wfiles", "10"],
        );
        assert_eq!(out.exit_code(), 2);
        assert!(out.text().starts_with(
            "CRITICAL: size=100KB is below critical threshold 200KB; \
             files=8 is below warning threshold 10, "
        ));
    }

    #[test]
    fn test_no_thresholds_never_alert() {
        for size_kb in [0, 1, 600000, u64::MAX] {
            for mode in ["-gt", "-lt"] {
                let out = run_with(size_kb, 0, &["-d", "/data", mode]);
                assert_eq!(out.state(), ServiceState::Ok, "{} {}", mode, size_kb);
                assert!(out.text().starts_with("OK: /data: "));
            }
        }
    }

    #[test]
    fn test_mode_is_required() {
        let args = ["check_dirsize", "-d", "/data", "--wsize", "1"];
        let err = try_parse_args::<Cli, _, _>(args).unwrap_err();
        assert_eq!(err.state(), ServiceState::Unknown);

        let args = ["check_dirsize", "-d", "/data", "--less-than", "--greater-than"];
        assert!(try_parse_args::<Cli, _, _>(args).is_err());

        let args = ["check_dirsize", "--less-than"];
        assert!(try_parse_args::<Cli, _, _>(args).is_err());
    }

    #[test]
    fn test_du_find_counts_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b"), vec![0u8; 4096]).unwrap();
        std::fs::write(dir.path().join("sub").join("with\nnewline"), b"x").unwrap();

        let usage = DuFindProbe.measure(dir.path()).unwrap();
        assert_eq!(usage.files, 3);
        assert!(usage.size_kb >= 4, "size_kb {}", usage.size_kb);
    }

    #[test]
    fn test_missing_dir_is_critical() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let err = DuFindProbe.measure(&missing).unwrap_err();
        assert!(matches!(err, DirSizeError::NotADirectory(_)));
        assert_eq!(err.service_state(), ServiceState::Critical);

        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();
        assert!(matches!(
            DuFindProbe.measure(&file),
            Err(DirSizeError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_failing_command_is_unknown() {
        let err = run("false", &mut Command::new("false")).unwrap_err();
        assert!(matches!(err, DirSizeError::CommandFailed { command: "false", .. }));
        assert_eq!(err.service_state(), ServiceState::Unknown);

        let err = run("du", Command::new("du").arg("-sk").arg("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, DirSizeError::CommandFailed { command: "du", .. }));

        let err = run("missing", &mut Command::new("/nonexistent/bin/du")).unwrap_err();
        assert!(matches!(err, DirSizeError::Spawn { .. }));
        assert_eq!(err.service_state(), ServiceState::Unknown);
    }

    #[test]
    fn test_failing_measurement_prints_unknown() {
        struct FailingCommand;

        impl DirectoryProbe for FailingCommand {
            fn measure(&self, _dir: &Path) -> Result<DirUsage, DirSizeError> {
                run("false", &mut Command::new("false"))?;
                Ok(DirUsage { size_kb: 0, files: 0 })
            }
        }

        let cli = cli(&["-d", "/data", "-gt"]);
        let output = Runner::new()
            .on_error(|e: &DirSizeError| e.service_state())
            .safe_run(|| check(&cli, &FailingCommand))
            .into_output();

        assert_eq!(output.exit_code(), 3);
        assert!(output.text().starts_with("UNKNOWN: false failed ("), "{}", output.text());
    }

    #[test]
    fn test_parse_du_output() {
        assert_eq!(parse_du_output("600000\t/data\n").unwrap(), 600000);

        let err = parse_du_output("garbage\n").unwrap_err();
        assert!(matches!(err, DirSizeError::UnexpectedOutput { command: "du", .. }));
        assert_eq!(err.service_state(), ServiceState::Unknown);
        assert!(parse_du_output("").is_err());
    }
}
