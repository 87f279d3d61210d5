//! Galera cluster node check.
//!
//! Status comes from the `mysql` command line client in batch mode, so the usual client
//! configuration (`~/.my.cnf`, `--defaults-file`, sockets) just works.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use clap::{ArgAction, Parser};

use crate::aggregate::Aggregator;
use crate::output::{render, PluginOutput};
use crate::threshold::{CheckResult, ExpectSpec, Matching, NumericSpec, TriggerIf};
use crate::{PerfDatum, ServiceState, Severity, Unit};

/// Status variables and the read only switches, as `name<TAB>value` rows.
pub const STATUS_QUERY: &str = "SHOW GLOBAL STATUS LIKE 'wsrep_%'; \
     SHOW GLOBAL VARIABLES WHERE Variable_name IN ('read_only', 'super_read_only')";

#[derive(Debug, Parser)]
#[command(
    name = "check_galera",
    version,
    about = "Checks replication health of a MariaDB/MySQL Galera cluster node."
)]
pub struct Cli {
    /// Host to connect to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to connect to
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Unix socket to connect through
    #[arg(short = 'S', long)]
    pub socket: Option<PathBuf>,

    /// User to connect as
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Password for the user
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Option file read by the mysql client instead of the default ones
    #[arg(long = "defaults-file")]
    pub defaults_file: Option<PathBuf>,

    /// mysql client executable
    #[arg(long = "mysql-cmd", default_value = "mysql")]
    pub mysql_cmd: String,

    /// Seconds the mysql client waits for a connection
    #[arg(long = "connect-timeout", default_value_t = 10)]
    pub connect_timeout: u32,

    /// Number of nodes the cluster should have
    #[arg(short = 'N', long = "expected-size")]
    pub expected_size: Option<u32>,

    /// Report an unexpected cluster size as critical instead of warning
    #[arg(long = "size-critical")]
    pub size_critical: bool,

    /// Flow control paused percentage to warn at
    #[arg(long = "warn-flow", default_value_t = 20.0)]
    pub warn_flow: f64,

    /// Flow control paused percentage to go critical at
    #[arg(long = "crit-flow", default_value_t = 50.0)]
    pub crit_flow: f64,

    /// Log to stderr, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum GaleraError {
    #[error("could not run {command}: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("{command} failed ({status}): {stderr}")]
    ClientFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("no wsrep status rows returned, is the Galera provider loaded?")]
    NoStatusRows,
}

impl GaleraError {
    /// The node may be fine and only monitoring unable to reach it, so every failure is unknown.
    pub fn service_state(&self) -> ServiceState {
        ServiceState::Unknown
    }
}

/// Where the status variables come from. Names are lower case.
pub trait StatusSource {
    fn fetch(&self) -> Result<BTreeMap<String, String>, GaleraError>;
}

/// Queries the node through the `mysql` command line client.
#[derive(Clone, Debug)]
pub struct MysqlClient {
    program: String,
    args: Vec<String>,
    password: Option<String>,
}

impl MysqlClient {
    pub fn from_cli(cli: &Cli) -> Self {
        let mut args = Vec::new();

        // the client only honours this as its first option
        if let Some(ref file) = cli.defaults_file {
            args.push(format!("--defaults-file={}", file.display()));
        }
        args.extend(["--batch", "--skip-column-names"].map(String::from));
        args.push(format!("--connect-timeout={}", cli.connect_timeout));

        if let Some(ref host) = cli.host {
            args.push(format!("--host={}", host));
        }
        if let Some(port) = cli.port {
            args.push(format!("--port={}", port));
        }
        if let Some(ref socket) = cli.socket {
            args.push(format!("--socket={}", socket.display()));
        }
        if let Some(ref user) = cli.user {
            args.push(format!("--user={}", user));
        }
        args.push(format!("--execute={}", STATUS_QUERY));

        MysqlClient {
            program: cli.mysql_cmd.clone(),
            args,
            password: cli.password.clone(),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);

        // keeps the password out of the process list
        if let Some(ref password) = self.password {
            command.env("MYSQL_PWD", password);
        }

        command
    }
}

impl StatusSource for MysqlClient {
    fn fetch(&self) -> Result<BTreeMap<String, String>, GaleraError> {
        tracing::debug!(program = %self.program, args = ?self.args, "querying status");

        let output = self
            .command()
            .output()
            .map_err(|source| GaleraError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GaleraError::ClientFailed {
                command: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().lines().next().unwrap_or_default().to_owned(),
            });
        }

        let status = parse_status(&String::from_utf8_lossy(&output.stdout))?;

        tracing::info!(rows = status.len(), "fetched status");
        Ok(status)
    }
}

/// Reads `name<TAB>value` rows as printed by `mysql --batch --skip-column-names`. Lines without
/// a tab are skipped.
pub fn parse_batch_output(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_owned()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Like [parse_batch_output], but fails unless at least one `wsrep_` row came back. The read
/// only switches exist on every server, so their rows alone say nothing about replication.
pub fn parse_status(output: &str) -> Result<BTreeMap<String, String>, GaleraError> {
    let status = parse_batch_output(output);
    if !status.keys().any(|name| name.starts_with("wsrep_")) {
        return Err(GaleraError::NoStatusRows);
    }
    Ok(status)
}

/// Paused ratio (0.0 to 1.0) as a percentage with two decimals.
pub fn paused_percent(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|ratio| ratio.is_finite())
        .map(|ratio| (ratio * 10000.0).round() / 100.0)
}

/// Fetches the node status through `source` and evaluates it.
pub fn check<S: StatusSource>(cli: &Cli, source: &S) -> Result<PluginOutput, GaleraError> {
    let status = source.fetch()?;
    let get = |name: &str| status.get(name).map(String::as_str).unwrap_or_default();

    let mut aggregator = Aggregator::new();

    if let Some(expected) = cli.expected_size {
        let severity = if cli.size_critical {
            Severity::Critical
        } else {
            Severity::Warning
        };
        aggregator.evaluate(
            &ExpectSpec::new("wsrep_cluster_size", get("wsrep_cluster_size"), severity)
                .expecting(expected.to_string(), Matching::Exact),
        );
    }

    aggregator.evaluate(
        &ExpectSpec::new("wsrep_cluster_status", get("wsrep_cluster_status"), Severity::Critical)
            .expecting("Primary", Matching::Exact),
    );
    aggregator.evaluate(
        &ExpectSpec::new("wsrep_connected", get("wsrep_connected"), Severity::Critical)
            .expecting("ON", Matching::Flag),
    );
    aggregator.evaluate(
        &ExpectSpec::new("wsrep_ready", get("wsrep_ready"), Severity::Critical)
            .expecting("ON", Matching::Flag),
    );
    aggregator.evaluate(
        &ExpectSpec::new(
            "wsrep_local_state_comment",
            get("wsrep_local_state_comment"),
            Severity::Warning,
        )
        .expecting("Synced", Matching::Exact),
    );

    let flow = paused_percent(get("wsrep_flow_control_paused"));
    match flow {
        Some(percent) => {
            aggregator.evaluate(
                &NumericSpec::new("flow_control_paused", percent, TriggerIf::GreaterOrEqual)
                    .with_thresholds(Some(cli.warn_flow), Some(cli.crit_flow))
                    .with_unit(Unit::Percentage),
            );
        }
        None => aggregator.record(CheckResult::new(
            Severity::Critical,
            format!(
                "wsrep_flow_control_paused={:?} is not a number",
                get("wsrep_flow_control_paused")
            ),
        )),
    }

    // older servers have no super_read_only, nothing to check then
    for name in ["read_only", "super_read_only"] {
        if let Some(value) = status.get(name).filter(|v| !v.is_empty()) {
            let spec = ExpectSpec::new(name, value.as_str(), Severity::Warning)
                .rejecting("ON", Matching::Flag);
            aggregator.evaluate(&spec);
        }
    }

    let baseline = format!(
        "node {}, cluster {} with {} nodes, flow control paused {}",
        or_unknown(get("wsrep_local_state_comment")),
        or_unknown(get("wsrep_cluster_status")),
        or_unknown(get("wsrep_cluster_size")),
        flow.map(|p| format!("{}%", p)).unwrap_or_else(|| "unknown".to_owned()),
    );

    let mut perfdata = Vec::new();
    if let Ok(size) = get("wsrep_cluster_size").parse::<u64>() {
        perfdata.push(PerfDatum::new("cluster_size", size).with_range(Some(0u64), None));
    }
    if let Some(percent) = flow {
        perfdata.push(
            PerfDatum::new("flow_control_paused", percent)
                .with_unit(Unit::Percentage)
                .with_thresholds(Some(cli.warn_flow), Some(cli.crit_flow))
                .with_range(Some(0.0), Some(100.0)),
        );
    }
    for name in ["local_recv_queue_avg", "local_send_queue_avg"] {
        if let Ok(value) = get(&format!("wsrep_{}", name)).parse::<f64>() {
            perfdata.push(PerfDatum::new(name, value).with_range(Some(0.0), None));
        }
    }

    Ok(render(aggregator.finalize(), &baseline, &perfdata))
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}
