//! Nagios/Icinga plugin checking the replication health of a Galera cluster node.
//!
//! ```text
//! check_galera --defaults-file /etc/nagios/galera.cnf -N 3 --warn-flow 10 --crit-flow 30
//! ```

use clap::CommandFactory;

use monplug::galera::{self, Cli, MysqlClient};
use monplug::output::PluginOutput;
use monplug::{config_generator, init_logging, parse_args_or_exit, Runner, ServiceState};

fn main() {
    if let Err(e) =
        config_generator::print_icinga_command_config_if_env_and_exit("galera", &Cli::command())
    {
        PluginOutput::from_state(ServiceState::Unknown, &e.to_string()).print_and_exit();
    }

    let cli: Cli = parse_args_or_exit(std::env::args_os());
    init_logging(cli.verbose);

    let client = MysqlClient::from_cli(&cli);

    Runner::new()
        .on_error(|e: &galera::GaleraError| e.service_state())
        .safe_run(|| galera::check(&cli, &client))
        .print_and_exit()
}
