//! Nagios/Icinga plugin checking size and file count of a directory.
//!
//! ```text
//! check_dirsize -d /var/spool/mail -gt -wsize 512000 -csize 1048576 -wfiles 1000
//! ```

use clap::CommandFactory;

use monplug::dirsize::{self, Cli, DuFindProbe, LEGACY_FLAGS};
use monplug::output::PluginOutput;
use monplug::{config_generator, init_logging, normalize_legacy_flags, parse_args_or_exit};
use monplug::{Runner, ServiceState};

fn main() {
    if let Err(e) =
        config_generator::print_icinga_command_config_if_env_and_exit("dirsize", &Cli::command())
    {
        PluginOutput::from_state(ServiceState::Unknown, &e.to_string()).print_and_exit();
    }

    let cli: Cli = parse_args_or_exit(normalize_legacy_flags(std::env::args_os(), LEGACY_FLAGS));
    init_logging(cli.verbose);

    Runner::new()
        .on_error(|e: &dirsize::DirSizeError| e.service_state())
        .safe_run(|| dirsize::check(&cli, &DuFindProbe))
        .print_and_exit()
}
