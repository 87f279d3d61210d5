//! Generates Icinga 2 `CheckCommand` definitions from a plugin's clap command.

pub struct CommandDescription {
    arguments: Vec<ArgumentDescription>,
}

pub struct ArgumentDescription {
    long: String,
    description: Option<String>,
    is_flag: bool,
    required: bool,
    default_value: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ToIcingaCommandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid executable path")]
    InvalidExecutablePath,
    #[error("error converting to command description: {0}")]
    CommandDescriptionFromError(#[from] CommandDescriptionFromError),
}

impl CommandDescription {
    /// Renders the definition for the currently running executable.
    pub fn to_icinga_command(&self, name: &str) -> Result<String, ToIcingaCommandError> {
        let current_exe = std::env::current_exe()?
            .to_str()
            .ok_or(ToIcingaCommandError::InvalidExecutablePath)?
            .to_owned();

        Ok(self.render(name, &current_exe))
    }

    /// Custom variables are named `<name>_<long option>`, e.g. `dirsize_wfiles`.
    pub fn render(&self, name: &str, executable: &str) -> String {
        let var = |arg: &ArgumentDescription| format!("{}_{}", name, arg.long.replace('-', "_"));

        let mut out = format!("object CheckCommand \"{name}\" {{\n");
        out.push_str(&format!("  command = [ \"{}\" ]\n", escape_string(executable)));
        out.push_str("  arguments = {\n");
        for arg in &self.arguments {
            out.push_str(&format!("    \"--{}\" = {{\n", arg.long));

            if arg.is_flag {
                out.push_str(&format!("      set_if = \"${}$\"\n", var(arg)));
            } else {
                out.push_str(&format!("      value = \"${}$\"\n", var(arg)));
            }

            if let Some(description) = &arg.description {
                out.push_str(&format!(
                    "      description = \"{}\"\n",
                    escape_string(description)
                ));
            }

            if arg.required {
                out.push_str("      required = true\n");
            }

            out.push_str("    }\n");
        }
        out.push_str("  }\n");

        let defaults = self
            .arguments
            .iter()
            .filter_map(|arg| arg.default_value.as_ref().map(|d| (var(arg), d)))
            .collect::<Vec<_>>();

        if !defaults.is_empty() {
            out.push('\n');
        }
        for (var, default_value) in defaults {
            out.push_str(&format!("  vars.{} = \"{}\"\n", var, escape_string(default_value)));
        }

        out.push_str("}\n");
        out
    }
}

fn escape_string(s: &str) -> String {
    ["\\", "\"", "$"]
        .iter()
        .fold(s.to_string(), |acc, c| acc.replace(c, &format!("\\{}", c)))
}

#[derive(Debug, thiserror::Error)]
pub enum CommandDescriptionFromError {
    #[error("argument {0} has no long option")]
    MissingLongArgument(String),
}

impl TryFrom<&clap::Command> for CommandDescription {
    type Error = CommandDescriptionFromError;

    fn try_from(cmd: &clap::Command) -> Result<Self, Self::Error> {
        let mut arguments = Vec::new();

        for arg in cmd.get_arguments() {
            if matches!(arg.get_id().as_str(), "help" | "version") {
                continue;
            }

            let long = arg
                .get_long()
                .ok_or_else(|| {
                    CommandDescriptionFromError::MissingLongArgument(arg.get_id().to_string())
                })?
                .to_owned();

            let description = arg.get_help().map(|s| s.to_string());
            let is_flag = !arg.get_action().takes_values();

            // switches get an implicit "false" default, that is no useful custom variable
            let default_value = arg
                .get_default_values()
                .first()
                .filter(|_| !is_flag)
                .and_then(|v| v.to_str())
                .map(|s| s.to_string());

            arguments.push(ArgumentDescription {
                long,
                description,
                is_flag,
                required: arg.is_required_set(),
                default_value,
            });
        }

        Ok(CommandDescription { arguments })
    }
}

/// Print the Icinga command configuration if the GENERATE_ICINGA_COMMAND environment variable
/// is set and exit the process.
pub fn print_icinga_command_config_if_env_and_exit(
    name: &str,
    cmd: &clap::Command,
) -> Result<(), ToIcingaCommandError> {
    if std::env::var_os("GENERATE_ICINGA_COMMAND").is_none() {
        return Ok(());
    }

    let description = CommandDescription::try_from(cmd)?;
    let out = description.to_icinga_command(name)?;

    println!("{}", out.trim());
    std::process::exit(0);
}
