//! Built-in command set and dispatch.
//!
//! Commands form a closed, enumerated set dispatched by exact name match.
//! Unknown names are not an error for the tasking loop: they surface to the
//! operator as a textual `Unknown command: <name>` result. The wider
//! filesystem vocabulary (directory listing, copy, mkdir and friends) is
//! deliberately not part of this set.

use crate::config::AgentConfig;
use crate::{CommandExecutor, ExecOutcome};

/// The closed set of built-in commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltinCommand {
    /// Rewrite the polling interval at runtime.
    Sleep,
    /// Run a command line through the platform shell.
    Shell,
    /// Terminate the agent.
    Exit,
}

impl BuiltinCommand {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sleep" => Some(Self::Sleep),
            "shell" => Some(Self::Shell),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Default command-execution collaborator backed by the platform shell.
#[derive(Debug, Default)]
pub struct BuiltinExecutor;

impl CommandExecutor for BuiltinExecutor {
    fn execute(&mut self, name: &str, args: &str, config: &mut AgentConfig) -> ExecOutcome {
        match BuiltinCommand::from_name(name) {
            Some(BuiltinCommand::Sleep) => cmd_sleep(args, config),
            Some(BuiltinCommand::Shell) => cmd_shell(args),
            Some(BuiltinCommand::Exit) => ExecOutcome {
                success: true,
                output: "Exiting...".to_string(),
                terminate: true,
            },
            None => ExecOutcome::failed(format!("Unknown command: {}", name)),
        }
    }
}

/// Rewrites the polling interval. The argument is a positive number of
/// seconds; anything else reports an error result without touching the
/// configuration.
fn cmd_sleep(args: &str, config: &mut AgentConfig) -> ExecOutcome {
    if args.is_empty() {
        return ExecOutcome::failed("Error: No sleep interval specified".to_string());
    }

    match args.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => {
            config.sleep_interval_ms = seconds * 1000;
            ExecOutcome::ok(format!("Sleep interval set to {} seconds", seconds))
        }
        _ => ExecOutcome::failed("Error: Invalid sleep interval".to_string()),
    }
}

/// Runs a command line through the platform shell and captures stdout and
/// stderr as the textual result.
fn cmd_shell(args: &str) -> ExecOutcome {
    if args.is_empty() {
        return ExecOutcome::failed("Error: No command specified".to_string());
    }

    let output = if cfg!(windows) {
        std::process::Command::new("cmd").args(["/C", args]).output()
    } else {
        std::process::Command::new("sh").args(["-c", args]).output()
    };

    match output {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            ExecOutcome {
                success: output.status.success(),
                output: text,
                terminate: false,
            }
        }
        Err(err) => ExecOutcome::failed(format!("Error: Failed to spawn shell: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_reports_the_fallback_result() {
        let mut executor = BuiltinExecutor;
        let mut config = AgentConfig::default();

        let outcome = executor.execute("frobnicate", "", &mut config);
        assert!(!outcome.success);
        assert!(!outcome.terminate);
        assert_eq!(outcome.output, "Unknown command: frobnicate");
    }

    #[test]
    fn sleep_rewrites_the_polling_interval() {
        let mut executor = BuiltinExecutor;
        let mut config = AgentConfig::default();

        let outcome = executor.execute("sleep", "60", &mut config);
        assert!(outcome.success);
        assert_eq!(outcome.output, "Sleep interval set to 60 seconds");
        assert_eq!(config.sleep_interval_ms, 60_000);
    }

    #[test]
    fn sleep_rejects_bad_arguments() {
        let mut executor = BuiltinExecutor;
        let mut config = AgentConfig::default();
        let before = config.sleep_interval_ms;

        assert!(!executor.execute("sleep", "", &mut config).success);
        assert!(!executor.execute("sleep", "zero", &mut config).success);
        assert!(!executor.execute("sleep", "0", &mut config).success);
        assert_eq!(config.sleep_interval_ms, before);
    }

    #[test]
    fn exit_requests_termination_without_failing() {
        let mut executor = BuiltinExecutor;
        let mut config = AgentConfig::default();

        let outcome = executor.execute("exit", "", &mut config);
        assert!(outcome.success);
        assert!(outcome.terminate);
    }

    #[cfg(unix)]
    #[test]
    fn shell_captures_command_output() {
        let mut executor = BuiltinExecutor;
        let mut config = AgentConfig::default();

        let outcome = executor.execute("shell", "echo hello", &mut config);
        assert!(outcome.success);
        assert_eq!(outcome.output.trim(), "hello");
    }
}
