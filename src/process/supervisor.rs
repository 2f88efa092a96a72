// std imports
use std::fs::{write, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

// 3rd party imports
use sysinfo::{Pid, ProcessRefreshKind, System};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

// internal imports
use crate::constants::{COMMAND_SCRIPT_SUFFIX, CONSOLE_OUTPUT_SUFFIX};
use crate::io::msgf::console_output::{parse_console_output, ConsoleOutputSummary};
use crate::job::errors::process_error::ProcessError;

/// Shell running the command scripts
///
const SHELL: &str = "sh";

/// Resource usage of a running tool, handed to the polling callback
///
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    /// Time since launch
    pub elapsed: Duration,
    pub pid: Option<u32>,
    /// CPU usage in percent of one core, 0 on the first sample
    pub cpu_usage: f32,
    /// Resident memory in MB
    pub memory_mb: f64,
}

/// Result of a finished tool run
///
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// True if the tool exited with code 0
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Version and last error line from the console output
    pub console: ConsoleOutputSummary,
    /// Captured stdout and stderr
    pub console_output_path: PathBuf,
}

/// Launches an external tool through a generated command script, captures its console output
/// and calls back on a fixed interval until the tool exits.
/// There is no cancellation, a hung tool blocks until the host kills the step.
///
pub struct ExternalProcessSupervisor {
    poll_interval: Duration,
    console_tail_lines: usize,
    version_prefix: String,
}

impl ExternalProcessSupervisor {
    /// Creates a new supervisor
    ///
    /// # Arguments
    /// * `poll_interval` - Time between two callbacks
    /// * `console_tail_lines` - Number of console output lines inspected after exit
    /// * `version_prefix` - Prefix of the tool's version banner
    ///
    pub fn new(poll_interval: Duration, console_tail_lines: usize, version_prefix: &str) -> Self {
        Self {
            poll_interval,
            console_tail_lines,
            version_prefix: version_prefix.to_string(),
        }
    }

    /// Runs the tool to completion.
    /// Writes the command line to `<tool_name>_Command.sh` in the working directory and runs
    /// that script, which replaces itself with the tool. Stdout and stderr are captured in
    /// `<tool_name>_ConsoleOutput.txt`.
    ///
    /// # Arguments
    /// * `tool_name` - Name used for the script and console files and in log messages
    /// * `executable` - Executable
    /// * `arguments` - Arguments
    /// * `work_dir` - Working directory of the tool
    /// * `callback` - Called every poll interval while the tool runs
    ///
    pub async fn launch<F>(
        &self,
        tool_name: &str,
        executable: &Path,
        arguments: &[String],
        work_dir: &Path,
        mut callback: F,
    ) -> Result<ProcessOutcome, ProcessError>
    where
        F: FnMut(&ProcessSample),
    {
        // bare names are resolved via PATH, other relative paths against the working directory
        if executable.components().count() > 1 && !work_dir.join(executable).is_file() {
            return Err(ProcessError::LaunchError(
                executable.to_path_buf(),
                std::io::Error::new(ErrorKind::NotFound, "executable not found"),
            ));
        }

        let script_name = format!("{}{}", tool_name, COMMAND_SCRIPT_SUFFIX);
        let script_path = work_dir.join(&script_name);
        let command_line = Self::command_line(executable, arguments);
        write(&script_path, format!("#!/bin/sh\nexec {}\n", command_line))
            .map_err(|err| ProcessError::LaunchError(script_path.clone(), err))?;
        debug!("{}", command_line);

        let console_output_path = work_dir.join(format!("{}{}", tool_name, CONSOLE_OUTPUT_SUFFIX));
        let stdout = File::create(&console_output_path)
            .map_err(|err| ProcessError::ConsoleOutputError(console_output_path.clone(), err))?;
        let stderr = stdout
            .try_clone()
            .map_err(|err| ProcessError::ConsoleOutputError(console_output_path.clone(), err))?;

        let mut child = Command::new(SHELL)
            .arg(&script_name)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(false)
            .spawn()
            .map_err(|err| ProcessError::LaunchError(executable.to_path_buf(), err))?;

        let pid = child.id();
        info!("{} started (pid {:?})", tool_name, pid);

        let start = Instant::now();
        let mut system = System::new();
        let status = loop {
            // `Child::wait` is cancel safe, the timeout only interrupts the wait
            match timeout(self.poll_interval, child.wait()).await {
                Ok(status) => {
                    break status
                        .map_err(|err| ProcessError::WaitError(executable.to_path_buf(), err))?
                }
                Err(_) => {
                    let sample = Self::sample(&mut system, pid, start.elapsed());
                    callback(&sample);
                }
            }
        };

        let console = match parse_console_output(
            &console_output_path,
            self.console_tail_lines,
            &self.version_prefix,
        ) {
            Ok(console) => console,
            Err(err) => {
                warn!("Unable to parse console output of {}: {:?}", tool_name, err);
                ConsoleOutputSummary::default()
            }
        };
        if let Some(version) = console.version.as_ref() {
            info!("{} version: {}", tool_name, version);
        }

        let outcome = ProcessOutcome {
            success: status.success(),
            exit_code: status.code(),
            console,
            console_output_path,
        };
        if outcome.success {
            info!("{} finished after {:.1}s", tool_name, start.elapsed().as_secs_f64());
        } else {
            error!(
                "{} exited with {:?}, last error line: {}",
                tool_name,
                outcome.exit_code,
                outcome.console.last_error.as_deref().unwrap_or("-")
            );
        }
        Ok(outcome)
    }

    /// Samples CPU and memory usage of the child
    ///
    fn sample(system: &mut System, pid: Option<u32>, elapsed: Duration) -> ProcessSample {
        let mut sample = ProcessSample {
            elapsed,
            pid,
            cpu_usage: 0.0,
            memory_mb: 0.0,
        };
        if let Some(pid) = pid {
            let sys_pid = Pid::from_u32(pid);
            system.refresh_pids_specifics(&[sys_pid], ProcessRefreshKind::everything());
            if let Some(process) = system.process(sys_pid) {
                sample.cpu_usage = process.cpu_usage();
                sample.memory_mb = process.memory() as f64 / 1024.0 / 1024.0;
            }
        }
        sample
    }

    /// Shell representation of the command, arguments with whitespace or quotes are single quoted
    ///
    pub fn command_line(executable: &Path, arguments: &[String]) -> String {
        let mut command_line = Self::quote(&executable.to_string_lossy());
        for argument in arguments {
            command_line.push(' ');
            command_line.push_str(&Self::quote(argument));
        }
        command_line
    }

    fn quote(value: &str) -> String {
        if !value.is_empty()
            && !value
                .chars()
                .any(|c| c.is_whitespace() || c == '\'' || c == '"' || c == '$' || c == '\\')
        {
            return value.to_string();
        }
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
