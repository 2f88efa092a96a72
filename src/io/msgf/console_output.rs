// std imports
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// 3rd party imports
use anyhow::{Context, Result};

/// Findings of the last lines of a captured console output
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsoleOutputSummary {
    /// First line starting with the tool's version prefix
    pub version: Option<String>,
    /// Last line containing `error`, case-insensitive
    pub last_error: Option<String>,
}

/// Parses the last `tail_lines` lines of a console output file.
///
/// # Arguments
/// * `path` - Path to the console output file
/// * `tail_lines` - Number of lines to inspect from the end of the file
/// * `version_prefix` - Prefix of the version banner, e.g. `MSGF v`
///
pub fn parse_console_output(
    path: &Path,
    tail_lines: usize,
    version_prefix: &str,
) -> Result<ConsoleOutputSummary> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Error when opening `{}`", path.display()))?,
    );
    let mut tail: VecDeque<String> = VecDeque::with_capacity(tail_lines);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        // tools may print non UTF-8 progress characters
        let line = String::from_utf8_lossy(&buffer).trim().to_string();
        if line.is_empty() {
            continue;
        }
        if tail.len() == tail_lines {
            tail.pop_front();
        }
        if tail_lines > 0 {
            tail.push_back(line);
        }
    }

    let version_prefix = version_prefix.to_ascii_lowercase();
    let version = tail
        .iter()
        .find(|line| line.to_ascii_lowercase().starts_with(&version_prefix))
        .cloned();
    let last_error = tail
        .iter()
        .rev()
        .find(|line| line.to_ascii_lowercase().contains("error"))
        .cloned();

    Ok(ConsoleOutputSummary {
        version,
        last_error,
    })
}
