// std imports
use std::collections::HashSet;
use std::fs::{copy, create_dir_all};
use std::path::{Path, PathBuf};

// 3rd party imports
use glob::{glob, Pattern};
use tracing::{error, info, warn};

// internal imports
use crate::functions::sanitize_file_name;
use crate::job::context::JobContext;

/// Working files worth a post-mortem, relative to the working directory
///
pub const FAILED_RESULT_PATTERNS: [&str; 7] = [
    "*_MSGF*.txt",
    "*_Part*.txt",
    "*_ConsoleOutput.txt",
    "*_Command.sh",
    "*_DtaRefineryLog.txt",
    "*_ProteinMods.txt",
    "mgf_index.json",
];

/// Directory receiving the working files of a failed job step
///
/// # Arguments
/// * `failed_results_dir` - Archive root
/// * `context` - Job context
///
pub fn archive_dir(failed_results_dir: &Path, context: &JobContext) -> PathBuf {
    failed_results_dir.join(format!(
        "{}_Job{}_Step{}",
        sanitize_file_name(&context.dataset_name),
        context.job,
        context.step
    ))
}

/// Copies the working files matching the patterns into the archive directory of the job step.
/// Never fails, errors are logged. Returns the number of copied files.
///
/// # Arguments
/// * `context` - Job context
/// * `failed_results_dir` - Archive root
/// * `patterns` - Glob patterns relative to the working directory
///
pub fn archive_failed_results(
    context: &JobContext,
    failed_results_dir: &Path,
    patterns: &[&str],
) -> usize {
    let target_dir = archive_dir(failed_results_dir, context);
    if let Err(err) = create_dir_all(&target_dir) {
        error!(
            "{} Unable to create archive directory `{}`: {}",
            context.log_prefix(),
            target_dir.display(),
            err
        );
        return 0;
    }

    let work_dir = Pattern::escape(&context.work_dir.to_string_lossy());
    let mut copied: HashSet<PathBuf> = HashSet::new();
    for pattern in patterns {
        let paths = match glob(&format!("{}/{}", work_dir, pattern)) {
            Ok(paths) => paths,
            Err(err) => {
                warn!("{} Invalid pattern `{}`: {}", context.log_prefix(), pattern, err);
                continue;
            }
        };
        for path in paths {
            let path = match path {
                Ok(path) => path,
                Err(err) => {
                    warn!("{} {}", context.log_prefix(), err);
                    continue;
                }
            };
            let file_name = match path.file_name() {
                Some(file_name) if path.is_file() => file_name.to_owned(),
                _ => continue,
            };
            if copied.contains(&path) {
                continue;
            }
            match copy(&path, target_dir.join(&file_name)) {
                Ok(_) => {
                    copied.insert(path);
                }
                Err(err) => error!(
                    "{} Unable to archive `{}`: {}",
                    context.log_prefix(),
                    path.display(),
                    err
                ),
            }
        }
    }
    info!(
        "{} Archived {} files to `{}`",
        context.log_prefix(),
        copied.len(),
        target_dir.display()
    );
    copied.len()
}

/// Archives the working files of a failed job step if an archive root is configured.
/// Returns the number of copied files.
///
/// # Arguments
/// * `context` - Job context
/// * `failed_results_dir` - Archive root, nothing is archived if unset
///
pub fn archive_step_failure(context: &JobContext, failed_results_dir: Option<&Path>) -> usize {
    match failed_results_dir {
        Some(failed_results_dir) if context.work_dir.is_dir() => {
            archive_failed_results(context, failed_results_dir, &FAILED_RESULT_PATTERNS)
        }
        Some(_) => 0,
        None => {
            warn!(
                "{} No directory for failed results configured, nothing archived",
                context.log_prefix()
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use super::*;

    #[test]
    fn test_archive_failed_results() {
        let work_dir = tempfile::tempdir().unwrap();
        let failed_dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC Shew", work_dir.path(), 5, 2);
        for name in [
            "QC Shew_MSGF.txt",
            "QC Shew_MSGF_input_Part1.txt",
            "MSGF_ConsoleOutput.txt",
            "QC Shew_syn.txt",
        ] {
            write(work_dir.path().join(name), "x\n").unwrap();
        }

        let copied =
            archive_failed_results(&context, failed_dir.path(), &FAILED_RESULT_PATTERNS);
        // `_MSGF_input_Part1.txt` matches two patterns but is copied once
        assert_eq!(copied, 3);

        let target_dir = failed_dir.path().join("QC_Shew_Job5_Step2");
        assert!(target_dir.join("QC Shew_MSGF.txt").is_file());
        assert!(target_dir.join("MSGF_ConsoleOutput.txt").is_file());
        assert!(!target_dir.join("QC Shew_syn.txt").exists());
    }

    #[test]
    fn test_archive_step_failure_without_root() {
        let work_dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", work_dir.path(), 5, 2);
        write(work_dir.path().join("QC_MSGF.txt"), "x\n").unwrap();
        assert_eq!(archive_step_failure(&context, None), 0);
    }

    #[test]
    fn test_unwritable_archive_is_swallowed() {
        let work_dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", work_dir.path(), 5, 2);
        let blocker = work_dir.path().join("blocker");
        write(&blocker, "file, not a directory").unwrap();
        assert_eq!(
            archive_failed_results(&context, &blocker, &FAILED_RESULT_PATTERNS),
            0
        );
    }
}
