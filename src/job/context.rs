use std::path::{Path, PathBuf};

/// Identity of the job step being processed. Owned by the host and only read by the runner.
///
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct JobContext {
    /// Dataset name, used as base name of all files
    pub dataset_name: String,
    /// Working directory containing the staged input and receiving all results
    pub work_dir: PathBuf,
    /// Job number
    pub job: u32,
    /// Step number
    pub step: u32,
    /// Debug level, values above 1 keep intermediate files
    #[serde(default)]
    pub debug_level: u8,
}

impl JobContext {
    /// Create a new job context
    ///
    /// # Arguments
    /// * `dataset_name` - Dataset name
    /// * `work_dir` - Working directory
    /// * `job` - Job number
    /// * `step` - Step number
    ///
    pub fn new(dataset_name: &str, work_dir: &Path, job: u32, step: u32) -> Self {
        Self {
            dataset_name: dataset_name.to_string(),
            work_dir: work_dir.to_path_buf(),
            job,
            step,
            debug_level: 0,
        }
    }

    /// Returns the path of a file in the working directory named `<dataset><suffix>`
    ///
    /// # Arguments
    /// * `suffix` - Suffix appended to the dataset name
    ///
    pub fn dataset_file(&self, suffix: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}{}", self.dataset_name, suffix))
    }

    /// Prefix for log messages, e.g. `[QC_Shew_01 / job 1234]`
    ///
    pub fn log_prefix(&self) -> String {
        format!("[{} / job {}]", self.dataset_name, self.job)
    }
}
