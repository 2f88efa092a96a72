use std::collections::HashMap;

use crate::job::errors::step_error::StepError;

/// Result type of the upstream search, e.g. `Sequest` or `MSGFPlus`
pub const RESULT_TYPE: &str = "ResultType";
/// Parameter file of the upstream search
pub const PARAM_FILE_NAME: &str = "ParamFileName";
/// Number of input rows per MSGF invocation
pub const MSGF_ENTRIES_PER_SEGMENT: &str = "MSGFEntriesPerSegment";
/// Instrument data is packaged as MGF, scan numbers in the MSGF input are MGF indices
pub const MGF_INSTRUMENT_DATA: &str = "MGFInstrumentData";
/// Java heap size in MB
pub const MSGF_JAVA_MEMORY_SIZE: &str = "MSGFJavaMemorySize";
/// Pass every synopsis row to MSGF, ignoring the per-format filters
pub const MSGF_IGNORE_FILTERS: &str = "MSGFIgnoreFilters";
/// Keep the synthesized input and segment files
pub const KEEP_MSGF_INPUT_FILES: &str = "KeepMSGFInputFiles";
/// Enzyme code passed to MSGF
pub const MSGF_ENZYME: &str = "MSGFEnzyme";
/// Render MS-GF+ results from their precomputed spectral probabilities instead of running MSGF
pub const MSGF_USE_CACHED_SCORES: &str = "MSGFUseCachedScores";
/// Submit the run summary to the database
pub const MSGF_POST_RESULTS_TO_DB: &str = "MSGFPostResultsToDB";
/// Dataset ID, looked up in the database if not given
pub const DATASET_ID: &str = "DatasetID";
/// FASTA file used by DTA-Refinery
pub const GENERATED_FASTA_NAME: &str = "GeneratedFastaName";
/// Submit DTA-Refinery mass error statistics to the database
pub const DTA_REFINERY_POST_RESULTS_TO_DB: &str = "DTARefineryPostResultsToDB";

/// Default number of rows per MSGF invocation
pub const DEFAULT_ENTRIES_PER_SEGMENT: i64 = 25_000;
/// Default Java heap size in MB
pub const DEFAULT_JAVA_MEMORY_SIZE: i64 = 2_000;
/// Default enzyme (trypsin)
pub const DEFAULT_ENZYME: i64 = 1;

/// Job parameters as handed over by the host: an opaque map of named strings
/// with typed lookups.
///
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct JobParameters {
    values: HashMap<String, String>,
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, overwriting an existing value
    ///
    /// # Arguments
    /// * `name` - Parameter name
    /// * `value` - Parameter value
    ///
    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    /// Returns the parameter as string, if set and not empty
    ///
    /// # Arguments
    /// * `name` - Parameter name
    ///
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Returns the parameter as string or fails if it is not set
    ///
    /// # Arguments
    /// * `name` - Parameter name
    ///
    pub fn require_str(&self, name: &'static str) -> Result<&str, StepError> {
        self.get_str(name).ok_or(StepError::MissingParameter(name))
    }

    /// Returns the parameter as bool. Accepts `true`/`false`, `yes`/`no` and `1`/`0`.
    /// Unset or unparsable values yield the default.
    ///
    /// # Arguments
    /// * `name` - Parameter name
    /// * `default` - Default value
    ///
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.get_str(name).map(|value| value.to_ascii_lowercase()) {
            Some(value) => match value.as_str() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                _ => default,
            },
            None => default,
        }
    }

    /// Returns the parameter as integer. Unset or unparsable values yield the default.
    ///
    /// # Arguments
    /// * `name` - Parameter name
    /// * `default` - Default value
    ///
    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        self.get_str(name)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(default)
    }

    /// Dataset ID, if given as positive number
    ///
    pub fn dataset_id(&self) -> Option<i32> {
        i32::try_from(self.get_int(DATASET_ID, 0))
            .ok()
            .filter(|dataset_id| *dataset_id > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookups() {
        let mut params = JobParameters::new();
        params.set(MGF_INSTRUMENT_DATA, "True");
        params.set(MSGF_ENTRIES_PER_SEGMENT, " 500 ");
        params.set(MSGF_JAVA_MEMORY_SIZE, "lots");
        params.set(RESULT_TYPE, "");

        assert!(params.get_bool(MGF_INSTRUMENT_DATA, false));
        assert!(!params.get_bool(KEEP_MSGF_INPUT_FILES, false));
        assert_eq!(params.get_int(MSGF_ENTRIES_PER_SEGMENT, 1), 500);
        assert_eq!(
            params.get_int(MSGF_JAVA_MEMORY_SIZE, DEFAULT_JAVA_MEMORY_SIZE),
            DEFAULT_JAVA_MEMORY_SIZE
        );
        assert!(params.get_str(RESULT_TYPE).is_none());
        assert!(params.dataset_id().is_none());
        params.set(DATASET_ID, "2718");
        assert_eq!(params.dataset_id(), Some(2718));
        assert!(matches!(
            params.require_str(RESULT_TYPE),
            Err(StepError::MissingParameter(RESULT_TYPE))
        ));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let params: JobParameters = toml::from_str(
            r#"
            ResultType = "Sequest"
            MSGFEntriesPerSegment = "100"
            "#,
        )
        .unwrap();
        assert_eq!(params.get_str(RESULT_TYPE), Some("Sequest"));
        assert_eq!(params.get_int(MSGF_ENTRIES_PER_SEGMENT, 0), 100);
    }
}
