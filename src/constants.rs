/// Separator of all tab delimited files read and written by the runner
///
pub const TSV_SEPARATOR: u8 = b'\t';

/// Tag written into the `Data_Source` column for synopsis rows
///
pub const SYNOPSIS_SOURCE_TAG: &'static str = "Syn";

/// Tag written into the `Data_Source` column for first-hits rows
///
pub const FIRST_HITS_SOURCE_TAG: &'static str = "FHT";

/// Header of the synthesized MSGF input file
///
pub const SYNTHESIZED_INPUT_HEADER: [&'static str; 9] = [
    "#SpectrumFile",
    "Title",
    "Scan#",
    "Annotation",
    "Charge",
    "Protein_First",
    "Result_ID",
    "Data_Source",
    "Collision_Mode",
];

/// Column of the raw tool output holding the spectral probability
///
pub const SPEC_PROB_COLUMN: &'static str = "SpecProb";

/// Header of the normalized MSGF result file
///
pub const NORMALIZED_RESULT_HEADER: [&'static str; 7] = [
    "Result_ID",
    "Scan",
    "Charge",
    "Protein",
    "Peptide",
    "SpecProb",
    "Notes",
];

/// Score written when the tool did not report a numeric spectral probability
///
pub const SENTINEL_SPEC_PROB: &'static str = "1";

/// Rows left after a full segment are appended to it instead of starting a new segment
/// if they are at most this fraction of all rows. Input with at most this fraction above
/// the nominal segment size is not segmented.
///
pub const SEGMENT_OVERFLOW_MARGIN: f64 = 0.05;

/// Fraction of rows with a precursor mass diagnostic above which the run failed
///
pub const MAX_PRECURSOR_MASS_ERROR_FRACTION: f64 = 0.1;

/// Fraction of rows with an unresolvable MGF index above which the run failed
///
pub const MAX_MGF_LOOKUP_FAILURE_FRACTION: f64 = 0.1;

/// Number of repeated per-row warnings written to the log before they are only counted
///
pub const MAX_LOGGED_WARNINGS: usize = 10;

/// Minimum number of seconds between two line counts of an in-progress output file
///
pub const MIN_PROGRESS_LINE_COUNT_INTERVAL: u64 = 20;

/// Fragmentation mode code passed to MSGF for CID/HCD or as written in the input
///
pub const FRAGMENTATION_MODE_AS_WRITTEN: u8 = 0;

/// Fragmentation mode code passed to MSGF for ETD spectra
///
pub const FRAGMENTATION_MODE_ETD: u8 = 1;

/// Suffix of the synthesized input file
///
pub const MSGF_INPUT_FILE_SUFFIX: &'static str = "_MSGF_input.txt";

/// Suffix of the MSGF result file
///
pub const MSGF_RESULT_FILE_SUFFIX: &'static str = "_MSGF.txt";

/// Suffix of the normalized first-hits MSGF result file
///
pub const MSGF_FIRST_HITS_RESULT_FILE_SUFFIX: &'static str = "_fht_MSGF.txt";

/// Suffix of the console output capture file
///
pub const CONSOLE_OUTPUT_SUFFIX: &'static str = "_ConsoleOutput.txt";

/// Suffix of the generated command script
///
pub const COMMAND_SCRIPT_SUFFIX: &'static str = "_Command.sh";

/// File name of the cached MGF index
///
pub const MGF_INDEX_CACHE_FILE_NAME: &'static str = "mgf_index.json";
