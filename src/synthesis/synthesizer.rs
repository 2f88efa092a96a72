// std imports
use std::collections::{HashMap, HashSet};
use std::fs::metadata;
use std::path::{Path, PathBuf};

// 3rd party imports
use anyhow::Result;
use metrics::counter;
use tracing::{debug, error, info, warn};

// internal imports
use super::result_format::ResultFormat;
use crate::constants::{MAX_LOGGED_WARNINGS, MGF_INDEX_CACHE_FILE_NAME, MSGF_INPUT_FILE_SUFFIX};
use crate::io::mgf::index::MgfIndexMap;
use crate::io::mgf::indexer::Indexer;
use crate::io::msgf::synthesized_input::{SynthesizedInputRow, SynthesizedInputWriter};
use crate::io::psm::psm_record::{DataSource, PsmRecord, ResultCode};
use crate::io::psm::reader::ResultRecordReader;
use crate::job::context::JobContext;
use crate::job::errors::synthesis_error::SynthesisError;

/// Synopsis record dropped as duplicate of a kept record.
/// Re-emitted with the score of the kept record after MSGF ran.
///
#[derive(Debug, Clone, PartialEq)]
pub struct SkipRecord {
    pub result_id: u64,
    pub protein: String,
}

/// Switches of the synthesis
///
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesisOptions {
    /// Write all synopsis records regardless of the format's filter
    pub ignore_filters: bool,
    /// Keep precomputed spectral probabilities (MS-GF+ only)
    pub use_cached_scores: bool,
}

/// State of one synthesis run, read by the post-processor afterwards
///
#[derive(Debug)]
pub struct SynthesisSession {
    format: ResultFormat,
    skip_list: HashMap<u64, Vec<SkipRecord>>,
    written_codes: HashMap<ResultCode, u64>,
    synopsis_codes: HashSet<ResultCode>,
    cached_scores: HashMap<u64, String>,
    mgf_index: Option<MgfIndexMap>,
    mgf_lookup_failures: usize,
    duplicate_warnings: usize,
}

impl SynthesisSession {
    pub fn new(format: ResultFormat) -> Self {
        Self {
            format,
            skip_list: HashMap::new(),
            written_codes: HashMap::new(),
            synopsis_codes: HashSet::new(),
            cached_scores: HashMap::new(),
            mgf_index: None,
            mgf_lookup_failures: 0,
            duplicate_warnings: 0,
        }
    }

    pub fn format(&self) -> ResultFormat {
        self.format
    }

    /// Duplicates of the given kept result
    ///
    pub fn skip_records(&self, result_id: u64) -> &[SkipRecord] {
        self.skip_list
            .get(&result_id)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    /// Number of synopsis rows dropped as duplicates
    ///
    pub fn skip_record_count(&self) -> usize {
        self.skip_list.values().map(|records| records.len()).sum()
    }

    /// Result ID written for the given result code
    ///
    pub fn result_id(&self, code: &ResultCode) -> Option<u64> {
        self.written_codes.get(code).copied()
    }

    /// Precomputed spectral probability of a result
    ///
    pub fn cached_score(&self, result_id: u64) -> Option<&str> {
        self.cached_scores.get(&result_id).map(|score| score.as_str())
    }

    /// True if every written result has a precomputed spectral probability
    ///
    pub fn has_complete_cached_scores(&self) -> bool {
        !self.written_codes.is_empty()
            && self
                .written_codes
                .values()
                .all(|result_id| self.cached_scores.contains_key(result_id))
    }

    pub fn mgf_index(&self) -> Option<&MgfIndexMap> {
        self.mgf_index.as_ref()
    }

    pub fn set_mgf_index(&mut self, mgf_index: MgfIndexMap) {
        self.mgf_index = Some(mgf_index);
    }

    pub fn mgf_lookup_failures(&self) -> usize {
        self.mgf_lookup_failures
    }

    /// Resolves the MGF spectrum index of a scan, falling back to the charge-0 entry.
    /// Unresolvable scans return 0 and are counted.
    ///
    fn resolve_mgf_index(&mut self, mgf_index: &MgfIndexMap, scan: u32, charge: u8) -> u32 {
        if let Some(index) = mgf_index.get_index(scan, charge) {
            return index as u32;
        }
        self.mgf_lookup_failures += 1;
        counter!("msgf_runner_mgf_lookup_failures").increment(1);
        if self.mgf_lookup_failures <= MAX_LOGGED_WARNINGS {
            warn!(
                "Scan {} with charge {} not found in the MGF index, using index 0",
                scan, charge
            );
        }
        0
    }
}

/// Creates the MSGF input file from the synopsis and first-hits files of an upstream search
///
pub struct InputFileSynthesizer<'a, R: ResultRecordReader> {
    context: &'a JobContext,
    reader: R,
    options: SynthesisOptions,
}

impl<'a, R: ResultRecordReader> InputFileSynthesizer<'a, R> {
    /// Creates a new synthesizer
    ///
    /// # Arguments
    /// * `context` - Job context
    /// * `reader` - Reader for the upstream result files
    /// * `options` - Synthesis switches
    ///
    pub fn new(context: &'a JobContext, reader: R, options: SynthesisOptions) -> Self {
        Self {
            context,
            reader,
            options,
        }
    }

    /// Writes `<dataset>_MSGF_input.txt` and returns its path and line count, including the header.
    ///
    /// # Arguments
    /// * `session` - Session receiving skip list, cached scores and MGF index
    /// * `synopsis_path` - Synopsis file
    /// * `first_hits_path` - First-hits file, if the format has one
    /// * `mgf_path` - MGF file if the instrument data is MGF packaged
    ///
    pub fn synthesize(
        &self,
        session: &mut SynthesisSession,
        synopsis_path: &Path,
        first_hits_path: Option<&Path>,
        mgf_path: Option<&Path>,
    ) -> Result<(PathBuf, usize), SynthesisError> {
        let synopsis_exists = synopsis_path.is_file();
        let first_hits_exists = first_hits_path.map(|path| path.is_file()).unwrap_or(false);
        if !synopsis_exists && !first_hits_exists {
            return Err(SynthesisError::MissingInputFile(
                synopsis_path.to_path_buf(),
                first_hits_path
                    .map(|path| path.to_path_buf())
                    .unwrap_or_default(),
            ));
        }

        let spectrum_file = match mgf_path {
            Some(mgf_path) => {
                let mgf_index = self.load_mgf_index(mgf_path)?;
                session.set_mgf_index(mgf_index);
                mgf_path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default()
            }
            None => format!("{}_dta.txt", self.context.dataset_name),
        };

        let input_path = self.context.dataset_file(MSGF_INPUT_FILE_SUFFIX);
        let mut writer = SynthesizedInputWriter::create(&input_path)
            .map_err(|err| SynthesisError::WriteError(input_path.clone(), err))?;

        let mut any_success = false;
        if synopsis_exists {
            any_success |= self.process_file(
                session,
                &mut writer,
                synopsis_path,
                DataSource::Synopsis,
                &spectrum_file,
            )?;
        } else {
            warn!(
                "{} Synopsis file `{}` not found",
                self.context.log_prefix(),
                synopsis_path.display()
            );
        }
        if let Some(first_hits_path) = first_hits_path.filter(|_| first_hits_exists) {
            any_success |= self.process_file(
                session,
                &mut writer,
                first_hits_path,
                DataSource::FirstHits,
                &spectrum_file,
            )?;
        }

        let line_count = writer
            .finish()
            .map_err(|err| SynthesisError::WriteError(input_path.clone(), err))?;
        if !any_success {
            return Err(SynthesisError::NoInputProduced);
        }
        info!(
            "{} Wrote {} lines to `{}`, {} duplicates skipped",
            self.context.log_prefix(),
            line_count,
            input_path.display(),
            session.skip_record_count()
        );
        Ok((input_path, line_count))
    }

    /// Returns the index of the MGF file. A cached index in the working directory is
    /// reused if it is not older than the MGF file, otherwise the MGF file is indexed
    /// and the cache rewritten.
    ///
    /// # Arguments
    /// * `mgf_path` - MGF file
    ///
    fn load_mgf_index(&self, mgf_path: &Path) -> Result<MgfIndexMap, SynthesisError> {
        let cache_path = self.context.work_dir.join(MGF_INDEX_CACHE_FILE_NAME);
        if Self::is_fresh_cache(&cache_path, mgf_path) {
            match MgfIndexMap::from_file(&cache_path) {
                Ok(mgf_index) if !mgf_index.is_empty() => {
                    info!(
                        "{} Reusing MGF index `{}` with {} spectra",
                        self.context.log_prefix(),
                        cache_path.display(),
                        mgf_index.len()
                    );
                    return Ok(mgf_index);
                }
                Ok(_) => (),
                Err(err) => warn!(
                    "{} Ignoring unreadable MGF index `{}`: {}",
                    self.context.log_prefix(),
                    cache_path.display(),
                    err
                ),
            }
        }

        let mgf_index = Indexer::create_index(mgf_path)
            .map_err(|err| SynthesisError::MgfIndexError(mgf_path.to_path_buf(), err))?;
        if mgf_index.is_empty() {
            return Err(SynthesisError::NoSpectraFound(mgf_path.to_path_buf()));
        }
        info!(
            "{} Indexed {} spectra in `{}`",
            self.context.log_prefix(),
            mgf_index.len(),
            mgf_path.display()
        );
        mgf_index
            .to_file(&cache_path)
            .map_err(|err| SynthesisError::MgfIndexError(cache_path, err))?;
        Ok(mgf_index)
    }

    /// True if the cache exists and was modified after the MGF file
    ///
    fn is_fresh_cache(cache_path: &Path, mgf_path: &Path) -> bool {
        let modified = |path: &Path| metadata(path).and_then(|meta| meta.modified()).ok();
        match (modified(cache_path), modified(mgf_path)) {
            (Some(cache), Some(mgf)) => cache >= mgf,
            _ => false,
        }
    }

    /// Streams one result file into the writer.
    /// Returns false if the file could not be opened.
    ///
    fn process_file(
        &self,
        session: &mut SynthesisSession,
        writer: &mut SynthesizedInputWriter,
        path: &Path,
        source: DataSource,
        spectrum_file: &str,
    ) -> Result<bool, SynthesisError> {
        let records = match self.reader.open(path, source) {
            Ok(records) => records,
            Err(err) => {
                error!(
                    "{} Unable to open `{}`: {:?}",
                    self.context.log_prefix(),
                    path.display(),
                    err
                );
                return Ok(false);
            }
        };
        let strategy = session.format.strategy();
        let mut written: u64 = 0;
        // first hits are buffered so a repeated result code replaces the earlier row
        let mut first_hits: Vec<SynthesizedInputRow> = Vec::new();
        let mut first_hit_positions: HashMap<ResultCode, usize> = HashMap::new();

        for record in records {
            let record = record.map_err(|err| SynthesisError::ReadError(path.to_path_buf(), err))?;
            let code = record.result_code();
            match source {
                DataSource::Synopsis => {
                    if !self.options.ignore_filters && !strategy.passes_filter(&record) {
                        continue;
                    }
                    if let Some(kept_result_id) = session.result_id(&code) {
                        session
                            .skip_list
                            .entry(kept_result_id)
                            .or_default()
                            .push(SkipRecord {
                                result_id: record.result_id,
                                protein: record.protein.clone(),
                            });
                        continue;
                    }
                    session.synopsis_codes.insert(code.clone());
                }
                DataSource::FirstHits => {
                    if session.synopsis_codes.contains(&code) {
                        continue;
                    }
                    if let Some(replaced_result_id) = session.result_id(&code) {
                        session.duplicate_warnings += 1;
                        counter!("msgf_runner_duplicate_result_codes").increment(1);
                        if session.duplicate_warnings <= MAX_LOGGED_WARNINGS {
                            warn!(
                                "{} Duplicate result code {} in `{}`, result {} replaced by result {}",
                                self.context.log_prefix(),
                                code,
                                path.display(),
                                replaced_result_id,
                                record.result_id
                            );
                        }
                    }
                }
            }

            if self.options.use_cached_scores {
                Self::cache_score(session, &record, strategy.cached_score_columns);
            }
            let scan = match session.mgf_index.take() {
                Some(mgf_index) => {
                    let index = session.resolve_mgf_index(&mgf_index, record.scan, record.charge);
                    session.mgf_index = Some(mgf_index);
                    index
                }
                None => record.scan,
            };
            let row = SynthesizedInputRow {
                spectrum_file: spectrum_file.to_string(),
                title: record.peptide.clone(),
                scan,
                annotation: record.annotated_peptide.clone(),
                charge: record.charge,
                protein: record.protein.clone(),
                result_id: record.result_id,
                source,
                collision_mode: record.collision_mode.clone().unwrap_or_default(),
            };
            session.written_codes.insert(code.clone(), record.result_id);
            match source {
                DataSource::Synopsis => {
                    writer
                        .write_row(&row)
                        .map_err(|err| SynthesisError::WriteError(path.to_path_buf(), err))?;
                    written += 1;
                }
                DataSource::FirstHits => match first_hit_positions.get(&code) {
                    Some(&position) => first_hits[position] = row,
                    None => {
                        first_hit_positions.insert(code, first_hits.len());
                        first_hits.push(row);
                    }
                },
            }
        }

        for row in first_hits.iter() {
            writer
                .write_row(row)
                .map_err(|err| SynthesisError::WriteError(path.to_path_buf(), err))?;
            written += 1;
        }

        counter!("msgf_runner_synthesized_rows", "source" => source.tag()).increment(written);
        debug!(
            "{} {} rows written from `{}`",
            self.context.log_prefix(),
            written,
            path.display()
        );
        Ok(true)
    }

    fn cache_score(session: &mut SynthesisSession, record: &PsmRecord, columns: &[&str]) {
        if let Some(score) = columns.iter().find_map(|column| record.score_str(column)) {
            session
                .cached_scores
                .insert(record.result_id, score.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{write, File};
    use std::time::SystemTime;

    use tracing_test::traced_test;

    use super::*;
    use crate::io::mgf::index::MgfIndexEntry;
    use crate::io::msgf::synthesized_input::read_rows;
    use crate::io::psm::mod_summary::ModificationSymbols;
    use crate::io::psm::reader::PhrpTsvReader;

    const SEQUEST_HEADER: &str =
        "HitNum\tScanNum\tChargeState\tPeptide\tReference\tXCorr\tDelCn\tNumTrypticEnds\n";

    fn sequest_reader() -> PhrpTsvReader {
        PhrpTsvReader::new(
            ResultFormat::Sequest.strategy().columns,
            ModificationSymbols::new(),
        )
    }

    #[test]
    fn test_synthesize_deduplicates_and_merges_first_hits() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synopsis = dir.path().join("QC_syn.txt");
        let first_hits = dir.path().join("QC_fht.txt");
        write(
            &synopsis,
            format!(
                "{}1\t100\t2\tK.PEPTIDEK.A\tProt1\t3.0\t0.1\t2\n\
                 2\t100\t2\tK.PEPTIDEK.A\tProt2\t3.0\t0.1\t2\n\
                 3\t101\t2\tK.LOWSCORE.A\tProt3\t0.5\t0.1\t2\n\
                 4\t102\t3\tK.OTHERPEP.A\tProt4\t3.0\t0.0\t2\n",
                SEQUEST_HEADER
            ),
        )
        .unwrap();
        write(
            &first_hits,
            format!(
                "{}1\t100\t2\tK.PEPTIDEK.A\tProt1\t3.0\t0.1\t2\n\
                 2\t101\t2\tK.LOWSCORE.A\tProt3\t0.5\t0.1\t2\n",
                SEQUEST_HEADER
            ),
        )
        .unwrap();

        let synthesizer =
            InputFileSynthesizer::new(&context, sequest_reader(), SynthesisOptions::default());
        let mut session = SynthesisSession::new(ResultFormat::Sequest);
        let (path, line_count) = synthesizer
            .synthesize(&mut session, &synopsis, Some(&first_hits), None)
            .unwrap();

        assert_eq!(path, dir.path().join("QC_MSGF_input.txt"));
        // header, results 1 and 4 from synopsis, result 2 from first hits
        assert_eq!(line_count, 4);
        let rows = read_rows(&path).unwrap();
        let ids: Vec<(u64, DataSource)> = rows
            .iter()
            .map(|row| (row.result_id, row.source))
            .collect();
        assert_eq!(
            ids,
            vec![
                (1, DataSource::Synopsis),
                (4, DataSource::Synopsis),
                (2, DataSource::FirstHits)
            ]
        );
        assert_eq!(rows[0].spectrum_file, "QC_dta.txt");
        assert_eq!(
            session.skip_records(1),
            &[SkipRecord {
                result_id: 2,
                protein: "Prot2".to_string()
            }]
        );

        // all result codes unique
        let codes: HashSet<ResultCode> = rows.iter().map(|row| row.result_code()).collect();
        assert_eq!(codes.len(), rows.len());
    }

    #[traced_test]
    #[test]
    fn test_repeated_first_hit_replaces_earlier_row() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synopsis = dir.path().join("QC_syn.txt");
        let first_hits = dir.path().join("QC_fht.txt");
        write(&synopsis, SEQUEST_HEADER).unwrap();
        write(
            &first_hits,
            format!(
                "{}5\t103\t2\tK.SAMEPEP.A\tProtOld\t1.0\t0.1\t2\n\
                 6\t104\t2\tK.OTHERPEP.A\tProt6\t1.0\t0.1\t2\n\
                 7\t103\t2\tK.SAMEPEP.A\tProtNew\t1.0\t0.1\t2\n",
                SEQUEST_HEADER
            ),
        )
        .unwrap();

        let synthesizer =
            InputFileSynthesizer::new(&context, sequest_reader(), SynthesisOptions::default());
        let mut session = SynthesisSession::new(ResultFormat::Sequest);
        let (path, line_count) = synthesizer
            .synthesize(&mut session, &synopsis, Some(&first_hits), None)
            .unwrap();

        assert_eq!(line_count, 3);
        let rows = read_rows(&path).unwrap();
        let written: Vec<(u64, &str)> = rows
            .iter()
            .map(|row| (row.result_id, row.protein.as_str()))
            .collect();
        assert_eq!(written, vec![(7, "ProtNew"), (6, "Prot6")]);
        assert_eq!(
            session.result_id(&ResultCode::new(103, 2, "K.SAMEPEP.A")),
            Some(7)
        );
        assert!(logs_contain("result 5 replaced by result 7"));
    }

    #[test]
    fn test_missing_input_files() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synthesizer =
            InputFileSynthesizer::new(&context, sequest_reader(), SynthesisOptions::default());
        let mut session = SynthesisSession::new(ResultFormat::Sequest);
        let result = synthesizer.synthesize(
            &mut session,
            &dir.path().join("QC_syn.txt"),
            Some(&dir.path().join("QC_fht.txt")),
            None,
        );
        assert!(matches!(result, Err(SynthesisError::MissingInputFile(_, _))));
    }

    #[test]
    fn test_unreadable_input_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synopsis = dir.path().join("QC_syn.txt");
        // identity columns missing
        write(&synopsis, "Foo\tBar\n1\t2\n").unwrap();
        let synthesizer =
            InputFileSynthesizer::new(&context, sequest_reader(), SynthesisOptions::default());
        let mut session = SynthesisSession::new(ResultFormat::Sequest);
        let result = synthesizer.synthesize(&mut session, &synopsis, None, None);
        assert!(matches!(result, Err(SynthesisError::NoInputProduced)));
    }

    #[traced_test]
    #[test]
    fn test_mgf_mode_falls_back_to_charge_zero() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synopsis = dir.path().join("QC_syn.txt");
        let mgf = dir.path().join("QC.mgf");
        write(
            &mgf,
            "BEGIN IONS\nSCANS=50\nCHARGE=2+\n100 1\nEND IONS\n\
             BEGIN IONS\nSCANS=100\n100 1\nEND IONS\n",
        )
        .unwrap();
        write(
            &synopsis,
            format!(
                "{}1\t100\t2\tK.PEPTIDEK.A\tProt1\t3.0\t0.1\t2\n\
                 2\t999\t2\tK.NOTFOUND.A\tProt2\t3.0\t0.1\t2\n",
                SEQUEST_HEADER
            ),
        )
        .unwrap();

        let synthesizer =
            InputFileSynthesizer::new(&context, sequest_reader(), SynthesisOptions::default());
        let mut session = SynthesisSession::new(ResultFormat::Sequest);
        let (path, _) = synthesizer
            .synthesize(&mut session, &synopsis, None, Some(&mgf))
            .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[0].scan, 2);
        assert_eq!(rows[0].spectrum_file, "QC.mgf");
        assert_eq!(rows[1].scan, 0);
        assert_eq!(session.mgf_lookup_failures(), 1);
        assert!(dir.path().join(MGF_INDEX_CACHE_FILE_NAME).is_file());
        assert!(logs_contain("not found in the MGF index"));
    }

    /// Stages an MGF file with scan 100 as second spectrum, a synopsis hitting scan 100
    /// and a cached index claiming scan 100 is the seventh spectrum
    ///
    fn stage_mgf_with_cache(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        let synopsis = dir.join("QC_syn.txt");
        let mgf = dir.join("QC.mgf");
        write(
            &mgf,
            "BEGIN IONS\nSCANS=50\nCHARGE=2+\n100 1\nEND IONS\n\
             BEGIN IONS\nSCANS=100\nCHARGE=2+\n100 1\nEND IONS\n",
        )
        .unwrap();
        write(
            &synopsis,
            format!("{}1\t100\t2\tK.PEPTIDEK.A\tProt1\t3.0\t0.1\t2\n", SEQUEST_HEADER),
        )
        .unwrap();
        let cache = dir.join(MGF_INDEX_CACHE_FILE_NAME);
        MgfIndexMap::new(vec![MgfIndexEntry {
            index: 7,
            scan: 100,
            charge: 2,
        }])
        .to_file(&cache)
        .unwrap();
        (synopsis, mgf, cache)
    }

    #[test]
    fn test_fresh_mgf_index_cache_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let (synopsis, mgf, _) = stage_mgf_with_cache(dir.path());

        let synthesizer =
            InputFileSynthesizer::new(&context, sequest_reader(), SynthesisOptions::default());
        let mut session = SynthesisSession::new(ResultFormat::Sequest);
        let (path, _) = synthesizer
            .synthesize(&mut session, &synopsis, None, Some(&mgf))
            .unwrap();
        assert_eq!(read_rows(&path).unwrap()[0].scan, 7);
        assert_eq!(session.mgf_index().unwrap().get_scan(7), Some(100));
    }

    #[test]
    fn test_stale_mgf_index_cache_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let (synopsis, mgf, cache) = stage_mgf_with_cache(dir.path());
        File::options()
            .write(true)
            .open(&cache)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH)
            .unwrap();

        let synthesizer =
            InputFileSynthesizer::new(&context, sequest_reader(), SynthesisOptions::default());
        let mut session = SynthesisSession::new(ResultFormat::Sequest);
        let (path, _) = synthesizer
            .synthesize(&mut session, &synopsis, None, Some(&mgf))
            .unwrap();
        assert_eq!(read_rows(&path).unwrap()[0].scan, 2);
        assert_eq!(MgfIndexMap::from_file(&cache).unwrap().get_scan(2), Some(100));
    }

    #[test]
    fn test_empty_mgf_file() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synopsis = dir.path().join("QC_syn.txt");
        let mgf = dir.path().join("QC.mgf");
        write(&mgf, "").unwrap();
        write(&synopsis, SEQUEST_HEADER).unwrap();
        let synthesizer =
            InputFileSynthesizer::new(&context, sequest_reader(), SynthesisOptions::default());
        let mut session = SynthesisSession::new(ResultFormat::Sequest);
        let result = synthesizer.synthesize(&mut session, &synopsis, None, Some(&mgf));
        assert!(matches!(result, Err(SynthesisError::NoSpectraFound(_))));
    }

    #[test]
    fn test_cached_scores() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synopsis = dir.path().join("QC_msgfplus_syn.txt");
        write(
            &synopsis,
            "ResultID\tScan\tFragMethod\tCharge\tPeptide\tProtein\tMSGFDB_SpecEValue\n\
             1\t100\tCID\t2\tK.PEPTIDE.R\tProt1\t1.5E-12\n\
             2\t101\tETD\t3\tK.SAMPLER.R\tProt2\t2.5E-08\n",
        )
        .unwrap();
        let reader = PhrpTsvReader::new(
            ResultFormat::MsgfPlus.strategy().columns,
            ModificationSymbols::new(),
        );
        let options = SynthesisOptions {
            ignore_filters: false,
            use_cached_scores: true,
        };
        let synthesizer = InputFileSynthesizer::new(&context, reader, options);
        let mut session = SynthesisSession::new(ResultFormat::MsgfPlus);
        let (path, _) = synthesizer
            .synthesize(&mut session, &synopsis, None, None)
            .unwrap();

        assert!(session.has_complete_cached_scores());
        assert_eq!(session.cached_score(2), Some("2.5E-08"));
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[1].collision_mode, "ETD");
    }
}
