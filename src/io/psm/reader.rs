// std imports
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

// 3rd party imports
use anyhow::{bail, Context, Result};
use csv::StringRecord;

// internal imports
use super::mod_summary::ModificationSymbols;
use super::psm_record::{DataSource, PsmRecord};
use crate::constants::TSV_SEPARATOR;

/// Names of the columns holding the identity of a PSM in a result file.
/// All other columns are exposed as named scores.
///
#[derive(Debug, Clone, Copy)]
pub struct PsmColumnMap {
    pub result_id: &'static str,
    pub scan: &'static str,
    pub charge: &'static str,
    pub peptide: &'static str,
    pub protein: &'static str,
    pub collision_mode: Option<&'static str>,
}

/// Source of PSMs. Each call of `open` starts a new pass over the file.
///
pub trait ResultRecordReader {
    type Records: Iterator<Item = Result<PsmRecord>>;

    /// Opens the given result file
    ///
    /// # Arguments
    /// * `path` - Path to the result file
    /// * `source` - Tier of the result file
    ///
    fn open(&self, path: &Path, source: DataSource) -> Result<Self::Records>;
}

/// Reader for the tab delimited synopsis and first-hits files written by PHRP
///
#[derive(Debug, Clone)]
pub struct PhrpTsvReader {
    columns: PsmColumnMap,
    modifications: ModificationSymbols,
}

impl PhrpTsvReader {
    /// Creates a new reader
    ///
    /// # Arguments
    /// * `columns` - Identity columns of the result format
    /// * `modifications` - Dynamic modification symbols used to annotate peptides
    ///
    pub fn new(columns: PsmColumnMap, modifications: ModificationSymbols) -> Self {
        Self {
            columns,
            modifications,
        }
    }
}

impl ResultRecordReader for PhrpTsvReader {
    type Records = PhrpTsvRecords;

    fn open(&self, path: &Path, source: DataSource) -> Result<PhrpTsvRecords> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(TSV_SEPARATOR)
            .flexible(true)
            .quoting(false)
            .from_path(path)
            .with_context(|| format!("Error when opening `{}`", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("Error when reading header of `{}`", path.display()))?
            .clone();
        let header_index = HeaderIndex::new(&headers, &self.columns)
            .with_context(|| format!("Unexpected header in `{}`", path.display()))?;

        Ok(PhrpTsvRecords {
            records: reader.into_records(),
            headers,
            header_index,
            modifications: self.modifications.clone(),
            source,
        })
    }
}

/// Positions of the identity columns
///
#[derive(Debug, Clone)]
struct HeaderIndex {
    result_id: usize,
    scan: usize,
    charge: usize,
    peptide: usize,
    protein: usize,
    collision_mode: Option<usize>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord, columns: &PsmColumnMap) -> Result<Self> {
        let by_name: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_ascii_lowercase(), idx))
            .collect();
        let find = |name: &str| -> Result<usize> {
            match by_name.get(&name.to_ascii_lowercase()) {
                Some(idx) => Ok(*idx),
                None => bail!("Column `{}` not found", name),
            }
        };
        Ok(Self {
            result_id: find(columns.result_id)?,
            scan: find(columns.scan)?,
            charge: find(columns.charge)?,
            peptide: find(columns.peptide)?,
            protein: find(columns.protein)?,
            collision_mode: columns
                .collision_mode
                .and_then(|name| by_name.get(&name.to_ascii_lowercase()).copied()),
        })
    }

    fn is_identity(&self, idx: usize) -> bool {
        idx == self.result_id
            || idx == self.scan
            || idx == self.charge
            || idx == self.peptide
            || idx == self.protein
    }
}

/// Lazy sequence of PSMs of one pass over a PHRP file
///
pub struct PhrpTsvRecords {
    records: csv::StringRecordsIntoIter<File>,
    headers: StringRecord,
    header_index: HeaderIndex,
    modifications: ModificationSymbols,
    source: DataSource,
}

impl PhrpTsvRecords {
    fn parse(&self, record: &StringRecord) -> Result<PsmRecord> {
        let field = |idx: usize| record.get(idx).unwrap_or_default().trim();

        let result_id: u64 = field(self.header_index.result_id)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid result ID `{}`",
                    field(self.header_index.result_id)
                )
            })?;
        let scan: u32 = field(self.header_index.scan).parse().with_context(|| {
            format!(
                "Invalid scan `{}` (result {})",
                field(self.header_index.scan),
                result_id
            )
        })?;
        let charge: u8 = field(self.header_index.charge).parse().with_context(|| {
            format!(
                "Invalid charge `{}` (result {})",
                field(self.header_index.charge),
                result_id
            )
        })?;
        let peptide = field(self.header_index.peptide).to_string();

        let scores = self
            .headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.header_index.is_identity(*idx))
            .map(|(idx, name)| (name.trim().to_string(), field(idx).to_string()))
            .collect();

        Ok(PsmRecord {
            scan,
            charge,
            annotated_peptide: self.modifications.annotate(&peptide),
            peptide,
            protein: field(self.header_index.protein).to_string(),
            result_id,
            collision_mode: self
                .header_index
                .collision_mode
                .map(|idx| field(idx).to_string())
                .filter(|mode| !mode.is_empty()),
            scores,
            source: self.source,
        })
    }
}

impl Iterator for PhrpTsvRecords {
    type Item = Result<PsmRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => return Some(Err(err.into())),
            };
            // skip blank lines
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            return Some(self.parse(&record));
        }
    }
}
