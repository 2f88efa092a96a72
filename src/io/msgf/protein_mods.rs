// std imports
use std::collections::HashMap;
use std::fs::{rename, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

// 3rd party imports
use anyhow::{bail, Context, Result};

// internal imports
use crate::functions::parse_number;

/// Column holding the result ID in the protein modifications file
///
pub const RESULT_ID_COLUMN: &str = "ResultID";

/// Placeholder score column filled with the MSGF spectral probability
///
pub const SPEC_PROB_PLACEHOLDER_COLUMN: &str = "MSGF_SpecProb";

/// Byte ranges of the whitespace separated fields of a line
///
fn field_spans(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (idx, character) in line.char_indices() {
        match (character.is_whitespace(), start) {
            (true, Some(field_start)) => {
                spans.push((field_start, idx));
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => (),
        }
    }
    if let Some(field_start) = start {
        spans.push((field_start, line.len()));
    }
    spans
}

/// Rewrites the score column of a protein modifications file with the resolved
/// spectral probabilities. Columns are separated by whitespace, only the score field
/// is replaced and the separators are kept. Values are only replaced when the resolved
/// value is numeric. Returns the number of rewritten rows.
///
/// # Arguments
/// * `path` - Path to the protein modifications file, replaced in place
/// * `spec_probs` - Resolved spectral probability by result ID
///
pub fn rewrite_protein_mods(path: &Path, spec_probs: &HashMap<u64, String>) -> Result<usize> {
    let tmp_path = path.with_extension("txt.tmp");

    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Error when opening `{}`", path.display()))?,
    );
    let mut writer = BufWriter::new(
        File::create(&tmp_path)
            .with_context(|| format!("Error when creating `{}`", tmp_path.display()))?,
    );

    let mut header = String::new();
    if reader.read_line(&mut header)? == 0 {
        bail!("`{}` is empty", path.display());
    }
    let header_columns: Vec<&str> = header.split_whitespace().collect();
    let find = |name: &str| -> Result<usize> {
        match header_columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
        {
            Some(idx) => Ok(idx),
            None => bail!("Column `{}` not found in `{}`", name, path.display()),
        }
    };
    let result_id_idx = find(RESULT_ID_COLUMN)?;
    let score_idx = find(SPEC_PROB_PLACEHOLDER_COLUMN)?;
    writer.write_all(header.as_bytes())?;
    if !header.ends_with('\n') {
        writer.write_all(b"\n")?;
    }

    let mut rewritten = 0;
    for line in reader.lines() {
        let line = line?;
        let spans = field_spans(&line);
        let spec_prob = spans
            .get(result_id_idx)
            .and_then(|(start, end)| line[*start..*end].parse::<u64>().ok())
            .and_then(|result_id| spec_probs.get(&result_id))
            .filter(|spec_prob| parse_number(spec_prob).is_some());
        match (spec_prob, spans.get(score_idx)) {
            (Some(spec_prob), Some((start, end))) => {
                writer.write_all(line[..*start].as_bytes())?;
                writer.write_all(spec_prob.as_bytes())?;
                writer.write_all(line[*end..].as_bytes())?;
                rewritten += 1;
            }
            _ => writer.write_all(line.as_bytes())?,
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    drop(writer);

    rename(&tmp_path, path).with_context(|| {
        format!(
            "Error when replacing `{}` with `{}`",
            path.display(),
            tmp_path.display()
        )
    })?;
    Ok(rewritten)
}
