// std imports
use std::path::Path;

// 3rd party imports
use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use tracing::info;

// internal imports
use crate::constants::{SPEC_PROB_COLUMN, SYNTHESIZED_INPUT_HEADER, TSV_SEPARATOR};
use crate::io::msgf::synthesized_input::read_rows;
use crate::synthesis::synthesizer::SynthesisSession;

/// Note written instead of a score if a row has no precomputed spectral probability
///
pub const MISSING_CACHED_SCORE_NOTE: &str = "N/A: no precomputed spectral probability";

/// Writes an MSGF-like result file from the synthesized input and the precomputed
/// spectral probabilities of the session, so MSGF does not need to run.
/// Returns the number of data rows.
///
/// # Arguments
/// * `session` - Synthesis session holding the cached scores
/// * `synthesized_input` - Synthesized input file
/// * `output_path` - Result file to write
///
pub fn render_cached_scores(
    session: &SynthesisSession,
    synthesized_input: &Path,
    output_path: &Path,
) -> Result<usize> {
    let rows = read_rows(synthesized_input)?;
    let mut writer = WriterBuilder::new()
        .delimiter(TSV_SEPARATOR)
        .quote_style(QuoteStyle::Never)
        .from_path(output_path)
        .with_context(|| format!("Error when creating `{}`", output_path.display()))?;

    let mut header: Vec<&str> = SYNTHESIZED_INPUT_HEADER.to_vec();
    header.push(SPEC_PROB_COLUMN);
    writer.write_record(&header)?;

    for row in rows.iter() {
        writer.write_record([
            row.spectrum_file.as_str(),
            row.title.as_str(),
            &row.scan.to_string(),
            row.annotation.as_str(),
            &row.charge.to_string(),
            row.protein.as_str(),
            &row.result_id.to_string(),
            row.source.tag(),
            row.collision_mode.as_str(),
            session
                .cached_score(row.result_id)
                .unwrap_or(MISSING_CACHED_SCORE_NOTE),
        ])?;
    }
    writer.flush()?;
    info!(
        "Rendered {} precomputed spectral probabilities into `{}`",
        rows.len(),
        output_path.display()
    );
    Ok(rows.len())
}
