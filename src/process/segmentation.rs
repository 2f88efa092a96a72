// std imports
use std::fs::{remove_file, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// 3rd party imports
use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

// internal imports
use crate::constants::SEGMENT_OVERFLOW_MARGIN;

/// One chunk of a segmented MSGF input file
///
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDescriptor {
    /// 1-based segment number
    pub index: usize,
    pub path: PathBuf,
    /// Data rows, header excluded
    pub entry_count: usize,
}

/// Returns the data row counts of the segments for the given input size.
/// A single segment is planned when `entries_per_segment <= 1` or the rows fit into one
/// segment including the overflow margin. Otherwise segments are cut every
/// `entries_per_segment` rows, unless the rows left after a full segment are at most 5% of
/// all rows. These are appended to the final segment instead of starting a new one.
///
/// # Arguments
/// * `data_rows` - Rows of the input file, header excluded
/// * `entries_per_segment` - Nominal rows per segment
///
pub fn plan_segments(data_rows: usize, entries_per_segment: usize) -> Vec<usize> {
    if entries_per_segment <= 1
        || data_rows as f64 <= entries_per_segment as f64 * (1.0 + SEGMENT_OVERFLOW_MARGIN)
    {
        return vec![data_rows];
    }
    let margin = data_rows as f64 * SEGMENT_OVERFLOW_MARGIN;
    let mut sizes = Vec::new();
    let mut remaining = data_rows;
    while remaining > 0 {
        let left_after_cut = remaining.saturating_sub(entries_per_segment);
        if left_after_cut as f64 <= margin {
            sizes.push(remaining);
            break;
        }
        sizes.push(entries_per_segment);
        remaining = left_after_cut;
    }
    sizes
}

/// Reads one line including its line break, false at the end of the file
///
fn read_raw_line<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<bool> {
    buffer.clear();
    Ok(reader.read_until(b'\n', buffer)? > 0)
}

/// Splits the input file into `<stem>_Part<N>.txt` files next to it, each starting with the header.
/// Data lines are copied byte for byte.
///
/// # Arguments
/// * `input_path` - Input file with header
/// * `segment_sizes` - Data rows per segment, see [plan_segments]
///
pub fn split(input_path: &Path, segment_sizes: &[usize]) -> Result<Vec<SegmentDescriptor>> {
    let mut reader = BufReader::new(
        File::open(input_path)
            .with_context(|| format!("Error when opening `{}`", input_path.display()))?,
    );
    let mut header = Vec::new();
    if !read_raw_line(&mut reader, &mut header)? {
        bail!("`{}` has no header", input_path.display());
    }
    if !header.ends_with(b"\n") {
        header.push(b'\n');
    }

    let stem = input_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let dir = input_path.parent().unwrap_or_else(|| Path::new("."));

    let mut descriptors = Vec::with_capacity(segment_sizes.len());
    let mut line = Vec::new();
    for (idx, size) in segment_sizes.iter().enumerate() {
        let path = dir.join(format!("{}_Part{}.txt", stem, idx + 1));
        let mut writer = BufWriter::new(
            File::create(&path)
                .with_context(|| format!("Error when creating `{}`", path.display()))?,
        );
        writer.write_all(&header)?;
        let mut entry_count = 0;
        while entry_count < *size && read_raw_line(&mut reader, &mut line)? {
            writer.write_all(&line)?;
            entry_count += 1;
        }
        writer.flush()?;
        debug!("Wrote {} entries to `{}`", entry_count, path.display());
        descriptors.push(SegmentDescriptor {
            index: idx + 1,
            path,
            entry_count,
        });
    }
    if read_raw_line(&mut reader, &mut line)? {
        bail!(
            "`{}` has more rows than planned for its segments",
            input_path.display()
        );
    }
    Ok(descriptors)
}

/// Concatenates result files in order. The header of the first file is written only
/// if `write_header` is set, headers of all other files are skipped.
/// Appends if the target exists. Returns the number of data rows appended.
///
/// # Arguments
/// * `sources` - Result files in segment order
/// * `target` - Combined result file
/// * `write_header` - Write the header of the first source
///
pub fn combine(sources: &[PathBuf], target: &Path, write_header: bool) -> Result<usize> {
    let mut writer = BufWriter::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(target)
            .with_context(|| format!("Error when opening `{}`", target.display()))?,
    );
    let mut rows = 0;
    let mut line = Vec::new();
    for (idx, source) in sources.iter().enumerate() {
        let mut reader = BufReader::new(
            File::open(source)
                .with_context(|| format!("Error when opening `{}`", source.display()))?,
        );
        if !read_raw_line(&mut reader, &mut line)? {
            warn!("`{}` is empty", source.display());
            continue;
        }
        if idx == 0 && write_header {
            write_line(&mut writer, &line)?;
        }
        while read_raw_line(&mut reader, &mut line)? {
            write_line(&mut writer, &line)?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}

/// Writes a line, adding the line break if the source's last line had none
///
fn write_line<W: Write>(writer: &mut W, line: &[u8]) -> Result<()> {
    writer.write_all(line)?;
    if !line.ends_with(b"\n") {
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Removes the given files, failures are logged only
///
pub fn remove_files<'a, I>(paths: I)
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    for path in paths {
        if path.exists() {
            if let Err(err) = remove_file(path) {
                warn!("Unable to remove `{}`: {}", path.display(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{read, read_to_string, write};

    use super::*;

    fn input(rows: usize) -> String {
        let mut content = "#SpectrumFile\tTitle\tScan#\n".to_string();
        for row in 0..rows {
            content.push_str(&format!("QC_dta.txt\tK.PEP{}.R\t{}\n", row, row + 1));
        }
        content
    }

    #[test]
    fn test_plan_segments() {
        assert_eq!(plan_segments(103, 100), vec![103]);
        assert_eq!(plan_segments(105, 100), vec![105]);
        assert_eq!(plan_segments(205, 100), vec![100, 105]);
        assert_eq!(plan_segments(206, 100), vec![100, 106]);
        assert_eq!(plan_segments(210, 100), vec![100, 110]);
        assert_eq!(plan_segments(211, 100), vec![100, 100, 11]);
        assert_eq!(plan_segments(300, 100), vec![100, 100, 100]);
        assert_eq!(plan_segments(5000, 1), vec![5000]);
        assert_eq!(plan_segments(0, 100), vec![0]);
    }

    #[test]
    fn test_split_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("QC_MSGF_input.txt");
        let content = input(205);
        write(&path, &content).unwrap();

        let descriptors = split(&path, &plan_segments(205, 100)).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].path, dir.path().join("QC_MSGF_input_Part1.txt"));
        assert_eq!(descriptors[1].entry_count, 105);

        // concatenation without the per segment headers reproduces the input
        let mut rebuilt = Vec::new();
        for (idx, descriptor) in descriptors.iter().enumerate() {
            let segment = read(&descriptor.path).unwrap();
            let header_end = segment.iter().position(|b| *b == b'\n').unwrap() + 1;
            if idx == 0 {
                rebuilt.extend_from_slice(&segment);
            } else {
                rebuilt.extend_from_slice(&segment[header_end..]);
            }
        }
        assert_eq!(rebuilt, content.as_bytes());
    }

    #[test]
    fn test_combine() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("out_Part1.txt");
        let second = dir.path().join("out_Part2.txt");
        let target = dir.path().join("out.txt");
        write(&first, "A\tB\n1\t2\n").unwrap();
        write(&second, "A\tB\n3\t4").unwrap();

        assert_eq!(combine(&[first.clone(), second.clone()], &target, true).unwrap(), 2);
        assert_eq!(read_to_string(&target).unwrap(), "A\tB\n1\t2\n3\t4\n");

        // appending a second bucket skips its header
        assert_eq!(combine(&[first.clone()], &target, false).unwrap(), 1);
        assert_eq!(read_to_string(&target).unwrap(), "A\tB\n1\t2\n3\t4\n1\t2\n");

        remove_files(&[first.clone(), second.clone()]);
        assert!(!first.exists() && !second.exists());
    }
}
