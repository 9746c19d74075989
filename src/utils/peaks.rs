// src/utils/peaks.rs: peak file cleaning for coverage plots
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::config::defs::{PipelineError, HOMER_HEADER_PREFIX, VALID_CHROM_PREFIX};
use crate::utils::file::file_stem_string;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeakFormat {
    /// `#PeakID chr start end strand Normalized ...`
    Homer,
    /// MACS narrowPeak / broadPeak: `chr start end name score ...`
    Macs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanPeak {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub weight: f64,
}


/// HOMER output carries a `#PeakID` header line; anything else is treated as MACS output.
pub fn detect_peak_format(path: &Path) -> Result<PeakFormat, PipelineError> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        if line?.starts_with(HOMER_HEADER_PREFIX) {
            return Ok(PeakFormat::Homer);
        }
    }
    Ok(PeakFormat::Macs)
}


fn parse_peak_line(
    line: &str,
    format: PeakFormat,
    path: &Path,
    line_number: usize,
) -> Result<Option<CleanPeak>, PipelineError> {
    let invalid = |reason: String| PipelineError::InvalidPeakFile {
        path: path.to_path_buf(),
        line: line_number,
        reason,
    };

    let items: Vec<&str> = line.split('\t').map(str::trim).collect();
    let (chrom_idx, weight_idx) = match format {
        PeakFormat::Homer => (1, 5),
        PeakFormat::Macs => (0, 4),
    };
    if items.len() <= weight_idx {
        return Err(invalid(format!("expected at least {} fields, found {}", weight_idx + 1, items.len())));
    }

    let chrom = items[chrom_idx];
    if !chrom.starts_with(VALID_CHROM_PREFIX) {
        return Ok(None);
    }

    let start = items[chrom_idx + 1]
        .parse::<u64>()
        .map_err(|e| invalid(format!("start '{}': {}", items[chrom_idx + 1], e)))?;
    let end = items[chrom_idx + 2]
        .parse::<u64>()
        .map_err(|e| invalid(format!("end '{}': {}", items[chrom_idx + 2], e)))?;
    let weight = items[weight_idx]
        .parse::<f64>()
        .map_err(|e| invalid(format!("weight '{}': {}", items[weight_idx], e)))?;

    Ok(Some(CleanPeak {
        chrom: chrom.to_string(),
        start,
        end,
        weight,
    }))
}


/// Reads a HOMER or MACS peak file, keeps rows on `chr*` chromosomes and
/// sorts them by (chromosome, start). Comment and blank lines are skipped.
pub fn read_clean_peaks(path: &Path) -> Result<Vec<CleanPeak>, PipelineError> {
    let format = detect_peak_format(path)?;
    let reader = BufReader::new(File::open(path)?);

    let mut peaks = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        if let Some(peak) = parse_peak_line(&line, format, path, i + 1)? {
            peaks.push(peak);
        }
    }

    peaks.sort_by(|a, b| a.chrom.cmp(&b.chrom).then(a.start.cmp(&b.start)));
    Ok(peaks)
}


/// Writes `<work_dir>/clean-<stem>.bed` as `chrom start end weight`, no header.
///
/// # Returns
/// The BED path, or None when no row survives the cleaning.
pub fn write_clean_bed(peak_file: &Path, work_dir: &Path) -> Result<Option<PathBuf>, PipelineError> {
    let peaks = read_clean_peaks(peak_file)?;
    if peaks.is_empty() {
        return Ok(None);
    }

    let clean_bed = work_dir.join(format!("clean-{}.bed", file_stem_string(peak_file)));
    let mut writer = BufWriter::new(File::create(&clean_bed)?);
    for peak in &peaks {
        writeln!(writer, "{}\t{}\t{}\t{}", peak.chrom, peak.start, peak.end, peak.weight)?;
    }
    writer.flush()?;
    Ok(Some(clean_bed))
}
