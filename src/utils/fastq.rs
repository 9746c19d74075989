use seq_io::fastq::{Reader, Record};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use flate2::read::MultiGzDecoder;
use crate::config::defs::PipelineError;
use crate::utils::file::is_gzipped;

pub enum FastqReader {
    Uncompressed(BufReader<File>),
    Gzipped(MultiGzDecoder<BufReader<File>>),
}

impl Read for FastqReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FastqReader::Uncompressed(r) => r.read(buf),
            FastqReader::Gzipped(r) => r.read(buf),
        }
    }
}

pub fn fastq_reader<P: AsRef<Path>>(path: P) -> io::Result<Reader<FastqReader>> {
    let file = File::open(&path)?;
    let reader = if is_gzipped(&path)? {
        Reader::new(FastqReader::Gzipped(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Reader::new(FastqReader::Uncompressed(BufReader::new(file)))
    };
    Ok(reader)
}


/// Checks that a FASTQ (plain or gzipped) opens and holds at least one valid record.
///
/// # Returns
/// The id of the first record.
pub fn check_fastq(path: &Path) -> Result<String, PipelineError> {
    let mut reader = fastq_reader(path)
        .map_err(|e| PipelineError::InvalidFastqFormat(format!("{}: {}", path.display(), e)))?;

    match reader.next() {
        Some(Ok(record)) => {
            let id = record
                .id()
                .map_err(|e| PipelineError::InvalidFastqFormat(format!("{}: {}", path.display(), e)))?;
            Ok(id.to_string())
        }
        Some(Err(e)) => Err(PipelineError::InvalidFastqFormat(format!("{}: {}", path.display(), e))),
        None => Err(PipelineError::InvalidFastqFormat(format!("{}: no records", path.display()))),
    }
}
