use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// One reference sequence reduced to what normalization needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub length: u64,
}

/// Open a file for line reading, decompressing on the fly when it ends with ".gz".
pub fn open_reader<P: AsRef<Path>>(path: P) -> std::io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path)?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Minimal FASTA scan that keeps only identifiers and sequence lengths.
///
/// The identifier is the first whitespace-delimited token of the header.
/// Line breaks inside a sequence do not count towards its length.
pub fn read_fasta_lengths<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<SeqRecord>> {
    let reader = open_reader(path)?;
    fasta_lengths_from(reader)
}

pub(crate) fn fasta_lengths_from<R: BufRead>(mut reader: R) -> std::io::Result<Vec<SeqRecord>> {
    let mut records = Vec::new();
    let mut current: Option<SeqRecord> = None;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let trimmed = line.trim_end();

        if let Some(header) = trimmed.strip_prefix('>') {
            if let Some(done) = current.take() {
                records.push(done);
            }
            let id = header.split_whitespace().next().unwrap_or_default();
            current = Some(SeqRecord {
                id: id.to_string(),
                length: 0,
            });
        } else if let Some(rec) = current.as_mut() {
            // sequence before any header is ignored
            rec.length += trimmed.trim().len() as u64;
        }
    }

    if let Some(done) = current.take() {
        records.push(done);
    }
    Ok(records)
}
