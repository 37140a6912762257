//! Result file writers
//!
//! Fetched records go to a gzip-compressed file, repair lines to plain text.
//! Both are UTF-8 with one entry per line, in the order given (the store
//! hands them over sorted by identifier).

use crate::output::OutputResult;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes fetched records, one per line, to a gzip file
///
/// Returns the number of records written.
pub fn write_fetched(path: &Path, records: &[(u64, String)]) -> OutputResult<usize> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let written = write_lines(&mut encoder, records)?;
    encoder.finish()?.flush()?;
    Ok(written)
}

/// Writes raw repair lines, one per line, to a plain text file
///
/// The result can be used as input for a later run.
pub fn write_repair(path: &Path, lines: &[(u64, String)]) -> OutputResult<usize> {
    let mut out = BufWriter::new(File::create(path)?);
    let written = write_lines(&mut out, lines)?;
    out.flush()?;
    Ok(written)
}

fn write_lines<W: Write>(out: &mut W, entries: &[(u64, String)]) -> OutputResult<usize> {
    for (_, line) in entries {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    Ok(entries.len())
}
