//! Round-robin token splitter.

use std::io::{self, prelude::*};
use std::path::Path;

use log;

use crate::file;
use crate::sort::SortError;
use crate::token::{write_token, TokenReader};

/// Number of tokens written to each destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitStats {
    pub first: usize,
    pub second: usize,
}

impl SplitStats {
    /// Total number of tokens read from the source.
    pub fn total(&self) -> usize {
        self.first + self.second
    }
}

/// Demultiplexes a token stream into two destinations, alternating after every token
/// and starting with `first`. Relative token order is preserved in both destinations.
pub fn split<R, A, B>(source: R, first: &mut A, second: &mut B) -> io::Result<SplitStats>
where
    R: BufRead,
    A: Write,
    B: Write,
{
    let mut outputs: [&mut dyn Write; 2] = [first, second];
    let mut counts = [0usize; 2];
    let mut active = 0;

    for token in TokenReader::new(source) {
        write_token(&mut *outputs[active], token?)?;
        counts[active] += 1;
        active ^= 1;
    }

    return Ok(SplitStats {
        first: counts[0],
        second: counts[1],
    });
}

/// Splits a token file into two files. Both destinations are created (or truncated)
/// even if the source holds no tokens.
///
/// # Arguments
/// * `source` - File to be split
/// * `first` - Destination receiving the first, third, ... tokens
/// * `second` - Destination receiving the second, fourth, ... tokens
/// * `buf_size` - File read/write buffer size
pub fn split_file(source: &Path, first: &Path, second: &Path, buf_size: Option<usize>) -> Result<SplitStats, SortError> {
    let source_file = file::open(source)?;
    let first_file = file::create(first)?;
    let second_file = file::create(second)?;

    let (reader, mut first_writer, mut second_writer) = match buf_size {
        Some(buf_size) => (
            io::BufReader::with_capacity(buf_size, source_file),
            io::BufWriter::with_capacity(buf_size, first_file),
            io::BufWriter::with_capacity(buf_size, second_file),
        ),
        None => (
            io::BufReader::new(source_file),
            io::BufWriter::new(first_file),
            io::BufWriter::new(second_file),
        ),
    };

    let stats = split(reader, &mut first_writer, &mut second_writer).map_err(SortError::IO)?;
    first_writer.flush().map_err(SortError::IO)?;
    second_writer.flush().map_err(SortError::IO)?;

    log::debug!(
        "split {} into {} ({} tokens) and {} ({} tokens)",
        source.display(),
        first.display(),
        stats.first,
        second.display(),
        stats.second
    );

    return Ok(stats);
}
