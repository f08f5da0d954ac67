//! Token counter.

use std::io::{self, prelude::*};
use std::path::Path;

use log;

use crate::file;
use crate::sort::SortError;
use crate::token::TokenReader;

/// Counts tokens in an already opened stream.
pub fn count_stream<R: BufRead>(reader: R) -> io::Result<usize> {
    let mut tokens = TokenReader::new(reader);
    let mut count = 0;
    while tokens.next_token()?.is_some() {
        count += 1;
    }

    return Ok(count);
}

/// Counts tokens across all the files. Files are processed in the given order
/// as a single logical stream.
///
/// # Arguments
/// * `paths` - Files to be counted
/// * `buf_size` - File read buffer size. If the parameter is [`None`] the default buffer size is used.
pub fn count_tokens<P: AsRef<Path>>(paths: &[P], buf_size: Option<usize>) -> Result<usize, SortError> {
    let mut total = 0;

    for path in paths {
        let path = path.as_ref();
        let source = file::open(path)?;
        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, source),
            None => io::BufReader::new(source),
        };

        let count = count_stream(reader).map_err(SortError::IO)?;
        log::trace!("{} tokens in {}", count, path.display());
        total += count;
    }

    return Ok(total);
}
