//! Two-way merger.

use std::io::{self, prelude::*};
use std::path::Path;

use log;

use crate::file;
use crate::sort::SortError;
use crate::token::{write_token, TokenReader};

/// Two-way merger implementation.
/// Merges two sorted inputs into a single sorted output. When both heads are equal
/// the item from the first input is emitted first.
pub struct TwoWayMerger<T, E, A, B>
where
    T: Ord,
    A: Iterator<Item = Result<T, E>>,
    B: Iterator<Item = Result<T, E>>,
{
    first: A,
    second: B,
    first_head: Option<T>,
    second_head: Option<T>,
    first_done: bool,
    second_done: bool,
}

impl<T, E, A, B> TwoWayMerger<T, E, A, B>
where
    T: Ord,
    A: Iterator<Item = Result<T, E>>,
    B: Iterator<Item = Result<T, E>>,
{
    /// Creates an instance of a two-way merger.
    /// Both inputs should be sorted in ascending order otherwise the result is undefined.
    ///
    /// # Arguments
    /// * `first` - Input preferred on ties
    /// * `second` - The other input
    pub fn new<I, J>(first: I, second: J) -> Self
    where
        I: IntoIterator<Item = Result<T, E>, IntoIter = A>,
        J: IntoIterator<Item = Result<T, E>, IntoIter = B>,
    {
        return TwoWayMerger {
            first: first.into_iter(),
            second: second.into_iter(),
            first_head: None,
            second_head: None,
            first_done: false,
            second_done: false,
        };
    }
}

impl<T, E, A, B> Iterator for TwoWayMerger<T, E, A, B>
where
    T: Ord,
    A: Iterator<Item = Result<T, E>>,
    B: Iterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    /// Returns the next item from the inputs in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        if self.first_head.is_none() && !self.first_done {
            match self.first.next() {
                Some(Ok(item)) => self.first_head = Some(item),
                Some(Err(err)) => return Some(Err(err)),
                None => self.first_done = true,
            }
        }
        if self.second_head.is_none() && !self.second_done {
            match self.second.next() {
                Some(Ok(item)) => self.second_head = Some(item),
                Some(Err(err)) => return Some(Err(err)),
                None => self.second_done = true,
            }
        }

        let take_second = match (&self.first_head, &self.second_head) {
            (Some(first), Some(second)) => second < first,
            (None, Some(_)) => true,
            _ => false,
        };

        return if take_second {
            self.second_head.take().map(Ok)
        } else {
            self.first_head.take().map(Ok)
        };
    }
}

/// Merges two sorted token streams into a writer. Returns the number of written tokens.
pub fn merge<R1, R2, W>(first: R1, second: R2, destination: &mut W) -> io::Result<usize>
where
    R1: BufRead,
    R2: BufRead,
    W: Write,
{
    let mut written = 0;
    for token in TwoWayMerger::new(TokenReader::new(first), TokenReader::new(second)) {
        write_token(destination, token?)?;
        written += 1;
    }

    return Ok(written);
}

/// Merges two sorted token files into a destination file.
/// The destination must not be one of the inputs.
///
/// # Arguments
/// * `first` - Sorted input preferred on ties
/// * `second` - The other sorted input
/// * `destination` - Result file, created or truncated
/// * `buf_size` - File read/write buffer size
pub fn merge_files(
    first: &Path,
    second: &Path,
    destination: &Path,
    buf_size: Option<usize>,
) -> Result<usize, SortError> {
    let first_file = file::open(first)?;
    let second_file = file::open(second)?;
    let destination_file = file::create(destination)?;

    let written = match buf_size {
        Some(buf_size) => {
            let mut writer = io::BufWriter::with_capacity(buf_size, destination_file);
            let written = merge(
                io::BufReader::with_capacity(buf_size, first_file),
                io::BufReader::with_capacity(buf_size, second_file),
                &mut writer,
            );
            written.and_then(|written| writer.flush().map(|_| written))
        }
        None => {
            let mut writer = io::BufWriter::new(destination_file);
            let written = merge(
                io::BufReader::new(first_file),
                io::BufReader::new(second_file),
                &mut writer,
            );
            written.and_then(|written| writer.flush().map(|_| written))
        }
    }
    .map_err(SortError::IO)?;

    log::debug!(
        "merged {} and {} into {} ({} tokens)",
        first.display(),
        second.display(),
        destination.display(),
        written
    );

    return Ok(written);
}
