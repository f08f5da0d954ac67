//! Decimal token reader and writer.

use std::io::{self, prelude::*};

/// Integer token type. Digit runs that exceed its range wrap around.
pub type Token = u64;

/// Token reader. Extracts non-negative decimal integers from a byte stream,
/// treating any run of non-digit bytes as a separator.
pub struct TokenReader<R> {
    reader: R,
}

impl<R: BufRead> TokenReader<R> {
    /// Creates a token reader on top of a buffered reader.
    pub fn new(reader: R) -> Self {
        TokenReader { reader }
    }

    /// Returns the next token or [`None`] if the stream ended before any digit was seen.
    /// The non-digit byte terminating a token is consumed.
    pub fn next_token(&mut self) -> io::Result<Option<Token>> {
        let mut value: Token = 0;
        let mut digits = 0usize;

        loop {
            let (consumed, terminated) = {
                let buf = match self.reader.fill_buf() {
                    Ok(buf) => buf,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                };
                if buf.is_empty() {
                    break;
                }

                let mut consumed = 0;
                let mut terminated = false;
                for &byte in buf {
                    consumed += 1;
                    if byte.is_ascii_digit() {
                        value = value.wrapping_mul(10).wrapping_add(Token::from(byte - b'0'));
                        digits += 1;
                    } else if digits > 0 {
                        terminated = true;
                        break;
                    }
                }
                (consumed, terminated)
            };

            self.reader.consume(consumed);
            if terminated {
                break;
            }
        }

        return Ok((digits > 0).then(|| value));
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> TokenReader<io::BufReader<R>> {
    /// Creates a token reader with the given read buffer size.
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        TokenReader::new(io::BufReader::with_capacity(capacity, reader))
    }
}

impl<R: BufRead> Iterator for TokenReader<R> {
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Writes a token as a decimal line.
pub fn write_token<W: Write + ?Sized>(writer: &mut W, token: Token) -> io::Result<()> {
    writeln!(writer, "{}", token)
}
