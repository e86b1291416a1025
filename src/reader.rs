//! A line reader over an arbitrary byte stream.
//!
//! Both protocols are line based, but an IMAP4 literal is a counted run of raw bytes that may
//! itself contain line breaks. [`LineReader`] serves both from one refill buffer, so bytes read
//! ahead while looking for a line end are never lost to a following literal read.

use std::io::{self, ErrorKind, Read};

use encoding_rs::Encoding;

use crate::codec::decode_text;

/// How many bytes are requested from the underlying stream per refill.
pub const CHUNK_SIZE: usize = 256;

/// Reads lines and counted byte runs from a stream.
///
/// A line ends at `\n`, which is consumed but not returned. Every `\r` is dropped from the
/// returned bytes. End of stream is reported as `None`, which is distinct from an empty line.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        LineReader {
            inner,
            buf: vec![0; CHUNK_SIZE].into_boxed_slice(),
            pos: 0,
            filled: 0,
            eof: false,
        }
    }

    /// Refills the buffer if it is exhausted. Returns `false` at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        if self.pos < self.filled {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return Ok(true);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads one line.
    ///
    /// Returns `Ok(None)` only if the stream ended before any byte of a new line was read. A
    /// final line without a `\n` is returned as is.
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let mut started = false;
        loop {
            if !self.fill()? {
                return Ok(if started { Some(line) } else { None });
            }
            started = true;
            let available = &self.buf[self.pos..self.filled];
            let (chunk, consumed, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..i], i + 1, true),
                None => (available, available.len(), false),
            };
            line.extend(chunk.iter().filter(|&&b| b != b'\r'));
            self.pos += consumed;
            if done {
                return Ok(Some(line));
            }
        }
    }

    /// Reads lines until a line consisting of a single `.` or the end of the stream, joining
    /// them with CRLF.
    ///
    /// With `dot_terminated` set the lone `.` ends the block and is not returned, and a leading
    /// `.` is removed from every longer line that starts with one. Without it the block runs to
    /// the end of the stream and lines are returned untouched.
    pub fn read_multi_line(&mut self, dot_terminated: bool) -> io::Result<Vec<u8>> {
        let mut block = Vec::new();
        while let Some(line) = self.read_line()? {
            let data = if !dot_terminated {
                &line[..]
            } else if line == b"." {
                break;
            } else if line.first() == Some(&b'.') {
                &line[1..]
            } else {
                &line[..]
            };
            block.extend_from_slice(data);
            block.extend_from_slice(b"\r\n");
        }
        Ok(block)
    }

    /// Reads one line and decodes it in `charset`.
    pub fn read_line_as_string(
        &mut self,
        charset: &'static Encoding,
    ) -> io::Result<Option<String>> {
        Ok(self.read_line()?.map(|line| decode_text(&line, charset)))
    }

    /// Reads a multi-line block, see [`Self::read_multi_line`], and decodes it in `charset`.
    pub fn read_multi_line_as_string(
        &mut self,
        dot_terminated: bool,
        charset: &'static Encoding,
    ) -> io::Result<String> {
        let block = self.read_multi_line(dot_terminated)?;
        Ok(decode_text(&block, charset))
    }

    /// Reads exactly `n` bytes, taking buffered bytes first. Line breaks are not interpreted.
    ///
    /// Fails with `UnexpectedEof` if the stream ends first.
    pub fn read_exact_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        // the length comes from the peer; grow as bytes arrive
        let mut out = Vec::with_capacity(n.min(CHUNK_SIZE));
        while out.len() < n {
            if !self.fill()? {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream ended {} bytes into a {} byte literal", out.len(), n),
                ));
            }
            let take = (n - out.len()).min(self.filled - self.pos);
            out.extend_from_slice(&self.buf[self.pos..self.pos + take]);
            self.pos += take;
        }
        Ok(out)
    }

    /// True once the underlying stream has reported end of stream.
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

impl<R> LineReader<R> {
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwraps the stream. Bytes that were buffered but not yet returned are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_stream::MockStream;
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use proptest::prelude::*;

    fn reader(data: &str) -> LineReader<MockStream> {
        LineReader::new(MockStream::new(data.as_bytes().to_vec()))
    }

    #[test]
    fn lines_drop_cr() {
        let mut r = reader("+OK ready\r\n\r\nlast");
        assert_eq!(r.read_line().unwrap(), Some(b"+OK ready".to_vec()));
        assert_eq!(r.read_line().unwrap(), Some(Vec::new()));
        assert_eq!(r.read_line().unwrap(), Some(b"last".to_vec()));
        assert_eq!(r.read_line().unwrap(), None);
        assert!(r.is_eof());
    }

    #[test]
    fn short_reads_accumulate() {
        let stream = MockStream::new(b"* OK Dovecot ready.\r\n".to_vec()).with_delay(5);
        let mut r = LineReader::new(stream);
        assert_eq!(
            r.read_line_as_string(UTF_8).unwrap().as_deref(),
            Some("* OK Dovecot ready.")
        );
    }

    #[test]
    fn lines_longer_than_a_chunk() {
        let long = "x".repeat(CHUNK_SIZE * 3 + 7);
        let mut r = reader(&format!("{}\r\nnext\r\n", long));
        assert_eq!(r.read_line().unwrap(), Some(long.into_bytes()));
        assert_eq!(r.read_line().unwrap(), Some(b"next".to_vec()));
    }

    #[test]
    fn eof_stream() {
        let mut r = LineReader::new(MockStream::default().with_eof());
        assert_eq!(r.read_line().unwrap(), None);
        assert!(r.is_eof());
    }

    #[test]
    fn read_error_propagates() {
        let mut r = LineReader::new(MockStream::default().with_err());
        assert!(r.read_line().is_err());
    }

    #[test]
    fn multi_line_unstuffs_dots() {
        let mut r = reader("line one\r\n..hidden\r\n.x\r\n.\r\n+OK next\r\n");
        let block = r.read_multi_line(true).unwrap();
        assert_eq!(block, b"line one\r\n.hidden\r\nx\r\n".to_vec());
        assert_eq!(r.read_line().unwrap(), Some(b"+OK next".to_vec()));
    }

    #[test]
    fn multi_line_without_terminator_runs_to_eof() {
        let mut r = reader("a\r\n.b\r\n.\r\nc");
        assert_eq!(r.read_multi_line(false).unwrap(), b"a\r\n.b\r\n.\r\nc\r\n".to_vec());
    }

    #[test]
    fn multi_line_charset() {
        let mut r = LineReader::new(MockStream::new(b"caf\xe9\r\n.\r\n".to_vec()));
        assert_eq!(
            r.read_multi_line_as_string(true, WINDOWS_1252).unwrap(),
            "café\r\n"
        );
    }

    #[test]
    fn exact_bytes_span_lines_and_buffer() {
        let mut r = reader("* 1 FETCH (BODY[] {11})\r\nhello\r\nworld)\r\nC0001 OK\r\n");
        r.read_line().unwrap();
        assert_eq!(r.read_exact_bytes(12).unwrap(), b"hello\r\nworld".to_vec());
        assert_eq!(r.read_line().unwrap(), Some(b")".to_vec()));
        assert_eq!(r.read_line().unwrap(), Some(b"C0001 OK".to_vec()));
    }

    #[test]
    fn exact_bytes_past_eof() {
        let mut r = reader("abc");
        let err = r.read_exact_bytes(10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn exact_bytes_with_absurd_length() {
        let mut r = reader("abc");
        let err = r.read_exact_bytes(usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        let err = r.read_exact_bytes(4_000_000_000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    proptest! {
        #[test]
        fn stuffed_lines_come_back_unstuffed(lines in prop::collection::vec("[a-z. ]{0,20}", 0..20)) {
            let mut wire = String::new();
            let mut expected = String::new();
            for line in &lines {
                if line.starts_with('.') {
                    wire.push('.');
                }
                wire.push_str(line);
                wire.push_str("\r\n");
                expected.push_str(line);
                expected.push_str("\r\n");
            }
            wire.push_str(".\r\n");
            let mut r = reader(&wire);
            prop_assert_eq!(r.read_multi_line_as_string(true, UTF_8).unwrap(), expected);
        }
    }
}
