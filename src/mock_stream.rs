use std::cmp::min;
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::conn::SetTimeout;

/// An in-memory transport that replays a scripted server side and records what the client
/// wrote.
///
/// The written bytes live behind a shared handle (see [`MockStream::written`]) so a test can
/// still inspect them after the session has dropped its transport.
pub struct MockStream {
    read_buf: Vec<u8>,
    read_pos: usize,
    written_buf: Arc<Mutex<Vec<u8>>>,
    err_on_read: bool,
    eof_on_read: bool,
    read_delay: usize,
    timeout: Arc<Mutex<Option<Duration>>>,
}

impl Default for MockStream {
    fn default() -> Self {
        MockStream {
            read_buf: Vec::new(),
            read_pos: 0,
            written_buf: Arc::new(Mutex::new(Vec::new())),
            err_on_read: false,
            eof_on_read: false,
            read_delay: 0,
            timeout: Arc::new(Mutex::new(None)),
        }
    }
}

impl MockStream {
    pub fn new(read_buf: Vec<u8>) -> MockStream {
        MockStream::default().with_buf(read_buf)
    }

    pub fn with_buf(mut self, read_buf: Vec<u8>) -> MockStream {
        self.read_buf = read_buf;
        self
    }

    pub fn with_eof(mut self) -> MockStream {
        self.eof_on_read = true;
        self
    }

    pub fn with_err(mut self) -> MockStream {
        self.err_on_read = true;
        self
    }

    /// Makes the next `reads` reads return at most one byte each.
    pub fn with_delay(mut self, reads: usize) -> MockStream {
        self.read_delay = reads;
        self
    }

    /// A handle on everything written to this stream so far.
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written_buf)
    }

    /// A handle on the last timeout the client applied to this stream.
    pub fn timeout(&self) -> Arc<Mutex<Option<Duration>>> {
        Arc::clone(&self.timeout)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.eof_on_read {
            return Ok(0);
        }
        if self.err_on_read {
            return Err(Error::new(ErrorKind::Other, "MockStream Error"));
        }
        if self.read_pos >= self.read_buf.len() {
            return Ok(0);
        }
        let mut write_len = min(buf.len(), self.read_buf.len() - self.read_pos);
        if self.read_delay > 0 {
            self.read_delay -= 1;
            write_len = min(write_len, 1);
        }
        let max_pos = self.read_pos + write_len;
        buf[..write_len].copy_from_slice(&self.read_buf[self.read_pos..max_pos]);
        self.read_pos = max_pos;
        Ok(write_len)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.written_buf.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl SetTimeout for MockStream {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        *self.timeout.lock().unwrap() = timeout;
        Ok(())
    }
}

/// Renders the shared written buffer as text.
pub fn written_text(buf: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&buf.lock().unwrap()).into_owned()
}
