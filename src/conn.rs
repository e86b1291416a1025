use std::fmt::{Debug, Formatter};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use native_tls::{TlsConnector, TlsStream};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Must be implemented for a transport so that a session can apply its I/O timeout to it.
pub trait SetTimeout {
    /// Set the timeout for subsequent reads and writes to the given one.
    ///
    /// If `timeout` is `None`, I/O may block indefinitely.
    ///
    /// See also `std::net::TcpStream::set_read_timeout`.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl SetTimeout for TcpStream {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

impl SetTimeout for TlsStream<TcpStream> {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.get_mut().set_timeout(timeout)
    }
}

/// A read/write stream a POP3 or IMAP4 session can run over.
pub trait MailConnection: Read + Write + Send + SetTimeout {}

impl<T> MailConnection for T where T: Read + Write + Send + SetTimeout {}

impl Debug for dyn MailConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mail connection")
    }
}

/// A boxed connection type
pub type Connection = Box<dyn MailConnection>;

/// Opens the transport described by `config`, reporting each stage's failure separately.
pub(crate) fn open(config: &ClientConfig) -> Result<Connection> {
    let host = config.host();
    let port = config.port();

    let mut tcp = TcpStream::connect((host, port)).map_err(|source| Error::Connect {
        host: host.to_string(),
        port,
        source,
    })?;
    tcp.set_timeout(config.timeout_value())
        .map_err(|source| Error::Stream {
            host: host.to_string(),
            source,
        })?;
    log::debug!("connected to {}:{}", host, port);

    if !config.is_tls() {
        return Ok(Box::new(tcp));
    }

    let connector = TlsConnector::new().map_err(|source| Error::TlsSetup {
        host: host.to_string(),
        source,
    })?;
    let tls = connector
        .connect(host, tcp)
        .map_err(|source| Error::TlsHandshake {
            host: host.to_string(),
            source,
        })?;
    log::debug!("TLS established with {}", host);
    Ok(Box::new(tls))
}
