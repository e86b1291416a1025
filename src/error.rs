//! IMAP4 and POP3 error types.

use std::io::Error as IoError;
use std::net::TcpStream;
use std::result;

use native_tls::Error as TlsError;
use native_tls::HandshakeError as TlsHandshakeError;
use thiserror::Error;

use crate::types::SessionState;

/// A convenience wrapper around `Result` for `mailpost::Error`.
pub type Result<T> = result::Result<T, Error>;

/// A set of errors that can occur while talking to a POP3 or IMAP4 server.
///
/// Only failures that leave the session unusable, or that the caller could not have
/// anticipated, are reported through this type. A command that the server answers with `NO`,
/// `BAD` or `-ERR` is an ordinary outcome and is reported as `false` or `None` by the
/// individual operations instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The TCP connection to the server could not be opened.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        /// Host that was dialled.
        host: String,
        /// Port that was dialled.
        port: u16,
        /// The underlying socket error.
        #[source]
        source: IoError,
    },
    /// The TCP connection was opened but the stream could not be prepared for use.
    #[error("connected to {host} but failed to acquire the network stream: {source}")]
    Stream {
        /// Host the stream belongs to.
        host: String,
        /// The underlying socket error.
        #[source]
        source: IoError,
    },
    /// An error from the `native_tls` library while setting up the TLS connector.
    #[error("connected to {host} but failed to set up TLS: {source}")]
    TlsSetup {
        /// Host the stream belongs to.
        host: String,
        /// The underlying TLS error.
        #[source]
        source: TlsError,
    },
    /// An error from the `native_tls` library during the TLS handshake.
    #[error("connected to {host} but the TLS handshake failed: {source}")]
    TlsHandshake {
        /// Host the stream belongs to.
        host: String,
        /// The underlying handshake error.
        #[source]
        source: TlsHandshakeError<TcpStream>,
    },
    /// The server did not send a positive welcome line after the connection was opened.
    #[error("connected to {host} but did not receive a welcome message")]
    NoGreeting {
        /// Host that stayed silent.
        host: String,
    },
    /// The server rejected the login.
    #[error("server {host} rejected the login for {user}: {response}")]
    Login {
        /// Host that rejected the login.
        host: String,
        /// The user name that was rejected.
        user: String,
        /// The server's raw reply.
        response: String,
    },
    /// An operation was invoked while the session was not in the state it requires.
    #[error("operation requires the session to be {required}, but it is {actual}")]
    State {
        /// The state the operation requires.
        required: SessionState,
        /// The state the session was actually in.
        actual: SessionState,
    },
    /// A command argument contained a character that cannot be sent, such as a line break.
    #[error("invalid character in command argument: {0:?}")]
    Validate(char),
    /// An `io::Error` that occurred outside of a protocol conversation, such as while reading
    /// a message file.
    #[error(transparent)]
    Io(#[from] IoError),
}

impl Error {
    /// True if this error was raised while opening the connection, before the server was
    /// spoken to.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Error::Connect { .. }
                | Error::Stream { .. }
                | Error::TlsSetup { .. }
                | Error::TlsHandshake { .. }
        )
    }
}
