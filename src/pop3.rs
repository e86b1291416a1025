//! A POP3 client.

use std::io::{self, Write};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::conn::{self, Connection, MailConnection, SetTimeout};
use crate::error::{Error, Result};
use crate::mime;
use crate::parse::{parse_list_entry, parse_stat, parse_uid_entry};
use crate::reader::LineReader;
use crate::types::*;

/// A POP3 session.
///
/// The session is created disconnected. [`connect`](Self::connect) opens the transport, reads
/// the welcome line and logs in with `USER`/`PASS`; after that the maildrop commands may be
/// used. Every maildrop command requires a connected session and fails with [`Error::State`]
/// otherwise, without touching the network.
///
/// A command the server answers with `-ERR`, or that fails on the wire, is reported as
/// `None` or `false` rather than as an error.
///
/// Dropping the session disconnects it.
///
/// ```no_run
/// # use mailpost::{ClientConfig, Pop3Client};
/// # fn main() -> mailpost::Result<()> {
/// let mut client = Pop3Client::new(
///     ClientConfig::pop3("pop.example.com").tls(true).credentials("alice", "secret"),
/// );
/// client.connect()?;
/// for info in client.list(true)? {
///     if let Some(message) = client.message(info.id)? {
///         println!("{:?}: {:?}", info.uid, message.subject());
///     }
/// }
/// client.disconnect();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pop3Client {
    config: ClientConfig,
    state: SessionState,
    stream: Option<LineReader<Connection>>,
}

impl Pop3Client {
    /// Creates a disconnected session for the server described by `config`.
    pub fn new(config: ClientConfig) -> Self {
        Pop3Client {
            config,
            state: SessionState::Disconnected,
            stream: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Changes the I/O timeout. If the session is connected, the new timeout applies from the
    /// next read or write on.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.config.set_timeout_value(timeout);
        if let Some(ref mut stream) = self.stream {
            stream.get_mut().set_timeout(self.config.timeout_value())?;
        }
        Ok(())
    }

    /// Connects to the server and logs in.
    ///
    /// Does nothing if the session is not disconnected. Each stage of opening the connection
    /// fails with its own error variant; a missing welcome line fails with
    /// [`Error::NoGreeting`] and a rejected `USER` or `PASS` with [`Error::Login`], after
    /// which the session is disconnected again.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Ok(());
        }
        let connection = conn::open(&self.config)?;
        self.start(connection)
    }

    /// Like [`connect`](Self::connect), but runs the session over an already opened stream.
    pub fn connect_with<C: MailConnection + 'static>(&mut self, stream: C) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Ok(());
        }
        self.start(Box::new(stream))
    }

    fn start(&mut self, connection: Connection) -> Result<()> {
        for value in [self.config.username(), self.config.password()] {
            if let Some(c) = value.chars().find(|&c| c == '\r' || c == '\n') {
                return Err(Error::Validate(c));
            }
        }
        self.stream = Some(LineReader::new(connection));

        match self.read_reply() {
            Ok(_) => {}
            Err(greeting) => {
                log::debug!("no welcome from {}: {:?}", self.config.host(), greeting);
                self.stream = None;
                return Err(Error::NoGreeting {
                    host: self.config.host().to_string(),
                });
            }
        }
        self.state = SessionState::Authorizing;

        let user = format!("USER {}", self.config.username());
        let pass = format!("PASS {}", self.config.password());
        for command in [user, pass] {
            if let Err(response) = self.command(&command) {
                self.disconnect();
                return Err(Error::Login {
                    host: self.config.host().to_string(),
                    user: self.config.username().to_string(),
                    response,
                });
            }
        }

        self.state = SessionState::Connected;
        log::debug!("logged in to {} as {}", self.config.host(), self.config.username());
        Ok(())
    }

    /// Sends `QUIT` and closes the connection.
    ///
    /// The connection is closed and the session disconnected even if `QUIT` fails. Calling this
    /// on a disconnected session does nothing.
    pub fn disconnect(&mut self) {
        if self.state == SessionState::Disconnected && self.stream.is_none() {
            return;
        }
        if self.stream.is_some() {
            if let Err(e) = self.command("QUIT") {
                log::debug!("QUIT failed: {:?}", e);
            }
        }
        self.stream = None;
        self.state = SessionState::Disconnected;
        log::debug!("disconnected from {}", self.config.host());
    }

    /// The number of messages in the maildrop and their total size, from `STAT`.
    pub fn stat(&mut self) -> Result<Option<MailboxStat>> {
        self.ensure_connected()?;
        Ok(self.command("STAT").ok().and_then(|line| parse_stat(&line)))
    }

    /// Lists the messages in the maildrop with their sizes, from `LIST`.
    ///
    /// With `with_uids` set, the unique ids reported by `UIDL` are filled in as well.
    pub fn list(&mut self, with_uids: bool) -> Result<Vec<MailInfo>> {
        self.ensure_connected()?;
        let mut infos: Vec<MailInfo> = match self.command_block("LIST") {
            Some(block) => String::from_utf8_lossy(&block)
                .lines()
                .filter_map(parse_list_entry)
                .collect(),
            None => return Ok(Vec::new()),
        };
        if with_uids {
            if let Some(block) = self.command_block("UIDL") {
                for (id, uid) in String::from_utf8_lossy(&block).lines().filter_map(parse_uid_entry) {
                    if let Some(info) = infos.iter_mut().find(|info| info.id == id) {
                        info.uid = Some(uid);
                    }
                }
            }
        }
        Ok(infos)
    }

    /// The size of message `id`, from `LIST id`.
    pub fn size(&mut self, id: Seq) -> Result<Option<u64>> {
        self.ensure_connected()?;
        Ok(self
            .command(&format!("LIST {}", id))
            .ok()
            .and_then(|line| parse_list_entry(&line))
            .map(|info| info.size))
    }

    /// The unique id of message `id`, from `UIDL id`.
    pub fn uid(&mut self, id: Seq) -> Result<Option<String>> {
        self.ensure_connected()?;
        Ok(self
            .command(&format!("UIDL {}", id))
            .ok()
            .and_then(|line| parse_uid_entry(&line))
            .map(|(_, uid)| uid))
    }

    /// The raw bytes of message `id`, from `RETR id`. Lines end in CRLF.
    pub fn retrieve(&mut self, id: Seq) -> Result<Option<Vec<u8>>> {
        self.ensure_connected()?;
        Ok(self.command_block(&format!("RETR {}", id)))
    }

    /// Message `id` as text in the configured charset.
    pub fn retrieve_text(&mut self, id: Seq) -> Result<Option<String>> {
        let charset = self.config.charset_value();
        Ok(self
            .retrieve(id)?
            .map(|block| crate::codec::decode_text(&block, charset)))
    }

    /// Message `id`, decoded.
    pub fn message(&mut self, id: Seq) -> Result<Option<MailMessage>> {
        let charset = self.config.charset_value();
        Ok(self
            .retrieve(id)?
            .map(|block| mime::parse_with_charset(&block, charset)))
    }

    /// The headers and the first `rows` body lines of message `id`, from `TOP id rows`.
    pub fn top(&mut self, id: Seq, rows: u32) -> Result<Option<String>> {
        self.ensure_connected()?;
        let charset = self.config.charset_value();
        Ok(self
            .command_block(&format!("TOP {} {}", id, rows))
            .map(|block| crate::codec::decode_text(&block, charset)))
    }

    /// Marks message `id` as deleted, with `DELE id`. The message is removed when the session
    /// ends.
    pub fn delete(&mut self, id: Seq) -> Result<bool> {
        self.ensure_connected()?;
        Ok(self.command(&format!("DELE {}", id)).is_ok())
    }

    /// Unmarks every message marked as deleted in this session, with `RSET`.
    pub fn reset(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        Ok(self.command("RSET").is_ok())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(Error::State {
                required: SessionState::Connected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Sends `command` and reads the single reply line. Returns the line if it is positive,
    /// and otherwise whatever the server said (possibly nothing).
    fn command(&mut self, command: &str) -> std::result::Result<String, String> {
        if let Err(e) = self.write_line(command) {
            log::warn!("failed to send {}: {}", verb(command), e);
            return Err(String::new());
        }
        self.read_reply()
    }

    /// Sends `command` and, if the reply is positive, reads the dot-terminated block that
    /// follows it.
    fn command_block(&mut self, command: &str) -> Option<Vec<u8>> {
        self.command(command).ok()?;
        let stream = self.stream.as_mut()?;
        match stream.read_multi_line(true) {
            Ok(block) => {
                log::trace!("S: <{} bytes>", block.len());
                Some(block)
            }
            Err(e) => {
                log::warn!("failed to read the reply to {}: {}", verb(command), e);
                None
            }
        }
    }

    fn read_reply(&mut self) -> std::result::Result<String, String> {
        let charset = self.config.charset_value();
        let stream = self.stream.as_mut().ok_or_else(String::new)?;
        match stream.read_line_as_string(charset) {
            Ok(Some(line)) => {
                log::trace!("S: {}", line);
                if line.starts_with('+') {
                    Ok(line)
                } else {
                    Err(line)
                }
            }
            Ok(None) => {
                log::warn!("connection closed by {}", self.config.host());
                Err(String::new())
            }
            Err(e) => {
                log::warn!("failed to read from {}: {}", self.config.host(), e);
                Err(String::new())
            }
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not connected"))?
            .get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        if line.starts_with("PASS ") {
            log::trace!("C: PASS ****");
        } else {
            log::trace!("C: {}", line);
        }
        Ok(())
    }
}

impl Drop for Pop3Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn verb(command: &str) -> &str {
    command.split(' ').next().unwrap_or(command)
}
