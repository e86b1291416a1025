//! An IMAP4 client.

use std::io::{self, Write};
use std::time::Duration;

use encoding_rs::Encoding;

use crate::codec::decode_text;
use crate::config::ClientConfig;
use crate::conn::{self, Connection, MailConnection, SetTimeout};
use crate::error::{Error, Result};
use crate::parse::{literal_length, parse_fetch_literals, parse_mailboxes};
use crate::reader::LineReader;
use crate::types::*;

static TAG_PREFIX: &str = "C";
const INITIAL_TAG: u32 = 0;
const CR: u8 = 0x0d;
const LF: u8 = 0x0a;

macro_rules! quote {
    ($x:expr) => {
        format!("\"{}\"", $x.replace(r"\", r"\\").replace("\"", "\\\""))
    };
}

/// Quotes `value` as an IMAP string, rejecting line breaks.
pub(crate) fn validate_str(value: &str) -> Result<String> {
    let quoted = quote!(value);
    if quoted.contains('\n') {
        return Err(Error::Validate('\n'));
    }
    if quoted.contains('\r') {
        return Err(Error::Validate('\r'));
    }
    Ok(quoted)
}

/// Everything the server sent in answer to one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    data: Vec<u8>,
    status: Option<String>,
    completion: Option<String>,
    charset: &'static Encoding,
}

impl Response {
    fn new(charset: &'static Encoding) -> Self {
        Response {
            data: Vec::new(),
            status: None,
            completion: None,
            charset,
        }
    }

    /// True if the command completed with `OK`.
    pub fn is_ok(&self) -> bool {
        self.status
            .as_deref()
            .map_or(false, |status| status.eq_ignore_ascii_case("OK"))
    }

    /// The result code of the completion line (`OK`, `NO` or `BAD`). If the response was cut
    /// off before its completion line, the result token of the last untagged line instead.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The completion line, if one was received.
    pub fn completion(&self) -> Option<&str> {
        self.completion.as_deref()
    }

    /// The untagged and continuation lines, each ending in CRLF, with literals inline exactly
    /// as received. The completion line is not included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// [`Self::data`] decoded in the session charset.
    pub fn text(&self) -> String {
        decode_text(&self.data, self.charset)
    }

    /// The payloads of the `BODY[...]` literals in a `FETCH` response, in order.
    pub fn literals(&self) -> Vec<Vec<u8>> {
        parse_fetch_literals(&self.data)
    }

    pub fn charset(&self) -> &'static Encoding {
        self.charset
    }

    /// The server text to report for a failed command.
    fn failure_text(&self) -> String {
        match self.completion {
            Some(ref line) => line.clone(),
            None => self.text().trim_end().to_string(),
        }
    }
}

/// An IMAP4 session.
///
/// The session is created disconnected. [`connect`](Self::connect) opens the transport, reads
/// the greeting and logs in with `LOGIN`. Every other command requires a connected session and
/// fails with [`Error::State`] otherwise, without touching the network.
///
/// Each command is sent with a fresh tag, `C0001`, `C0002` and so on, and its response is read
/// up to the completion line carrying that tag. A command the server answers with `NO` or
/// `BAD`, or that fails on the wire, is reported as `false`, `None` or a failed [`Response`]
/// rather than as an error.
///
/// Mailbox level commands are methods of [`Mailbox`], which take the session as an argument.
///
/// Dropping the session disconnects it.
///
/// ```no_run
/// # use mailpost::{ClientConfig, Imap4Client};
/// # fn main() -> mailpost::Result<()> {
/// let mut client = Imap4Client::new(
///     ClientConfig::imap("imap.example.com").tls(true).credentials("alice", "secret"),
/// );
/// client.connect()?;
/// if let Some(mut inbox) = client.select_mailbox("INBOX")? {
///     for message in inbox.messages(&mut client, false)? {
///         println!("{:?}", message.subject());
///     }
///     inbox.close(&mut client)?;
/// }
/// client.disconnect();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Imap4Client {
    config: ClientConfig,
    state: SessionState,
    stream: Option<LineReader<Connection>>,
    tag: u32,
}

impl Imap4Client {
    /// Creates a disconnected session for the server described by `config`.
    pub fn new(config: ClientConfig) -> Self {
        Imap4Client {
            config,
            state: SessionState::Disconnected,
            stream: None,
            tag: INITIAL_TAG,
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
    /// fails with its own error variant; a missing or negative greeting fails with
    /// [`Error::NoGreeting`] and a rejected `LOGIN` with [`Error::Login`], after which the
    /// session is disconnected again.
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
        let username = validate_str(self.config.username())?;
        let password = validate_str(self.config.password())?;
        self.stream = Some(LineReader::new(connection));

        let greeting = self.read_response(None);
        if !greeting.is_ok() {
            log::debug!("no greeting from {}: {:?}", self.config.host(), greeting.completion());
            self.stream = None;
            return Err(Error::NoGreeting {
                host: self.config.host().to_string(),
            });
        }
        self.state = SessionState::Authorizing;

        let login = self.command_masked(
            &format!("LOGIN {} {}", username, password),
            &format!("LOGIN {} ****", username),
        );
        if !login.is_ok() {
            self.disconnect();
            return Err(Error::Login {
                host: self.config.host().to_string(),
                user: self.config.username().to_string(),
                response: login.failure_text(),
            });
        }

        self.state = SessionState::Connected;
        log::debug!("logged in to {} as {}", self.config.host(), self.config.username());
        Ok(())
    }

    /// Sends `LOGOUT` and closes the connection.
    ///
    /// The connection is closed and the session disconnected even if `LOGOUT` fails. Calling
    /// this on a disconnected session does nothing.
    pub fn disconnect(&mut self) {
        if self.state == SessionState::Disconnected && self.stream.is_none() {
            return;
        }
        if self.stream.is_some() && !self.command("LOGOUT").is_ok() {
            log::debug!("LOGOUT was not acknowledged");
        }
        self.stream = None;
        self.state = SessionState::Disconnected;
        log::debug!("disconnected from {}", self.config.host());
    }

    /// Creates the mailbox `name`.
    pub fn create_mailbox(&mut self, name: &str) -> Result<Option<Mailbox>> {
        self.ensure_connected()?;
        let response = self.command(&format!("CREATE {}", validate_str(name)?));
        Ok(if response.is_ok() {
            Some(Mailbox::new(name))
        } else {
            None
        })
    }

    /// Selects the mailbox `name`. The returned handle carries the status the server reported.
    pub fn select_mailbox(&mut self, name: &str) -> Result<Option<Mailbox>> {
        let mut mailbox = Mailbox::new(name);
        Ok(mailbox.select(self)?.map(|_| mailbox))
    }

    /// Closes the selected mailbox, permanently removing the messages flagged `\Deleted`.
    pub fn close_mailbox(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        Ok(self.command("CLOSE").is_ok())
    }

    /// Lists every mailbox, with `LIST "" "*"`.
    pub fn all_mailboxes(&mut self) -> Result<Vec<Mailbox>> {
        self.list_mailboxes("", "*")
    }

    /// Lists the mailboxes matching `pattern` under `reference`, with `LIST`.
    pub fn list_mailboxes(&mut self, reference: &str, pattern: &str) -> Result<Vec<Mailbox>> {
        self.list("LIST", reference, pattern, false)
    }

    /// Lists the subscribed mailboxes matching `pattern` under `reference`, with `LSUB`.
    pub fn list_subscribed_mailboxes(
        &mut self,
        reference: &str,
        pattern: &str,
    ) -> Result<Vec<Mailbox>> {
        self.list("LSUB", reference, pattern, true)
    }

    fn list(
        &mut self,
        command: &str,
        reference: &str,
        pattern: &str,
        subscribed: bool,
    ) -> Result<Vec<Mailbox>> {
        self.ensure_connected()?;
        let response = self.command(&format!(
            "{} {} {}",
            command,
            validate_str(reference)?,
            validate_str(pattern)?
        ));
        Ok(if response.is_ok() {
            parse_mailboxes(&response.text(), subscribed)
        } else {
            Vec::new()
        })
    }

    /// Sends `FETCH sequence items` and returns the response as is.
    pub fn fetch(&mut self, sequence: impl Into<Sequence>, items: &str) -> Result<Response> {
        self.run_command(&format!("FETCH {} {}", sequence.into(), items))
    }

    /// Adds (`+FLAGS`) or removes (`-FLAGS`) `flags` on the messages in `sequence`.
    pub(crate) fn store(
        &mut self,
        sequence: Sequence,
        operation: &str,
        flags: &[&str],
    ) -> Result<bool> {
        let command = format!(
            "STORE {} {} ({})",
            sequence,
            operation,
            crate::utils::iter_join(flags, " ")
        );
        Ok(self.run_command(&command)?.is_ok())
    }

    /// Permanently removes the messages flagged `\Deleted` from the selected mailbox.
    pub fn expunge(&mut self) -> Result<bool> {
        Ok(self.run_command("EXPUNGE")?.is_ok())
    }

    /// Runs any command, given without a tag, and returns the server's response.
    pub fn run_command(&mut self, untagged_command: &str) -> Result<Response> {
        self.ensure_connected()?;
        Ok(self.command(untagged_command))
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(Error::State {
                required: SessionState::Connected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn command(&mut self, command: &str) -> Response {
        self.command_masked(command, command)
    }

    /// Sends `command` under a fresh tag and reads its response. `shown` is what gets logged.
    fn command_masked(&mut self, command: &str, shown: &str) -> Response {
        let tag = self.next_tag();
        if let Err(e) = self.write_line(format!("{} {}", tag, command).as_bytes()) {
            log::warn!("failed to send {} {}: {}", tag, verb(command), e);
            return Response::new(self.config.charset_value());
        }
        log::trace!("C: {} {}", tag, shown);
        self.read_response(Some(&tag))
    }

    fn next_tag(&mut self) -> String {
        self.tag += 1;
        format!("{}{:04}", TAG_PREFIX, self.tag)
    }

    /// Reads lines up to the completion line tagged `tag`.
    ///
    /// Without a tag the first line read completes the response; this is how the greeting is
    /// read. A read failure ends the response early; the status is then the result token of
    /// the last untagged or continuation line seen, so a response cut off after `* OK` still
    /// counts as a success.
    fn read_response(&mut self, tag: Option<&str>) -> Response {
        let mut response = Response::new(self.config.charset_value());
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return response,
        };
        loop {
            let line = match stream.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    log::warn!("connection closed by {}", self.config.host());
                    break;
                }
                Err(e) => {
                    log::warn!("failed to read from {}: {}", self.config.host(), e);
                    break;
                }
            };
            let text = String::from_utf8_lossy(&line).into_owned();
            log::trace!("S: {}", text);

            let mut tokens = text.splitn(3, ' ');
            let first = tokens.next().unwrap_or("");
            let completes = match tag {
                Some(tag) => first.eq_ignore_ascii_case(tag),
                None => true,
            };
            if completes {
                response.status = tokens.next().map(str::to_string);
                response.completion = Some(text);
                break;
            }

            if first == "*" || first == "+" {
                response.status = tokens.next().map(str::to_string);
            } else {
                log::debug!("unexpected response line while waiting for {:?}", tag);
            }
            response.data.extend_from_slice(&line);
            response.data.extend_from_slice(&[CR, LF]);
            if let Some(length) = literal_length(&line) {
                match stream.read_exact_bytes(length) {
                    Ok(literal) => {
                        log::trace!("S: <{} byte literal>", literal.len());
                        response.data.extend_from_slice(&literal);
                    }
                    Err(e) => {
                        log::warn!("failed to read a {} byte literal: {}", length, e);
                        break;
                    }
                }
            }
        }
        response
    }

    fn write_line(&mut self, buf: &[u8]) -> io::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not connected"))?
            .get_mut();
        stream.write_all(buf)?;
        stream.write_all(&[CR, LF])?;
        stream.flush()
    }
}

impl Drop for Imap4Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn verb(command: &str) -> &str {
    command.split(' ').next().unwrap_or(command)
}
