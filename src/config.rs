use std::fmt;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};

use crate::codec;

/// The I/O timeout used unless another one is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for a [`Pop3Client`](crate::Pop3Client) or an
/// [`Imap4Client`](crate::Imap4Client).
///
/// ```
/// # use mailpost::ClientConfig;
/// # use std::time::Duration;
/// let config = ClientConfig::imap("imap.example.com")
///     .tls(true)
///     .credentials("alice", "secret")
///     .timeout(Duration::from_secs(30))
///     .charset("gbk");
/// assert_eq!(config.port(), 993);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    host: String,
    port: u16,
    default_ports: Option<(u16, u16)>,
    username: String,
    password: String,
    tls: bool,
    timeout: Option<Duration>,
    charset: &'static Encoding,
}

impl ClientConfig {
    /// Settings for the server at `host:port`, without TLS and without credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            default_ports: None,
            username: String::new(),
            password: String::new(),
            tls: false,
            timeout: Some(DEFAULT_TIMEOUT),
            charset: UTF_8,
        }
    }

    /// Settings for a POP3 server on the standard port, 110, or 995 once TLS is enabled.
    pub fn pop3(host: impl Into<String>) -> Self {
        Self::with_default_ports(host, 110, 995)
    }

    /// Settings for an IMAP4 server on the standard port, 143, or 993 once TLS is enabled.
    pub fn imap(host: impl Into<String>) -> Self {
        Self::with_default_ports(host, 143, 993)
    }

    fn with_default_ports(host: impl Into<String>, plain: u16, tls: u16) -> Self {
        let mut config = Self::new(host, plain);
        config.default_ports = Some((plain, tls));
        config
    }

    /// The user name and password to log in with.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Use TLS for this connection. Configurations made with [`Self::pop3`] or
    /// [`Self::imap`] switch to the protocol's TLS port as well.
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        if let Some((plain, secure)) = self.default_ports {
            self.port = if tls { secure } else { plain };
        }
        self
    }

    /// Overrides the port.
    pub fn port_number(mut self, port: u16) -> Self {
        self.port = port;
        self.default_ports = None;
        self
    }

    /// The read and write timeout of the transport. A zero duration disables the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }

    /// The charset used for text the server sends outside of MIME content, and the default
    /// for messages that do not declare one. Unknown names resolve to UTF-8.
    pub fn charset(mut self, name: &str) -> Self {
        self.charset = codec::charset(name);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn timeout_value(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn set_timeout_value(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout.filter(|t| !t.is_zero());
    }

    pub fn charset_value(&self) -> &'static Encoding {
        self.charset
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .field("charset", &self.charset.name())
            .finish()
    }
}
