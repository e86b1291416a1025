//! This module contains types used throughout the POP3 and IMAP4 sessions and the MIME decoder.

use std::fmt;

/// A relative position from 1 to the number of messages in the mailbox.
///
/// Message sequence numbers are session-local. A POP3 server assigns them when the maildrop is
/// opened, and an IMAP4 server renumbers them whenever messages are expunged, so they must not
/// be stored across sessions. Use the unique id of a [`MailInfo`] for that.
pub type Seq = u32;

/// The lifecycle state of a POP3 or IMAP4 session.
///
/// A session starts `Disconnected`, moves to `Authorizing` once the server has greeted it, and
/// becomes `Connected` after a successful login. Disconnecting always returns it to
/// `Disconnected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport is open.
    Disconnected,
    /// The server has greeted the client but the login has not completed.
    Authorizing,
    /// The client is logged in and may issue mailbox commands.
    Connected,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Disconnected
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            SessionState::Disconnected => "disconnected",
            SessionState::Authorizing => "authorizing",
            SessionState::Connected => "connected",
        })
    }
}

mod address;
pub use self::address::{Address, InvalidAddress};

mod content_type;
pub use self::content_type::{ContentDisposition, ContentType};

mod headers;
pub use self::headers::HeaderMap;

mod mail_info;
pub use self::mail_info::{MailInfo, MailboxStat};

mod mailbox;
pub use self::mailbox::{MailboxStatus, StatusItem};

mod message;
pub use self::message::{Attachment, MailMessage};

mod name;
pub use self::name::{Mailbox, NameAttribute};

mod part;
pub(crate) use self::part::HeaderSink;
pub use self::part::MailPart;

mod sequence;
pub use self::sequence::{ParseSequenceError, Sequence};

pub use crate::codec::TransferEncoding;
