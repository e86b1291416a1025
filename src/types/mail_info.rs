use std::fmt;

use super::Seq;

/// One entry of a maildrop listing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MailInfo {
    /// The session-local message number.
    pub id: Seq,
    /// The unique id of the message, if the server reported one. Unlike `id`, it stays the same
    /// across sessions.
    pub uid: Option<String>,
    /// The size of the message in octets.
    pub size: u64,
}

impl MailInfo {
    pub fn new(id: Seq, size: u64) -> Self {
        MailInfo {
            id,
            uid: None,
            size,
        }
    }
}

impl fmt::Display for MailInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.size)?;
        if let Some(ref uid) = self.uid {
            write!(f, " {}", uid)?;
        }
        Ok(())
    }
}

/// The reply to a POP3 `STAT` command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MailboxStat {
    /// Number of messages in the maildrop.
    pub count: u32,
    /// Total size of the maildrop in octets.
    pub size: u64,
}
