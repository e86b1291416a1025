use std::fmt;

/// A snapshot of the state of a mailbox, as reported by `SELECT`, `EXAMINE` or `STATUS`.
///
/// Each query produces a new snapshot; nothing updates one in place.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MailboxStatus {
    /// The number of messages in the mailbox.
    pub total_messages: u32,
    /// The number of messages with the `\Recent` flag set.
    pub recent_messages: u32,
    /// For `SELECT`/`EXAMINE`, the sequence number of the first unseen message. For `STATUS`,
    /// the number of messages without the `\Seen` flag.
    pub unseen_messages: u32,
    /// The next unique identifier value, if reported.
    pub uid_next: Option<u32>,
    /// The unique identifier validity value, if reported.
    pub uid_validity: Option<u32>,
    /// The flags defined in the mailbox, as the raw space-separated text the server sent.
    pub flags: String,
}

impl MailboxStatus {
    /// The defined flags as separate tokens.
    pub fn flag_list(&self) -> impl Iterator<Item = &str> {
        self.flags.split_whitespace()
    }
}

impl fmt::Display for MailboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flags: ({}), exists: {}, recent: {}, unseen: {}, uid_next: {:?}, uid_validity: {:?}",
            self.flags,
            self.total_messages,
            self.recent_messages,
            self.unseen_messages,
            self.uid_next,
            self.uid_validity
        )
    }
}

/// A status data item that can be requested with the `STATUS` command.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StatusItem {
    Messages,
    Recent,
    UidNext,
    UidValidity,
    Unseen,
}

impl StatusItem {
    /// Every item, in the order servers usually report them.
    pub const ALL: &'static [StatusItem] = &[
        StatusItem::Messages,
        StatusItem::Recent,
        StatusItem::UidNext,
        StatusItem::UidValidity,
        StatusItem::Unseen,
    ];
}

impl fmt::Display for StatusItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            StatusItem::Messages => "MESSAGES",
            StatusItem::Recent => "RECENT",
            StatusItem::UidNext => "UIDNEXT",
            StatusItem::UidValidity => "UIDVALIDITY",
            StatusItem::Unseen => "UNSEEN",
        })
    }
}
