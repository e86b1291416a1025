use std::fmt;

use super::MailboxStatus;

/// A mailbox on an IMAP4 server, as returned by `LIST`/`LSUB` or created by selecting it.
///
/// A `Mailbox` is plain data. Its operations (see the methods defined alongside the IMAP4
/// client) take the owning [`Imap4Client`](crate::Imap4Client) as an explicit argument, so a
/// mailbox never holds on to the connection. The `selected`, `subscribed` and `deleted` flags
/// cache the outcome of the last command issued through this handle and are not refreshed from
/// the server.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Mailbox {
    pub(crate) name: String,
    pub(crate) delimiter: Option<String>,
    pub(crate) attributes: Vec<NameAttribute>,
    pub(crate) selected: bool,
    pub(crate) subscribed: bool,
    pub(crate) deleted: bool,
    pub(crate) status: Option<MailboxStatus>,
}

impl Mailbox {
    /// A handle for the mailbox called `name`. Nothing is sent to the server.
    pub fn new(name: impl Into<String>) -> Self {
        Mailbox {
            name: name.into(),
            ..Mailbox::default()
        }
    }

    pub(crate) fn listed(
        name: String,
        delimiter: Option<String>,
        attributes: Vec<NameAttribute>,
        subscribed: bool,
    ) -> Self {
        Mailbox {
            name,
            delimiter,
            attributes,
            subscribed,
            ..Mailbox::default()
        }
    }

    /// The full name of the mailbox, including any hierarchy.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The hierarchy delimiter. `None` means that no hierarchy exists; the name is a "flat"
    /// name.
    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    /// Attributes reported for this name by `LIST` or `LSUB`.
    pub fn attributes(&self) -> &[NameAttribute] {
        &self.attributes[..]
    }

    /// True unless the server flagged this name `\Noselect`.
    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(&NameAttribute::NoSelect)
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// The status reported by the last successful `SELECT` or `EXAMINE` through this handle.
    pub fn last_status(&self) -> Option<&MailboxStatus> {
        self.status.as_ref()
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An attribute set for an IMAP name.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum NameAttribute {
    /// No child levels exist under this name and none can be created.
    NoInferiors,

    /// It is not possible to use this name as a selectable mailbox.
    NoSelect,

    /// The mailbox has probably received messages since it was last selected.
    Marked,

    /// The mailbox has not received messages since it was last selected.
    Unmarked,

    /// A non-standard user- or server-defined name attribute.
    Custom(String),
}

impl NameAttribute {
    fn system(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("\\Noinferiors") {
            Some(NameAttribute::NoInferiors)
        } else if s.eq_ignore_ascii_case("\\Noselect") {
            Some(NameAttribute::NoSelect)
        } else if s.eq_ignore_ascii_case("\\Marked") {
            Some(NameAttribute::Marked)
        } else if s.eq_ignore_ascii_case("\\Unmarked") {
            Some(NameAttribute::Unmarked)
        } else {
            None
        }
    }
}

impl From<&str> for NameAttribute {
    fn from(s: &str) -> Self {
        NameAttribute::system(s).unwrap_or_else(|| NameAttribute::Custom(s.to_string()))
    }
}

impl fmt::Display for NameAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NameAttribute::NoInferiors => f.write_str("\\Noinferiors"),
            NameAttribute::NoSelect => f.write_str("\\Noselect"),
            NameAttribute::Marked => f.write_str("\\Marked"),
            NameAttribute::Unmarked => f.write_str("\\Unmarked"),
            NameAttribute::Custom(ref s) => f.write_str(s),
        }
    }
}
