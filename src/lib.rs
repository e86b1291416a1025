//! Blocking POP3 and IMAP4 clients for retrieving mail, with a MIME decoder that turns raw
//! messages into a tree of headers, text views and attachments.
//!
//! # Usage
//!
//! Both sessions are configured with a [`ClientConfig`], connected once, used for any number
//! of commands and then disconnected (dropping a session disconnects it as well).
//!
//! ```no_run
//! use mailpost::{ClientConfig, Imap4Client, Pop3Client};
//!
//! fn main() -> mailpost::Result<()> {
//!     let mut pop3 = Pop3Client::new(
//!         ClientConfig::pop3("pop.example.com")
//!             .tls(true)
//!             .credentials("alice", "secret"),
//!     );
//!     pop3.connect()?;
//!     for info in pop3.list(true)? {
//!         if let Some(message) = pop3.message(info.id)? {
//!             println!("{}: {:?}", info.id, message.subject());
//!         }
//!     }
//!     pop3.disconnect();
//!
//!     let mut imap = Imap4Client::new(
//!         ClientConfig::imap("imap.example.com")
//!             .tls(true)
//!             .credentials("alice", "secret"),
//!     );
//!     imap.connect()?;
//!     for mailbox in imap.all_mailboxes()? {
//!         println!("{}", mailbox);
//!     }
//!     if let Some(inbox) = imap.select_mailbox("INBOX")? {
//!         if let Some(message) = inbox.message(&mut imap, 1)? {
//!             println!("{:?}", message.body());
//!             for attachment in message.attachments() {
//!                 println!("attached: {:?}", attachment.file_name());
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Messages that are already on hand can be decoded directly with [`mime::parse`] and its
//! siblings.

mod parse;
mod utils;

pub mod codec;
pub mod config;
pub mod conn;
pub mod error;
pub mod imap;
mod mailbox;
pub mod mime;
pub mod pop3;
pub mod reader;
pub mod types;

pub use crate::config::ClientConfig;
pub use crate::conn::{Connection, MailConnection, SetTimeout};
pub use crate::error::{Error, Result};
pub use crate::imap::{Imap4Client, Response};
pub use crate::pop3::Pop3Client;
pub use crate::reader::LineReader;
pub use crate::types::*;

#[cfg(test)]
mod mock_stream;
