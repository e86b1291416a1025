//! Operations on a single IMAP4 mailbox.
//!
//! A [`Mailbox`] does not hold on to its session; each operation takes the
//! [`Imap4Client`] to run on. All of them require a connected session and fail with
//! [`Error::State`](crate::Error::State) otherwise.

use crate::codec::decode_text;
use crate::error::Result;
use crate::imap::{validate_str, Imap4Client, Response};
use crate::mime;
use crate::parse::{parse_mailbox_status, parse_size, parse_status};
use crate::types::*;
use crate::utils::iter_join;

impl Mailbox {
    /// Selects this mailbox with `SELECT`. On success the mailbox is marked selected and the
    /// reported status is returned and kept on the handle.
    pub fn select(&mut self, client: &mut Imap4Client) -> Result<Option<MailboxStatus>> {
        let status = self.open("SELECT", client)?;
        if status.is_some() {
            self.selected = true;
        }
        Ok(status)
    }

    /// Like [`select`](Self::select), but opens the mailbox read-only with `EXAMINE`.
    pub fn examine(&mut self, client: &mut Imap4Client) -> Result<Option<MailboxStatus>> {
        let status = self.open("EXAMINE", client)?;
        if status.is_some() {
            self.selected = true;
        }
        Ok(status)
    }

    fn open(&mut self, command: &str, client: &mut Imap4Client) -> Result<Option<MailboxStatus>> {
        let response = self.run(client, &format!("{} {}", command, validate_str(&self.name)?))?;
        if !response.is_ok() {
            return Ok(None);
        }
        let status = parse_mailbox_status(&response.text());
        self.status = Some(status.clone());
        Ok(Some(status))
    }

    /// Closes this mailbox with `CLOSE` if it is selected.
    pub fn close(&mut self, client: &mut Imap4Client) -> Result<bool> {
        client.ensure_connected()?;
        if !self.selected {
            return Ok(false);
        }
        let closed = client.close_mailbox()?;
        if closed {
            self.selected = false;
        }
        Ok(closed)
    }

    /// Queries `items` with `STATUS`. Does not change the selected mailbox.
    pub fn status(
        &self,
        client: &mut Imap4Client,
        items: &[StatusItem],
    ) -> Result<Option<MailboxStatus>> {
        let items = if items.is_empty() { StatusItem::ALL } else { items };
        let response = self.run(
            client,
            &format!("STATUS {} ({})", validate_str(&self.name)?, iter_join(items, " ")),
        )?;
        Ok(if response.is_ok() {
            Some(parse_status(&response.text()))
        } else {
            None
        })
    }

    /// Renames this mailbox to `name`.
    pub fn rename(&mut self, client: &mut Imap4Client, name: &str) -> Result<bool> {
        let command = format!("RENAME {} {}", validate_str(&self.name)?, validate_str(name)?);
        let renamed = self.run(client, &command)?.is_ok();
        if renamed {
            self.name = name.to_string();
        }
        Ok(renamed)
    }

    pub fn delete(&mut self, client: &mut Imap4Client) -> Result<bool> {
        let deleted = self
            .run(client, &format!("DELETE {}", validate_str(&self.name)?))?
            .is_ok();
        if deleted {
            self.deleted = true;
        }
        Ok(deleted)
    }

    pub fn subscribe(&mut self, client: &mut Imap4Client) -> Result<bool> {
        let subscribed = self
            .run(client, &format!("SUBSCRIBE {}", validate_str(&self.name)?))?
            .is_ok();
        if subscribed {
            self.subscribed = true;
        }
        Ok(subscribed)
    }

    pub fn unsubscribe(&mut self, client: &mut Imap4Client) -> Result<bool> {
        let unsubscribed = self
            .run(client, &format!("UNSUBSCRIBE {}", validate_str(&self.name)?))?
            .is_ok();
        if unsubscribed {
            self.subscribed = false;
        }
        Ok(unsubscribed)
    }

    /// Fetches and decodes every message in the mailbox. With `all_data` false only the
    /// headers are fetched, so the messages have no bodies.
    pub fn messages(&self, client: &mut Imap4Client, all_data: bool) -> Result<Vec<MailMessage>> {
        let section = if all_data { "" } else { "HEADER" };
        let response = self.fetch(client, Sequence::ALL, &format!("(BODY[{}])", section))?;
        Ok(response
            .literals()
            .iter()
            .map(|literal| mime::parse_with_charset(literal, response.charset()))
            .collect())
    }

    /// Fetches and decodes message `id`.
    pub fn message(&self, client: &mut Imap4Client, id: Seq) -> Result<Option<MailMessage>> {
        let response = self.fetch(client, id, "(BODY[])")?;
        Ok(response
            .literals()
            .first()
            .map(|literal| mime::parse_with_charset(literal, response.charset())))
    }

    /// Fetches the raw source of message `id`, decoded in the session charset.
    pub fn content(&self, client: &mut Imap4Client, id: Seq) -> Result<Option<String>> {
        let response = self.fetch(client, id, "(BODY[])")?;
        Ok(response
            .literals()
            .first()
            .map(|literal| decode_text(literal, response.charset())))
    }

    /// The size of message `id` in bytes, from `RFC822.SIZE`.
    pub fn size(&self, client: &mut Imap4Client, id: Seq) -> Result<Option<u64>> {
        let response = self.fetch(client, id, "(RFC822.SIZE)")?;
        Ok(parse_size(&response.text()))
    }

    /// Sends `FETCH sequence items`. A failed fetch yields a response without data.
    pub fn fetch(
        &self,
        client: &mut Imap4Client,
        sequence: impl Into<Sequence>,
        items: &str,
    ) -> Result<Response> {
        client.fetch(sequence, items)
    }

    /// Sets `flags` on the messages in `sequence` with `STORE ... +FLAGS`.
    pub fn add_flags(
        &self,
        client: &mut Imap4Client,
        sequence: impl Into<Sequence>,
        flags: &[&str],
    ) -> Result<bool> {
        client.store(sequence.into(), "+FLAGS", flags)
    }

    /// Clears `flags` on the messages in `sequence` with `STORE ... -FLAGS`.
    pub fn remove_flags(
        &self,
        client: &mut Imap4Client,
        sequence: impl Into<Sequence>,
        flags: &[&str],
    ) -> Result<bool> {
        client.store(sequence.into(), "-FLAGS", flags)
    }

    /// Flags the messages in `sequence` `\Deleted` and expunges them. Nothing is expunged if
    /// the flags could not be set.
    pub fn remove(&self, client: &mut Imap4Client, sequence: impl Into<Sequence>) -> Result<bool> {
        if !self.add_flags(client, sequence, &["\\Deleted"])? {
            return Ok(false);
        }
        client.expunge()
    }

    fn run(&self, client: &mut Imap4Client, command: &str) -> Result<Response> {
        log::debug!("{} on mailbox {}", command.split(' ').next().unwrap_or(command), self.name);
        client.run_command(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::Error;
    use crate::mock_stream::{written_text, MockStream};
    use std::sync::{Arc, Mutex};

    const LOGIN: &str = "* OK ready\r\nC0001 OK LOGIN completed\r\n";

    fn connected(script: &str) -> (Imap4Client, Arc<Mutex<Vec<u8>>>) {
        let mock = MockStream::new(format!("{}{}", LOGIN, script).into_bytes());
        let written = mock.written();
        let mut client =
            Imap4Client::new(ClientConfig::imap("imap.example.com").credentials("alice", "secret"));
        client.connect_with(mock).unwrap();
        written.lock().unwrap().clear();
        (client, written)
    }

    const SELECT: &str = "* 172 EXISTS\r\n\
                          * 1 RECENT\r\n\
                          * OK [UNSEEN 12] Message 12 is first unseen\r\n\
                          * OK [UIDVALIDITY 3857529045] UIDs valid\r\n\
                          * OK [UIDNEXT 4392] Predicted next UID\r\n\
                          * FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
                          C0002 OK [READ-WRITE] SELECT completed\r\n";

    #[test]
    fn select_keeps_status() {
        let (mut client, written) = connected(SELECT);
        let mut inbox = client.select_mailbox("INBOX").unwrap().unwrap();
        assert!(inbox.is_selected());
        let status = inbox.last_status().cloned().unwrap();
        assert_eq!(status.total_messages, 172);
        assert_eq!(status.recent_messages, 1);
        assert_eq!(status.unseen_messages, 12);
        assert_eq!(status.uid_validity, Some(3857529045));
        assert_eq!(status.uid_next, Some(4392));
        assert_eq!(status.flag_list().count(), 5);
        assert_eq!(written_text(&written), "C0002 SELECT \"INBOX\"\r\n");
        inbox.selected = false;
        assert!(!inbox.close(&mut client).unwrap());
    }

    #[test]
    fn failed_select() {
        let (mut client, _) = connected("C0002 NO no such mailbox\r\n");
        assert_eq!(client.select_mailbox("Nope").unwrap(), None);
    }

    #[test]
    fn examine_then_close() {
        let (mut client, written) =
            connected("* 3 EXISTS\r\nC0002 OK [READ-ONLY] done\r\nC0003 OK CLOSE completed\r\n");
        let mut mailbox = Mailbox::new("Archive");
        let status = mailbox.examine(&mut client).unwrap().unwrap();
        assert_eq!(status.total_messages, 3);
        assert!(mailbox.is_selected());
        assert!(mailbox.close(&mut client).unwrap());
        assert!(!mailbox.is_selected());
        assert_eq!(
            written_text(&written),
            "C0002 EXAMINE \"Archive\"\r\nC0003 CLOSE\r\n"
        );
    }

    #[test]
    fn status_items() {
        let (mut client, written) = connected(
            "* STATUS \"INBOX\" (MESSAGES 231 UIDNEXT 44292)\r\nC0002 OK STATUS completed\r\n",
        );
        let status = Mailbox::new("INBOX")
            .status(&mut client, &[StatusItem::Messages, StatusItem::UidNext])
            .unwrap()
            .unwrap();
        assert_eq!(status.total_messages, 231);
        assert_eq!(status.uid_next, Some(44292));
        assert_eq!(
            written_text(&written),
            "C0002 STATUS \"INBOX\" (MESSAGES UIDNEXT)\r\n"
        );
    }

    #[test]
    fn rename_delete_subscribe() {
        let (mut client, written) = connected(
            "C0002 OK RENAME completed\r\n\
             C0003 OK SUBSCRIBE completed\r\n\
             C0004 NO not subscribed\r\n\
             C0005 OK DELETE completed\r\n",
        );
        let mut mailbox = Mailbox::new("Drafts");
        assert!(mailbox.rename(&mut client, "Old Drafts").unwrap());
        assert_eq!(mailbox.name(), "Old Drafts");
        assert!(mailbox.subscribe(&mut client).unwrap());
        assert!(mailbox.is_subscribed());
        assert!(!mailbox.unsubscribe(&mut client).unwrap());
        assert!(mailbox.is_subscribed());
        assert!(mailbox.delete(&mut client).unwrap());
        assert!(mailbox.is_deleted());
        assert_eq!(
            written_text(&written),
            "C0002 RENAME \"Drafts\" \"Old Drafts\"\r\n\
             C0003 SUBSCRIBE \"Old Drafts\"\r\n\
             C0004 UNSUBSCRIBE \"Old Drafts\"\r\n\
             C0005 DELETE \"Old Drafts\"\r\n"
        );
    }

    #[test]
    fn header_only_messages() {
        let (mut client, written) = connected(
            "* 1 FETCH (BODY[HEADER] {14}\r\nSubject: A\r\n\r\n)\r\n\
             * 2 FETCH (BODY[HEADER] {14}\r\nSubject: B\r\n\r\n)\r\n\
             C0002 OK FETCH completed\r\n",
        );
        let messages = Mailbox::new("INBOX").messages(&mut client, false).unwrap();
        let subjects: Vec<_> = messages.iter().map(|m| m.subject()).collect();
        assert_eq!(subjects, vec![Some("A"), Some("B")]);
        assert_eq!(written_text(&written), "C0002 FETCH 1:* (BODY[HEADER])\r\n");
    }

    #[test]
    fn single_message_and_content() {
        let script = "* 7 FETCH (BODY[] {21}\r\nSubject: Hi\r\n\r\nBody\r\n)\r\nC0002 OK done\r\n";
        let (mut client, written) = connected(&format!(
            "{}{}",
            script,
            script.replace("C0002", "C0003")
        ));
        let mailbox = Mailbox::new("INBOX");
        let message = mailbox.message(&mut client, 7).unwrap().unwrap();
        assert_eq!(message.subject(), Some("Hi"));
        assert_eq!(message.body().as_deref(), Some("Body\r\n"));
        assert_eq!(
            mailbox.content(&mut client, 7).unwrap().as_deref(),
            Some("Subject: Hi\r\n\r\nBody\r\n")
        );
        assert_eq!(
            written_text(&written),
            "C0002 FETCH 7 (BODY[])\r\nC0003 FETCH 7 (BODY[])\r\n"
        );
    }

    #[test]
    fn missing_message() {
        let (mut client, _) = connected("C0002 NO no such message\r\n");
        assert_eq!(Mailbox::new("INBOX").message(&mut client, 9).unwrap(), None);
    }

    #[test]
    fn size() {
        let (mut client, written) =
            connected("* 3 FETCH (RFC822.SIZE 4286)\r\nC0002 OK FETCH completed\r\n");
        assert_eq!(Mailbox::new("INBOX").size(&mut client, 3).unwrap(), Some(4286));
        assert_eq!(written_text(&written), "C0002 FETCH 3 (RFC822.SIZE)\r\n");
    }

    #[test]
    fn flags_and_removal() {
        let (mut client, written) = connected(
            "C0002 OK STORE completed\r\n\
             C0003 OK STORE completed\r\n\
             C0004 OK STORE completed\r\n\
             C0005 OK EXPUNGE completed\r\n\
             C0006 NO STORE failed\r\n",
        );
        let mailbox = Mailbox::new("INBOX");
        assert!(mailbox
            .add_flags(&mut client, Sequence::Range(1, 3), &["\\Seen", "\\Flagged"])
            .unwrap());
        assert!(mailbox.remove_flags(&mut client, Sequence::Single(2), &["\\Seen"]).unwrap());
        assert!(mailbox.remove(&mut client, Sequence::From(4)).unwrap());
        assert!(!mailbox.remove(&mut client, Sequence::Single(5)).unwrap());
        assert_eq!(
            written_text(&written),
            "C0002 STORE 1:3 +FLAGS (\\Seen \\Flagged)\r\n\
             C0003 STORE 2 -FLAGS (\\Seen)\r\n\
             C0004 STORE 4:* +FLAGS (\\Deleted)\r\n\
             C0005 EXPUNGE\r\n\
             C0006 STORE 5 +FLAGS (\\Deleted)\r\n"
        );
    }

    #[test]
    fn operations_require_connection() {
        let mut client =
            Imap4Client::new(ClientConfig::imap("imap.example.com").credentials("alice", "secret"));
        let mut mailbox = Mailbox::new("INBOX");
        assert!(matches!(mailbox.select(&mut client), Err(Error::State { .. })));
        assert!(matches!(mailbox.messages(&mut client, true), Err(Error::State { .. })));
        assert!(matches!(mailbox.close(&mut client), Err(Error::State { .. })));
        assert!(matches!(mailbox.delete(&mut client), Err(Error::State { .. })));
        assert!(!mailbox.is_deleted());
    }
}
