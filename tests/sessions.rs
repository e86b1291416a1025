use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mailpost::{ClientConfig, Error, Imap4Client, Mailbox, Pop3Client, Sequence, SessionState, SetTimeout};

/// Replays a canned server transcript and records everything the client sends.
struct Script {
    server: Cursor<Vec<u8>>,
    client: Arc<Mutex<Vec<u8>>>,
}

impl Script {
    fn new(server: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let client = Arc::new(Mutex::new(Vec::new()));
        let script = Script {
            server: Cursor::new(server.as_bytes().to_vec()),
            client: Arc::clone(&client),
        };
        (script, client)
    }
}

impl Read for Script {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.server.read(buf)
    }
}

impl Write for Script {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.client.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SetTimeout for Script {
    fn set_timeout(&mut self, _: Option<Duration>) -> io::Result<()> {
        Ok(())
    }
}

fn sent(client: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(client.lock().unwrap().clone()).unwrap()
}

fn pop3() -> Pop3Client {
    Pop3Client::new(ClientConfig::pop3("pop.example.com").credentials("alice", "secret"))
}

fn imap() -> Imap4Client {
    Imap4Client::new(ClientConfig::imap("imap.example.com").credentials("alice", "secret"))
}

const REPORT: &str = "From: Bob <bob@example.com>\r\n\
Subject: report\r\n\
Content-Type: multipart/mixed; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
hello\r\n\
..hidden dot\r\n\
--b\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"a.txt\"\r\n\
\r\n\
data\r\n\
--b--\r\n";

#[test]
fn pop3_session() {
    let (script, written) = Script::new(&format!(
        "+OK POP3 server ready\r\n\
         +OK\r\n\
         +OK maildrop locked\r\n\
         +OK 2 320\r\n\
         +OK 2 messages\r\n1 120\r\n2 200\r\n.\r\n\
         +OK\r\n1 whqtswO00WBw418f9t5JxYwZ\r\n2 QhdPYR:00WBw1Ph7x7\r\n.\r\n\
         +OK 120 octets\r\n{}.\r\n\
         +OK message 1 deleted\r\n\
         +OK bye\r\n",
        REPORT
    ));
    let mut client = pop3();
    client.connect_with(script).unwrap();
    assert_eq!(client.state(), SessionState::Connected);

    let stat = client.stat().unwrap().unwrap();
    assert_eq!((stat.count, stat.size), (2, 320));

    let infos = client.list(true).unwrap();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[1].size, 200);
    assert_eq!(infos[0].uid.as_deref(), Some("whqtswO00WBw418f9t5JxYwZ"));

    let message = client.message(1).unwrap().unwrap();
    assert_eq!(message.subject(), Some("report"));
    assert_eq!(message.from().unwrap().address(), "bob@example.com");
    assert_eq!(message.body().as_deref(), Some("hello\r\n.hidden dot\r\n"));
    assert_eq!(message.alternate_views().len(), 1);
    assert_eq!(message.attachments().len(), 1);
    assert_eq!(message.attachments()[0].file_name(), Some("a.txt"));
    assert_eq!(message.attachments()[0].text().as_deref(), Some("data\r\n"));

    assert!(client.delete(1).unwrap());
    client.disconnect();
    client.disconnect();
    drop(client);

    assert_eq!(
        sent(&written),
        "USER alice\r\nPASS secret\r\nSTAT\r\nLIST\r\nUIDL\r\nRETR 1\r\nDELE 1\r\nQUIT\r\n"
    );
}

#[test]
fn pop3_rejected_login() {
    let (script, written) = Script::new(
        "+OK POP3 server ready\r\n+OK\r\n-ERR invalid password\r\n+OK bye\r\n",
    );
    let mut client = pop3();
    match client.connect_with(script) {
        Err(Error::Login { ref response, .. }) => assert!(response.contains("invalid password")),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(client.state(), SessionState::Disconnected);
    assert_eq!(sent(&written), "USER alice\r\nPASS secret\r\nQUIT\r\n");
}

#[test]
fn imap_session() {
    let (script, written) = Script::new(
        "* OK IMAP4rev1 Service Ready\r\n\
         C0001 OK LOGIN completed\r\n\
         * LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n\
         * LIST (\\Noselect \\HasChildren) \"/\" \"Archive\"\r\n\
         C0002 OK LIST completed\r\n\
         * 2 EXISTS\r\n\
         * 0 RECENT\r\n\
         * OK [UIDVALIDITY 1] UIDs valid\r\n\
         C0003 OK [READ-WRITE] SELECT completed\r\n\
         * 1 FETCH (BODY[HEADER] {18}\r\nSubject: first\r\n\r\n)\r\n\
         * 2 FETCH (BODY[HEADER] {19}\r\nSubject: second\r\n\r\n)\r\n\
         C0004 OK FETCH completed\r\n\
         C0005 OK STORE completed\r\n\
         * 1 EXPUNGE\r\n\
         C0006 OK EXPUNGE completed\r\n\
         * BYE logging out\r\n\
         C0007 OK LOGOUT completed\r\n",
    );
    let mut client = imap();
    client.connect_with(script).unwrap();

    let mailboxes = client.all_mailboxes().unwrap();
    let names: Vec<_> = mailboxes.iter().map(Mailbox::name).collect();
    assert_eq!(names, vec!["INBOX", "Archive"]);
    assert!(!mailboxes[1].is_selectable());

    let inbox = client.select_mailbox("INBOX").unwrap().unwrap();
    assert!(inbox.is_selected());
    assert_eq!(inbox.last_status().unwrap().total_messages, 2);
    assert_eq!(inbox.last_status().unwrap().uid_validity, Some(1));

    let subjects: Vec<_> = inbox
        .messages(&mut client, false)
        .unwrap()
        .iter()
        .map(|m| m.subject().map(str::to_string))
        .collect();
    assert_eq!(subjects, vec![Some("first".to_string()), Some("second".to_string())]);

    assert!(inbox.remove(&mut client, Sequence::Single(1)).unwrap());
    client.disconnect();
    client.disconnect();

    assert_eq!(
        sent(&written),
        "C0001 LOGIN \"alice\" \"secret\"\r\n\
         C0002 LIST \"\" \"*\"\r\n\
         C0003 SELECT \"INBOX\"\r\n\
         C0004 FETCH 1:* (BODY[HEADER])\r\n\
         C0005 STORE 1 +FLAGS (\\Deleted)\r\n\
         C0006 EXPUNGE\r\n\
         C0007 LOGOUT\r\n"
    );
}

#[test]
fn disconnected_sessions_refuse_commands() {
    let (script, written) = Script::new("* OK ready\r\nC0001 OK\r\nC0002 OK LOGOUT completed\r\n");
    let mut client = imap();
    client.connect_with(script).unwrap();
    client.disconnect();
    let before = sent(&written);

    let inbox = Mailbox::new("INBOX");
    assert!(matches!(
        inbox.messages(&mut client, true),
        Err(Error::State {
            required: SessionState::Connected,
            actual: SessionState::Disconnected
        })
    ));
    assert!(matches!(inbox.size(&mut client, 1), Err(Error::State { .. })));
    assert_eq!(sent(&written), before);

    let mut pop3 = pop3();
    assert!(matches!(pop3.stat(), Err(Error::State { .. })));
    assert!(matches!(pop3.retrieve(1), Err(Error::State { .. })));
}

fn test_host() -> String {
    std::env::var("TEST_HOST").unwrap_or("127.0.0.1".to_string())
}

fn test_imap_port() -> u16 {
    std::env::var("TEST_IMAP_PORT")
        .unwrap_or("3143".to_string())
        .parse()
        .unwrap_or(3143)
}

#[test]
#[ignore = "needs an IMAP server at TEST_HOST:TEST_IMAP_PORT"]
fn live_imap_login() {
    let user = std::env::var("TEST_USER").unwrap_or("readonly-test@localhost".to_string());
    let password = std::env::var("TEST_PASSWORD").unwrap_or("password".to_string());
    let mut client = Imap4Client::new(
        ClientConfig::new(test_host(), test_imap_port()).credentials(user, password),
    );
    client.connect().unwrap();
    assert_eq!(client.state(), SessionState::Connected);
    assert!(client
        .all_mailboxes()
        .unwrap()
        .iter()
        .any(|mailbox| mailbox.name().eq_ignore_ascii_case("INBOX")));
    client.disconnect();
}
