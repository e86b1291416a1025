//! Parsing of server responses.
//!
//! The IMAP4 helpers take the accumulated untagged lines of one command (the completion line is
//! not included) and pick out the data they understand. Lines they do not recognise are
//! skipped, so a response with unexpected untagged data still yields whatever was parseable.

use lazy_static::lazy_static;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;

use crate::types::*;

lazy_static! {
    static ref UNSEEN_CODE: Regex = Regex::new(r"(?i)^\[UNSEEN\s+(\d+)\s*\]").unwrap();
    static ref UIDVALIDITY_CODE: Regex = Regex::new(r"(?i)^\[UIDVALIDITY\s+(\d+)\s*\]").unwrap();
    static ref UIDNEXT_CODE: Regex = Regex::new(r"(?i)^\[UIDNEXT\s+(\d+)\s*\]").unwrap();
    static ref STATUS_LINE: Regex =
        Regex::new(r#"(?i)^\S+\s+STATUS\s+(?:"[^"]*"|\S+)\s+\(([^)]*)\)\s*$"#).unwrap();
    static ref LIST_LINE: Regex = Regex::new(
        r#"(?i)^[*=]\s+\S+\s+\(([^)]*)\)\s+(?:"([^"]*)"|(\S+))\s+(?:"([^"]+)"|(\S+))$"#
    )
    .unwrap();
    static ref FETCH_LITERAL: BytesRegex =
        BytesRegex::new(r"(?i)^[*=]\s+\S+\s+FETCH\s+\(BODY\[[^\]]*\]\s+\{(\d+)\}\)?$").unwrap();
    static ref LITERAL_SUFFIX: BytesRegex = BytesRegex::new(r"\{(\d+)\}$").unwrap();
    static ref RFC822_SIZE: Regex = Regex::new(r"(?i)RFC822\.SIZE (\d+)").unwrap();
}

fn to_u32(s: &str) -> u32 {
    s.trim().parse().unwrap_or(0)
}

/// Builds a status snapshot from the untagged lines of a `SELECT` or `EXAMINE` response.
///
/// `* n EXISTS` and `* n RECENT` give the counts, `* FLAGS (...)` the raw flag list, and the
/// `[UNSEEN n]`, `[UIDVALIDITY n]` and `[UIDNEXT n]` response codes of `* OK` lines the rest.
pub fn parse_mailbox_status(data: &str) -> MailboxStatus {
    let mut status = MailboxStatus::default();
    for line in data.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let items: Vec<&str> = line.splitn(3, ' ').collect();
        if items.len() < 3 {
            continue;
        }
        if items[2].eq_ignore_ascii_case("EXISTS") {
            status.total_messages = to_u32(items[1]);
        } else if items[2].eq_ignore_ascii_case("RECENT") {
            status.recent_messages = to_u32(items[1]);
        } else if items[1].eq_ignore_ascii_case("FLAGS") {
            status.flags = items[2].trim_matches(|c| c == '(' || c == ')').to_string();
        } else if let Some(cap) = UNSEEN_CODE.captures(items[2]) {
            status.unseen_messages = to_u32(&cap[1]);
        } else if let Some(cap) = UIDVALIDITY_CODE.captures(items[2]) {
            status.uid_validity = cap[1].parse().ok();
        } else if let Some(cap) = UIDNEXT_CODE.captures(items[2]) {
            status.uid_next = cap[1].parse().ok();
        }
    }
    status
}

/// Builds a status snapshot from the `* STATUS mailbox (name value ...)` line of a `STATUS`
/// response.
pub fn parse_status(data: &str) -> MailboxStatus {
    let mut status = MailboxStatus::default();
    for line in data.lines() {
        let cap = match STATUS_LINE.captures(line.trim()) {
            Some(cap) => cap,
            None => continue,
        };
        let tokens: Vec<&str> = cap[1].split_whitespace().collect();
        for pair in tokens.chunks_exact(2) {
            let (name, value) = (pair[0], pair[1]);
            if name.eq_ignore_ascii_case("MESSAGES") {
                status.total_messages = to_u32(value);
            } else if name.eq_ignore_ascii_case("RECENT") {
                status.recent_messages = to_u32(value);
            } else if name.eq_ignore_ascii_case("UNSEEN") {
                status.unseen_messages = to_u32(value);
            } else if name.eq_ignore_ascii_case("UIDNEXT") {
                status.uid_next = value.parse().ok();
            } else if name.eq_ignore_ascii_case("UIDVALIDITY") {
                status.uid_validity = value.parse().ok();
            }
        }
    }
    status
}

/// Collects the mailboxes named by the `* LIST` or `* LSUB` lines of a response. Lines that do
/// not have the shape `* LIST (<attributes>) <delimiter> <name>` are skipped.
pub fn parse_mailboxes(data: &str, subscribed: bool) -> Vec<Mailbox> {
    data.lines()
        .filter_map(|line| LIST_LINE.captures(line.trim_end()))
        .map(|cap| {
            let attributes = cap[1].split_whitespace().map(NameAttribute::from).collect();
            let delimiter = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str())
                .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("NIL"))
                .map(str::to_string);
            let name = cap
                .get(4)
                .or_else(|| cap.get(5))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Mailbox::listed(name, delimiter, attributes, subscribed)
        })
        .collect()
}

/// Extracts the literal payloads announced by `* n FETCH (BODY[section] {count}` lines.
///
/// The `count` bytes following the announcing line are the payload. A payload cut short by the
/// end of the data is returned as far as it goes; an empty one is skipped.
pub fn parse_fetch_literals(data: &[u8]) -> Vec<Vec<u8>> {
    let mut literals = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let (line, next) = match data[pos..].iter().position(|&b| b == b'\n') {
            Some(i) => (&data[pos..pos + i], pos + i + 1),
            None => (&data[pos..], data.len()),
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        pos = next;

        let length = FETCH_LITERAL
            .captures(line)
            .and_then(|cap| std::str::from_utf8(&cap[1]).ok()?.parse::<usize>().ok());
        if let Some(length) = length {
            let end = pos.saturating_add(length).min(data.len());
            if end > pos {
                literals.push(data[pos..end].to_vec());
            }
            pos = end;
        }
    }
    literals
}

/// The byte count of the literal announced at the end of a response line, if any.
pub fn literal_length(line: &[u8]) -> Option<usize> {
    let cap = LITERAL_SUFFIX.captures(line)?;
    std::str::from_utf8(&cap[1]).ok()?.parse().ok()
}

/// The value of the first `RFC822.SIZE` item in a `FETCH` response.
pub fn parse_size(data: &str) -> Option<u64> {
    RFC822_SIZE
        .captures(data)
        .and_then(|cap| cap[1].parse().ok())
}

/// Parses the `+OK count size` reply to `STAT`.
pub fn parse_stat(line: &str) -> Option<MailboxStat> {
    let mut tokens = line.split_whitespace().skip(1);
    let count = tokens.next()?.parse().ok()?;
    let size = tokens.next()?.parse().ok()?;
    Some(MailboxStat { count, size })
}

/// Parses a `n size` line of a `LIST` listing, or the `+OK n size` reply to `LIST n`.
pub fn parse_list_entry(line: &str) -> Option<MailInfo> {
    let mut tokens = line.split_whitespace().skip_while(|t| t.starts_with('+'));
    let id = tokens.next()?.parse().ok()?;
    let size = tokens.next()?.parse().ok()?;
    Some(MailInfo::new(id, size))
}

/// Parses a `n uid` line of a `UIDL` listing, or the `+OK n uid` reply to `UIDL n`.
pub fn parse_uid_entry(line: &str) -> Option<(Seq, String)> {
    let mut tokens = line.split_whitespace().skip_while(|t| t.starts_with('+'));
    let id = tokens.next()?.parse().ok()?;
    let uid = tokens.next()?;
    Some((id, uid.to_string()))
}
