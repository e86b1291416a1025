use std::ops::Deref;

use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;

use super::part::{strip_angle, HeaderSink};
use super::{Address, ContentDisposition, MailPart};
use crate::codec::decode_header_value;

lazy_static! {
    static ref TRAILING_ZONE_COMMENT: Regex = Regex::new(r"\s*\([^()]*\)\s*$").unwrap();
}

/// A decoded mail message.
///
/// A message is itself a [`MailPart`] (available through `Deref`), extended with the envelope
/// fields taken from its headers and with the parts found in its body. Textual leaves end up in
/// [`alternate_views`](Self::alternate_views); everything else becomes an [`Attachment`].
#[derive(Clone, Debug, PartialEq)]
pub struct MailMessage {
    pub(crate) part: MailPart,
    pub(crate) from: Option<Address>,
    pub(crate) sender: Option<Address>,
    pub(crate) reply_to: Option<Address>,
    pub(crate) to: Vec<Address>,
    pub(crate) cc: Vec<Address>,
    pub(crate) bcc: Vec<Address>,
    pub(crate) subject: Option<String>,
    pub(crate) subject_charset: Option<&'static Encoding>,
    pub(crate) date: DateTime<Utc>,
    pub(crate) alternate_views: Vec<MailPart>,
    pub(crate) attachments: Vec<Attachment>,
}

impl Default for MailMessage {
    fn default() -> Self {
        MailMessage {
            part: MailPart::default(),
            from: None,
            sender: None,
            reply_to: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: None,
            subject_charset: None,
            date: DateTime::<Utc>::MIN_UTC,
            alternate_views: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

impl MailMessage {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    pub fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    pub fn reply_to(&self) -> Option<&Address> {
        self.reply_to.as_ref()
    }

    pub fn to(&self) -> &[Address] {
        &self.to
    }

    pub fn cc(&self) -> &[Address] {
        &self.cc
    }

    pub fn bcc(&self) -> &[Address] {
        &self.bcc
    }

    /// The decoded subject.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The charset of the last encoded word in the raw subject, if it had any.
    pub fn subject_charset(&self) -> Option<&'static Encoding> {
        self.subject_charset
    }

    /// The `Date` header in UTC.
    ///
    /// A message without a parseable `Date` header reports [`DateTime::<Utc>::MIN_UTC`].
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// True if the message carried a `Date` header that could be parsed.
    pub fn has_date(&self) -> bool {
        self.date != DateTime::<Utc>::MIN_UTC
    }

    /// The textual parts of the message, in the order they were found.
    pub fn alternate_views(&self) -> &[MailPart] {
        &self.alternate_views
    }

    /// The non-textual parts of the message, in the order they were found.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// The underlying part holding the top-level headers and, for single-part messages, the
    /// body.
    pub fn part(&self) -> &MailPart {
        &self.part
    }

    /// Discards the envelope fields and children, keeping only the top-level part.
    pub fn into_part(self) -> MailPart {
        self.part
    }

    /// The message text.
    ///
    /// Without alternate views this is the message's own content. Otherwise it is the first
    /// alternate view with a `text/*` type, falling back to the first view.
    pub fn body(&self) -> Option<String> {
        match self.alternate_views.first() {
            None => self.part.text(),
            Some(first) => self
                .alternate_views
                .iter()
                .find(|view| view.content_type().is_text())
                .unwrap_or(first)
                .text(),
        }
    }

    /// The text of the first alternate view whose media type is `media_type`, e.g.
    /// `text/html`. Falls back to [`Self::body`] when there is no such view.
    pub fn body_of(&self, media_type: &str) -> Option<String> {
        self.alternate_views
            .iter()
            .find(|view| {
                view.content_type()
                    .media_type()
                    .eq_ignore_ascii_case(media_type.trim())
            })
            .map_or_else(|| self.body(), MailPart::text)
    }

    fn on_header(&mut self, name: &str, value: &str) {
        match name.to_ascii_lowercase().as_str() {
            "from" => self.from = Address::parse(&decode_header_value(value).0),
            "sender" => self.sender = Address::parse(&decode_header_value(value).0),
            "reply-to" => self.reply_to = Address::parse(&decode_header_value(value).0),
            "to" => self.to = Address::parse_list(&decode_header_value(value).0),
            "cc" => self.cc = Address::parse_list(&decode_header_value(value).0),
            "bcc" => self.bcc = Address::parse_list(&decode_header_value(value).0),
            "subject" => {
                let (subject, charset) = decode_header_value(value);
                self.subject = Some(subject);
                self.subject_charset = charset;
            }
            "date" => self.date = parse_date(value),
            _ => {}
        }
    }
}

impl Deref for MailMessage {
    type Target = MailPart;

    fn deref(&self) -> &MailPart {
        &self.part
    }
}

impl HeaderSink for MailMessage {
    fn add_header(&mut self, name: String, value: String) {
        self.on_header(&name, &value);
        self.part.add_header(name, value);
    }
}

/// A non-textual part of a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    pub(crate) part: MailPart,
    pub(crate) content_id: Option<String>,
    pub(crate) disposition: Option<ContentDisposition>,
}

impl Attachment {
    /// Turns a decoded part into an attachment, picking up its `Content-ID` and
    /// `Content-Disposition` headers.
    pub fn from_part(part: MailPart) -> Self {
        let headers: Vec<(String, String)> = part
            .headers()
            .iter()
            .filter(|(name, _)| {
                name.eq_ignore_ascii_case("content-id")
                    || name.eq_ignore_ascii_case("content-disposition")
            })
            .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
            .collect();
        let mut attachment = Attachment {
            part,
            content_id: None,
            disposition: None,
        };
        for (name, value) in headers {
            attachment.on_header(&name, &value);
        }
        attachment
    }

    /// The `Content-ID`, without angle brackets.
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    pub fn disposition(&self) -> Option<&ContentDisposition> {
        self.disposition.as_ref()
    }

    /// True if the attachment is meant to be shown inline, e.g. an image referenced from an
    /// HTML view by its content id.
    pub fn is_inline(&self) -> bool {
        self.disposition.as_ref().map_or(false, ContentDisposition::is_inline)
    }

    /// The file name from `Content-Disposition`, falling back to the `name` parameter of the
    /// content type.
    pub fn file_name(&self) -> Option<&str> {
        self.disposition
            .as_ref()
            .and_then(ContentDisposition::file_name)
            .or_else(|| self.part.content_type().name())
    }

    pub fn part(&self) -> &MailPart {
        &self.part
    }

    pub fn into_part(self) -> MailPart {
        self.part
    }

    fn on_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("content-id") {
            self.content_id = Some(strip_angle(value).to_string());
        } else if name.eq_ignore_ascii_case("content-disposition") {
            self.disposition = Some(ContentDisposition::parse(value));
        }
    }
}

impl Deref for Attachment {
    type Target = MailPart;

    fn deref(&self) -> &MailPart {
        &self.part
    }
}

impl HeaderSink for Attachment {
    fn add_header(&mut self, name: String, value: String) {
        self.on_header(&name, &value);
        self.part.add_header(name, value);
    }
}

/// Parses an RFC 2822 date, tolerating a trailing zone comment such as `(PDT)`.
///
/// Returns [`DateTime::<Utc>::MIN_UTC`] if the value is not a date.
pub(crate) fn parse_date(value: &str) -> DateTime<Utc> {
    let value = TRAILING_ZONE_COMMENT.replace(value.trim(), "");
    DateTime::parse_from_rfc2822(&value)
        .or_else(|_| DateTime::parse_from_rfc3339(&value))
        .map(|date| date.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::debug!("unparseable date {:?}: {}", value, e);
            DateTime::<Utc>::MIN_UTC
        })
}
