use encoding_rs::Encoding;

use super::{ContentType, HeaderMap};
use crate::codec::{self, TransferEncoding};

/// Receives the headers of a part as the decoder reads them.
///
/// Every kind of node in a message tree implements this. `add_header` records the header in
/// the node's [`HeaderMap`] and, in the same step, updates whatever fields the node derives
/// from that header name. Headers arrive in the order they appear in the message, so a node
/// always sees e.g. its `Content-Type` before the decoder looks at its body.
pub(crate) trait HeaderSink {
    fn add_header(&mut self, name: String, value: String);
}

/// A single node of a message tree: a header block plus either decoded content or, for
/// multipart containers, nothing (the children are collected by the enclosing
/// [`MailMessage`](super::MailMessage)).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MailPart {
    pub(crate) headers: HeaderMap,
    pub(crate) content_type: ContentType,
    pub(crate) transfer_encoding: TransferEncoding,
    pub(crate) content: Option<Vec<u8>>,
    pub(crate) charset: Option<&'static Encoding>,
    pub(crate) message_id: Option<String>,
}

impl MailPart {
    /// Creates an empty `text/plain` part.
    pub fn new() -> Self {
        Self::default()
    }

    /// The headers of this part, in the order they were read.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The parsed `Content-Type` of this part.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// The transfer encoding the body arrived in.
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.transfer_encoding
    }

    /// The `Message-ID` of this part, without angle brackets.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// The decoded content of this part.
    ///
    /// For textual parts these are the bytes of the decoded text in [`Self::charset`],
    /// whatever transfer encoding the part arrived in. For base64 encoded non-text parts they
    /// are the raw decoded bytes. Multipart containers have no content.
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// True if this part carries content.
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// The charset the content is stored in: the one the decoder resolved for this part, else
    /// the `charset` parameter of its content type, else UTF-8.
    pub fn charset(&self) -> &'static Encoding {
        self.charset
            .unwrap_or_else(|| codec::charset(self.content_type.charset().unwrap_or("")))
    }

    /// The content decoded as text in [`Self::charset`].
    pub fn text(&self) -> Option<String> {
        self.content
            .as_deref()
            .map(|bytes| codec::decode_text(bytes, self.charset()))
    }

    pub(crate) fn set_content(&mut self, content: Vec<u8>, charset: &'static Encoding) {
        self.content = Some(content);
        self.charset = Some(charset);
    }

    fn on_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("message-id") {
            self.message_id = Some(strip_angle(value).to_string());
        } else if name.eq_ignore_ascii_case("content-type") {
            self.content_type = ContentType::parse(value);
        } else if name.eq_ignore_ascii_case("content-transfer-encoding") {
            self.transfer_encoding = TransferEncoding::from_header(value);
        }
    }
}

impl HeaderSink for MailPart {
    fn add_header(&mut self, name: String, value: String) {
        self.on_header(&name, &value);
        self.headers.insert(name, value);
    }
}

/// Trims whitespace and surrounding angle brackets from a message or content id.
pub(crate) fn strip_angle(value: &str) -> &str {
    value.trim_matches(|c: char| c == '<' || c == '>' || c == ' ')
}
