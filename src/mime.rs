//! Decoding of MIME messages into a tree of parts.
//!
//! The decoder reads a message line by line from a [`LineReader`]. Each part starts with a
//! header block ended by an empty line. A part whose content type carries a `boundary`
//! parameter is a container: its children follow, separated by `--boundary` lines and closed by
//! `--boundary--`. Any other part is a leaf, whose body runs up to the delimiter of the
//! enclosing container, or to the end of the input for a single-part message.
//!
//! The resulting [`MailMessage`] keeps the top-level headers and flattens the tree below it:
//! `text/plain` and `text/html` leaves become alternate views, other leaves become
//! attachments, and nested containers contribute their own views and attachments to their
//! parent.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::codec::{self, TransferEncoding};
use crate::error::Result;
use crate::reader::LineReader;
use crate::types::{Attachment, HeaderSink, MailMessage};

/// Decodes a message held in memory. Text outside of any declared charset is read as UTF-8.
pub fn parse(data: &[u8]) -> MailMessage {
    parse_with_charset(data, UTF_8)
}

/// Decodes a message held in memory, reading text outside of any declared charset in
/// `charset`.
pub fn parse_with_charset(data: &[u8], charset: &'static Encoding) -> MailMessage {
    let mut reader = LineReader::new(Cursor::new(data));
    match Decoder::new(&mut reader).message(charset) {
        Ok(message) => message,
        // reading from memory does not fail
        Err(e) => {
            log::warn!("failed to decode in-memory message: {}", e);
            MailMessage::default()
        }
    }
}

/// Decodes a message held in a string.
pub fn parse_str(text: &str) -> MailMessage {
    parse(text.as_bytes())
}

/// Decodes the message stored in the file at `path`.
pub fn parse_file(path: impl AsRef<Path>, charset: &'static Encoding) -> Result<MailMessage> {
    let file = File::open(path)?;
    parse_reader(&mut LineReader::new(file), charset)
}

/// Decodes a message from a reader positioned at the start of its header block, consuming the
/// reader to its end.
pub fn parse_reader<R: Read>(
    reader: &mut LineReader<R>,
    charset: &'static Encoding,
) -> Result<MailMessage> {
    Ok(Decoder::new(reader).message(charset)?)
}

/// How a part's body ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum End {
    /// The delimiter of the enclosing container; another sibling follows.
    Delimiter,
    /// The closing delimiter of the enclosing container.
    Close,
    /// The end of the input.
    Eof,
}

struct Decoder<'a, R> {
    reader: &'a mut LineReader<R>,
}

impl<'a, R: Read> Decoder<'a, R> {
    fn new(reader: &'a mut LineReader<R>) -> Self {
        Decoder { reader }
    }

    fn message(&mut self, charset: &'static Encoding) -> io::Result<MailMessage> {
        let (message, _) = self.part(charset, None)?;
        Ok(message.unwrap_or_default())
    }

    /// Decodes one part. `delimiter` is the `--boundary` line of the enclosing container, if
    /// any. Returns `None` for a part without headers.
    fn part(
        &mut self,
        charset: &'static Encoding,
        delimiter: Option<&str>,
    ) -> io::Result<(Option<MailMessage>, End)> {
        let mut message = MailMessage::new();
        let end_of_headers = self.headers(&mut message, charset)?;
        if message.headers().is_empty() {
            let end = match (end_of_headers, delimiter) {
                (End::Eof, _) | (_, None) => End::Eof,
                (_, Some(delimiter)) => self.skip_to(delimiter, charset)?,
            };
            return Ok((None, end));
        }

        let charset = message
            .content_type()
            .charset()
            .map(codec::charset)
            .unwrap_or(charset);

        let end = match message.content_type().boundary().map(|b| format!("--{}", b)) {
            Some(boundary) => {
                self.children(&mut message, charset, &boundary)?;
                match delimiter {
                    // the epilogue runs up to the enclosing container's next delimiter
                    Some(delimiter) => self.skip_to(delimiter, charset)?,
                    None => End::Eof,
                }
            }
            None => self.body(&mut message, charset, delimiter)?,
        };
        Ok((Some(message), end))
    }

    /// Reads a header block into `message`, unfolding continuation lines.
    fn headers(&mut self, message: &mut MailMessage, charset: &'static Encoding) -> io::Result<End> {
        let mut current: Option<(String, String)> = None;
        let end = loop {
            let line = match self.reader.read_line_as_string(charset)? {
                Some(line) => line,
                None => break End::Eof,
            };
            if line.is_empty() {
                break End::Delimiter;
            }
            if line.starts_with(|c: char| c.is_whitespace()) {
                if let Some((_, ref mut value)) = current {
                    unfold(value, line.trim_start());
                }
                continue;
            }
            if let Some((name, value)) = current.take() {
                message.add_header(name, value);
            }
            current = line
                .split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .filter(|(name, _)| !name.is_empty());
        };
        if let Some((name, value)) = current {
            message.add_header(name, value);
        }
        Ok(end)
    }

    /// Decodes the children of a container and sorts them into `message`.
    fn children(
        &mut self,
        message: &mut MailMessage,
        charset: &'static Encoding,
        boundary: &str,
    ) -> io::Result<()> {
        // preamble
        if self.skip_to(boundary, charset)? != End::Delimiter {
            return Ok(());
        }
        loop {
            let (child, end) = self.part(charset, Some(boundary))?;
            if let Some(child) = child {
                adopt(message, child);
            }
            if end != End::Delimiter {
                return Ok(());
            }
        }
    }

    /// Reads a leaf body up to the delimiter (or the end of input) and stores its decoded
    /// content on `message`.
    fn body(
        &mut self,
        message: &mut MailMessage,
        charset: &'static Encoding,
        delimiter: Option<&str>,
    ) -> io::Result<End> {
        let mut text = String::new();
        let end = loop {
            let line = match self.reader.read_line_as_string(charset)? {
                Some(line) => line,
                None => break End::Eof,
            };
            if let Some(end) = delimiter.and_then(|d| match_delimiter(&line, d)) {
                break end;
            }
            text.push_str(&line);
            text.push_str("\r\n");
        };

        let encoding = message.transfer_encoding();
        let content = if !message.content_type().is_text() && encoding == TransferEncoding::Base64
        {
            codec::decode_base64(&text).unwrap_or_else(|e| {
                log::warn!(
                    "keeping undecodable base64 body of a {} part: {}",
                    message.content_type().media_type(),
                    e
                );
                text.into_bytes()
            })
        } else {
            let decoded = codec::decode_mime_text(&text, encoding, charset);
            codec::encode_text(&decoded, charset)
        };
        message.part.set_content(content, charset);
        Ok(end)
    }

    /// Discards lines up to and including the next `delimiter` or closing delimiter.
    fn skip_to(&mut self, delimiter: &str, charset: &'static Encoding) -> io::Result<End> {
        while let Some(line) = self.reader.read_line_as_string(charset)? {
            if let Some(end) = match_delimiter(&line, delimiter) {
                return Ok(end);
            }
        }
        Ok(End::Eof)
    }
}

fn match_delimiter(line: &str, delimiter: &str) -> Option<End> {
    let rest = line.strip_prefix(delimiter)?;
    if rest.is_empty() {
        Some(End::Delimiter)
    } else if rest == "--" {
        Some(End::Close)
    } else {
        None
    }
}

/// Appends a continuation line to a header value. Adjacent encoded words are joined without
/// the folding whitespace between them.
fn unfold(value: &mut String, continuation: &str) {
    if !value.is_empty() && !(value.ends_with("?=") && continuation.starts_with("=?")) {
        value.push(' ');
    }
    value.push_str(continuation);
}

/// Files a decoded child under its parent.
fn adopt(parent: &mut MailMessage, child: MailMessage) {
    let content_type = child.content_type();
    // every multipart subtype is spliced, signed and report containers included
    if content_type.is_multipart() {
        parent.alternate_views.extend(child.alternate_views);
        parent.attachments.extend(child.attachments);
    } else if !child.has_content() {
        log::debug!("dropping empty {} part", content_type.media_type());
    } else if matches!(content_type.media_type(), "text/plain" | "text/html") {
        parent.alternate_views.push(child.into_part());
    } else {
        parent.attachments.push(Attachment::from_part(child.into_part()));
    }
}
