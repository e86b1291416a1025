//! Charset resolution and the content transfer encodings used by MIME messages.
//!
//! Everything here is a pure function over text. Decoding failures never escape: an unknown
//! charset falls back to UTF-8, malformed quoted-printable text is returned as it was, and
//! undecodable base64 text is left untouched.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use encoding_rs::{Encoding, GB18030, UTF_8};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref ENCODED_WORD: Regex =
        Regex::new(r"=\?([^?]+)\?([^?]+)\?([^?]+)\?=").unwrap();
}

/// Line length used when base64 output is broken into lines.
const BASE64_LINE_LENGTH: usize = 76;

/// The content transfer encodings a part body can arrive in.
///
/// `7bit`, `8bit` and `binary` are all treated as [`TransferEncoding::SevenBit`]: the body is
/// taken as it stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferEncoding {
    /// The body is not encoded.
    SevenBit,
    /// The body is base64 encoded.
    Base64,
    /// The body is quoted-printable encoded.
    QuotedPrintable,
}

impl Default for TransferEncoding {
    fn default() -> Self {
        TransferEncoding::SevenBit
    }
}

impl TransferEncoding {
    /// Interprets the value of a `Content-Transfer-Encoding` header.
    pub fn from_header(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("base64") {
            TransferEncoding::Base64
        } else if value.eq_ignore_ascii_case("quoted-printable") {
            TransferEncoding::QuotedPrintable
        } else {
            TransferEncoding::SevenBit
        }
    }

    /// Interprets the encoding token of an RFC 2047 encoded word (`B` or `Q`).
    fn from_word_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("B") {
            TransferEncoding::Base64
        } else if token.eq_ignore_ascii_case("Q") {
            TransferEncoding::QuotedPrintable
        } else {
            TransferEncoding::SevenBit
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            TransferEncoding::SevenBit => "7bit",
            TransferEncoding::Base64 => "base64",
            TransferEncoding::QuotedPrintable => "quoted-printable",
        })
    }
}

/// Resolves a charset name to an encoding.
///
/// An empty name resolves to UTF-8, as does any name the encoding tables do not know. `GBK` is
/// looked up as its superset `GB18030`.
pub fn charset(name: &str) -> &'static Encoding {
    let name = name.trim().trim_matches('"');
    if name.is_empty() {
        return UTF_8;
    }
    if name.eq_ignore_ascii_case("gbk") {
        return GB18030;
    }
    match Encoding::for_label_no_replacement(name.as_bytes()) {
        Some(encoding) => encoding,
        None => {
            log::debug!("unsupported charset {:?}, falling back to UTF-8", name);
            UTF_8
        }
    }
}

/// Decodes `bytes` as text in `charset`. Malformed sequences become U+FFFD.
pub fn decode_text(bytes: &[u8], charset: &'static Encoding) -> String {
    charset.decode_without_bom_handling(bytes).0.into_owned()
}

/// Encodes `text` into the bytes of `charset`.
///
/// Characters the charset cannot represent are written as numeric character references, which
/// is what `encoding_rs` does for every non-UTF encoder.
pub fn encode_text(text: &str, charset: &'static Encoding) -> Vec<u8> {
    charset.encode(text).0.into_owned()
}

/// Decodes every RFC 2047 encoded word (`=?charset?B|Q?text?=`) in a header value.
///
/// Each encoded word is replaced in place by its decoded text; everything around it is left
/// alone. The returned encoding is the charset of the last encoded word, or `None` if the value
/// contained no encoded word at all.
///
/// The `Q` encoding is decoded with the same routine as a quoted-printable body, so an `_` is
/// kept as an underscore.
pub fn decode_header_value(value: &str) -> (String, Option<&'static Encoding>) {
    let mut last = None;
    let decoded = ENCODED_WORD.replace_all(value, |caps: &Captures<'_>| {
        let encoding = charset(&caps[1]);
        last = Some(encoding);
        let transfer = TransferEncoding::from_word_token(&caps[2]);
        decode_mime_text(&caps[3], transfer, encoding)
    });
    (decoded.into_owned(), last)
}

/// Decodes `text` according to its transfer encoding, interpreting the decoded bytes in
/// `charset`.
pub fn decode_mime_text(
    text: &str,
    encoding: TransferEncoding,
    charset: &'static Encoding,
) -> String {
    if text.is_empty() {
        return String::new();
    }
    match encoding {
        TransferEncoding::Base64 => match decode_base64(text) {
            Ok(bytes) => decode_text(&bytes, charset),
            Err(e) => {
                log::debug!("leaving undecodable base64 text as is: {}", e);
                text.to_string()
            }
        },
        TransferEncoding::QuotedPrintable => decode_quoted_printable(text, charset),
        TransferEncoding::SevenBit => text.to_string(),
    }
}

/// Decodes quoted-printable text.
///
/// Runs of `=XX` escapes are collected as bytes and decoded in `charset` as soon as an
/// unescaped character follows. `=` followed by CRLF is a soft line break. So is `=` followed by
/// a bare LF when the next character is another `=`, which then starts a new escape. A trailing
/// `=` at the very end of the input is dropped.
///
/// Any other character after `=` makes the whole input invalid, and the input is then returned
/// unmodified instead of partially decoded.
pub fn decode_quoted_printable(value: &str, charset: &'static Encoding) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut pending: Vec<u8> = Vec::new();
    let mut offset = 0;

    while offset < chars.len() {
        let c = chars[offset];
        offset += 1;
        if c != '=' {
            if !pending.is_empty() {
                out.push_str(&decode_text(&pending, charset));
                pending.clear();
            }
            out.push(c);
            continue;
        }

        let c1 = chars.get(offset).copied();
        if c1.is_some() {
            offset += 1;
        }
        let c2 = chars.get(offset).copied();
        if c2.is_some() {
            offset += 1;
        }

        match (c1, c2) {
            (Some(h), Some(l)) if h.is_ascii_hexdigit() && l.is_ascii_hexdigit() => {
                // both are ASCII hex digits, so this cannot overflow
                let byte = (hex_value(h) << 4) | hex_value(l);
                pending.push(byte);
            }
            (Some('\r'), Some('\n')) => {}
            (Some('\n'), Some('=')) => {
                offset -= 1;
            }
            (None, _) => break,
            _ => return value.to_string(),
        }
    }

    if !pending.is_empty() {
        out.push_str(&decode_text(&pending, charset));
    }
    out
}

fn hex_value(c: char) -> u8 {
    c.to_digit(16).map(|d| d as u8).unwrap_or(0)
}

/// Decodes base64 text, ignoring any whitespace and line breaks in it.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Encodes `data` as base64, broken into CRLF-separated lines of 76 characters.
pub fn encode_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2);
    for (i, chunk) in encoded.as_bytes().chunks(BASE64_LINE_LENGTH).enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        // base64 output is ASCII
        out.push_str(&String::from_utf8_lossy(chunk));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{BIG5, ISO_8859_2, WINDOWS_1252};
    use proptest::prelude::*;

    #[test]
    fn charset_resolution() {
        assert_eq!(charset("utf-8"), UTF_8);
        assert_eq!(charset("UTF-8"), UTF_8);
        assert_eq!(charset("\"iso-8859-2\""), ISO_8859_2);
        assert_eq!(charset("big5"), BIG5);
        assert_eq!(charset("us-ascii"), WINDOWS_1252);
        assert_eq!(charset("GBK"), GB18030);
        assert_eq!(charset("gbk"), GB18030);
        assert_eq!(charset("x-no-such-charset"), UTF_8);
        assert_eq!(charset(""), UTF_8);
    }

    #[test]
    fn transfer_encoding_from_header() {
        assert_eq!(TransferEncoding::from_header("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::from_header(" Quoted-Printable "),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::from_header("8bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::from_header(""), TransferEncoding::SevenBit);
    }

    #[test]
    fn qp_escape() {
        assert_eq!(decode_quoted_printable("Hi=3D there", UTF_8), "Hi= there");
    }

    #[test]
    fn qp_multibyte_run() {
        assert_eq!(decode_quoted_printable("H=C3=A9llo", UTF_8), "Héllo");
        assert_eq!(decode_quoted_printable("caf=E9", WINDOWS_1252), "café");
    }

    #[test]
    fn qp_invalid_escape_returns_input() {
        assert_eq!(decode_quoted_printable("bad =ZZ escape", UTF_8), "bad =ZZ escape");
        assert_eq!(decode_quoted_printable("=3D=Z", UTF_8), "=3D=Z");
    }

    #[test]
    fn qp_soft_line_breaks() {
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld", UTF_8), "HelloWorld");
        assert_eq!(decode_quoted_printable("a=\n=3Db", UTF_8), "a=b");
        assert_eq!(decode_quoted_printable("=E4=\r\n=BD=A0", UTF_8), "你");
    }

    #[test]
    fn qp_trailing_equals_is_dropped() {
        assert_eq!(decode_quoted_printable("abc=", UTF_8), "abc");
    }

    #[test]
    fn qp_keeps_underscores() {
        assert_eq!(decode_quoted_printable("a_b", UTF_8), "a_b");
    }

    #[test]
    fn header_value_base64_word() {
        let (text, cs) = decode_header_value("=?UTF-8?B?5L2g5aW9?=");
        assert_eq!(text, "你好");
        assert_eq!(cs, Some(UTF_8));
    }

    #[test]
    fn header_value_q_word_in_context() {
        let (text, cs) =
            decode_header_value("Re: =?iso-8859-1?q?caf=E9?= and =?utf-8?Q?H=C3=A9?=");
        assert_eq!(text, "Re: café and Hé");
        assert_eq!(cs, Some(UTF_8));
    }

    #[test]
    fn header_value_without_words() {
        let (text, cs) = decode_header_value("plain subject");
        assert_eq!(text, "plain subject");
        assert_eq!(cs, None);
    }

    #[test]
    fn header_value_gbk_word() {
        // "中文" in GBK
        let (text, cs) = decode_header_value("=?GBK?B?1tDOxA==?=");
        assert_eq!(text, "中文");
        assert_eq!(cs, Some(GB18030));
    }

    #[test]
    fn mime_text_dispatch() {
        assert_eq!(
            decode_mime_text("aGVsbG8=", TransferEncoding::Base64, UTF_8),
            "hello"
        );
        assert_eq!(
            decode_mime_text("a=3Db", TransferEncoding::QuotedPrintable, UTF_8),
            "a=b"
        );
        assert_eq!(
            decode_mime_text("a=3Db", TransferEncoding::SevenBit, UTF_8),
            "a=3Db"
        );
        assert_eq!(decode_mime_text("", TransferEncoding::Base64, UTF_8), "");
        assert_eq!(
            decode_mime_text("not base64!", TransferEncoding::Base64, UTF_8),
            "not base64!"
        );
    }

    #[test]
    fn base64_lines() {
        let data = vec![0u8; 120];
        let encoded = encode_base64(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    proptest! {
        #[test]
        fn qp_without_escapes_is_identity(s in "[^=]*") {
            prop_assert_eq!(decode_quoted_printable(&s, UTF_8), s);
        }

        #[test]
        fn qp_never_panics(s in "\\PC*") {
            let _ = decode_quoted_printable(&s, UTF_8);
        }
    }
}
