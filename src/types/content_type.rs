use std::fmt;

use crate::codec::decode_header_value;

/// A parsed `Content-Type` header: the media type and its parameters.
///
/// A part without a `Content-Type` header is `text/plain` with no parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentType {
    media_type: String,
    parameters: Vec<(String, String)>,
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType {
            media_type: "text/plain".to_string(),
            parameters: Vec::new(),
        }
    }
}

impl ContentType {
    /// Parses a `Content-Type` header value such as `text/plain; charset="utf-8"`.
    ///
    /// The `name` parameter is RFC 2047 decoded.
    pub fn parse(value: &str) -> Self {
        let (media_type, mut parameters) = split_parameters(value);
        for (key, value) in parameters.iter_mut() {
            if key == "name" {
                *value = decode_header_value(value).0;
            }
        }
        ContentType {
            media_type: if media_type.is_empty() {
                "text/plain".to_string()
            } else {
                media_type
            },
            parameters,
        }
    }

    /// The media type in lower case, e.g. `multipart/mixed`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// True if the media type is `text/*`.
    pub fn is_text(&self) -> bool {
        self.media_type.starts_with("text/")
    }

    /// True if the media type is `multipart/*`.
    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }

    /// The value of the parameter `key`; parameter names are matched case-insensitively.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        lookup(&self.parameters, key)
    }

    /// The multipart boundary, if present and not empty.
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }

    /// The charset, if present and not empty.
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset").filter(|c| !c.is_empty())
    }

    /// The decoded `name` parameter, if present and not empty.
    pub fn name(&self) -> Option<&str> {
        self.parameter("name").filter(|n| !n.is_empty())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.media_type)?;
        for (key, value) in &self.parameters {
            write!(f, "; {}=\"{}\"", key, value)?;
        }
        Ok(())
    }
}

/// A parsed `Content-Disposition` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDisposition {
    disposition: String,
    parameters: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Parses a `Content-Disposition` header value such as `attachment; filename="a.txt"`.
    ///
    /// The `filename` parameter is RFC 2047 decoded.
    pub fn parse(value: &str) -> Self {
        let (disposition, mut parameters) = split_parameters(value);
        for (key, value) in parameters.iter_mut() {
            if key == "filename" {
                *value = decode_header_value(value).0;
            }
        }
        ContentDisposition {
            disposition,
            parameters,
        }
    }

    /// The disposition type in lower case, usually `inline` or `attachment`.
    pub fn disposition(&self) -> &str {
        &self.disposition
    }

    /// True if the disposition type is `inline`.
    pub fn is_inline(&self) -> bool {
        self.disposition == "inline"
    }

    /// The value of the parameter `key`.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        lookup(&self.parameters, key)
    }

    /// The decoded `filename` parameter, if present and not empty.
    pub fn file_name(&self) -> Option<&str> {
        self.parameter("filename").filter(|n| !n.is_empty())
    }
}

fn lookup<'a>(parameters: &'a [(String, String)], key: &str) -> Option<&'a str> {
    parameters
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// Splits `value; key=value; key="quoted value"` into the lower-cased leading token and the
/// parameters, with parameter names lower-cased and quotes removed.
fn split_parameters(value: &str) -> (String, Vec<(String, String)>) {
    let mut segments = split_unquoted(value, ';').into_iter();
    let head = segments
        .next()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let parameters = segments
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                return None;
            }
            Some((key, unquote(value.trim())))
        })
        .collect();
    (head, parameters)
}

/// Splits on `delim` wherever it is not inside a quoted string.
pub(crate) fn split_unquoted(value: &str, delim: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            c if c == delim && !quoted => {
                out.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&value[start..]);
    out
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    } else {
        value.to_string()
    }
}
