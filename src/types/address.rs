use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ADDR_SPEC: Regex = Regex::new(r"^[^@\s<>(),;:]+@[^@\s<>(),;:]+$").unwrap();
}

/// A mailbox address such as `"Alice Example" <alice@example.com>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    display_name: Option<String>,
    address: String,
}

impl Address {
    /// Parses a single address. Returns `None` if `value` does not contain a valid address.
    ///
    /// Accepted forms are `name <user@host>`, `<user@host>` and `user@host`. The display name
    /// may be quoted.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (display_name, address) = match (value.rfind('<'), value.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                let name = unquote_name(value[..open].trim());
                (name, value[open + 1..close].trim())
            }
            (None, None) => (None, value),
            _ => return None,
        };
        if !ADDR_SPEC.is_match(address) {
            return None;
        }
        Some(Address {
            display_name,
            address: address.to_string(),
        })
    }

    /// Parses a comma-separated address list, silently dropping the entries that are not
    /// valid addresses.
    pub fn parse_list(value: &str) -> Vec<Self> {
        split_list(value)
            .into_iter()
            .filter_map(Address::parse)
            .collect()
    }

    /// The display name, if one was given.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// The `user@host` part.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The part before the `@`.
    pub fn user(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map(|(user, _)| user)
            .unwrap_or(&self.address)
    }

    /// The part after the `@`.
    pub fn host(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map(|(_, host)| host)
            .unwrap_or("")
    }
}

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s).ok_or_else(|| InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_name {
            Some(ref name) => write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Text that could not be parsed as an [`Address`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0:?}")]
pub struct InvalidAddress(pub String);

fn unquote_name(name: &str) -> Option<String> {
    let name = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .map(|n| n.replace("\\\"", "\""))
        .unwrap_or_else(|| name.to_string());
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Splits on commas that are outside quoted display names and angle brackets.
fn split_list(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut quoted = false;
    let mut angle = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '<' if !quoted => angle = true,
            '>' if !quoted => angle = false,
            ',' if !quoted && !angle => {
                out.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&value[start..]);
    out
}
