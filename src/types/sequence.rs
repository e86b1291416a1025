use std::fmt;
use std::str::FromStr;

use super::Seq;

/// A message sequence set as accepted by `FETCH` and `STORE`: one number, a closed range, or a
/// range running to the last message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sequence {
    /// A single message, `n`.
    Single(Seq),
    /// The messages `a` to `b` inclusive, `a:b`.
    Range(Seq, Seq),
    /// The messages from `a` to the last one, `a:*`.
    From(Seq),
}

impl Sequence {
    /// Every message in the mailbox, `1:*`.
    pub const ALL: Sequence = Sequence::From(1);
}

impl From<Seq> for Sequence {
    fn from(id: Seq) -> Self {
        Sequence::Single(id)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Sequence::Single(n) => write!(f, "{}", n),
            Sequence::Range(a, b) => write!(f, "{}:{}", a, b),
            Sequence::From(a) => write!(f, "{}:*", a),
        }
    }
}

/// Text that is not a sequence set.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid sequence set: {0:?}")]
pub struct ParseSequenceError(String);

impl FromStr for Sequence {
    type Err = ParseSequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSequenceError(s.to_string());
        let number = |n: &str| match n.parse::<Seq>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(err()),
        };
        match s.trim().split_once(':') {
            None => number(s.trim()).map(Sequence::Single),
            Some((a, "*")) => number(a).map(Sequence::From),
            Some((a, b)) => Ok(Sequence::Range(number(a)?, number(b)?)),
        }
    }
}
