use std::fmt::{self, Display, Write};

/// Writes the items of `iter` to `w`, separated by `delim`.
pub(crate) fn iter_join_onto<W, I, T>(mut w: W, iter: I, delim: &str) -> fmt::Result
where
    W: Write,
    I: IntoIterator<Item = T>,
    T: Display,
{
    let mut it = iter.into_iter().peekable();
    while let Some(n) = it.next() {
        write!(w, "{}", n)?;
        if it.peek().is_some() {
            w.write_str(delim)?;
        }
    }
    Ok(())
}

/// Joins the items of `iter` into a new string, as used for flag and status item lists.
pub(crate) fn iter_join<I, T>(iter: I, delim: &str) -> String
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let mut s = String::new();
    let _ = iter_join_onto(&mut s, iter, delim);
    s
}
