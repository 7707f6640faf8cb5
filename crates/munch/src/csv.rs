//! Diagnostic CSV dumps of automaton edges

use std::fmt;

use crate::{dfa::table::Escaped, state::State};

/// One edge: source, symbol (`None` for epsilon), target, and whether the
/// target is accepting
pub type Row<'a> = (&'a State, Option<char>, &'a State, bool);

/// A `from,char,to` listing of edges, with accepting targets prefixed by `f`
#[derive(Debug, Clone)]
pub struct Csv<'a> {
    rows: Vec<Row<'a>>,
}

impl<'a> Csv<'a> {
    pub(crate) fn new<I: IntoIterator<Item = Row<'a>>>(rows: I) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    /// The edges, in listing order
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Row<'a>] { &self.rows }
}

impl fmt::Display for Csv<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "from,char,to")?;

        for &(from, by, to, accepting) in &self.rows {
            write!(f, "{from},")?;
            match by {
                Some(c) => write!(f, "{}", Escaped(c.encode_utf8(&mut [0; 4])))?,
                None => f.write_str("ε")?,
            }
            writeln!(f, ",{}{to}", if accepting { "f" } else { "" })?;
        }

        Ok(())
    }
}
