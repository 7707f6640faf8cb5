//! Text serialization of DFAs for the downstream lexer stage
//!
//! A single automaton is written as a stage-2 block:
//!
//! ```text
//! <alphabet symbols concatenated>
//! <state count>
//! <start ordinal>
//! <accepting ordinals, space-separated>
//! <src>,'<symbol>',<dst>
//! ```
//!
//! A lexer table is a sequence of blocks, each preceded by a line holding the
//! token name and separated from the next by one blank line.  Newlines are
//! written as `\n` and backslashes as `\\`.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    iter::{Enumerate, Peekable},
    str::Lines,
};

use indexmap::IndexSet;

use super::{Dfa, Parts, sinks};
use crate::state::State;

/// Write a string with newlines and backslashes escaped
#[derive(Debug, Clone, Copy)]
pub struct Escaped<'a>(pub &'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            write_sym(f, c)?;
        }
        Ok(())
    }
}

fn write_sym(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    match c {
        '\n' => f.write_str("\\n"),
        '\\' => f.write_str("\\\\"),
        c => fmt::Write::write_char(f, c),
    }
}

fn write_ordinal(f: &mut fmt::Formatter<'_>, state: &State) -> fmt::Result {
    match state.ordinal() {
        Some(n) => write!(f, "{n}"),
        None => write!(f, "{state}"),
    }
}

/// Stage-2 rendering of a single DFA
#[derive(Debug, Clone, Copy)]
pub struct Stage2<'a>(pub(super) &'a Dfa);

impl fmt::Display for Stage2<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(dfa) = *self;

        for &c in dfa.alphabet() {
            write_sym(f, c)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", dfa.states().len())?;
        write_ordinal(f, dfa.start())?;
        writeln!(f)?;

        for (i, state) in dfa.accepting().iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write_ordinal(f, state)?;
        }
        writeln!(f)?;

        for (from, sym, to) in dfa.transitions() {
            write_ordinal(f, from)?;
            f.write_str(",'")?;
            write_sym(f, sym)?;
            f.write_str("',")?;
            write_ordinal(f, to)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

/// What went wrong while reading a lexer table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableErrorKind {
    /// The input ended in the middle of an entry
    #[error("Unexpected end of input, expected {0}")]
    Truncated(&'static str),
    /// A count or ordinal that is not an unsigned integer
    #[error("Invalid number {0:?}")]
    BadNumber(String),
    /// A state ordinal not below the entry's state count
    #[error("State {ordinal} is out of range for {count} states")]
    OutOfRange {
        /// The ordinal as written
        ordinal: usize,
        /// The entry's state count
        count: usize,
    },
    /// A transition line without three comma-separated fields
    #[error("Malformed transition {0:?}, expected <src>,'<symbol>',<dst>")]
    BadTransition(String),
    /// A symbol that does not unescape to exactly one character
    #[error("Invalid symbol {0:?}")]
    BadSymbol(String),
    /// A transition on a symbol missing from the alphabet line
    #[error("Symbol {0:?} is not in the alphabet")]
    UnknownSymbol(char),
    /// Two transitions out of one state on the same symbol
    #[error("State {state} already has a transition on {sym:?}")]
    Conflict {
        /// Ordinal of the source state
        state: usize,
        /// The repeated symbol
        sym: char,
    },
    /// A token line with a malformed escape
    #[error("Invalid token name {0:?}")]
    BadToken(String),
    /// A state count larger than the transitions can reach
    #[error("State count {count} exceeds {max}, the most the transitions can account for")]
    TooManyStates {
        /// The state count as written
        count: usize,
        /// Transitions in the entry plus two
        max: usize,
    },
}

/// An error encountered while reading a lexer table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error on line {line}: {kind}")]
pub struct TableError {
    /// One-based line number of the offending input
    pub line: usize,
    /// Description of the error
    pub kind: TableErrorKind,
}

fn unescape(s: &str) -> Result<Vec<char>, TableErrorKind> {
    let mut out = vec![];
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        out.push(match c {
            '\\' => match chars.next() {
                Some('n') => '\n',
                Some('\\') => '\\',
                _ => return Err(TableErrorKind::BadSymbol(s.into())),
            },
            c => c,
        });
    }

    Ok(out)
}

fn unescape_sym(s: &str) -> Result<char, TableErrorKind> {
    // a lone backslash is accepted unescaped
    if s == "\\" {
        return Ok('\\');
    }

    match *unescape(s)? {
        [c] => Ok(c),
        _ => Err(TableErrorKind::BadSymbol(s.into())),
    }
}

fn number(s: &str) -> Result<usize, TableErrorKind> {
    s.trim()
        .parse()
        .map_err(|_| TableErrorKind::BadNumber(s.into()))
}

fn ordinal(s: &str, count: usize) -> Result<usize, TableErrorKind> {
    let ordinal = number(s)?;
    if ordinal < count {
        Ok(ordinal)
    } else {
        Err(TableErrorKind::OutOfRange { ordinal, count })
    }
}

fn transition(line: &str, count: usize) -> Result<(usize, char, usize), TableErrorKind> {
    let bad = || TableErrorKind::BadTransition(line.into());

    let (from, rest) = line.split_once(',').ok_or_else(bad)?;
    let (sym, to) = rest.rsplit_once(',').ok_or_else(bad)?;
    let sym = sym
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .ok_or_else(bad)?;

    Ok((ordinal(from, count)?, unescape_sym(sym)?, ordinal(to, count)?))
}

struct Reader<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    line: usize,
}

impl<'a> Reader<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            lines: s.lines().enumerate().peekable(),
            line: 0,
        }
    }

    fn error(&self, kind: TableErrorKind) -> TableError {
        TableError {
            line: self.line,
            kind,
        }
    }

    fn next_line(&mut self, expected: &'static str) -> Result<&'a str, TableError> {
        let Some((i, line)) = self.lines.next() else {
            self.line += 1;
            return Err(self.error(TableErrorKind::Truncated(expected)));
        };

        self.line = i + 1;
        Ok(line)
    }

    fn read<T>(
        &mut self,
        expected: &'static str,
        f: impl FnOnce(&'a str) -> Result<T, TableErrorKind>,
    ) -> Result<T, TableError> {
        let line = self.next_line(expected)?;
        f(line).map_err(|k| self.error(k))
    }

    /// Check whether only blank lines remain
    fn at_end(&self) -> bool { self.lines.clone().all(|(_, l)| l.trim().is_empty()) }

    /// Consume the blank line separating two entries
    fn separator(&mut self) { self.lines.next_if(|(_, l)| l.is_empty()); }

    /// Take the next line if it continues the current block
    fn next_in_block(&mut self) -> Option<&'a str> {
        let (i, line) = self.lines.next_if(|(_, l)| !l.is_empty())?;
        self.line = i + 1;
        Some(line)
    }

    fn entry(&mut self) -> Result<Dfa, TableError> {
        let token: String = self.read("a token name", |l| {
            unescape(l)
                .map(|t| t.into_iter().collect())
                .map_err(|_| TableErrorKind::BadToken(l.into()))
        })?;
        let alphabet: IndexSet<char> = self.read("an alphabet", unescape)?.into_iter().collect();
        let count = self.read("a state count", number)?;
        let count_line = self.line;
        let start = self.read("a start state", |l| ordinal(l, count))?;
        let accept = self.read("accepting states", |l| {
            l.split_whitespace()
                .map(|s| ordinal(s, count))
                .collect::<Result<BTreeSet<_>, _>>()
        })?;

        let mut table: BTreeMap<usize, BTreeMap<char, usize>> = BTreeMap::new();
        while let Some(line) = self.next_in_block() {
            let (from, sym, to) = transition(line, count).map_err(|k| self.error(k))?;
            if !alphabet.contains(&sym) {
                return Err(self.error(TableErrorKind::UnknownSymbol(sym)));
            }

            if table.entry(from).or_default().insert(sym, to).is_some() {
                return Err(self.error(TableErrorKind::Conflict { state: from, sym }));
            }
        }

        // every state but the start and the sink is entered by some transition
        let max = table.values().map(BTreeMap::len).sum::<usize>() + 2;
        if count > max {
            return Err(TableError {
                line: count_line,
                kind: TableErrorKind::TooManyStates { count, max },
            });
        }

        let states: BTreeSet<State> = (0..count).map(State::numbered).collect();
        let accept: BTreeSet<State> = accept.into_iter().map(State::numbered).collect();
        let delta: BTreeMap<State, BTreeMap<char, State>> = table
            .into_iter()
            .map(|(from, edges)| {
                let edges = edges
                    .into_iter()
                    .map(|(sym, to)| (sym, State::numbered(to)))
                    .collect();
                (State::numbered(from), edges)
            })
            .collect();

        let sinks = sinks::classify(
            &states,
            delta
                .iter()
                .flat_map(|(from, edges)| edges.iter().map(move |(&sym, to)| (from, sym, to))),
            &accept,
        );

        tracing::debug!(
            token = %Escaped(&token),
            states = count,
            accepting = accept.len(),
            sinks = sinks.len(),
            "Read DFA from lexer table"
        );

        Ok(Parts {
            token,
            states,
            alphabet,
            start: State::numbered(start),
            delta,
            accept,
            sinks,
            trap: None,
        }
        .into())
    }
}

/// An ordered list of token automata, in priority order
#[derive(Debug, Clone, Default)]
pub struct LexerTable {
    dfas: Vec<Dfa>,
}

impl LexerTable {
    /// Read a lexer table, classifying the sink states of every automaton
    ///
    /// # Errors
    /// This function returns an error if the input is not a well-formed lexer
    /// table.
    pub fn parse(s: &str) -> Result<Self, TableError> {
        let _s = tracing::debug_span!("read_lexer_table").entered();
        let mut reader = Reader::new(s);
        let mut dfas = vec![];

        while !reader.at_end() {
            dfas.push(reader.entry()?);
            reader.separator();
        }

        tracing::debug!(dfas = dfas.len(), "Lexer table loaded");
        Ok(Self { dfas })
    }

    /// The entries, in priority order
    #[inline]
    #[must_use]
    pub fn dfas(&self) -> &[Dfa] { &self.dfas }

    /// Unwrap the entries
    #[inline]
    #[must_use]
    pub fn into_dfas(self) -> Vec<Dfa> { self.dfas }

    /// Append an entry with the lowest priority so far
    #[inline]
    pub fn push(&mut self, dfa: Dfa) { self.dfas.push(dfa); }
}

impl FromIterator<Dfa> for LexerTable {
    fn from_iter<I: IntoIterator<Item = Dfa>>(it: I) -> Self {
        Self {
            dfas: it.into_iter().collect(),
        }
    }
}

impl fmt::Display for LexerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dfa) in self.dfas.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", Escaped(dfa.token()))?;
            fmt::Display::fmt(&dfa.stage2(), f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::{Escaped, LexerTable, TableError, TableErrorKind};
    use crate::{dfa::Dfa, re, re::Expr, state::State};

    fn dfa(prenex: &str) -> Dfa { Expr::parse(prenex).unwrap().to_nfa().to_dfa() }

    #[test]
    fn stage2() {
        let dfa = dfa("CONCAT a b");
        assert_eq!(
            dfa.stage2().to_string(),
            "ab\n4\n0\n2\n0,'a',1\n1,'b',2\n3,'a',3\n3,'b',3\n"
        );
    }

    #[test]
    fn stage2_escapes() {
        let dfa = dfa("UNION \\n \\");
        let text = dfa.stage2().to_string();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("\\n\\\\"));
        assert!(text.contains(",'\\n',"));
        assert!(text.contains(",'\\\\',"));
        assert_eq!(Escaped("a\nb\\").to_string(), "a\\nb\\\\");
    }

    #[test]
    fn no_accepting_states() {
        let text = dfa("NULL").stage2().to_string();
        assert_eq!(text, "\n2\n0\n\n");

        let table = LexerTable::parse(&format!("NONE\n{text}")).unwrap();
        let dfa = &table.dfas()[0];
        assert!(dfa.accepting().is_empty());
        assert_eq!(dfa.sinks().len(), 2);
    }

    #[test]
    fn read_table() {
        let text = "NUM\n\
                    01\n\
                    3\n\
                    0\n\
                    1\n\
                    0,'0',1\n\
                    0,'1',1\n\
                    1,'0',1\n\
                    1,'1',1\n\
                    \n\
                    COMMA\n\
                    ,\n\
                    2\n\
                    0\n\
                    1\n\
                    0,',',1\n";
        let table = LexerTable::parse(text).unwrap();
        let [num, comma] = table.dfas() else {
            panic!("Expected two DFAs");
        };

        assert_eq!(num.token(), "NUM");
        assert!(num.accept("0110"));
        assert!(!num.accept(""));
        // state 2 is unreachable and dead
        assert_eq!(num.sinks().iter().collect::<Vec<_>>(), [&State::numbered(2)]);
        assert_eq!(num.trap(), &State::numbered(2));

        assert_eq!(comma.token(), "COMMA");
        assert!(comma.accept(","));
        assert!(comma.sinks().is_empty());
        assert!(!comma.accept(",,"));

        assert_eq!(table.to_string(), text);
    }

    fn err(text: &str) -> TableError { LexerTable::parse(text).unwrap_err() }

    #[test]
    fn errors() {
        assert_eq!(err("T\nab\n2"), TableError {
            line: 4,
            kind: TableErrorKind::Truncated("a start state"),
        });
        assert_eq!(err("T\nab\ntwo\n0\n\n"), TableError {
            line: 3,
            kind: TableErrorKind::BadNumber("two".into()),
        });
        assert_eq!(err("T\nab\n2\n2\n\n"), TableError {
            line: 4,
            kind: TableErrorKind::OutOfRange {
                ordinal: 2,
                count: 2,
            },
        });
        assert_eq!(err("T\nab\n2\n0\n1\n0;'a';1\n"), TableError {
            line: 6,
            kind: TableErrorKind::BadTransition("0;'a';1".into()),
        });
        assert_eq!(err("T\nab\n2\n0\n1\n0,'ab',1\n"), TableError {
            line: 6,
            kind: TableErrorKind::BadSymbol("ab".into()),
        });
        assert_eq!(err("T\nab\n2\n0\n1\n0,'c',1\n"), TableError {
            line: 6,
            kind: TableErrorKind::UnknownSymbol('c'),
        });
        assert_eq!(err("T\nab\n2\n0\n1\n0,'a',1\n0,'a',0\n"), TableError {
            line: 7,
            kind: TableErrorKind::Conflict { state: 0, sym: 'a' },
        });
        assert_eq!(err("T\na\\x\n2\n0\n1\n"), TableError {
            line: 2,
            kind: TableErrorKind::BadSymbol("a\\x".into()),
        });
    }

    #[test]
    fn unusual_token_names() {
        let table: LexerTable = [
            dfa("a"),
            dfa("b").with_token("B"),
            dfa("c").with_token("two\nlines \\"),
        ]
        .into_iter()
        .collect();

        let text = table.to_string();
        assert!(text.starts_with("\na\n"));

        let read = LexerTable::parse(&text).unwrap();
        let tokens: Vec<_> = read.dfas().iter().map(Dfa::token).collect();
        assert_eq!(tokens, ["", "B", "two\nlines \\"]);
        assert!(read.dfas()[0].accept("a"));
        assert!(read.dfas()[2].accept("c"));

        // trailing blank lines do not start another entry
        assert_eq!(LexerTable::parse(&format!("{text}\n\n")).unwrap().dfas().len(), 3);
        assert_eq!(err("T\\x\na\n2\n0\n1\n"), TableError {
            line: 1,
            kind: TableErrorKind::BadToken("T\\x".into()),
        });
    }

    #[test]
    fn state_count_is_bounded() {
        assert_eq!(err("T\nab\n99999999999\n0\n\n"), TableError {
            line: 3,
            kind: TableErrorKind::TooManyStates {
                count: 99_999_999_999,
                max: 2,
            },
        });
        assert_eq!(err("T\na\n5\n0\n1\n0,'a',1\n"), TableError {
            line: 3,
            kind: TableErrorKind::TooManyStates { count: 5, max: 3 },
        });
    }

    #[test]
    fn empty_table() {
        assert!(LexerTable::parse("").unwrap().dfas().is_empty());
        assert!(LexerTable::parse("\n\n").unwrap().dfas().is_empty());
    }

    proptest! {
        #[test]
        fn written_tables_read_back(
            exprs in prop::collection::vec(
                re::expr(4, 16, prop::sample::select(vec!['a', 'b', '\n', '\\', ',', '\'']), true),
                1..5,
            ),
            words in prop::collection::vec("[ab\n\\\\,']{0,6}", 12),
        ) {
            let table: LexerTable = exprs
                .into_iter()
                .enumerate()
                .map(|(i, e)| {
                    let token = match i {
                        0 => String::new(),
                        1 => "a b\\\n".into(),
                        i => format!("T{i}"),
                    };
                    e.to_nfa().to_dfa().with_token(token)
                })
                .collect();
            let read = LexerTable::parse(&table.to_string()).unwrap();

            prop_assert_eq!(read.dfas().len(), table.dfas().len());
            for (before, after) in table.dfas().iter().zip(read.dfas()) {
                prop_assert_eq!(before.token(), after.token());
                prop_assert_eq!(
                    before.sinks().iter().map(State::ordinal).collect::<Vec<_>>(),
                    after.sinks().iter().map(State::ordinal).collect::<Vec<_>>()
                );
                for w in &words {
                    prop_assert_eq!(before.accept(w), after.accept(w), "{:?}", w);
                    prop_assert_eq!(before.longest_prefix(w), after.longest_prefix(w));
                }
            }
        }
    }
}
