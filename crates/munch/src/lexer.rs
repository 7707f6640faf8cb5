//! Maximal-munch tokenization over a prioritized list of DFAs

use std::ops::Range;

use crate::dfa::Dfa;

/// No automaton accepts a non-empty prefix of the remaining input
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No token matches the input at byte {at}")]
pub struct NoMatch {
    /// Byte offset of the unmatched input
    pub at: usize,
}

/// A token recognized by one of the lexer's automata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme<'t, 'i> {
    /// Token name of the automaton that matched
    pub token: &'t str,
    /// The matched text
    pub text: &'i str,
    /// Byte range of the match within the input
    pub span: Range<usize>,
}

/// Iterator splitting input into lexemes
///
/// At every position each automaton reports its longest accepted prefix and
/// the longest one wins, with ties going to the automaton listed first.
/// Iteration ends after the first [`NoMatch`].
#[derive(Debug, Clone)]
#[allow(missing_copy_implementations)] // copying would fork the cursor
pub struct Lexer<'t, 'i> {
    dfas: &'t [Dfa],
    input: &'i str,
    pos: usize,
    failed: bool,
}

impl<'t, 'i> Lexer<'t, 'i> {
    /// Tokenize `input` with `dfas`, listed from highest priority to lowest
    #[must_use]
    pub fn new(dfas: &'t [Dfa], input: &'i str) -> Self {
        Self {
            dfas,
            input,
            pos: 0,
            failed: false,
        }
    }

    /// The unconsumed input
    #[inline]
    #[must_use]
    pub fn rest(&self) -> &'i str { &self.input[self.pos..] }
}

impl<'t, 'i> Iterator for Lexer<'t, 'i> {
    type Item = Result<Lexeme<'t, 'i>, NoMatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.input.len() {
            return None;
        }

        let rest = self.rest();
        let best = self
            .dfas
            .iter()
            .map(|d| (d, d.longest_prefix(rest).0))
            .filter(|(_, p)| !p.is_empty())
            .fold(None, |best: Option<(&Dfa, &str)>, (d, p)| match best {
                Some((_, b)) if b.len() >= p.len() => best,
                _ => Some((d, p)),
            });

        let Some((dfa, text)) = best else {
            tracing::trace!(at = self.pos, "No token matches");
            self.failed = true;
            return Some(Err(NoMatch { at: self.pos }));
        };

        let start = self.pos;
        self.pos += text.len();
        tracing::trace!(token = dfa.token(), ?text, start, "Matched lexeme");

        Some(Ok(Lexeme {
            token: dfa.token(),
            text,
            span: start..self.pos,
        }))
    }
}

impl std::iter::FusedIterator for Lexer<'_, '_> {}
