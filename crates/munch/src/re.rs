//! Regular expression syntax trees

use std::{fmt, mem};

use crate::nfa::Nfa;

mod nfa_builder;
mod parse;

pub use parse::ParseError;

/// A regular expression over single-character symbols
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Matches exactly one occurrence of the symbol
    Symbol(char),
    /// Matches the empty word
    Epsilon,
    /// Matches nothing
    Empty,
    /// Matches the left operand followed by the right
    Concat(Box<Expr>, Box<Expr>),
    /// Matches either operand
    Union(Box<Expr>, Box<Expr>),
    /// Zero or more repetitions
    Star(Box<Expr>),
    /// One or more repetitions
    Plus(Box<Expr>),
}

impl Expr {
    /// Construct a concatenation
    #[inline]
    #[must_use]
    pub fn concat(lhs: Self, rhs: Self) -> Self { Self::Concat(lhs.into(), rhs.into()) }

    /// Construct an alternation
    #[inline]
    #[must_use]
    pub fn union(lhs: Self, rhs: Self) -> Self { Self::Union(lhs.into(), rhs.into()) }

    /// Wrap the expression in a Kleene star
    #[inline]
    #[must_use]
    pub fn star(self) -> Self { Self::Star(self.into()) }

    /// Wrap the expression in a one-or-more repetition
    #[inline]
    #[must_use]
    pub fn plus(self) -> Self { Self::Plus(self.into()) }

    /// Parse an expression from whitespace-separated tokens in prefix order
    ///
    /// # Errors
    /// This function fails if the tokens do not form exactly one complete
    /// expression.
    #[inline]
    pub fn parse(prenex: &str) -> Result<Self, ParseError> { parse::parse(prenex) }

    /// Number of operands this node takes
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Symbol(_) | Self::Epsilon | Self::Empty => 0,
            Self::Star(_) | Self::Plus(_) => 1,
            Self::Concat(..) | Self::Union(..) => 2,
        }
    }

    /// The operands of this node, left to right
    #[must_use]
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Self::Symbol(_) | Self::Epsilon | Self::Empty => vec![],
            Self::Star(e) | Self::Plus(e) => vec![&**e],
            Self::Concat(l, r) | Self::Union(l, r) => vec![&**l, &**r],
        }
    }

    /// Display name of the node, or the symbol itself for literals
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Symbol(c) => c.to_string(),
            Self::Epsilon => "ε".into(),
            Self::Empty => "∅".into(),
            Self::Concat(..) => "Concat".into(),
            Self::Union(..) => "Union".into(),
            Self::Star(_) => "Star".into(),
            Self::Plus(_) => "Plus".into(),
        }
    }

    /// Total number of nodes in the tree, equal to its prenex token count
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];

        while let Some(e) = stack.pop() {
            count += 1;
            stack.extend(e.children());
        }

        count
    }

    /// Render the expression in infix notation
    #[must_use]
    pub fn to_regex(&self) -> String {
        let mut s = String::new();
        self.write_regex(&mut s);
        s
    }

    fn write_regex(&self, s: &mut String) {
        match self {
            Self::Symbol(c) => s.extend(c.escape_default()),
            Self::Epsilon | Self::Empty => s.push_str(&self.name()),
            Self::Concat(l, r) => {
                s.push('(');
                l.write_regex(s);
                r.write_regex(s);
                s.push(')');
            },
            Self::Union(l, r) => {
                s.push('(');
                l.write_regex(s);
                s.push_str(" U ");
                r.write_regex(s);
                s.push(')');
            },
            Self::Star(e) => {
                e.write_regex(s);
                s.push('*');
            },
            Self::Plus(e) => {
                e.write_regex(s);
                s.push('+');
            },
        }
    }

    /// Render the expression back into the prenex input format
    ///
    /// The empty-word expression has no token of its own and is written as
    /// `STAR NULL`, which denotes the same language.
    #[inline]
    #[must_use]
    pub fn prenex(&self) -> Prenex<'_> { Prenex(self) }

    /// Compile the expression with the Thompson construction
    #[inline]
    #[must_use]
    pub fn to_nfa(self) -> Nfa { nfa_builder::build(self) }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())?;

        let children = self.children();
        if children.is_empty() {
            return Ok(());
        }

        f.write_str("(")?;
        for (i, child) in children.into_iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(child, f)?;
        }
        f.write_str(")")
    }
}

/// Prenex rendering of an [`Expr`]
#[derive(Debug, Clone, Copy)]
pub struct Prenex<'a>(&'a Expr);

impl fmt::Display for Prenex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        static EMPTY: Expr = Expr::Empty;

        let mut stack = vec![self.0];
        let mut first = true;

        while let Some(e) = stack.pop() {
            if !mem::take(&mut first) {
                f.write_str(" ")?;
            }

            match e {
                Expr::Symbol('\n') => f.write_str(parse::NEWLINE)?,
                Expr::Symbol(c) => fmt::Write::write_char(f, *c)?,
                Expr::Epsilon | Expr::Star(_) => f.write_str(parse::STAR)?,
                Expr::Empty => f.write_str(parse::NULL)?,
                Expr::Concat(..) => f.write_str(parse::CONCAT)?,
                Expr::Union(..) => f.write_str(parse::UNION)?,
                Expr::Plus(_) => f.write_str(parse::PLUS)?,
            }

            if matches!(e, Expr::Epsilon) {
                stack.push(&EMPTY);
            } else {
                stack.extend(e.children().into_iter().rev());
            }
        }

        Ok(())
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        fn detach(e: &mut Expr, out: &mut Vec<Expr>) {
            match e {
                Expr::Symbol(_) | Expr::Epsilon | Expr::Empty => (),
                Expr::Star(e) | Expr::Plus(e) => out.push(mem::replace(&mut **e, Expr::Empty)),
                Expr::Concat(l, r) | Expr::Union(l, r) => {
                    out.push(mem::replace(&mut **l, Expr::Empty));
                    out.push(mem::replace(&mut **r, Expr::Empty));
                },
            }
        }

        // unlink the tree first so dropping it never recurses
        let mut stack = vec![];
        detach(self, &mut stack);
        while let Some(mut e) = stack.pop() {
            detach(&mut e, &mut stack);
        }
    }
}

#[cfg(any(test, feature = "proptest"))]
pub use prop::*;

#[cfg(any(test, feature = "proptest"))]
mod prop {
    use proptest::prelude::*;

    use super::Expr;

    /// Strategy for random expressions over the given symbols
    ///
    /// With `epsilon` unset no [`Expr::Epsilon`] nodes are generated, so the
    /// output survives a trip through [`Expr::prenex`] unchanged.
    pub fn expr(
        depth: u32,
        tree_size: u32,
        sym: impl Strategy<Value = char> + 'static,
        epsilon: bool,
    ) -> impl Strategy<Value = Expr> {
        let leaf = if epsilon {
            prop_oneof![
                6 => sym.prop_map(Expr::Symbol),
                1 => Just(Expr::Epsilon),
                1 => Just(Expr::Empty),
            ]
            .boxed()
        } else {
            prop_oneof![
                7 => sym.prop_map(Expr::Symbol),
                1 => Just(Expr::Empty),
            ]
            .boxed()
        };

        leaf.prop_recursive(depth, tree_size, 2, |s| {
            prop_oneof![
                (s.clone(), s.clone()).prop_map(|(l, r)| Expr::concat(l, r)),
                (s.clone(), s.clone()).prop_map(|(l, r)| Expr::union(l, r)),
                s.clone().prop_map(Expr::star),
                s.prop_map(Expr::plus),
            ]
        })
    }
}
