use super::Expr;

pub(super) const STAR: &str = "STAR";
pub(super) const PLUS: &str = "PLUS";
pub(super) const CONCAT: &str = "CONCAT";
pub(super) const UNION: &str = "UNION";
pub(super) const NULL: &str = "NULL";

pub(super) const NEWLINE: &str = "\\n";

/// An error arising from malformed prenex input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input held no tokens at all
    #[error("Expected an expression, found no tokens")]
    NoInput,
    /// The input ran out before an operator received all its operands
    #[error("Missing operand {index} of {op} (after {consumed} tokens)")]
    MissingOperand {
        /// Keyword of the unsatisfied operator
        op: &'static str,
        /// Zero-based index of the first missing operand
        index: usize,
        /// Number of tokens read before the input ran out
        consumed: usize,
    },
    /// A token that is neither an operator nor a valid literal
    ///
    /// Literals are a single character or the two-character escape `\n`.
    /// Longer tokens such as `ab` or `star` are rejected here rather than
    /// read as multi-character symbols.
    #[error("Invalid symbol {0:?}, symbols must be a single character or \\n")]
    BadSymbol(String),
    /// Tokens left over after one complete expression
    #[error("Trailing tokens after a complete expression: {0:?}")]
    Trailing(Vec<String>),
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Star,
    Plus,
    Concat,
    Union,
}

impl Op {
    fn keyword(self) -> &'static str {
        match self {
            Self::Star => STAR,
            Self::Plus => PLUS,
            Self::Concat => CONCAT,
            Self::Union => UNION,
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::Star | Self::Plus => 1,
            Self::Concat | Self::Union => 2,
        }
    }

    fn build(self, mut args: Vec<Expr>) -> Expr {
        debug_assert_eq!(args.len(), self.arity());
        let last = args.pop().unwrap_or_else(|| unreachable!());

        match self {
            Self::Star => last.star(),
            Self::Plus => last.plus(),
            Self::Concat | Self::Union => {
                let first = args.pop().unwrap_or_else(|| unreachable!());
                if matches!(self, Self::Concat) {
                    Expr::concat(first, last)
                } else {
                    Expr::union(first, last)
                }
            },
        }
    }
}

enum Token {
    Op(Op),
    Leaf(Expr),
}

fn classify(tok: &str) -> Result<Token, ParseError> {
    Ok(match tok {
        STAR => Token::Op(Op::Star),
        PLUS => Token::Op(Op::Plus),
        CONCAT => Token::Op(Op::Concat),
        UNION => Token::Op(Op::Union),
        NULL => Token::Leaf(Expr::Empty),
        NEWLINE => Token::Leaf(Expr::Symbol('\n')),
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Token::Leaf(Expr::Symbol(c)),
                _ => return Err(ParseError::BadSymbol(s.into())),
            }
        },
    })
}

/// An operator still waiting on some of its operands
struct Pending {
    op: Op,
    args: Vec<Expr>,
}

/// Parse prenex tokens with an explicit operator stack, so nesting depth is
/// bounded only by memory
pub fn parse(prenex: &str) -> Result<Expr, ParseError> {
    let mut toks = prenex.split_whitespace();
    let mut consumed = 0_usize;
    let mut stack: Vec<Pending> = vec![];

    let expr = 'parse: loop {
        let Some(tok) = toks.next() else {
            return Err(match stack.last() {
                None => ParseError::NoInput,
                Some(p) => ParseError::MissingOperand {
                    op: p.op.keyword(),
                    index: p.args.len(),
                    consumed,
                },
            });
        };
        consumed += 1;

        let mut done = match classify(tok)? {
            Token::Op(op) => {
                stack.push(Pending {
                    op,
                    args: Vec::with_capacity(op.arity()),
                });
                continue;
            },
            Token::Leaf(e) => e,
        };

        loop {
            let Some(top) = stack.last_mut() else {
                break 'parse done;
            };

            top.args.push(done);
            if top.args.len() < top.op.arity() {
                break;
            }

            let Pending { op, args } = stack.pop().unwrap_or_else(|| unreachable!());
            done = op.build(args);
        }
    };

    let rest: Vec<String> = toks.map(Into::into).collect();
    if !rest.is_empty() {
        return Err(ParseError::Trailing(rest));
    }

    tracing::trace!(tokens = consumed, "Parsed prenex expression");
    Ok(expr)
}
