//! Compiler from prenex regular expressions to maximal-munch lexer automata
//!
//! The pipeline runs [`re::Expr::parse`] to get an AST, [`re::Expr::to_nfa`]
//! for a Thompson NFA, and [`nfa::Nfa::to_dfa`] for a DFA with its dead states
//! classified.  The resulting [`dfa::Dfa`] can be queried directly or fed to a
//! [`lexer::Lexer`] alongside the automata for other token classes.

#![deny(
    clippy::disallowed_methods,
    clippy::suspicious,
    clippy::style,
    clippy::clone_on_ref_ptr,
    missing_debug_implementations,
    missing_copy_implementations
)]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod csv;
pub mod dfa;
pub mod lexer;
pub mod nfa;
pub mod re;
pub mod state;

mod reach;

pub mod prelude {
    //! Common re-exports

    pub use crate::{
        dfa::{Dfa, table::LexerTable},
        lexer::{Lexeme, Lexer, NoMatch},
        nfa::Nfa,
        re::{Expr, ParseError},
        state::State,
    };
}
