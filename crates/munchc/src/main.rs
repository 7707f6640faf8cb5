#![deny(
    clippy::disallowed_methods,
    clippy::suspicious,
    clippy::style,
    missing_debug_implementations,
    missing_copy_implementations
)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

fn main() { entry::main(); }

mod entry {
    use std::{
        fmt, fs,
        io::{self, prelude::*},
        path::{Path, PathBuf},
    };

    use anyhow::{Context, Result};
    use clap::Parser;
    use munch::{
        dfa::table::{Escaped, LexerTable},
        lexer::Lexer,
        re::Expr,
    };
    use tracing_subscriber::{filter::LevelFilter, prelude::*};

    #[derive(Debug, Parser)]
    #[command(version, author, about)]
    struct Opts {
        /// Print more verbose logs
        #[arg(short, long, action = clap::ArgAction::Count, global = true)]
        verbose: u8,

        #[command(subcommand)]
        cmd: Command,
    }

    #[derive(Debug, clap::Subcommand)]
    enum Command {
        /// Compile a prenex regular expression into a DFA table
        Compile(CompileOpts),
        /// Split input into tokens using a lexer table
        Lex(LexOpts),
    }

    #[derive(Debug, clap::Args)]
    struct CompileOpts {
        /// Token name to label the DFA with, producing a lexer table entry
        #[arg(short, long)]
        token: Option<String>,

        /// Write the NFA edges as CSV to this file
        #[arg(long)]
        nfa_csv: Option<PathBuf>,

        /// Write the DFA transitions as CSV to this file
        #[arg(long)]
        dfa_csv: Option<PathBuf>,

        /// File containing the prenex expression
        input: PathBuf,

        /// Output file, defaults to standard output
        output: Option<PathBuf>,
    }

    #[derive(Debug, clap::Args)]
    struct LexOpts {
        /// Lexer table to tokenize with
        table: PathBuf,

        /// Input file, defaults to standard input
        input: Option<PathBuf>,
    }

    #[inline]
    pub fn main() {
        let opts = Opts::parse();

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(match (cfg!(debug_assertions), opts.verbose) {
                (false, 0) => LevelFilter::INFO,
                (false, 1) | (true, 0) => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            })
            .init();

        tracing::debug!("{opts:#?}");

        std::process::exit(run(opts).map_or_else(
            |e| {
                tracing::error!("{e:?}");
                1
            },
            |()| 0,
        ));
    }

    #[inline]
    fn run(Opts { verbose: _, cmd }: Opts) -> Result<()> {
        match cmd {
            Command::Compile(opts) => compile(opts),
            Command::Lex(opts) => lex(opts),
        }
    }

    fn read(path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Error reading {}", path.display()))
    }

    fn write_csv(path: &Path, csv: impl fmt::Display) -> Result<()> {
        fs::write(path, csv.to_string())
            .with_context(|| format!("Error writing CSV to {}", path.display()))
    }

    fn compile(
        CompileOpts {
            token,
            nfa_csv,
            dfa_csv,
            input,
            output,
        }: CompileOpts,
    ) -> Result<()> {
        let _s = tracing::info_span!("compile", input = %input.display()).entered();

        let expr = Expr::parse(&read(&input)?).context("Error parsing regular expression")?;
        tracing::debug!(regex = %expr.to_regex(), nodes = expr.node_count(), "Parsed expression");

        let nfa = expr.to_nfa();
        if let Some(path) = nfa_csv {
            write_csv(&path, nfa.csv())?;
        }

        let dfa = nfa.to_dfa();
        tracing::info!(
            states = dfa.states().len(),
            accepting = dfa.accepting().len(),
            sinks = dfa.sinks().len(),
            "DFA compiled"
        );

        if let Some(path) = dfa_csv {
            write_csv(&path, dfa.csv())?;
        }

        let table = match token {
            Some(token) => [dfa.with_token(token)]
                .into_iter()
                .collect::<LexerTable>()
                .to_string(),
            None => dfa.stage2().to_string(),
        };

        if let Some(path) = output {
            fs::write(&path, table)
                .with_context(|| format!("Error writing table to {}", path.display()))
        } else {
            io::stdout()
                .lock()
                .write_all(table.as_bytes())
                .context("Error writing table to standard output")
        }
    }

    fn lex(LexOpts { table, input }: LexOpts) -> Result<()> {
        let table = LexerTable::parse(&read(&table)?)
            .with_context(|| format!("Error loading lexer table {}", table.display()))?;

        let input = if let Some(path) = input {
            read(&path)?
        } else {
            let mut s = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut s)
                .context("Error reading standard input")?;
            s
        };

        let mut out = io::stdout().lock();
        let mut count = 0_usize;
        for lexeme in Lexer::new(table.dfas(), &input) {
            let lexeme = lexeme.context("Error tokenizing input")?;
            writeln!(out, "{}\t{}", lexeme.token, Escaped(lexeme.text))
                .context("Error writing to standard output")?;
            count += 1;
        }

        tracing::debug!(count, "Input tokenized");
        Ok(())
    }
}
