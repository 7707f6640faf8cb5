use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexSet;

use super::Nfa;
use crate::{
    dfa::{Dfa, Parts},
    state::State,
};

/// Subset construction over an NFA, keeping composed states in discovery
/// order so their index doubles as their ordinal
struct DfaBuilder<'a> {
    nfa: &'a Nfa,
    found: IndexSet<State>,
    table: BTreeMap<usize, BTreeMap<char, usize>>,
    accept: BTreeSet<usize>,
}

impl<'a> DfaBuilder<'a> {
    fn new(nfa: &'a Nfa) -> Self {
        Self {
            nfa,
            found: IndexSet::new(),
            table: BTreeMap::new(),
            accept: BTreeSet::new(),
        }
    }

    /// Look up the composed state for a set of NFA states, creating it if it
    /// is new
    fn intern(&mut self, origin: BTreeSet<State>) -> (usize, bool) {
        let accepting = !origin.is_disjoint(self.nfa.accepting());
        let (id, fresh) = self.found.insert_full(State::composed(origin));

        if fresh {
            tracing::trace!(id, accepting, "Found new DFA state");
            if accepting {
                self.accept.insert(id);
            }
        }

        (id, fresh)
    }

    fn explore(&mut self) {
        let (start, _) = self.intern(self.nfa.closure_of(self.nfa.start()));
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let Some(origin) = self.found[id].origin().cloned() else {
                unreachable!("Subset construction produced a non-composed state");
            };

            for &sym in self.nfa.alphabet() {
                let dest = self.nfa.advance(&origin, sym);
                if dest.is_empty() {
                    continue;
                }

                let (to, fresh) = self.intern(dest);
                assert!(self.table.entry(id).or_default().insert(sym, to).is_none());

                if fresh {
                    stack.push(to);
                }
            }
        }
    }

    fn finish(self) -> Dfa {
        let Self {
            nfa,
            found,
            table,
            accept,
        } = self;

        let count = found.len();
        let sink = State::sink(count);
        let alphabet: IndexSet<char> = nfa.alphabet().iter().copied().collect();

        let mut delta: BTreeMap<State, BTreeMap<char, State>> = table
            .into_iter()
            .map(|(from, edges)| {
                (
                    State::numbered(from),
                    edges
                        .into_iter()
                        .map(|(sym, to)| (sym, State::numbered(to)))
                        .collect(),
                )
            })
            .collect();
        delta.insert(
            sink.clone(),
            alphabet.iter().map(|&sym| (sym, sink.clone())).collect(),
        );

        let states = (0..count)
            .map(State::numbered)
            .chain([sink.clone()])
            .collect();

        Parts {
            token: String::new(),
            states,
            alphabet,
            start: State::numbered(0),
            delta,
            accept: accept.into_iter().map(State::numbered).collect(),
            sinks: [sink.clone()].into_iter().collect(),
            trap: Some(sink),
        }
        .into()
    }
}

pub fn build(nfa: &Nfa) -> Dfa {
    let _s = tracing::debug_span!(
        "subset_construction",
        nfa_states = nfa.states().len(),
        symbols = nfa.alphabet().len()
    )
    .entered();

    let mut builder = DfaBuilder::new(nfa);
    builder.explore();
    let dfa = builder.finish();

    tracing::debug!(
        states = dfa.states().len(),
        accepting = dfa.accepting().len(),
        "Subset construction finished"
    );

    dfa
}
