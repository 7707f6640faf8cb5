//! Deterministic automata and the maximal-munch runtime

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexSet;

use crate::{csv::Csv, state::State};

pub mod sinks;
pub mod table;

/// A runtime configuration: the current state and the input left to read
pub type Conf<'d, 'w> = (&'d State, &'w str);

pub(crate) struct Parts {
    pub token: String,
    pub states: BTreeSet<State>,
    pub alphabet: IndexSet<char>,
    pub start: State,
    pub delta: BTreeMap<State, BTreeMap<char, State>>,
    pub accept: BTreeSet<State>,
    pub sinks: BTreeSet<State>,
    pub trap: Option<State>,
}

/// A deterministic finite automaton recognizing one token class
///
/// The transition table may be partial.  Reading a symbol with no table entry
/// sends the automaton to its trap state and discards the rest of the input.
#[derive(Debug, Clone)]
pub struct Dfa {
    token: String,
    states: BTreeSet<State>,
    alphabet: IndexSet<char>,
    start: State,
    delta: BTreeMap<State, BTreeMap<char, State>>,
    accept: BTreeSet<State>,
    sinks: BTreeSet<State>,
    trap: State,
}

impl From<Parts> for Dfa {
    fn from(parts: Parts) -> Self {
        let Parts {
            token,
            states,
            alphabet,
            start,
            delta,
            accept,
            sinks,
            trap,
        } = parts;

        assert!(states.contains(&start), "Start state {start} is not in the DFA");
        assert!(accept.is_subset(&states), "Accepting states must belong to the DFA");
        for (from, edges) in &delta {
            assert!(states.contains(from), "Edge source {from} is not in the DFA");
            for to in edges.values() {
                assert!(states.contains(to), "Edge target {to} is not in the DFA");
            }
        }

        let trap = trap
            .or_else(|| sinks.first().cloned())
            .unwrap_or_else(|| State::new(crate::state::SINK_LABEL));

        Self {
            token,
            states,
            alphabet,
            start,
            delta,
            accept,
            sinks,
            trap,
        }
    }
}

impl Dfa {
    /// Name of the token class this automaton recognizes
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str { &self.token }

    /// Rename the token class
    #[inline]
    pub fn set_token<S: Into<String>>(&mut self, token: S) { self.token = token.into(); }

    /// Builder form of [`set_token`](Self::set_token)
    #[inline]
    #[must_use]
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.set_token(token);
        self
    }

    /// Every state, including sinks
    #[inline]
    #[must_use]
    pub fn states(&self) -> &BTreeSet<State> { &self.states }

    /// The alphabet, in serialization order
    #[inline]
    #[must_use]
    pub fn alphabet(&self) -> &IndexSet<char> { &self.alphabet }

    /// The initial state
    #[inline]
    #[must_use]
    pub fn start(&self) -> &State { &self.start }

    /// The final states
    #[inline]
    #[must_use]
    pub fn accepting(&self) -> &BTreeSet<State> { &self.accept }

    /// Whether `state` is final
    #[inline]
    #[must_use]
    pub fn is_accepting(&self, state: &State) -> bool { self.accept.contains(state) }

    /// States from which no accepting state can be reached
    #[inline]
    #[must_use]
    pub fn sinks(&self) -> &BTreeSet<State> { &self.sinks }

    /// The state undefined transitions lead to
    #[inline]
    #[must_use]
    pub fn trap(&self) -> &State { &self.trap }

    /// Whether `state` is the trap or a classified sink
    #[inline]
    #[must_use]
    pub fn is_sink(&self, state: &State) -> bool {
        *state == self.trap || self.sinks.contains(state)
    }

    /// Look up a stored transition
    #[inline]
    #[must_use]
    pub fn get(&self, state: &State, sym: char) -> Option<&State> {
        self.delta.get(state)?.get(&sym)
    }

    /// Every stored transition, by source state and then in alphabet order
    pub fn transitions(&self) -> impl Iterator<Item = (&State, char, &State)> {
        self.delta.iter().flat_map(move |(from, edges)| {
            self.alphabet
                .iter()
                .filter_map(move |sym| edges.get(sym).map(|to| (from, *sym, to)))
        })
    }

    /// Recompute the sink set from the transition table
    pub fn classify_sinks(&mut self) {
        self.sinks = sinks::classify(&self.states, self.transitions(), &self.accept);
    }

    /// Builder form of [`classify_sinks`](Self::classify_sinks)
    #[inline]
    #[must_use]
    pub fn with_classified_sinks(mut self) -> Self {
        self.classify_sinks();
        self
    }

    /// Read one symbol
    ///
    /// An undefined transition yields the trap state with no input left, so a
    /// caller looping until the input runs out always terminates.  With no
    /// input left the configuration is returned unchanged.
    #[must_use]
    pub fn step<'d, 'w>(&'d self, (state, rest): Conf<'d, 'w>) -> Conf<'d, 'w> {
        let mut chars = rest.chars();
        let Some(sym) = chars.next() else {
            return (state, rest);
        };

        match self.get(state, sym) {
            Some(next) => (next, chars.as_str()),
            None => (&self.trap, ""),
        }
    }

    /// Run the automaton over the whole word
    #[must_use]
    pub fn accept(&self, word: &str) -> bool {
        let mut conf = (&self.start, word);
        while !conf.1.is_empty() {
            conf = self.step(conf);
        }

        self.is_accepting(conf.0)
    }

    /// Find the longest prefix of `word` accepted by the automaton
    ///
    /// Returns the prefix and the index (counted in symbols) of the last
    /// symbol read before the walk stopped, or `None` if none was.  The walk
    /// stops early when a symbol leads into a sink, and that symbol does not
    /// count as read.
    #[must_use]
    pub fn longest_prefix<'w>(&self, word: &'w str) -> (&'w str, Option<usize>) {
        let mut state = &self.start;
        let mut best = 0;
        let mut last = None;

        if self.is_sink(state) {
            return ("", None);
        }

        for (i, (pos, sym)) in word.char_indices().enumerate() {
            let (next, _) = self.step((state, &word[pos..]));
            if self.is_sink(next) {
                break;
            }

            state = next;
            last = Some(i);

            if self.is_accepting(state) {
                best = pos + sym.len_utf8();
            }
        }

        (&word[..best], last)
    }

    /// Render the automaton as a stage-2 table block
    #[inline]
    #[must_use]
    pub fn stage2(&self) -> table::Stage2<'_> { table::Stage2(self) }

    /// Dump the transition table as CSV
    #[must_use]
    pub fn csv(&self) -> Csv<'_> {
        Csv::new(
            self.transitions()
                .map(|(from, sym, to)| (from, Some(sym), to, self.accept.contains(to))),
        )
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::Dfa;
    use crate::{re, re::Expr, state::State};

    fn dfa(prenex: &str) -> Dfa { Expr::parse(prenex).unwrap().to_nfa().to_dfa() }

    #[test]
    fn concat() {
        let dfa = dfa("CONCAT a b");
        assert!(dfa.accept("ab"));
        assert!(!dfa.accept("a"));
        assert!(!dfa.accept("ba"));
        assert!(!dfa.accept("abc"));
        assert!(!dfa.accept(""));
    }

    #[test]
    fn star() {
        let dfa = dfa("STAR a");
        assert!(dfa.accept(""));
        assert!(dfa.accept("aaaa"));
        assert!(!dfa.accept("ab"));
    }

    #[test]
    fn union_longest_prefix() {
        let dfa = dfa("UNION a b");
        assert_eq!(dfa.longest_prefix("ac"), ("a", Some(0)));
        assert_eq!(dfa.longest_prefix("b"), ("b", Some(0)));
        assert_eq!(dfa.longest_prefix("ca"), ("", None));
    }

    #[test]
    fn plus() {
        let dfa = dfa("PLUS a");
        assert!(!dfa.accept(""));
        assert!(dfa.accept("a"));
        assert!(dfa.accept("aa"));
    }

    #[test]
    fn null() {
        let dfa = dfa("NULL");
        assert!(!dfa.accept(""));
        assert!(!dfa.accept("a"));
        assert!(!dfa.accept("anything"));
        assert!(dfa.is_sink(dfa.start()));
        assert_eq!(dfa.longest_prefix("abc"), ("", None));
    }

    #[test]
    fn step() {
        let dfa = dfa("CONCAT a b");
        let start = dfa.start();

        let (s, rest) = dfa.step((start, "abx"));
        assert_eq!((s, rest), (&State::numbered(1), "bx"));
        let (s, rest) = dfa.step((s, rest));
        assert_eq!((s, rest), (&State::numbered(2), "x"));

        // undefined: straight to the trap with nothing left to read
        assert_eq!(dfa.step((s, rest)), (dfa.trap(), ""));
        assert_eq!(dfa.step((start, "")), (start, ""));
        assert_eq!(dfa.step((dfa.trap(), "ab")), (dfa.trap(), "b"));
    }

    #[test]
    fn longest_prefix() {
        let dfa = dfa("STAR a");
        assert_eq!(dfa.longest_prefix("aaa"), ("aaa", Some(2)));
        assert_eq!(dfa.longest_prefix("aab"), ("aa", Some(1)));
        assert_eq!(dfa.longest_prefix(""), ("", None));

        let dfa = self::dfa("CONCAT a CONCAT b c");
        assert_eq!(dfa.longest_prefix("ab"), ("", Some(1)));
        assert_eq!(dfa.longest_prefix("abcabc"), ("abc", Some(2)));

        let dfa = self::dfa("CONCAT a STAR CONCAT b c");
        assert_eq!(dfa.longest_prefix("abcbx"), ("abc", Some(3)));
        assert_eq!(dfa.longest_prefix("ébc"), ("", None));
    }

    #[test]
    fn multibyte_symbols() {
        let dfa = dfa("PLUS é");
        assert_eq!(dfa.longest_prefix("ééa"), ("éé", Some(1)));
        assert!(dfa.accept("é"));
    }

    #[test]
    fn dead_states_are_classified() {
        // after "a" the automaton can never accept
        let dfa = dfa("UNION CONCAT a NULL b");
        let after_a = dfa.get(dfa.start(), 'a').unwrap().clone();

        assert!(dfa.is_sink(&after_a));
        assert!(dfa.sinks().contains(dfa.trap()));
        assert_eq!(dfa.longest_prefix("ab"), ("", None));
        assert!(!dfa.accept("a"));
        assert!(dfa.accept("b"));
    }

    #[test]
    fn csv() {
        let dfa = dfa("CONCAT a b");
        assert_eq!(
            dfa.csv().to_string(),
            "from,char,to\n0,a,1\n1,b,f2\nS,a,S\nS,b,S\n"
        );
    }

    fn word() -> impl Strategy<Value = String> { "[a-d]{0,8}" }

    proptest! {
        #[test]
        fn determinization_preserves_language(
            e in re::expr(5, 24, prop::char::range('a', 'c'), true),
            words in prop::collection::vec(word(), 16),
        ) {
            let nfa = e.to_nfa();
            let dfa = nfa.to_dfa();

            for w in &words {
                prop_assert_eq!(nfa.accept(w), dfa.accept(w), "{:?}", w);
            }
        }

        #[test]
        fn longest_prefix_is_accepted(
            e in re::expr(5, 24, prop::char::range('a', 'c'), true),
            w in word(),
        ) {
            let dfa = e.to_nfa().to_dfa();
            let (prefix, last) = dfa.longest_prefix(&w);

            prop_assert!(w.starts_with(prefix));
            if !prefix.is_empty() {
                prop_assert!(dfa.accept(prefix));
                prop_assert!(last.is_some_and(|l| l + 1 >= prefix.chars().count()));
            }

            for len in prefix.len() + 1..=w.len() {
                prop_assert!(!dfa.accept(&w[..len]), "{:?} is longer than {:?}", &w[..len], prefix);
            }
        }

        #[test]
        fn sinks_are_dead(e in re::expr(5, 24, prop::char::range('a', 'c'), true)) {
            let dfa = e.to_nfa().to_dfa();

            for sink in dfa.sinks() {
                prop_assert!(!dfa.is_accepting(sink));

                for sym in dfa.alphabet() {
                    if let Some(next) = dfa.get(sink, *sym) {
                        prop_assert!(dfa.sinks().contains(next));
                    }
                }
            }

            // every live state can still reach an accepting one
            for state in dfa.states().iter().filter(|s| !dfa.sinks().contains(*s)) {
                let mut seen = BTreeSet::from([state]);
                let mut stack = vec![state];
                let mut live = false;

                while let Some(s) = stack.pop() {
                    live |= dfa.is_accepting(s);
                    for next in dfa.alphabet().iter().filter_map(|&c| dfa.get(s, c)) {
                        if seen.insert(next) {
                            stack.push(next);
                        }
                    }
                }

                prop_assert!(live, "{} is live but cannot accept", state);
            }
        }
    }
}
