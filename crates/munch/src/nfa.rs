//! Nondeterministic automata with epsilon transitions

use std::collections::{BTreeMap, BTreeSet};

use crate::{csv::Csv, dfa::Dfa, reach::Reach, state::State};

mod dfa_builder;

/// For every state, the states reachable from it over one or more epsilon
/// edges, not counting the state itself
pub type Closures = BTreeMap<State, BTreeSet<State>>;

/// Outgoing edges of one NFA state
#[derive(Debug, Default, Clone)]
pub struct Node {
    nil: BTreeSet<State>,
    map: BTreeMap<char, BTreeSet<State>>,
}

impl Node {
    /// Targets of epsilon edges
    #[inline]
    #[must_use]
    pub fn nil_edges(&self) -> &BTreeSet<State> { &self.nil }

    /// Targets of edges on `sym`
    #[inline]
    #[must_use]
    pub fn get(&self, sym: char) -> Option<&BTreeSet<State>> { self.map.get(&sym) }

    /// Every edge, epsilon edges (labelled `None`) first
    pub fn edges(&self) -> impl Iterator<Item = (Option<char>, &State)> {
        self.nil.iter().map(|s| (None, s)).chain(
            self.map
                .iter()
                .flat_map(|(&c, set)| set.iter().map(move |s| (Some(c), s))),
        )
    }
}

/// A nondeterministic finite automaton over `char` symbols
///
/// Epsilon closures are computed on first use and cached for the lifetime of
/// the automaton.
#[derive(Debug)]
pub struct Nfa {
    states: BTreeSet<State>,
    alphabet: BTreeSet<char>,
    start: State,
    nodes: BTreeMap<State, Node>,
    accept: BTreeSet<State>,
    closures: spin::Once<Closures>,
}

impl Nfa {
    pub(crate) fn new(start: State) -> Self {
        Self {
            states: [start.clone()].into_iter().collect(),
            alphabet: BTreeSet::new(),
            start,
            nodes: BTreeMap::new(),
            accept: BTreeSet::new(),
            closures: spin::Once::new(),
        }
    }

    /// The initial state
    #[inline]
    #[must_use]
    pub fn start(&self) -> &State { &self.start }

    /// Every state, including ones without outgoing edges
    #[inline]
    #[must_use]
    pub fn states(&self) -> &BTreeSet<State> { &self.states }

    /// Every symbol with at least one edge
    #[inline]
    #[must_use]
    pub fn alphabet(&self) -> &BTreeSet<char> { &self.alphabet }

    /// The final states
    #[inline]
    #[must_use]
    pub fn accepting(&self) -> &BTreeSet<State> { &self.accept }

    /// Whether `state` is final
    #[inline]
    #[must_use]
    pub fn is_accepting(&self, state: &State) -> bool { self.accept.contains(state) }

    /// Outgoing edges of `state`, if it has any
    #[inline]
    #[must_use]
    pub fn get(&self, state: &State) -> Option<&Node> { self.nodes.get(state) }

    /// Every state with outgoing edges, in state order
    #[inline]
    pub fn nodes(&self) -> impl Iterator<Item = (&State, &Node)> { self.nodes.iter() }

    #[inline]
    pub(crate) fn insert(&mut self, state: State) -> bool {
        self.closures = spin::Once::new();
        self.states.insert(state)
    }

    pub(crate) fn connect(&mut self, from: &State, to: State, by: Option<char>) -> bool {
        assert!(self.states.contains(from), "Edge source {from} is not in the NFA");
        assert!(self.states.contains(&to), "Edge target {to} is not in the NFA");
        self.closures = spin::Once::new();

        let node = self.nodes.entry(from.clone()).or_default();
        if let Some(c) = by {
            self.alphabet.insert(c);
            node.map.entry(c).or_default().insert(to)
        } else {
            node.nil.insert(to)
        }
    }

    pub(crate) fn set_accept<I: IntoIterator<Item = State>>(&mut self, accept: I) {
        self.accept = accept.into_iter().collect();
        assert!(
            self.accept.is_subset(&self.states),
            "Accepting states must belong to the NFA"
        );
    }

    fn epsilon_targets<'a>(&'a self, state: &State) -> impl Iterator<Item = &'a State> + use<'a> {
        self.nodes.get(state).into_iter().flat_map(|n| n.nil.iter())
    }

    fn solve_closures(&self) -> Closures {
        let _s = tracing::trace_span!("epsilon_closures", states = self.states.len()).entered();
        let mut reach = Reach::default();

        self.states
            .iter()
            .map(|state| {
                let mut seen = BTreeSet::new();
                reach.init(self.epsilon_targets(state));
                reach.solve(&mut seen, |s| self.epsilon_targets(s));
                seen.remove(state);

                (state.clone(), seen.into_iter().cloned().collect())
            })
            .collect()
    }

    /// The epsilon closure of every state, computed once per automaton
    #[inline]
    pub fn epsilon_closures(&self) -> &Closures { self.closures.call_once(|| self.solve_closures()) }

    /// The given state together with everything reachable from it over
    /// epsilon edges
    #[must_use]
    pub fn closure_of(&self, state: &State) -> BTreeSet<State> {
        let mut set = self
            .epsilon_closures()
            .get(state)
            .cloned()
            .unwrap_or_default();
        set.insert(state.clone());
        set
    }

    /// States reached from `from` by one `sym` edge followed by any number of
    /// epsilon edges
    pub(crate) fn advance(&self, from: &BTreeSet<State>, sym: char) -> BTreeSet<State> {
        let closures = self.epsilon_closures();
        let mut to = BTreeSet::new();

        for dest in from
            .iter()
            .filter_map(|s| self.nodes.get(s)?.get(sym))
            .flatten()
        {
            to.insert(dest.clone());
            if let Some(c) = closures.get(dest) {
                to.extend(c.iter().cloned());
            }
        }

        to
    }

    /// Simulate the automaton on a word, tracking every live state at once
    #[must_use]
    pub fn accept(&self, word: &str) -> bool {
        let mut current = self.closure_of(&self.start);

        for c in word.chars() {
            current = self.advance(&current, c);
            if current.is_empty() {
                return false;
            }
        }

        !current.is_disjoint(&self.accept)
    }

    /// Determinize the automaton with the subset construction and classify
    /// the dead states of the result
    #[must_use]
    pub fn to_dfa(&self) -> Dfa { dfa_builder::build(self).with_classified_sinks() }

    /// Dump the transition relation as CSV
    #[must_use]
    pub fn csv(&self) -> Csv<'_> {
        Csv::new(self.nodes.iter().flat_map(|(from, node)| {
            node.edges()
                .map(move |(by, to)| (from, by, to, self.accept.contains(to)))
        }))
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::Nfa;
    use crate::{
        re::{self, Expr, test_tools::matches},
        state::State,
    };

    fn states<const N: usize>(ns: [usize; N]) -> BTreeSet<State> {
        ns.into_iter().map(State::numbered).collect()
    }

    fn nfa(prenex: &str) -> Nfa { Expr::parse(prenex).unwrap().to_nfa() }

    #[test]
    fn closures_handle_cycles() {
        // 0 -ε-> 1 -ε-> 2 -ε-> 1, 2 -a-> 3
        let mut nfa = Nfa::new(State::numbered(0));
        for n in 1..=3 {
            nfa.insert(State::numbered(n));
        }
        nfa.connect(&State::numbered(0), State::numbered(1), None);
        nfa.connect(&State::numbered(1), State::numbered(2), None);
        nfa.connect(&State::numbered(2), State::numbered(1), None);
        nfa.connect(&State::numbered(2), State::numbered(3), Some('a'));

        let closures = nfa.epsilon_closures();
        assert_eq!(closures[&State::numbered(0)], states([1, 2]));
        assert_eq!(closures[&State::numbered(1)], states([2]));
        assert_eq!(closures[&State::numbered(2)], states([1]));
        assert_eq!(closures[&State::numbered(3)], states([]));
        assert_eq!(nfa.closure_of(&State::numbered(1)), states([1, 2]));
    }

    #[test]
    fn star_closure() {
        let nfa = nfa("STAR a");
        assert_eq!(nfa.closure_of(nfa.start()), states([0, 1, 3]));
    }

    #[test]
    fn closures_are_cached() {
        let nfa = nfa("STAR UNION a b");
        let first: *const _ = nfa.epsilon_closures();
        let second: *const _ = nfa.epsilon_closures();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn languages() {
        let cat = nfa("CONCAT a b");
        assert!(cat.accept("ab"));
        assert!(!cat.accept("a"));
        assert!(!cat.accept("abb"));

        let star = nfa("STAR a");
        for w in ["", "a", "aa", "aaaa"] {
            assert!(star.accept(w), "{w:?}");
        }
        assert!(!star.accept("ab"));

        let alt = nfa("UNION a b");
        assert!(alt.accept("a"));
        assert!(alt.accept("b"));
        assert!(!alt.accept(""));
        assert!(!alt.accept("ab"));

        let plus = nfa("PLUS a");
        assert!(!plus.accept(""));
        assert!(plus.accept("a"));
        assert!(plus.accept("aaa"));

        let null = nfa("NULL");
        assert!(!null.accept(""));
        assert!(null.alphabet().is_empty());

        let eps = Expr::Epsilon.to_nfa();
        assert!(eps.accept(""));
        assert!(!eps.accept("a"));
    }

    #[test]
    fn csv() {
        let nfa = nfa("CONCAT a b");
        assert_eq!(
            nfa.csv().to_string(),
            "from,char,to\n0,a,1\n1,ε,2\n2,b,f3\n"
        );
    }

    proptest! {
        #[test]
        fn matches_reference(
            e in re::expr(5, 24, prop::char::range('a', 'c'), true),
            words in prop::collection::vec("[a-d]{0,6}", 16),
        ) {
            let nfa = e.clone().to_nfa();
            for w in &words {
                prop_assert_eq!(nfa.accept(w), matches(&e, w), "{} on {:?}", e, w);
            }
        }
    }
}
