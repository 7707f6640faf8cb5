//! Dead-state detection over a DFA transition table

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

use crate::{reach::Reach, state::State};

/// Find every state with no path to an accepting state
///
/// Walks the transition graph backwards from the accepting states; whatever
/// the walk never reaches is a sink.
pub fn classify<'a, I: IntoIterator<Item = (&'a State, char, &'a State)>>(
    states: &'a BTreeSet<State>,
    transitions: I,
    accept: &'a BTreeSet<State>,
) -> BTreeSet<State> {
    let mut rev: HashMap<&State, Vec<&State>> = HashMap::new();
    for (from, _, to) in transitions {
        rev.entry(to).or_default().push(from);
    }

    let mut live = HashSet::new();
    let mut reach = Reach::default();
    reach.init(accept.iter());
    reach.solve(&mut live, |s| rev.get(s).into_iter().flatten().copied());

    let sinks: BTreeSet<State> = states
        .iter()
        .filter(|s| !live.contains(s))
        .cloned()
        .collect();

    tracing::trace!(
        live = live.len(),
        sinks = sinks.len(),
        "Classified sink states"
    );
    sinks
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::classify;
    use crate::state::State;

    fn set<const N: usize>(ns: [usize; N]) -> BTreeSet<State> {
        ns.into_iter().map(State::numbered).collect()
    }

    #[test]
    fn backwards_from_accepting() {
        // 0 -a-> 1 -b-> 2 (accepting), 0 -b-> 3 -a-> 3, 2 -a-> 4
        let states = set([0, 1, 2, 3, 4]);
        let n = State::numbered;
        let edges = [
            (n(0), 'a', n(1)),
            (n(1), 'b', n(2)),
            (n(0), 'b', n(3)),
            (n(3), 'a', n(3)),
            (n(2), 'a', n(4)),
        ];
        let accept = set([2]);

        let sinks = classify(&states, edges.iter().map(|(f, c, t)| (f, *c, t)), &accept);
        assert_eq!(sinks, set([3, 4]));
    }

    #[test]
    fn no_accepting_states() {
        let states = set([0, 1]);
        let n = State::numbered;
        let edges = [(n(0), 'a', n(1))];

        let sinks = classify(
            &states,
            edges.iter().map(|(f, c, t)| (f, *c, t)),
            &BTreeSet::new(),
        );
        assert_eq!(sinks, states);
    }

    #[test]
    fn everything_live() {
        let states = set([0, 1]);
        let n = State::numbered;
        let edges = [(n(0), 'a', n(1)), (n(1), 'a', n(0))];

        let sinks = classify(&states, edges.iter().map(|(f, c, t)| (f, *c, t)), &set([0]));
        assert!(sinks.is_empty());
    }
}
