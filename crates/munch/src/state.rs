//! Automaton states and their identity rules

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt, hash,
    sync::Arc,
};

/// Label of the state the runtime routes undefined transitions to
pub const SINK_LABEL: &str = "S";

/// A state label, with its numeric value cached when it has one
#[derive(Clone)]
pub struct Label {
    name: Arc<str>,
    num: Option<usize>,
}

impl Label {
    fn new(name: Arc<str>) -> Self {
        let num = name.parse().ok();
        Self { name, num }
    }

    /// The label text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str { &self.name }

    /// The label's value if it is a plain unsigned integer
    #[inline]
    #[must_use]
    pub fn num(&self) -> Option<usize> { self.num }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(&*self.name, f) }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool { self.name == other.name }
}

impl Eq for Label {}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.num, other.num) {
            (Some(l), Some(r)) => l.cmp(&r).then_with(|| self.name.cmp(&other.name)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.name.cmp(&other.name),
        }
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl hash::Hash for Label {
    fn hash<H: hash::Hasher>(&self, state: &mut H) { self.name.hash(state); }
}

/// A vertex of an NFA or DFA
///
/// Simple states are identified by their label alone.  Composed states are
/// produced by subset construction and are identified by the set of states
/// they were merged from.  The two kinds never compare equal.
#[derive(Clone)]
pub enum State {
    /// A labelled state
    Simple {
        /// Identity of the state
        label: Label,
        /// Position of the state in serialized tables, if it has one
        ordinal: Option<usize>,
    },
    /// A set of states merged into one
    Composed(Arc<BTreeSet<State>>),
}

impl State {
    /// Construct a simple state, deriving its ordinal from the label
    #[must_use]
    pub fn new<S: Into<Arc<str>>>(label: S) -> Self {
        let label = Label::new(label.into());
        Self::Simple {
            ordinal: label.num,
            label,
        }
    }

    /// Construct a simple state labelled with a decimal number
    #[inline]
    #[must_use]
    pub fn numbered(n: usize) -> Self { Self::new(n.to_string()) }

    /// Construct the sink state added after subset construction, placed at
    /// the given ordinal
    #[must_use]
    pub fn sink(ordinal: usize) -> Self {
        Self::Simple {
            label: Label::new(SINK_LABEL.into()),
            ordinal: Some(ordinal),
        }
    }

    /// Construct a state standing for a non-empty set of other states
    ///
    /// # Panics
    /// This function panics if `origin` is empty.
    #[must_use]
    pub fn composed<I: IntoIterator<Item = State>>(origin: I) -> Self {
        let set: BTreeSet<_> = origin.into_iter().collect();
        assert!(!set.is_empty(), "Composed states need at least one origin");
        Self::Composed(set.into())
    }

    /// The label of a simple state
    #[must_use]
    pub fn label(&self) -> Option<&Label> {
        match self {
            Self::Simple { label, .. } => Some(label),
            Self::Composed(_) => None,
        }
    }

    /// The serialization ordinal, if one was assigned
    #[must_use]
    pub fn ordinal(&self) -> Option<usize> {
        match self {
            Self::Simple { ordinal, .. } => *ordinal,
            Self::Composed(_) => None,
        }
    }

    /// The states this one was merged from, if it is a composed state
    #[must_use]
    pub fn origin(&self) -> Option<&BTreeSet<State>> {
        match self {
            Self::Simple { .. } => None,
            Self::Composed(set) => Some(set),
        }
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Simple { label: l, .. }, Self::Simple { label: r, .. }) => l == r,
            (Self::Composed(l), Self::Composed(r)) => Arc::ptr_eq(l, r) || l == r,
            _ => false,
        }
    }
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Simple { label: l, .. }, Self::Simple { label: r, .. }) => l.cmp(r),
            (Self::Simple { .. }, Self::Composed(_)) => Ordering::Less,
            (Self::Composed(_), Self::Simple { .. }) => Ordering::Greater,
            (Self::Composed(l), Self::Composed(r)) => l.cmp(r),
        }
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl hash::Hash for State {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::Simple { label, .. } => {
                0_u8.hash(state);
                label.hash(state);
            },
            Self::Composed(set) => {
                1_u8.hash(state);
                set.hash(state);
            },
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple { label, ordinal } if *ordinal == label.num => {
                f.debug_tuple("State").field(label).finish()
            },
            Self::Simple { label, ordinal } => f
                .debug_struct("State")
                .field("label", label)
                .field("ordinal", ordinal)
                .finish(),
            Self::Composed(set) => f.debug_set().entries(set.iter()).finish(),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple { label, .. } => fmt::Display::fmt(label, f),
            Self::Composed(set) => {
                f.write_str("{")?;
                for (i, state) in set.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(state, f)?;
                }
                f.write_str("}")
            },
        }
    }
}
