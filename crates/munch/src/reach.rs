use std::{collections::BTreeSet, hash::Hash};

use hashbrown::HashSet;

pub trait Visited<T> {
    /// Mark a node as visited, returning false if it already was
    fn visit(&mut self, t: T) -> bool;
}

impl<T: Eq + Hash> Visited<T> for HashSet<T> {
    #[inline]
    fn visit(&mut self, t: T) -> bool { self.insert(t) }
}

impl<T: Ord> Visited<T> for BTreeSet<T> {
    #[inline]
    fn visit(&mut self, t: T) -> bool { self.insert(t) }
}

/// Depth-first worklist collecting every node reachable from a set of roots
#[derive(Debug)]
pub struct Reach<T>(Vec<T>);

impl<T> Default for Reach<T> {
    #[inline]
    fn default() -> Self { Self(Vec::new()) }
}

impl<T> Reach<T> {
    #[inline]
    pub fn init<I: IntoIterator<Item = T>>(&mut self, roots: I) {
        assert!(self.0.is_empty());
        self.0.extend(roots);
    }
}

impl<T: Clone> Reach<T> {
    /// Drain the worklist into `seen`, following `next` out of every node
    /// visited for the first time
    pub fn solve<S: Visited<T>, I: IntoIterator<Item = T>>(
        &mut self,
        seen: &mut S,
        next: impl Fn(T) -> I,
    ) {
        while let Some(node) = self.0.pop() {
            if seen.visit(node.clone()) {
                self.0.extend(next(node));
            }
        }
    }
}
