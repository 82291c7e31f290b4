//! Frontier of pending search nodes.

use std::collections::VecDeque;

use derive_more::Display;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::search::SearchTreeNode;
use crate::space::Action;
use crate::space::State;

/// Order in which a `Frontier` hands out its pending nodes.
///
/// This is the only thing telling a depth-first traversal apart from a
/// breadth-first one.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum FrontierKind {
    /// Last-in-first-out. Depth-first traversal.
    #[default]
    #[display("stack")]
    Stack,
    /// First-in-first-out. Breadth-first traversal.
    #[display("queue")]
    Queue,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontierError {
    #[error("empty frontier")]
    Empty,
}

/// Nodes discovered but not yet expanded.
///
/// Both orderings share the same storage and only differ on `remove()`.
/// Pending states are counted on the side so `contains_state()` doesn't need
/// to scan the whole frontier.
#[derive(Debug)]
pub struct Frontier<St, A>
where
    St: State,
    A: Action,
{
    kind: FrontierKind,
    nodes: VecDeque<SearchTreeNode<St, A>>,
    /// Number of pending nodes on each state.
    ///
    /// `add()` doesn't deduplicate, so a state may be pending more than once.
    pending: FxHashMap<St, u32>,
}

impl<St, A> Frontier<St, A>
where
    St: State,
    A: Action,
{
    #[must_use]
    pub fn new(kind: FrontierKind) -> Self {
        Self {
            kind,
            nodes: VecDeque::new(),
            pending: FxHashMap::default(),
        }
    }

    pub fn kind(&self) -> FrontierKind {
        self.kind
    }

    pub fn add(&mut self, node: SearchTreeNode<St, A>) {
        *self.pending.entry(node.state).or_insert(0) += 1;
        self.nodes.push_back(node);
        self.verify();
    }

    #[inline(always)]
    pub fn contains_state(&self, s: &St) -> bool {
        self.pending.contains_key(s)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Removes the next node according to the `FrontierKind`.
    pub fn remove(&mut self) -> Result<SearchTreeNode<St, A>, FrontierError> {
        let node = match self.kind {
            FrontierKind::Stack => self.nodes.pop_back(),
            FrontierKind::Queue => self.nodes.pop_front(),
        }
        .ok_or(FrontierError::Empty)?;

        if let Some(count) = self.pending.get_mut(&node.state) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&node.state);
            }
        }
        self.verify();

        Ok(node)
    }

    #[inline(always)]
    #[cfg(not(feature = "verify"))]
    pub(crate) fn verify(&self) {
        // All good... (hopefully)
    }
    #[inline(always)]
    #[cfg(feature = "verify")]
    pub(crate) fn verify(&self) {
        let total: usize = self.pending.values().map(|c| *c as usize).sum();
        debug_assert_eq!(total, self.nodes.len());
        for n in &self.nodes {
            debug_assert!(self.pending.get(&n.state).is_some_and(|c| *c > 0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::search::SearchTreeIndex;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    struct S(u8);
    impl State for S {}
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct Step;
    impl Action for Step {}

    fn node(s: u8) -> SearchTreeNode<S, Step> {
        SearchTreeNode::new_root(S(s))
    }

    #[test]
    fn stack_is_lifo() {
        let mut frontier = Frontier::<S, Step>::new(FrontierKind::Stack);
        frontier.add(node(1));
        frontier.add(node(2));
        frontier.add(node(3));

        assert_eq!(frontier.remove().unwrap().state, S(3));
        assert_eq!(frontier.remove().unwrap().state, S(2));
        frontier.add(node(4));
        assert_eq!(frontier.remove().unwrap().state, S(4));
        assert_eq!(frontier.remove().unwrap().state, S(1));
        assert!(frontier.is_empty());
    }

    #[test]
    fn queue_is_fifo() {
        let mut frontier = Frontier::<S, Step>::new(FrontierKind::Queue);
        frontier.add(node(1));
        frontier.add(node(2));
        frontier.add(node(3));

        assert_eq!(frontier.remove().unwrap().state, S(1));
        frontier.add(node(4));
        assert_eq!(frontier.remove().unwrap().state, S(2));
        assert_eq!(frontier.remove().unwrap().state, S(3));
        assert_eq!(frontier.remove().unwrap().state, S(4));
        assert!(frontier.is_empty());
    }

    #[test]
    fn remove_from_empty_fails() {
        for kind in [FrontierKind::Stack, FrontierKind::Queue] {
            let mut frontier = Frontier::<S, Step>::new(kind);
            assert!(frontier.is_empty());
            assert_eq!(frontier.remove(), Err(FrontierError::Empty));

            frontier.add(node(1));
            assert!(frontier.remove().is_ok());
            assert_eq!(frontier.remove(), Err(FrontierError::Empty));
        }
    }

    #[test]
    fn contains_tracks_pending_states() {
        let mut frontier = Frontier::<S, Step>::new(FrontierKind::Queue);
        assert!(!frontier.contains_state(&S(1)));

        frontier.add(node(1));
        frontier.add(node(1));
        frontier.add(node(2));
        assert!(frontier.contains_state(&S(1)));
        assert!(frontier.contains_state(&S(2)));
        assert_eq!(frontier.len(), 3);

        // One copy of S(1) is still pending.
        frontier.remove().unwrap();
        assert!(frontier.contains_state(&S(1)));
        frontier.remove().unwrap();
        assert!(!frontier.contains_state(&S(1)));
        assert!(frontier.contains_state(&S(2)));
    }

    #[test]
    fn nodes_keep_their_parents() {
        let mut frontier = Frontier::<S, Step>::new(FrontierKind::Stack);
        let mut tree = crate::search::SearchTree::<S, Step>::new();
        let root: SearchTreeIndex = tree.push(node(0));
        frontier.add(SearchTreeNode::new(S(1), root, Step));

        let n = frontier.remove().unwrap();
        assert_eq!(n.parent(), Some(root));
        assert_eq!(n.action(), Some(Step));
    }

    #[test]
    fn kind_names() {
        assert_eq!(FrontierKind::default(), FrontierKind::Stack);
        assert_eq!(FrontierKind::Stack.to_string(), "stack");
        assert_eq!(FrontierKind::Queue.to_string(), "queue");
    }
}
