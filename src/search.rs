use nonmax::NonMaxUsize;

use crate::space::Action;
use crate::space::Path;
use crate::space::State;

/// A reference to a `SearchTreeNode<St, A>` within a `SearchTree<St, A>`.
///
/// Backed by a `NonMaxUsize` so `Option<SearchTreeIndex>` (a missing parent)
/// is still a single word.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchTreeIndex {
    index: NonMaxUsize,
}

impl SearchTreeIndex {
    #[inline(always)]
    fn new(index: usize) -> Self {
        Self {
            index: NonMaxUsize::new(index).expect("SearchTree can't hold usize::MAX nodes"),
        }
    }

    #[inline(always)]
    pub fn get(&self) -> usize {
        self.index.get()
    }
}

/// A point in the search tree.
///
/// Records a state, how it was reached, and from where. Only the root has no
/// parent, and it's the only node without an action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchTreeNode<St, A>
where
    St: State,
    A: Action,
{
    pub(crate) parent: Option<(SearchTreeIndex, A)>,
    pub(crate) state: St,
}

impl<St, A> SearchTreeNode<St, A>
where
    St: State,
    A: Action,
{
    /// Creates a root node, one without a parent.
    pub fn new_root(s: St) -> Self {
        Self {
            parent: None,
            state: s,
        }
    }

    /// Creates a node reached from `parent` through `a`.
    pub fn new(s: St, parent: SearchTreeIndex, a: A) -> Self {
        Self {
            parent: Some((parent, a)),
            state: s,
        }
    }

    pub fn state(&self) -> &St {
        &self.state
    }
    pub fn parent(&self) -> Option<SearchTreeIndex> {
        self.parent.map(|(p, _)| p)
    }
    pub fn action(&self) -> Option<A> {
        self.parent.map(|(_, a)| a)
    }
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// An arena of `SearchTreeNode`s linked to their parents through indices.
///
/// Nodes are only ever appended, so a parent always has a smaller index than
/// its children.
pub(crate) struct SearchTree<St, A>
where
    St: State,
    A: Action,
{
    nodes: Vec<SearchTreeNode<St, A>>,
}

impl<St, A> SearchTree<St, A>
where
    St: State,
    A: Action,
{
    #[inline(always)]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, node: SearchTreeNode<St, A>) -> SearchTreeIndex {
        let index = SearchTreeIndex::new(self.nodes.len());
        debug_assert!(node.parent().is_none_or(|p| p < index));
        self.nodes.push(node);
        index
    }

    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Rebuilds the Path from the root to the given node.
    #[must_use]
    pub fn path(&self, mut node_index: SearchTreeIndex) -> Path<St, A> {
        let mut path = Path::<St, A>::new_from_start(self[node_index].state);

        while let Some((parent_index, a)) = self[node_index].parent {
            path.append(a, self[node_index].state);
            debug_assert!(parent_index < node_index);
            node_index = parent_index;
        }

        // Walked back to the root, which is the real start.
        debug_assert!(self[node_index].is_root());
        path.start = self[node_index].state;
        path.reverse_steps();
        path
    }
}

impl<St, A> Default for SearchTree<St, A>
where
    St: State,
    A: Action,
{
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl<St, A> std::ops::Index<SearchTreeIndex> for SearchTree<St, A>
where
    St: State,
    A: Action,
{
    type Output = SearchTreeNode<St, A>;

    #[inline(always)]
    fn index(&self, index: SearchTreeIndex) -> &Self::Output {
        &self.nodes[index.get()]
    }
}

impl<St, A> std::fmt::Debug for SearchTree<St, A>
where
    St: State,
    A: Action,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SearchTree{{({} nodes)}}", self.len())
    }
}
