use std::fmt::Debug;
use std::hash::Hash;

use smallvec::SmallVec;

pub trait Action: Copy + Clone + Debug + PartialEq + Eq {}
pub trait State: Copy + Clone + Debug + PartialEq + Eq + Hash {}

/// Neighbours of a State, as `(action, resulting state)` pairs.
///
/// Grid spaces have at most 4 orthogonal moves, so these fit inline.
pub type Neighbours<St, A> = SmallVec<[(A, St); 4]>;

/// A sequence of actions and the states they lead to.
///
/// Both `actions` and `states` are ordered from start to end. The start
/// itself is not part of `states`, but the end is, so both always have the
/// same length.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "inspect", derive(Clone))]
pub struct Path<St, A>
where
    St: State,
    A: Action,
{
    pub start: St,
    pub actions: Vec<A>,
    pub states: Vec<St>,
}

impl<St, A> Path<St, A>
where
    St: State,
    A: Action,
{
    #[inline(always)]
    pub fn new_from_start(start: St) -> Self {
        Self {
            start,
            actions: vec![],
            states: vec![],
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.actions.len(), self.states.len());
        self.actions.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The last state of the Path. The start if there's no actions.
    #[inline(always)]
    pub fn end(&self) -> St {
        *self.states.last().unwrap_or(&self.start)
    }

    #[inline(always)]
    pub fn append(&mut self, a: A, s: St) {
        self.actions.push(a);
        self.states.push(s);
    }

    /// Reverses the steps of the Path, likely making it invalid.
    ///
    /// Useful when naturally reconstructing paths in reverse, where steps are
    /// appended from the end back to the start.
    pub fn reverse_steps(&mut self) {
        self.actions.reverse();
        self.states.reverse();
    }
}

impl<St, A> std::fmt::Display for Path<St, A>
where
    St: State,
    A: Action,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Path({}, {:?}:{:?}:{:?})",
            self.len(),
            self.start,
            self.actions.iter().take(20).collect::<Vec<_>>(),
            self.end()
        )
    }
}

pub trait Space<St, A>: Clone + std::fmt::Debug
where
    St: State,
    A: Action,
{
    /// Applies an action without checking for obstacles.
    fn apply(&self, s: &St, a: &A) -> Option<St>;
    /// Expands a State.
    ///
    /// Implementations must return neighbours in a fixed order, as it decides
    /// which path depth-first traversals find first.
    fn neighbours(&self, s: &St) -> Neighbours<St, A>;
    /// Verify is a State is valid.
    fn valid(&self, s: &St) -> bool;

    /// Verifies that every step of the Path is a legal move.
    fn valid_path(&self, p: &Path<St, A>) -> bool {
        if p.actions.len() != p.states.len() {
            return false;
        }
        let mut state: St = p.start;
        for (a, expected) in p.actions.iter().zip(p.states.iter()) {
            let reachable = self
                .neighbours(&state)
                .iter()
                .any(|(na, ns)| na == a && ns == expected);
            match self.apply(&state, a) {
                Some(new_state) if reachable && new_state == *expected => state = new_state,
                _ => return false,
            }
        }
        true
    }

    fn size(&self) -> Option<usize> {
        None
    }
}
