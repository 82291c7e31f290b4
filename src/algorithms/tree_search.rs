//! Implementation of uninformed tree search.
//!
//! Depth-first and breadth-first traversals share the same loop and only
//! differ on the `FrontierKind` of their `Frontier`.

use std::marker::PhantomData;

use derive_more::Display;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::data_structures::frontier::Frontier;
use crate::data_structures::frontier::FrontierKind;
use crate::problem::Problem;
use crate::search::SearchTree;
use crate::search::SearchTreeIndex;
use crate::search::SearchTreeNode;
use crate::space::Action;
use crate::space::Path;
use crate::space::Space;
use crate::space::State;

/// Lifecycle of a `TreeSearch`.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum SearchStatus {
    Initialized,
    Running,
    Solved,
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("no solution (explored {num_explored} states)")]
    NoSolution { num_explored: usize },
}

/// Everything a successful search produces.
#[derive(Debug)]
pub struct SearchOutcome<St, A>
where
    St: State,
    A: Action,
{
    pub path: Path<St, A>,
    /// Number of nodes removed from the frontier, the goal included.
    pub num_explored: usize,
    /// States that were expanded. The goal is never expanded.
    pub explored: FxHashSet<St>,
}

/// A single run of tree search over a borrowed Problem.
///
/// The Problem is only read, so many searches can run over the same one.
#[derive(Debug)]
pub struct TreeSearch<'p, P, Sp, St, A>
where
    P: Problem<Sp, St, A>,
    Sp: Space<St, A>,
    St: State,
    A: Action,
{
    problem: &'p P,
    frontier: Frontier<St, A>,
    /// Nodes removed from the frontier, linked to their parents.
    tree: SearchTree<St, A>,
    explored: FxHashSet<St>,
    num_explored: usize,
    status: SearchStatus,
    /// Where the goal landed in `tree`, once found.
    goal_index: Option<SearchTreeIndex>,

    _phantom_space: PhantomData<Sp>,
}

impl<'p, P, Sp, St, A> TreeSearch<'p, P, Sp, St, A>
where
    P: Problem<Sp, St, A>,
    Sp: Space<St, A>,
    St: State,
    A: Action,
{
    /// Initialises the Search
    #[must_use]
    pub fn new(problem: &'p P, kind: FrontierKind) -> Self {
        let mut frontier = Frontier::new(kind);
        frontier.add(SearchTreeNode::new_root(problem.start()));

        Self {
            problem,
            frontier,
            tree: SearchTree::new(),
            explored: FxHashSet::default(),
            num_explored: 0usize,
            status: SearchStatus::Initialized,
            goal_index: None,

            _phantom_space: PhantomData,
        }
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }
    pub fn num_explored(&self) -> usize {
        self.num_explored
    }
    pub fn explored(&self) -> &FxHashSet<St> {
        &self.explored
    }

    /// Runs the search until the goal is removed from the frontier.
    ///
    /// Once finished, later calls repeat the same answer without searching.
    pub fn find_path(&mut self) -> Result<Path<St, A>, SearchError> {
        if let Some(goal_index) = self.goal_index {
            return Ok(self.tree.path(goal_index));
        }
        match self.status {
            SearchStatus::Initialized => {}
            SearchStatus::Running => unreachable!("TreeSearch::find_path is not re-entrant"),
            SearchStatus::Solved => unreachable!("solved TreeSearch without a goal node"),
            SearchStatus::Failed => {
                return Err(SearchError::NoSolution {
                    num_explored: self.num_explored,
                });
            }
        }
        self.status = SearchStatus::Running;
        log::debug!(
            "Starting {} search from {:?} to {:?}",
            self.frontier.kind(),
            self.problem.start(),
            self.problem.goal()
        );

        // The Frontier being empty is the only way out without a path.
        while let Ok(node) = self.frontier.remove() {
            self.num_explored += 1;
            let state = node.state;
            let node_index = self.tree.push(node);

            if self.problem.is_goal(&state) {
                let path = self.tree.path(node_index);
                debug_assert!(self.problem.space().valid_path(&path));
                debug_assert_eq!(path.start, self.problem.start());
                debug_assert_eq!(path.end(), state);
                log::debug!(
                    "Found {path} after exploring {} states",
                    self.num_explored
                );

                self.status = SearchStatus::Solved;
                self.goal_index = Some(node_index);
                return Ok(path);
            }

            // States are expanded at most once.
            let newly_explored = self.explored.insert(state);
            debug_assert!(newly_explored, "{state:?} was expanded twice");

            log::trace!("Expanding {state:?}");
            for (a, s) in self.problem.space().neighbours(&state) {
                if self.explored.contains(&s) || self.frontier.contains_state(&s) {
                    // The first path reaching a state wins.
                    continue;
                }
                self.frontier.add(SearchTreeNode::new(s, node_index, a));
            }
        }

        log::info!(
            "No path from {:?} to {:?} after exploring {} states",
            self.problem.start(),
            self.problem.goal(),
            self.num_explored
        );
        self.status = SearchStatus::Failed;
        Err(SearchError::NoSolution {
            num_explored: self.num_explored,
        })
    }

    /// Runs the search to completion, handing over everything it gathered.
    pub fn into_outcome(mut self) -> Result<SearchOutcome<St, A>, SearchError> {
        let path = self.find_path()?;
        Ok(SearchOutcome {
            path,
            num_explored: self.num_explored,
            explored: self.explored,
        })
    }

    pub fn write_memory_stats<W: std::io::Write>(&self, mut out: W) -> std::io::Result<()> {
        use size::Size;
        use std::mem::size_of;
        use thousands::Separable;

        writeln!(out, "TreeSearch Stats ({}):", self.frontier.kind())?;
        let s = size_of::<SearchTreeNode<St, A>>();
        let l = self.tree.len();
        let c = self.tree.capacity();
        writeln!(
            out,
            "  - |Tree|:     {} ({})",
            l.separate_with_commas(),
            Size::from_bytes(l * s)
        )?;
        writeln!(
            out,
            "  - |Tree|*:    {} ({})",
            c.separate_with_commas(),
            Size::from_bytes(c * s)
        )?;

        let l = self.frontier.len();
        let c = self.frontier.capacity();
        writeln!(
            out,
            "  - |Frontier|: {} ({})",
            l.separate_with_commas(),
            Size::from_bytes(l * s)
        )?;
        writeln!(
            out,
            "  - |Frontier|*: {} ({})",
            c.separate_with_commas(),
            Size::from_bytes(c * s)
        )?;

        let s = size_of::<St>();
        let l = self.explored.len();
        writeln!(
            out,
            "  - |Explored|: {} ({})",
            l.separate_with_commas(),
            Size::from_bytes(l * s)
        )?;
        writeln!(
            out,
            "  - Removed nodes: {}",
            self.num_explored.separate_with_commas()
        )?;

        Ok(())
    }
}

/// Solves a Problem with a fresh search.
pub fn solve<P, Sp, St, A>(
    problem: &P,
    kind: FrontierKind,
) -> Result<SearchOutcome<St, A>, SearchError>
where
    P: Problem<Sp, St, A>,
    Sp: Space<St, A>,
    St: State,
    A: Action,
{
    TreeSearch::new(problem, kind).into_outcome()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use indoc::indoc;
    use rand::Rng;
    use rand_chacha::ChaCha8Rng;
    use rand_chacha::rand_core::SeedableRng;
    use rustc_hash::FxHashMap;

    use crate::problems::maze_2d::Maze2DAction;
    use crate::problems::maze_2d::Maze2DProblem;
    use crate::problems::maze_2d::Maze2DState;

    const KINDS: [FrontierKind; 2] = [FrontierKind::Stack, FrontierKind::Queue];

    /// Shortest number of moves from start to goal, if reachable.
    fn shortest_distance(p: &Maze2DProblem) -> Option<usize> {
        let mut distance = FxHashMap::<Maze2DState, usize>::default();
        let mut queue = VecDeque::from([p.start()]);
        distance.insert(p.start(), 0);

        while let Some(s) = queue.pop_front() {
            let d = distance[&s];
            if s == p.goal() {
                return Some(d);
            }
            for (_a, n) in p.space().neighbours(&s) {
                if !distance.contains_key(&n) {
                    distance.insert(n, d + 1);
                    queue.push_back(n);
                }
            }
        }
        None
    }

    fn open_cells(p: &Maze2DProblem) -> usize {
        let (height, width) = p.space().dimensions();
        let mut open = 0;
        for row in 0..height {
            for col in 0..width {
                if !p.space().is_wall(&Maze2DState::new(row as u32, col as u32)) {
                    open += 1;
                }
            }
        }
        open
    }

    #[test]
    fn open_3x3_breadth_first() {
        let problem = Maze2DProblem::try_from(indoc! {"
            A

              B
        "})
        .unwrap();

        let outcome = solve(&problem, FrontierKind::Queue).unwrap();
        assert_eq!(outcome.path.len(), 4);
        assert_eq!(outcome.path.end(), Maze2DState::new(2, 2));
        assert!(outcome.num_explored <= 9);
        assert!(problem.space().valid_path(&outcome.path));
    }

    #[test]
    fn open_3x3_depth_first() {
        let problem = Maze2DProblem::try_from(indoc! {"
            A

              B
        "})
        .unwrap();

        let outcome = solve(&problem, FrontierKind::Stack).unwrap();
        // Right is pushed last, so it's the first move tried.
        assert_eq!(outcome.path.actions[0], Maze2DAction::Right);
        assert_eq!(outcome.path.end(), Maze2DState::new(2, 2));
        assert!(problem.space().valid_path(&outcome.path));
    }

    #[test]
    fn walled_off_goal() {
        let problem = Maze2DProblem::try_from(indoc! {"
            A
               #
              #B#
               #
        "})
        .unwrap();

        for kind in KINDS {
            let err = solve(&problem, kind).unwrap_err();
            let SearchError::NoSolution { num_explored } = err;
            assert!(num_explored <= open_cells(&problem));
            assert!(num_explored > 0);
        }
    }

    #[test]
    fn adjacent_start_and_goal() {
        let problem = Maze2DProblem::try_from("AB").unwrap();

        for kind in KINDS {
            let outcome = solve(&problem, kind).unwrap();
            assert_eq!(outcome.path.actions, vec![Maze2DAction::Right]);
            assert_eq!(outcome.path.states, vec![Maze2DState::new(0, 1)]);
            // The start is removed and expanded, then the goal is removed.
            assert_eq!(outcome.num_explored, 2);
            assert_eq!(outcome.explored.len(), 1);
            assert!(outcome.explored.contains(&Maze2DState::new(0, 0)));
        }
    }

    #[test]
    fn depth_first_may_be_longer() {
        // Depth-first tries right first and goes around the long way.
        let problem = Maze2DProblem::try_from(indoc! {"
            ########
            #      #
            # #### #
            #B A   #
            ########
        "})
        .unwrap();

        let bfs = solve(&problem, FrontierKind::Queue).unwrap();
        assert_eq!(bfs.path.actions, vec![Maze2DAction::Left, Maze2DAction::Left]);

        let dfs = solve(&problem, FrontierKind::Stack).unwrap();
        assert_eq!(dfs.path.len(), 12);
        assert_eq!(dfs.path.actions[0], Maze2DAction::Right);
        assert!(problem.space().valid_path(&dfs.path));
        assert_eq!(dfs.path.end(), problem.goal());
    }

    #[test]
    fn status_transitions() {
        let solvable = Maze2DProblem::try_from("A B").unwrap();
        let mut search = TreeSearch::new(&solvable, FrontierKind::Queue);
        assert_eq!(search.status(), SearchStatus::Initialized);
        let first = search.find_path().unwrap();
        assert_eq!(search.status(), SearchStatus::Solved);
        assert_eq!(search.num_explored(), 3);
        // Asking again hands back the same path without searching.
        let again = search.find_path().unwrap();
        assert_eq!(again, first);
        assert_eq!(again.actions, vec![Maze2DAction::Right, Maze2DAction::Right]);
        assert_eq!(search.status(), SearchStatus::Solved);
        assert_eq!(search.num_explored(), 3);

        let unsolvable = Maze2DProblem::try_from("A#B").unwrap();
        let mut search = TreeSearch::new(&unsolvable, FrontierKind::Queue);
        assert_eq!(
            search.find_path(),
            Err(SearchError::NoSolution { num_explored: 1 })
        );
        assert_eq!(search.status(), SearchStatus::Failed);
        assert_eq!(
            search.find_path(),
            Err(SearchError::NoSolution { num_explored: 1 })
        );
    }

    #[test]
    fn shared_problem_across_searches() {
        let problem = Maze2DProblem::try_from(indoc! {"
            A #
              # #
                #B
        "})
        .unwrap();

        let mut stack = TreeSearch::new(&problem, FrontierKind::Stack);
        let mut queue = TreeSearch::new(&problem, FrontierKind::Queue);
        let from_queue = queue.find_path().unwrap();
        let from_stack = stack.find_path().unwrap();
        assert_eq!(from_queue.end(), from_stack.end());
        assert_eq!(Some(from_queue.len()), shortest_distance(&problem));
    }

    #[test]
    fn memory_stats() {
        let problem = Maze2DProblem::try_from("A  B").unwrap();
        let mut search = TreeSearch::new(&problem, FrontierKind::Stack);
        search.find_path().unwrap();

        let mut out = Vec::<u8>::new();
        search.write_memory_stats(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("TreeSearch Stats (stack)"));
        assert!(out.contains("Removed nodes: 4"));
    }

    #[test]
    fn random_mazes_against_oracle() {
        for seed in 0..200u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let height = rng.random_range(1..8usize);
            let width = rng.random_range(2..8usize);
            let problem = Maze2DProblem::random(&mut rng, height, width, 0.35).unwrap();
            let oracle = shortest_distance(&problem);
            let bound = height * width;

            for kind in KINDS {
                match (solve(&problem, kind), oracle) {
                    (Ok(outcome), Some(d)) => {
                        let path = &outcome.path;
                        assert!(problem.space().valid_path(path), "seed {seed}: {path}");
                        assert_eq!(path.start, problem.start());
                        assert_eq!(path.end(), problem.goal());
                        assert!(outcome.num_explored <= bound);
                        if kind == FrontierKind::Queue {
                            assert_eq!(path.len(), d, "seed {seed}");
                        } else {
                            assert!(path.len() >= d, "seed {seed}");
                        }
                    }
                    (Err(SearchError::NoSolution { num_explored }), None) => {
                        assert!(num_explored <= bound);
                    }
                    (result, oracle) => {
                        panic!("seed {seed}: {kind} got {result:?} but oracle says {oracle:?}")
                    }
                }
            }
        }
    }
}
