use derive_more::Display;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use thiserror::Error;

use crate::problem::Problem;
use crate::space::Action;
use crate::space::Neighbours;
use crate::space::Path;
use crate::space::Space;
use crate::space::State;

const MAX_ELEMENTS_DISPLAYED: usize = 20;
const RANDOM_STATE_MAX_TRIES: usize = 10_000;

pub type CoordIntrinsic = u32;

/// A cell in the maze, addressed by `(row, col)` from the top-left corner.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
#[display("({row},{col})")]
pub struct Maze2DState {
    pub(crate) row: CoordIntrinsic,
    pub(crate) col: CoordIntrinsic,
}

impl Maze2DState {
    pub fn new(row: CoordIntrinsic, col: CoordIntrinsic) -> Maze2DState {
        Maze2DState { row, col }
    }
    pub fn new_from_usize(row: usize, col: usize) -> Option<Maze2DState> {
        Some(Maze2DState {
            row: CoordIntrinsic::try_from(row).ok()?,
            col: CoordIntrinsic::try_from(col).ok()?,
        })
    }
    pub fn row(&self) -> CoordIntrinsic {
        self.row
    }
    pub fn col(&self) -> CoordIntrinsic {
        self.col
    }
    pub(crate) fn safe_dimensions(height: usize, width: usize) -> bool {
        (height <= CoordIntrinsic::MAX as usize) && (width <= CoordIntrinsic::MAX as usize)
    }
}
impl State for Maze2DState {}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Maze2DAction {
    #[display("up")]
    Up = 0, // row--
    #[display("down")]
    Down = 1, // row++
    #[display("left")]
    Left = 2, // col--
    #[display("right")]
    Right = 3, // col++
}
impl Action for Maze2DAction {}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum Maze2DCell {
    #[display(" ")]
    Empty,
    #[display("█")]
    Wall,
}

/// What cells rows shorter than the widest one get.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RaggedRows {
    /// Missing cells are open floor.
    #[default]
    Open,
    /// Every row must be as wide as the maze.
    Reject,
}

/// Characters used to write down a maze.
///
/// Any character other than these is a wall.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Maze2DSyntax {
    pub start: char,
    pub goal: char,
    pub open: char,
    pub ragged_rows: RaggedRows,
}

impl Default for Maze2DSyntax {
    fn default() -> Self {
        Self {
            start: 'A',
            goal: 'B',
            open: ' ',
            ragged_rows: RaggedRows::Open,
        }
    }
}

#[derive(Clone)]
pub struct Maze2DSpace {
    /// Rows of cells, all of them equally wide.
    pub(crate) map: Vec<Vec<Maze2DCell>>,
}

impl Maze2DSpace {
    /// Wraps rows of cells, refusing jagged or oversized maps.
    pub fn new_from_map(map: Vec<Vec<Maze2DCell>>) -> Option<Self> {
        let width = map.first().map_or(0, Vec::len);
        if map.iter().any(|row| row.len() != width)
            || !Maze2DState::safe_dimensions(map.len(), width)
        {
            return None;
        }
        Some(Self { map })
    }
    pub(crate) fn new_empty_with_dimensions(height: usize, width: usize) -> Self {
        Self {
            map: vec![vec![Maze2DCell::Empty; width]; height],
        }
    }

    /// Gets `(height, width)`.
    pub fn dimensions(&self) -> (usize, usize) {
        if self.map.is_empty() {
            return (0, 0);
        }
        (self.map.len(), self.map[0].len())
    }

    #[inline(always)]
    fn at(&self, state: &Maze2DState) -> Maze2DCell {
        debug_assert!(self.valid(state));
        self.map[state.row as usize][state.col as usize]
    }

    /// Whether a cell within the maze is blocked.
    pub fn is_wall(&self, state: &Maze2DState) -> bool {
        self.valid(state) && self.at(state) == Maze2DCell::Wall
    }
}

impl Space<Maze2DState, Maze2DAction> for Maze2DSpace {
    #[inline(always)]
    fn apply(&self, state: &Maze2DState, action: &Maze2DAction) -> Option<Maze2DState> {
        let row = state.row;
        let col = state.col;

        #[rustfmt::skip]
        let (row, col) = match action {
            Maze2DAction::Up    => (row.checked_sub(1)?, col),
            Maze2DAction::Down  => (row.checked_add(1)?, col),
            Maze2DAction::Left  => (row, col.checked_sub(1)?),
            Maze2DAction::Right => (row, col.checked_add(1)?),
        };

        Some(Maze2DState { row, col })
    }

    #[inline(always)]
    fn valid(&self, state: &Maze2DState) -> bool {
        let (height, width) = self.dimensions();
        (state.row as usize) < height && (state.col as usize) < width
    }

    /// Gets the neighbours of a given position.
    ///
    /// Always in `up, down, left, right` order.
    ///
    /// NOTE: These states can only be used with the current Maze
    fn neighbours(&self, state: &Maze2DState) -> Neighbours<Maze2DState, Maze2DAction> {
        let mut v = SmallVec::new();

        for action in [
            Maze2DAction::Up,
            Maze2DAction::Down,
            Maze2DAction::Left,
            Maze2DAction::Right,
        ] {
            if let Some(s) = self.apply(state, &action) {
                if self.valid(&s) && self.at(&s) != Maze2DCell::Wall {
                    v.push((action, s));
                }
            }
        }
        v
    }

    fn size(&self) -> Option<usize> {
        let (height, width) = self.dimensions();
        Some(height * width)
    }
}

impl std::fmt::Display for Maze2DSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let d = self.dimensions();
        writeln!(f, "Maze2D({}x{}):", d.0, d.1)?;
        for line in self.map.iter().take(MAX_ELEMENTS_DISPLAYED) {
            for cell in line.iter().take(MAX_ELEMENTS_DISPLAYED) {
                write!(f, "{cell}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for Maze2DSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Maze2D{:?}", self.dimensions())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedMazeReason {
    #[error("no start marker '{0}'")]
    NoStart(char),
    #[error("multiple start markers '{marker}' ({count})")]
    MultipleStarts { marker: char, count: usize },
    #[error("no goal marker '{0}'")]
    NoGoal(char),
    #[error("multiple goal markers '{marker}' ({count})")]
    MultipleGoals { marker: char, count: usize },
}

#[derive(Debug, Error)]
pub enum Maze2DProblemParseError {
    #[error("Malformed maze: {reason}")]
    MalformedMaze { reason: MalformedMazeReason },
    #[error("Ambiguous syntax, markers must differ ({syntax:?})")]
    AmbiguousSyntax { syntax: Maze2DSyntax },
    #[error("Row {row} has {len} cells but the maze is {width} wide")]
    RaggedRow { row: usize, len: usize, width: usize },
    #[error("Maze too large ({height}x{width})")]
    TooLarge { height: usize, width: usize },
    #[error("I/O error when loading '{p}': {e}")]
    IOError {
        p: std::path::PathBuf,
        e: std::io::Error,
    },
}

impl Maze2DProblemParseError {
    /// The marker problem, if the maze was malformed.
    pub fn malformed_reason(&self) -> Option<MalformedMazeReason> {
        match self {
            Self::MalformedMaze { reason } => Some(*reason),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Maze2DProblem {
    space: Maze2DSpace,
    start: Maze2DState,
    goal: Maze2DState,
    syntax: Maze2DSyntax,
}

impl Problem<Maze2DSpace, Maze2DState, Maze2DAction> for Maze2DProblem {
    fn space(&self) -> &Maze2DSpace {
        &self.space
    }
    fn start(&self) -> Maze2DState {
        self.start
    }
    fn goal(&self) -> Maze2DState {
        self.goal
    }
}

fn check_marker_count(
    s: &str,
    marker: char,
    none: MalformedMazeReason,
    many: impl FnOnce(usize) -> MalformedMazeReason,
) -> Result<(), Maze2DProblemParseError> {
    match s.chars().filter(|ch| *ch == marker).count() {
        1 => Ok(()),
        0 => Err(Maze2DProblemParseError::MalformedMaze { reason: none }),
        count => Err(Maze2DProblemParseError::MalformedMaze {
            reason: many(count),
        }),
    }
}

impl Maze2DProblem {
    /// Reads a maze written with the given syntax.
    ///
    /// Lines are rows, and characters are columns.
    pub fn parse(s: &str, syntax: &Maze2DSyntax) -> Result<Self, Maze2DProblemParseError> {
        if syntax.start == syntax.goal || syntax.start == syntax.open || syntax.goal == syntax.open
        {
            return Err(Maze2DProblemParseError::AmbiguousSyntax { syntax: *syntax });
        }
        check_marker_count(s, syntax.start, MalformedMazeReason::NoStart(syntax.start), |count| {
            MalformedMazeReason::MultipleStarts {
                marker: syntax.start,
                count,
            }
        })?;
        check_marker_count(s, syntax.goal, MalformedMazeReason::NoGoal(syntax.goal), |count| {
            MalformedMazeReason::MultipleGoals {
                marker: syntax.goal,
                count,
            }
        })?;

        let lines: Vec<Vec<char>> = s.lines().map(|l| l.chars().collect()).collect();
        let height = lines.len();
        let width = lines.iter().map(Vec::len).max().unwrap_or(0);
        if !Maze2DState::safe_dimensions(height, width) {
            return Err(Maze2DProblemParseError::TooLarge { height, width });
        }
        if syntax.ragged_rows == RaggedRows::Reject {
            if let Some((row, line)) = lines.iter().enumerate().find(|(_, l)| l.len() != width) {
                return Err(Maze2DProblemParseError::RaggedRow {
                    row,
                    len: line.len(),
                    width,
                });
            }
        }

        let mut space = Maze2DSpace::new_empty_with_dimensions(height, width);
        let mut start = None;
        let mut goal = None;
        for (row, line) in lines.iter().enumerate() {
            // Cells past the end of a short row stay Empty.
            for (col, ch) in line.iter().enumerate() {
                let state = Maze2DState::new(row as CoordIntrinsic, col as CoordIntrinsic);
                space.map[row][col] = match *ch {
                    ch if ch == syntax.start => {
                        start = Some(state);
                        Maze2DCell::Empty
                    }
                    ch if ch == syntax.goal => {
                        goal = Some(state);
                        Maze2DCell::Empty
                    }
                    ch if ch == syntax.open => Maze2DCell::Empty,
                    _ => Maze2DCell::Wall,
                };
            }
        }

        // Line breaks were counted on the raw text but never reach a row.
        let start = start.ok_or(Maze2DProblemParseError::MalformedMaze {
            reason: MalformedMazeReason::NoStart(syntax.start),
        })?;
        let goal = goal.ok_or(Maze2DProblemParseError::MalformedMaze {
            reason: MalformedMazeReason::NoGoal(syntax.goal),
        })?;

        Ok(Maze2DProblem {
            space,
            start,
            goal,
            syntax: *syntax,
        })
    }

    /// Reads a maze from a text file.
    pub fn load(p: &std::path::Path, syntax: &Maze2DSyntax) -> Result<Self, Maze2DProblemParseError> {
        let s = std::fs::read_to_string(p).map_err(|e| Maze2DProblemParseError::IOError {
            p: p.to_path_buf(),
            e,
        })?;
        log::debug!("Loaded {} bytes from {p:?}", s.len());
        Self::parse(&s, syntax)
    }

    pub fn syntax(&self) -> &Maze2DSyntax {
        &self.syntax
    }

    /// Generates a random maze with the given dimensions.
    ///
    /// Each cell is a wall with probability `wall_density`, except for the
    /// start and goal cells. Needs room for 2 distinct cells.
    pub fn random<R: rand::Rng>(
        r: &mut R,
        height: usize,
        width: usize,
        wall_density: f64,
    ) -> Option<Maze2DProblem> {
        if !Maze2DState::safe_dimensions(height, width)
            || height.checked_mul(width).is_none_or(|cells| cells < 2)
        {
            return None;
        }
        if !(0.0..=1.0).contains(&wall_density) {
            return None;
        }

        let mut space = Maze2DSpace::new_empty_with_dimensions(height, width);
        for row in space.map.iter_mut() {
            for cell in row.iter_mut() {
                if r.random_bool(wall_density) {
                    *cell = Maze2DCell::Wall;
                }
            }
        }

        let random_state = |r: &mut R| {
            Maze2DState::new_from_usize(r.random_range(0..height), r.random_range(0..width))
        };
        let start = random_state(r)?;
        let mut goal = None;
        for _tries in 0..RANDOM_STATE_MAX_TRIES {
            let g = random_state(r)?;
            if g != start {
                goal = Some(g);
                break;
            }
        }
        let goal = goal?;
        space.map[start.row as usize][start.col as usize] = Maze2DCell::Empty;
        space.map[goal.row as usize][goal.col as usize] = Maze2DCell::Empty;

        Some(Maze2DProblem {
            space,
            start,
            goal,
            syntax: Maze2DSyntax::default(),
        })
    }

    /// Draws the maze with a solution on top, if any.
    pub fn render<'a>(&'a self, path: Option<&'a Path<Maze2DState, Maze2DAction>>) -> Maze2DRender<'a> {
        Maze2DRender {
            problem: self,
            path,
            explored: None,
        }
    }
}

impl std::convert::TryFrom<&str> for Maze2DProblem {
    type Error = Maze2DProblemParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s, &Maze2DSyntax::default())
    }
}

impl std::convert::TryFrom<&std::path::Path> for Maze2DProblem {
    type Error = Maze2DProblemParseError;

    fn try_from(p: &std::path::Path) -> Result<Self, Self::Error> {
        Self::load(p, &Maze2DSyntax::default())
    }
}

impl std::fmt::Display for Maze2DProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let d = self.space.dimensions();
        writeln!(
            f,
            "Maze2DProblem({}x{}) (s:{}, g:{}):",
            d.0, d.1, self.start, self.goal
        )?;
        for (row, line) in self.space.map.iter().enumerate().take(MAX_ELEMENTS_DISPLAYED) {
            for (col, cell) in line.iter().enumerate().take(MAX_ELEMENTS_DISPLAYED) {
                let s = Maze2DState::new(row as CoordIntrinsic, col as CoordIntrinsic);
                if s == self.start {
                    write!(f, "{}", self.syntax.start)?;
                } else if s == self.goal {
                    write!(f, "{}", self.syntax.goal)?;
                } else {
                    write!(f, "{cell}")?;
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

pub const PATH_GLYPH: char = '*';
pub const EXPLORED_GLYPH: char = '·';

/// A full drawing of a maze, with its solution and explored cells.
///
/// Walls are blocks, start and goal use their markers and the path is drawn
/// with `PATH_GLYPH`. Ends with a blank line.
#[derive(Debug)]
pub struct Maze2DRender<'a> {
    problem: &'a Maze2DProblem,
    path: Option<&'a Path<Maze2DState, Maze2DAction>>,
    explored: Option<&'a FxHashSet<Maze2DState>>,
}

impl<'a> Maze2DRender<'a> {
    /// Also marks explored cells that are not on the path.
    pub fn with_explored(mut self, explored: &'a FxHashSet<Maze2DState>) -> Self {
        self.explored = Some(explored);
        self
    }
}

impl std::fmt::Display for Maze2DRender<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let p = self.problem;
        let on_path: FxHashSet<Maze2DState> = self
            .path
            .map(|path| path.states.iter().copied().collect())
            .unwrap_or_default();

        for (row, line) in p.space.map.iter().enumerate() {
            for (col, cell) in line.iter().enumerate() {
                let s = Maze2DState::new(row as CoordIntrinsic, col as CoordIntrinsic);
                match cell {
                    Maze2DCell::Wall => write!(f, "{cell}")?,
                    Maze2DCell::Empty if s == p.start => write!(f, "{}", p.syntax.start)?,
                    Maze2DCell::Empty if s == p.goal => write!(f, "{}", p.syntax.goal)?,
                    Maze2DCell::Empty if on_path.contains(&s) => write!(f, "{PATH_GLYPH}")?,
                    Maze2DCell::Empty if self.explored.is_some_and(|e| e.contains(&s)) => {
                        write!(f, "{EXPLORED_GLYPH}")?
                    }
                    Maze2DCell::Empty => write!(f, "{cell}")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f)
    }
}
