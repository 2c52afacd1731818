pub mod grid;

use tracing::{debug, trace, warn};

pub use self::grid::{Cell, Grid};
use crate::core::matrix::ModuleMatrix;

/// Cells born or killed by a single step, sorted by coordinate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StepDelta {
    pub added: Vec<Cell>,
    pub removed: Vec<Cell>,
}

impl StepDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Conway's Game of Life on a sparse grid clamped to `width` x `height`.
///
/// Mutation goes through `&mut self`, so a caller observes either the
/// generation before or after a step. Wrap the automaton in a
/// `std::sync::RwLock` to inspect it from other threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    width: usize,
    height: usize,
    grid: Grid,
}

impl Automaton {
    /// Creates an empty automaton. Zero-sized bounds are accepted and
    /// produce an automaton that can never hold a live cell.
    #[must_use]
    #[tracing::instrument(level = "debug")]
    pub fn new(width: usize, height: usize) -> Self {
        debug!("Creating automaton of {width}x{height}");
        Self {
            width,
            height,
            grid: Grid::new(),
        }
    }

    /// Creates an automaton sized to the matrix and seeded with its set
    /// entries.
    #[must_use]
    #[tracing::instrument(level = "debug", skip_all, fields(width = matrix.width(), height = matrix.height()))]
    pub fn from_matrix(matrix: &ModuleMatrix) -> Self {
        let mut automaton = Self::new(matrix.width(), matrix.height());
        let seeded = automaton.seed(matrix.live_cells());
        debug!("Seeded {seeded} live cells from matrix");
        automaton
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.grid.len()
    }

    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.grid.contains(cell)
    }

    /// Whether the cell lies inside `[0, width) x [0, height)`.
    #[must_use]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        usize::try_from(cell.x).is_ok_and(|x| x < self.width)
            && usize::try_from(cell.y).is_ok_and(|y| y < self.height)
    }

    /// Bulk-inserts live cells and returns how many were newly added.
    /// Duplicates are ignored, cells outside the bounds are dropped.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn seed<I>(&mut self, cells: I) -> usize
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut inserted = 0;
        for cell in cells {
            if self.add_cell(cell) {
                inserted += 1;
            }
        }
        trace!("Seed: inserted={inserted} total={}", self.grid.len());
        inserted
    }

    /// Marks a single cell as live. Returns `false` if it was already live
    /// or lies outside the bounds.
    pub fn add_cell(&mut self, cell: Cell) -> bool {
        if !self.in_bounds(cell) {
            warn!("Ignoring cell {cell} outside of {}x{}", self.width, self.height);
            return false;
        }
        self.grid.insert(cell)
    }

    /// Marks a single cell as dead. Returns `false` if it was not live.
    pub fn remove_cell(&mut self, cell: Cell) -> bool {
        self.grid.remove(cell)
    }

    /// Advances one generation and reports which cells changed.
    ///
    /// Only live cells and their neighbours are evaluated. Births outside
    /// the bounds are discarded and never show up in `added`.
    #[tracing::instrument(level = "trace", skip(self), fields(live = self.grid.len()))]
    pub fn step(&mut self) -> StepDelta {
        if self.grid.is_empty() {
            return StepDelta::default();
        }

        let mut next = Grid::new();
        let mut added = Vec::new();
        for cell in self.grid.candidates() {
            let alive = self.grid.contains(cell);
            if !next_state(alive, self.grid.live_neighbours(cell)) || !self.in_bounds(cell) {
                continue;
            }
            if !alive {
                added.push(cell);
            }
            next.insert(cell);
        }

        let mut removed: Vec<Cell> = self.grid.iter().filter(|cell| !next.contains(*cell)).collect();
        added.sort_unstable();
        removed.sort_unstable();

        self.grid = next;

        if !added.is_empty() || !removed.is_empty() {
            trace!("Step: added={} removed={}", added.len(), removed.len());
        }
        StepDelta { added, removed }
    }

    /// Snapshot of the live cells as a `height` x `width` matrix.
    #[must_use]
    pub fn matrix(&self) -> ModuleMatrix {
        ModuleMatrix::from_grid(&self.grid, self.width, self.height)
    }
}

/// Survival on 2 or 3 neighbours, birth on exactly 3.
#[must_use]
pub const fn next_state(alive: bool, live_neighbours: usize) -> bool {
    matches!((alive, live_neighbours), (true, 2 | 3) | (false, 3))
}
