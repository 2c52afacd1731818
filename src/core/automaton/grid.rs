use std::{collections::HashSet, fmt};

use tracing::trace;

/// Offsets of the Moore neighbourhood, excluding the cell itself.
pub const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A cell coordinate. Coordinates may be negative while a step is being
/// computed; live cells are always inside the automaton bounds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Iterates over the eight neighbours of this cell.
    pub fn neighbours(self) -> impl Iterator<Item = Self> {
        NEIGHBOUR_OFFSETS
            .iter()
            .map(move |(dx, dy)| Self::new(self.x + dx, self.y + dy))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Sparse set of live cells. Absence means dead.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: HashSet<Cell>,
}

impl Grid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the cell as live. Returns `false` if it already was.
    pub fn insert(&mut self, cell: Cell) -> bool {
        self.cells.insert(cell)
    }

    /// Marks the cell as dead. Returns `false` if it already was.
    pub fn remove(&mut self, cell: Cell) -> bool {
        self.cells.remove(&cell)
    }

    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    /// Counts the live neighbours of `cell` that are present in this grid.
    /// No bounds are applied.
    #[must_use]
    pub fn live_neighbours(&self, cell: Cell) -> usize {
        cell.neighbours().filter(|n| self.contains(*n)).count()
    }

    /// Every live cell plus its Moore neighbourhood, deduplicated.
    #[must_use]
    #[tracing::instrument(level = "trace", skip(self), fields(live = self.len()))]
    pub fn candidates(&self) -> HashSet<Cell> {
        let mut candidates = HashSet::with_capacity(self.cells.len() * 9);
        for cell in &self.cells {
            candidates.insert(*cell);
            candidates.extend(cell.neighbours());
        }
        trace!("Collected {} candidates", candidates.len());
        candidates
    }
}

impl FromIterator<Cell> for Grid {
    fn from_iter<T: IntoIterator<Item = Cell>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_are_the_moore_neighbourhood() {
        let cell = Cell::new(0, 0);
        let neighbours: HashSet<Cell> = cell.neighbours().collect();

        assert_eq!(neighbours.len(), 8);
        assert!(!neighbours.contains(&cell));
        assert!(neighbours.contains(&Cell::new(-1, -1)));
        assert!(neighbours.contains(&Cell::new(1, 1)));
    }

    #[test]
    fn insert_is_idempotent() {
        let mut grid = Grid::new();
        assert!(grid.insert(Cell::new(2, 3)));
        assert!(!grid.insert(Cell::new(2, 3)));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn live_neighbours_ignores_self() {
        let grid: Grid = [(0, 0), (1, 0), (2, 0)].into_iter().map(Cell::from).collect();

        assert_eq!(grid.live_neighbours(Cell::new(1, 0)), 2);
        assert_eq!(grid.live_neighbours(Cell::new(1, 1)), 3);
        assert_eq!(grid.live_neighbours(Cell::new(-1, 0)), 1);
    }

    #[test]
    fn candidates_of_single_cell() {
        let grid: Grid = std::iter::once(Cell::new(5, 5)).collect();
        assert_eq!(grid.candidates().len(), 9);
    }

    #[test]
    fn cell_display() {
        assert_eq!(Cell::new(-1, 4).to_string(), "-1,4");
    }
}
