use std::fmt;

use itertools::Itertools;
use ndarray::{s, Array2};
use tracing::trace;

use crate::{
    core::automaton::{Cell, Grid},
    error::{Error, Result},
};

/// Row-major boolean grid of QR modules or automaton cells.
///
/// Indexed as `(y, x)` internally; the accessors take `(x, y)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMatrix {
    modules: Array2<bool>,
}

impl ModuleMatrix {
    /// All-false matrix of the given size.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            modules: Array2::from_elem((height, width), false),
        }
    }

    #[must_use]
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        Self {
            modules: Array2::from_shape_fn((height, width), |(y, x)| f(x, y)),
        }
    }

    /// Builds a matrix from rows of equal length.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows are ragged.
    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some((index, row)) = rows.iter().find_position(|row| row.len() != width) {
            return Err(Error::Decode(format!(
                "row {index} has {} modules, expected {width}",
                row.len()
            )));
        }
        Ok(Self::from_fn(width, rows.len(), |x, y| rows[y][x]))
    }

    /// Rasterizes a live-cell set. Cells outside the bounds are skipped.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn from_grid(grid: &Grid, width: usize, height: usize) -> Self {
        let mut matrix = Self::new(width, height);
        for cell in grid.iter() {
            if cell.x < 0 || cell.y < 0 {
                continue;
            }
            let (x, y) = (cell.x as usize, cell.y as usize);
            if x < width && y < height {
                matrix.modules[(y, x)] = true;
            }
        }
        trace!("Matrix from grid: size={width}x{height}");
        matrix
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.modules.ncols()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.modules.nrows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the matrix.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.modules[(y, x)]
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the matrix.
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.modules[(y, x)] = value;
    }

    #[must_use]
    pub fn count_set(&self) -> usize {
        self.modules.iter().filter(|module| **module).count()
    }

    /// Coordinates of every set entry, row by row.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn live_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.modules
            .indexed_iter()
            .filter(|(_, module)| **module)
            .map(|((y, x), _)| Cell::new(x as i32, y as i32))
    }

    /// Copy of the matrix surrounded by `border` unset modules on each side.
    #[must_use]
    pub fn with_quiet_zone(&self, border: usize) -> Self {
        let mut padded = Self::new(self.width() + 2 * border, self.height() + 2 * border);
        padded
            .modules
            .slice_mut(s![border..border + self.height(), border..border + self.width()])
            .assign(&self.modules);
        padded
    }
}

impl From<Array2<bool>> for ModuleMatrix {
    fn from(modules: Array2<bool>) -> Self {
        Self { modules }
    }
}

impl fmt::Display for ModuleMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.modules.rows() {
            let line = row.iter().map(|module| if *module { '1' } else { '0' }).join(" ");
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
