//! Mosaic grid geometry
//!
//! Sources are laid out row-major in a near-square grid:
//!
//! ```text
//! rows    = round(sqrt(n))
//! columns = ceil(n / rows)
//!
//! n = 5:  ┌───┬───┬───┐
//!         │ 0 │ 1 │ 2 │
//!         ├───┼───┼───┤
//!         │ 3 │ 4 │   │
//!         └───┴───┴───┘
//! ```

/// Fixed grid layout for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicGrid {
    /// Number of sources laid out
    pub sources: usize,
    /// Grid rows
    pub rows: u32,
    /// Grid columns
    pub columns: u32,
    /// Cell width in pixels
    pub cell_width: u32,
    /// Cell height in pixels
    pub cell_height: u32,
}

/// Pixel rectangle of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl MosaicGrid {
    /// Compute the layout for `sources` inputs
    ///
    /// Zero sources yields an empty 0×0 grid.
    pub fn new(sources: usize, cell_width: u32, cell_height: u32) -> Self {
        let (rows, columns) = if sources == 0 {
            (0, 0)
        } else {
            let rows = ((sources as f64).sqrt().round() as usize).max(1);
            let columns = sources.div_ceil(rows);
            (rows as u32, columns as u32)
        };

        Self {
            sources,
            rows,
            columns,
            cell_width,
            cell_height,
        }
    }

    /// Mosaic width in pixels
    pub fn width(&self) -> u32 {
        self.columns * self.cell_width
    }

    /// Mosaic height in pixels
    pub fn height(&self) -> u32 {
        self.rows * self.cell_height
    }

    /// Cell rectangle for a source index, if the index is laid out
    pub fn cell(&self, index: usize) -> Option<CellRect> {
        if index >= self.sources {
            return None;
        }
        let row = index as u32 / self.columns;
        let column = index as u32 % self.columns;

        Some(CellRect {
            x: column * self.cell_width,
            y: row * self.cell_height,
            width: self.cell_width,
            height: self.cell_height,
        })
    }
}
