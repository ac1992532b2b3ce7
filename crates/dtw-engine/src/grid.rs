//! Linked pixel grid: an arena of cells with explicit adjacency.
//!
//! Every pixel of the source bitmap becomes a [`Cell`] in a flat arena
//! addressed by a stable [`CellId`]. Instead of relying on row-major
//! arithmetic, each cell records the arena index of its four orthogonal
//! neighbours. Seam removal unlinks cells from that graph without moving
//! anything, so the arena never shrinks and indices never change.
//!
//! The only place the linked topology is turned back into a raster is
//! [`PixelGrid::row_major`] (and [`PixelGrid::materialize`] on top of
//! it), which walks the mesh from the starting cell.

use std::sync::Arc;

use image::Rgba;

use crate::energy::{self, EnergyModel};
use crate::types::{Dimensions, EngineError, MIN_DIMENSION, RgbaImage};

/// Stable arena index of a cell.
pub type CellId = u32;

/// One of the four orthogonal neighbour slots of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The cell above.
    Up,
    /// The cell to the right.
    Right,
    /// The cell below.
    Down,
    /// The cell to the left.
    Left,
}

impl Side {
    /// All four sides in slot order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// The side pointing back the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }
}

/// A single pixel node: adjacency record plus energy.
///
/// A `None` link means "no neighbour on that side" (image boundary, or a
/// removed cell that is no longer part of the mesh).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    links: [Option<CellId>; 4],
    energy: f64,
}

impl Cell {
    const fn unlinked(energy: f64) -> Self {
        Self {
            links: [None; 4],
            energy,
        }
    }

    /// Neighbour on `side`, if any.
    #[must_use]
    pub const fn link(&self, side: Side) -> Option<CellId> {
        self.links[side.slot()]
    }

    /// Current importance of this cell.
    #[must_use]
    pub const fn energy(&self) -> f64 {
        self.energy
    }

    /// Whether the cell has no links at all.
    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.links.iter().all(Option::is_none)
    }
}

/// Border class of a source pixel, used to pick its wiring routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BorderClass {
    /// One of the four corners.
    Corner,
    /// Top or bottom row, excluding corners.
    HorizontalEdge,
    /// Left or right column, excluding corners.
    VerticalEdge,
    /// Everything else.
    Interior,
}

impl BorderClass {
    const fn of(x: u32, y: u32, size: Dimensions) -> Self {
        let on_x_edge = x == 0 || x == size.width - 1;
        let on_y_edge = y == 0 || y == size.height - 1;
        match (on_x_edge, on_y_edge) {
            (true, true) => Self::Corner,
            (false, true) => Self::HorizontalEdge,
            (true, false) => Self::VerticalEdge,
            (false, false) => Self::Interior,
        }
    }
}

/// The arena of colours and cells plus the current logical shape.
///
/// Cloning is cheap for the colour arena (shared, immutable) and a
/// structural copy for the cells, so a clone can be carved without
/// affecting the original.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    colors: Arc<[Rgba<u8>]>,
    cells: Vec<Cell>,
    source: Dimensions,
    size: Dimensions,
    start: CellId,
    model: EnergyModel,
}

impl PixelGrid {
    /// Convert a decoded bitmap into the linked representation and
    /// compute the energy of every cell.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidDimensions`] if either dimension is
    /// below [`MIN_DIMENSION`] or the pixel count does not fit the arena
    /// index type.
    pub fn build(bitmap: &RgbaImage, model: EnergyModel) -> Result<Self, EngineError> {
        let size = Dimensions::new(bitmap.width(), bitmap.height());
        if !size.is_supported() || size.area() > u64::from(CellId::MAX) {
            return Err(EngineError::InvalidDimensions {
                width: size.width,
                height: size.height,
                minimum: MIN_DIMENSION,
            });
        }

        let colors: Arc<[Rgba<u8>]> = bitmap.pixels().copied().collect();
        let mut cells = Vec::with_capacity(colors.len());
        for (x, y, _) in bitmap.enumerate_pixels() {
            let class = BorderClass::of(x, y, size);
            let links = match class {
                BorderClass::Corner => wire_corner(x, y, size),
                BorderClass::HorizontalEdge => wire_horizontal_edge(x, y, size),
                BorderClass::VerticalEdge => wire_vertical_edge(x, y, size),
                BorderClass::Interior => wire_interior(x, y, size),
            };
            let seed = if class == BorderClass::Interior {
                0.0
            } else {
                model.border_energy()
            };
            cells.push(Cell {
                links,
                energy: seed,
            });
        }

        let mut grid = Self {
            colors,
            cells,
            source: size,
            size,
            start: 0,
            model,
        };
        for id in 0..grid.arena_len() {
            energy::recompute(&mut grid, id);
        }
        Ok(grid)
    }

    /// Current logical size.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.size
    }

    /// Size of the bitmap the grid was built from.
    #[must_use]
    pub const fn source_dimensions(&self) -> Dimensions {
        self.source
    }

    /// Arena index of the current top-left cell.
    #[must_use]
    pub const fn start(&self) -> CellId {
        self.start
    }

    /// Energy configuration the grid was built with.
    #[must_use]
    pub const fn model(&self) -> EnergyModel {
        self.model
    }

    /// Number of slots in the arena, including removed cells.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn arena_len(&self) -> CellId {
        // `build` guarantees the arena fits the index type.
        self.cells.len() as CellId
    }

    /// The cell stored at `id`.
    #[must_use]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id as usize]
    }

    /// Neighbour of `id` on `side`.
    #[must_use]
    pub fn link(&self, id: CellId, side: Side) -> Option<CellId> {
        self.cell(id).link(side)
    }

    /// Energy of `id`.
    #[must_use]
    pub fn energy(&self, id: CellId) -> f64 {
        self.cell(id).energy
    }

    /// Colour of `id`.
    #[must_use]
    pub fn color(&self, id: CellId) -> Rgba<u8> {
        self.colors[id as usize]
    }

    pub(crate) fn set_link(&mut self, id: CellId, side: Side, target: Option<CellId>) {
        self.cells[id as usize].links[side.slot()] = target;
    }

    pub(crate) fn set_energy(&mut self, id: CellId, energy: f64) {
        self.cells[id as usize].energy = energy;
    }

    pub(crate) const fn set_start(&mut self, id: CellId) {
        self.start = id;
    }

    pub(crate) const fn set_dimensions(&mut self, size: Dimensions) {
        self.size = size;
    }

    /// Detach `id` from the mesh. The slot stays in the arena.
    pub(crate) fn tombstone(&mut self, id: CellId, mark: Option<f64>) {
        let cell = &mut self.cells[id as usize];
        *cell = Cell::unlinked(mark.unwrap_or(cell.energy));
    }

    /// Walk the mesh from the starting cell, rightwards along each row
    /// and downwards between rows, returning every live cell in
    /// row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if a row is shorter or
    /// longer than the logical width, or the column walk does not end
    /// exactly after the logical height.
    pub fn row_major(&self) -> Result<Vec<CellId>, EngineError> {
        let Dimensions { width, height } = self.size;
        let mut ids = Vec::with_capacity(self.size.area().try_into().unwrap_or(0));
        let mut row_start = Some(self.start);

        for y in 0..height {
            let Some(first) = row_start else {
                return Err(EngineError::CorruptTopology(format!(
                    "column walk ended after {y} of {height} rows"
                )));
            };
            let mut cursor = Some(first);
            for x in 0..width {
                let Some(id) = cursor else {
                    return Err(EngineError::CorruptTopology(format!(
                        "row {y} ended after {x} of {width} cells"
                    )));
                };
                ids.push(id);
                cursor = self.link(id, Side::Right);
            }
            if let Some(extra) = cursor {
                return Err(EngineError::CorruptTopology(format!(
                    "row {y} continues past column {width} into cell {extra}"
                )));
            }
            row_start = self.link(first, Side::Down);
        }

        if let Some(extra) = row_start {
            return Err(EngineError::CorruptTopology(format!(
                "column walk continues past row {height} into cell {extra}"
            )));
        }
        Ok(ids)
    }

    /// Arena index of the cell at logical position `(x, y)`.
    #[must_use]
    pub fn cell_at(&self, x: u32, y: u32) -> Option<CellId> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let mut id = self.start;
        for _ in 0..y {
            id = self.link(id, Side::Down)?;
        }
        for _ in 0..x {
            id = self.link(id, Side::Right)?;
        }
        Some(id)
    }

    /// Rebuild a dense bitmap from the linked mesh.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] if the mesh is not a
    /// `width x height` rectangle (see [`row_major`](Self::row_major)).
    pub fn materialize(&self) -> Result<RgbaImage, EngineError> {
        let ids = self.row_major()?;
        let mut image = RgbaImage::new(self.size.width, self.size.height);
        for (pixel, &id) in image.pixels_mut().zip(&ids) {
            *pixel = self.color(id);
        }
        Ok(image)
    }

    /// Verify every adjacency invariant of the live mesh.
    ///
    /// Checks that the mesh is a `width x height` rectangle, that every
    /// link points at the logically adjacent cell (which implies
    /// symmetry), that boundary links are empty, and that no cell
    /// appears twice.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CorruptTopology`] describing the first
    /// violation found.
    pub fn check_consistency(&self) -> Result<(), EngineError> {
        let ids = self.row_major()?;
        let width = self.size.width as usize;

        let mut seen = vec![false; self.cells.len()];
        for (i, &id) in ids.iter().enumerate() {
            if std::mem::replace(&mut seen[id as usize], true) {
                return Err(EngineError::CorruptTopology(format!(
                    "cell {id} is reachable at more than one position"
                )));
            }

            let (x, y) = (i % width, i / width);
            let expected = [
                (Side::Up, (y > 0).then(|| ids[i - width])),
                (Side::Right, (x + 1 < width).then(|| ids[i + 1])),
                (Side::Down, ids.get(i + width).copied()),
                (Side::Left, (x > 0).then(|| ids[i - 1])),
            ];
            for (side, want) in expected {
                let got = self.link(id, side);
                if got != want {
                    return Err(EngineError::CorruptTopology(format!(
                        "cell {id} at ({x}, {y}) links {side:?} to {got:?}, expected {want:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ───────────────────────── Construction wiring ──────────────────────────

/// Arena index of the source pixel at `(x, y)`.
const fn index(x: u32, y: u32, size: Dimensions) -> CellId {
    y * size.width + x
}

fn wire_corner(x: u32, y: u32, size: Dimensions) -> [Option<CellId>; 4] {
    let left_column = x == 0;
    let top_row = y == 0;
    let mut links = [None; 4];
    if top_row {
        links[Side::Down.slot()] = Some(index(x, y + 1, size));
    } else {
        links[Side::Up.slot()] = Some(index(x, y - 1, size));
    }
    if left_column {
        links[Side::Right.slot()] = Some(index(x + 1, y, size));
    } else {
        links[Side::Left.slot()] = Some(index(x - 1, y, size));
    }
    links
}

fn wire_horizontal_edge(x: u32, y: u32, size: Dimensions) -> [Option<CellId>; 4] {
    let (up, down) = if y == 0 {
        (None, Some(index(x, y + 1, size)))
    } else {
        (Some(index(x, y - 1, size)), None)
    };
    [
        up,
        Some(index(x + 1, y, size)),
        down,
        Some(index(x - 1, y, size)),
    ]
}

fn wire_vertical_edge(x: u32, y: u32, size: Dimensions) -> [Option<CellId>; 4] {
    let (right, left) = if x == 0 {
        (Some(index(x + 1, y, size)), None)
    } else {
        (None, Some(index(x - 1, y, size)))
    };
    [
        Some(index(x, y - 1, size)),
        right,
        Some(index(x, y + 1, size)),
        left,
    ]
}

const fn wire_interior(x: u32, y: u32, size: Dimensions) -> [Option<CellId>; 4] {
    [
        Some(index(x, y - 1, size)),
        Some(index(x + 1, y, size)),
        Some(index(x, y + 1, size)),
        Some(index(x - 1, y, size)),
    ]
}
