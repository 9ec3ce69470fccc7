//! Regions of interest and masked grid-point iteration.
//!
//! A [`Roi`] is a closed 2D shape in physical (x, y) coordinates. Transforms
//! use it to restrict work to the cells inside it, outside it, or everywhere:
//!
//! ```text
//!  Outside      Inside
//!  . . . . . . . . .
//!  . . # # # # . . .      add_points(grid, Inside, recipient)
//!  . . # # # # . . .        -> add_block(1, 3, 2, 6)
//!  . . . . . . . . .
//! ```
//!
//! Cells are classified by their centre `(grid.x(col), grid.y(row))`. The
//! iterator hands cells to a [`GridPointRecipient`] one at a time or as whole
//! rectangular blocks; a block is only a faster way of delivering the same
//! cells, each of which is visited exactly once.

use serde::{Deserialize, Serialize};

use crate::grid::Grid2D;

/// Which cells a masked operation should touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoiPosition {
    /// Cells whose centre lies inside the ROI.
    Inside,
    /// Cells whose centre lies outside the ROI.
    Outside,
    /// Every cell of the grid.
    #[default]
    Everything,
}

/// Receiver of grid cells enumerated by [`Roi::add_points`].
pub trait GridPointRecipient {
    /// Receives a single cell.
    fn add_point(&mut self, row: usize, col: usize);

    /// Receives every cell of `[row_from, row_to) x [col_from, col_to)`.
    fn add_block(&mut self, row_from: usize, row_to: usize, col_from: usize, col_to: usize) {
        for row in row_from..row_to {
            for col in col_from..col_to {
                self.add_point(row, col);
            }
        }
    }
}

impl<F: FnMut(usize, usize)> GridPointRecipient for F {
    #[inline]
    fn add_point(&mut self, row: usize, col: usize) {
        self(row, col)
    }
}

/// Boolean mask over a grid, filled by ROI iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMask {
    rows: usize,
    columns: usize,
    cells: Vec<bool>,
    count: usize,
}

impl GridMask {
    /// Empty mask.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![false; rows * columns],
            count: 0,
        }
    }

    /// Mask with every cell set.
    pub fn full(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![true; rows * columns],
            count: rows * columns,
        }
    }

    /// Mask row count.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Mask column count.
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns `true` if `(row, col)` is set.
    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.columns + col]
    }

    /// Number of set cells.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if no cell is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Row-major cell flags.
    #[inline]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Half-open `(row_from, row_to, col_from, col_to)` bounds of the set
    /// cells, or `None` for an empty mask.
    pub fn bounding_box(&self) -> Option<(usize, usize, usize, usize)> {
        if self.count == 0 {
            return None;
        }
        let mut bounds = (usize::MAX, 0, usize::MAX, 0);
        for row in 0..self.rows {
            for col in 0..self.columns {
                if self.contains(row, col) {
                    bounds.0 = bounds.0.min(row);
                    bounds.1 = bounds.1.max(row + 1);
                    bounds.2 = bounds.2.min(col);
                    bounds.3 = bounds.3.max(col + 1);
                }
            }
        }
        Some(bounds)
    }
}

impl GridPointRecipient for GridMask {
    #[inline]
    fn add_point(&mut self, row: usize, col: usize) {
        let cell = &mut self.cells[row * self.columns + col];
        if !*cell {
            *cell = true;
            self.count += 1;
        }
    }
}

/// Recipient that only counts the cells it receives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointCounter {
    count: usize,
}

impl PointCounter {
    /// Number of cells received so far.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl GridPointRecipient for PointCounter {
    #[inline]
    fn add_point(&mut self, _row: usize, _col: usize) {
        self.count += 1;
    }

    #[inline]
    fn add_block(&mut self, row_from: usize, row_to: usize, col_from: usize, col_to: usize) {
        self.count += (row_to - row_from) * (col_to - col_from);
    }
}

/// Region of interest shape in physical coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Roi {
    /// Axis-aligned rectangle, boundary included.
    Rectangle {
        /// Left edge.
        x_min: f64,
        /// Bottom edge.
        y_min: f64,
        /// Right edge.
        x_max: f64,
        /// Top edge.
        y_max: f64,
    },
    /// Ellipse with semi-axes `radius_x`, `radius_y` rotated by `angle`
    /// radians about its centre.
    Ellipse {
        /// Centre x.
        center_x: f64,
        /// Centre y.
        center_y: f64,
        /// Semi-axis along the (rotated) x direction.
        radius_x: f64,
        /// Semi-axis along the (rotated) y direction.
        radius_y: f64,
        /// Counterclockwise rotation in radians.
        angle: f64,
    },
    /// Closed polygon (even-odd rule); the last vertex connects to the first.
    Polygon(Vec<(f64, f64)>),
}

impl Roi {
    /// Rectangle from two corners in any order.
    pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::Rectangle {
            x_min: x0.min(x1),
            y_min: y0.min(y1),
            x_max: x0.max(x1),
            y_max: y0.max(y1),
        }
    }

    /// Axis-aligned ellipse.
    pub fn ellipse(center_x: f64, center_y: f64, radius_x: f64, radius_y: f64) -> Self {
        Self::Ellipse {
            center_x,
            center_y,
            radius_x: radius_x.abs(),
            radius_y: radius_y.abs(),
            angle: 0.0,
        }
    }

    /// Polygon from its vertices.
    pub fn polygon(vertices: Vec<(f64, f64)>) -> Self {
        Self::Polygon(vertices)
    }

    /// Returns `true` if `(x, y)` lies inside the shape.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            Self::Rectangle {
                x_min,
                y_min,
                x_max,
                y_max,
            } => x >= *x_min && x <= *x_max && y >= *y_min && y <= *y_max,
            Self::Ellipse {
                center_x,
                center_y,
                radius_x,
                radius_y,
                angle,
            } => {
                if *radius_x <= 0.0 || *radius_y <= 0.0 {
                    return false;
                }
                let (u, v) = rotate_about(x - center_x, y - center_y, -angle);
                let (u, v) = (u / radius_x, v / radius_y);
                u * u + v * v <= 1.0
            }
            Self::Polygon(vertices) => polygon_contains(vertices, x, y),
        }
    }

    /// Bounding box `(x_min, y_min, x_max, y_max)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match self {
            Self::Rectangle {
                x_min,
                y_min,
                x_max,
                y_max,
            } => (*x_min, *y_min, *x_max, *y_max),
            Self::Ellipse {
                center_x,
                center_y,
                radius_x,
                radius_y,
                angle,
            } => {
                let (s, c) = angle.sin_cos();
                let half_w = ((radius_x * c).powi(2) + (radius_y * s).powi(2)).sqrt();
                let half_h = ((radius_x * s).powi(2) + (radius_y * c).powi(2)).sqrt();
                (
                    center_x - half_w,
                    center_y - half_h,
                    center_x + half_w,
                    center_y + half_h,
                )
            }
            Self::Polygon(vertices) => vertices.iter().fold(
                (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
                |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            ),
        }
    }

    /// Copy of this ROI rotated by `-angle` radians about `(center_x, center_y)`.
    ///
    /// Rotating image content by `angle` moves the content of `self` into
    /// `self.rotated_copy(-angle, ..)`; transforms use this to classify output
    /// cells by where their value came from.
    pub fn rotated_copy(&self, angle: f64, center_x: f64, center_y: f64) -> Self {
        let theta = -angle;
        let rotate = |(x, y): (f64, f64)| {
            let (dx, dy) = rotate_about(x - center_x, y - center_y, theta);
            (center_x + dx, center_y + dy)
        };
        match self {
            Self::Rectangle {
                x_min,
                y_min,
                x_max,
                y_max,
            } => Self::Polygon(
                [
                    (*x_min, *y_min),
                    (*x_max, *y_min),
                    (*x_max, *y_max),
                    (*x_min, *y_max),
                ]
                .into_iter()
                .map(rotate)
                .collect(),
            ),
            Self::Ellipse {
                center_x: ex,
                center_y: ey,
                radius_x,
                radius_y,
                angle: own,
            } => {
                let (cx, cy) = rotate((*ex, *ey));
                Self::Ellipse {
                    center_x: cx,
                    center_y: cy,
                    radius_x: *radius_x,
                    radius_y: *radius_y,
                    angle: own + theta,
                }
            }
            Self::Polygon(vertices) => Self::Polygon(vertices.iter().copied().map(rotate).collect()),
        }
    }

    /// Enumerates the cells of `grid` matching `position` into `recipient`.
    ///
    /// Every matching cell is delivered exactly once, either through
    /// [`GridPointRecipient::add_point`] or as part of a block.
    pub fn add_points(
        &self,
        grid: &Grid2D,
        position: RoiPosition,
        recipient: &mut dyn GridPointRecipient,
    ) {
        let rows = grid.row_count();
        let cols = grid.column_count();
        match position {
            RoiPosition::Everything => recipient.add_block(0, rows, 0, cols),
            RoiPosition::Inside => self.add_inside_points(grid, recipient),
            RoiPosition::Outside => self.add_outside_points(grid, recipient),
        }
    }

    /// Mask of the cells matching `position`.
    pub fn mask(&self, grid: &Grid2D, position: RoiPosition) -> GridMask {
        let mut mask = GridMask::new(grid.row_count(), grid.column_count());
        self.add_points(grid, position, &mut mask);
        mask
    }

    fn add_inside_points(&self, grid: &Grid2D, recipient: &mut dyn GridPointRecipient) {
        if let Some((r0, r1, c0, c1)) = self.exact_rectangle_cells(grid) {
            recipient.add_block(r0, r1, c0, c1);
            return;
        }
        let Some((r0, r1, c0, c1)) = self.candidate_cells(grid) else {
            return;
        };
        for row in r0..r1 {
            let y = grid.y(row);
            for col in c0..c1 {
                if self.contains(grid.x(col), y) {
                    recipient.add_point(row, col);
                }
            }
        }
    }

    fn add_outside_points(&self, grid: &Grid2D, recipient: &mut dyn GridPointRecipient) {
        let rows = grid.row_count();
        let cols = grid.column_count();

        if matches!(self, Self::Rectangle { .. }) {
            match self.exact_rectangle_cells(grid) {
                Some((r0, r1, c0, c1)) => add_complement_blocks(recipient, rows, cols, r0, r1, c0, c1),
                None => recipient.add_block(0, rows, 0, cols),
            }
            return;
        }

        let Some((r0, r1, c0, c1)) = self.candidate_cells(grid) else {
            recipient.add_block(0, rows, 0, cols);
            return;
        };
        recipient.add_block(0, r0, 0, cols);
        for row in r0..r1 {
            recipient.add_block(row, row + 1, 0, c0);
            let y = grid.y(row);
            for col in c0..c1 {
                if !self.contains(grid.x(col), y) {
                    recipient.add_point(row, col);
                }
            }
            recipient.add_block(row, row + 1, c1, cols);
        }
        recipient.add_block(r1, rows, 0, cols);
    }

    /// Half-open cell range that contains every cell the shape may contain.
    fn candidate_cells(&self, grid: &Grid2D) -> Option<(usize, usize, usize, usize)> {
        let (x0, y0, x1, y1) = self.bounds();
        if !(x0 <= x1 && y0 <= y1) {
            return None;
        }
        let (c0, c1) = candidate_range(grid.column_position(x0), grid.column_position(x1), grid.column_count())?;
        let (r0, r1) = candidate_range(grid.row_position(y0), grid.row_position(y1), grid.row_count())?;
        Some((r0, r1, c0, c1))
    }

    /// Exact cell block covered by an axis-aligned rectangle.
    fn exact_rectangle_cells(&self, grid: &Grid2D) -> Option<(usize, usize, usize, usize)> {
        let Self::Rectangle {
            x_min,
            y_min,
            x_max,
            y_max,
        } = self
        else {
            return None;
        };
        let (r0, r1, c0, c1) = self.candidate_cells(grid)?;
        let cols: Vec<usize> = (c0..c1)
            .filter(|&c| {
                let x = grid.x(c);
                x >= *x_min && x <= *x_max
            })
            .collect();
        let rows: Vec<usize> = (r0..r1)
            .filter(|&r| {
                let y = grid.y(r);
                y >= *y_min && y <= *y_max
            })
            .collect();
        match (rows.first(), rows.last(), cols.first(), cols.last()) {
            (Some(&ra), Some(&rb), Some(&ca), Some(&cb)) => Some((ra, rb + 1, ca, cb + 1)),
            _ => None,
        }
    }
}

fn add_complement_blocks(
    recipient: &mut dyn GridPointRecipient,
    rows: usize,
    cols: usize,
    r0: usize,
    r1: usize,
    c0: usize,
    c1: usize,
) {
    recipient.add_block(0, r0, 0, cols);
    recipient.add_block(r0, r1, 0, c0);
    recipient.add_block(r0, r1, c1, cols);
    recipient.add_block(r1, rows, 0, cols);
}

fn candidate_range(from: f64, to: f64, count: usize) -> Option<(usize, usize)> {
    if from.is_nan() || to.is_nan() {
        return None;
    }
    let lo = (from.floor() - 1.0).max(0.0);
    let hi = (to.ceil() + 2.0).min(count as f64);
    if lo >= hi {
        return None;
    }
    Some((lo as usize, hi as usize))
}

#[inline]
fn rotate_about(dx: f64, dy: f64, theta: f64) -> (f64, f64) {
    let (s, c) = theta.sin_cos();
    (dx * c - dy * s, dx * s + dy * c)
}

fn polygon_contains(vertices: &[(f64, f64)], x: f64, y: f64) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
