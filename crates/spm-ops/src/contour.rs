//! Moore-neighbour contour tracing.
//!
//! Traces the outer boundary of the region set in a [`GridMask`], 8-connected,
//! starting at the first region cell in raster order. The neighbours of the
//! current cell are scanned clockwise from the cell we backtracked from:
//!
//! ```text
//!   NW  N  NE        1 2 3
//!   W   .  E    ->   0 . 4
//!   SW  S  SE        7 6 5
//! ```
//!
//! The walk stops when it leaves the start cell towards the same neighbour
//! as on its first step. A bound on the number of steps guards against
//! malformed input.

use spm_core::{GridMask, GridPointRecipient, Roi};
use tracing::{trace, warn};

/// Neighbour offsets `(d_row, d_col)` in clockwise order starting west.
const DIRECTIONS: [(isize, isize); 8] = [(0, -1), (-1, -1), (-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0), (1, -1)];

fn direction_index(d_row: isize, d_col: isize) -> Option<usize> {
    DIRECTIONS.iter().position(|&d| d == (d_row, d_col))
}

/// Closed boundary of a region as `(row, col)` cells in walking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    points: Vec<(usize, usize)>,
}

impl Contour {
    /// Boundary cells; the last connects back to the first.
    pub fn points(&self) -> &[(usize, usize)] {
        &self.points
    }

    /// Number of boundary cells.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; a traced contour has at least its start cell.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Boundary as a polygon in index space (`x = col`, `y = row`).
    pub fn to_polygon(&self) -> Roi {
        Roi::polygon(self.points.iter().map(|&(r, c)| (c as f64, r as f64)).collect())
    }

    /// Adds every cell of `mask`'s grid whose centre lies inside the polygon.
    pub fn fill_interior(&self, mask: &mut GridMask) {
        if self.points.len() < 3 {
            return;
        }
        let polygon = self.to_polygon();
        let r0 = self.points.iter().map(|p| p.0).min().unwrap_or(0);
        let r1 = self.points.iter().map(|p| p.0).max().unwrap_or(0);
        let c0 = self.points.iter().map(|p| p.1).min().unwrap_or(0);
        let c1 = self.points.iter().map(|p| p.1).max().unwrap_or(0);
        for row in r0..=r1 {
            for col in c0..=c1 {
                if !mask.contains(row, col) && polygon.contains(col as f64, row as f64) {
                    mask.add_point(row, col);
                }
            }
        }
    }
}

/// Outer contour of the region in `region`, or `None` when it is empty.
pub fn trace_contour(region: &GridMask) -> Option<Contour> {
    let rows = region.rows();
    let cols = region.columns();
    let first = region.cells().iter().position(|&set| set)?;
    let start = (first / cols, first % cols);
    trace!(rows, cols, start_row = start.0, start_col = start.1, "trace contour");

    let inside = |r: isize, c: isize| -> bool {
        r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols && region.contains(r as usize, c as usize)
    };

    // Finds the next boundary cell clockwise from `backtrack`, returning it
    // with the new backtrack direction.
    let step = |(r, c): (usize, usize), backtrack: usize| -> Option<((usize, usize), usize)> {
        let (r, c) = (r as isize, c as isize);
        for k in 1..=8 {
            let d = (backtrack + k) % 8;
            let (nr, nc) = (r + DIRECTIONS[d].0, c + DIRECTIONS[d].1);
            if inside(nr, nc) {
                let prev = DIRECTIONS[(d + 7) % 8];
                let back = direction_index(r + prev.0 - nr, c + prev.1 - nc)?;
                return Some(((nr as usize, nc as usize), back));
            }
        }
        None
    };

    let mut points = vec![start];
    // West of the first raster cell is never in the region.
    let Some((second, mut backtrack)) = step(start, 0) else {
        return Some(Contour { points });
    };
    let mut current = second;
    let limit = 4 * region.count() + 8;

    for _ in 0..limit {
        if current == start {
            match step(current, backtrack) {
                Some((next, _)) if next == second => return Some(Contour { points }),
                _ => {}
            }
        }
        points.push(current);
        let Some((next, back)) = step(current, backtrack) else {
            break;
        };
        current = next;
        backtrack = back;
    }

    warn!(steps = limit, "Contour did not close, returning the partial boundary");
    Some(Contour { points })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(rows: usize, cols: usize, cells: &[(usize, usize)]) -> GridMask {
        let mut m = GridMask::new(rows, cols);
        for &(r, c) in cells {
            m.add_point(r, c);
        }
        m
    }

    #[test]
    fn test_single_cell() {
        let c = trace_contour(&mask(3, 3, &[(1, 1)])).unwrap();
        assert_eq!(c.points(), &[(1, 1)]);
        assert!(trace_contour(&GridMask::new(2, 2)).is_none());
    }

    #[test]
    fn test_two_cells_close() {
        let c = trace_contour(&mask(1, 2, &[(0, 0), (0, 1)])).unwrap();
        assert_eq!(c.points(), &[(0, 0), (0, 1)]);
    }

    #[test]
    fn test_square_boundary() {
        let mut m = GridMask::new(5, 5);
        m.add_block(1, 4, 1, 4);
        let c = trace_contour(&m).unwrap();
        assert_eq!(c.len(), 8);
        assert_eq!(c.points()[0], (1, 1));
        assert!(!c.points().contains(&(2, 2)));
        assert!(c.points().iter().all(|&(r, col)| m.contains(r, col)));
    }

    #[test]
    fn test_ring_interior_filled() {
        let mut m = GridMask::new(5, 5);
        m.add_block(0, 5, 0, 5);
        let mut ring = GridMask::new(5, 5);
        for r in 0..5 {
            for c in 0..5 {
                if r == 0 || c == 0 || r == 4 || c == 4 {
                    ring.add_point(r, c);
                }
            }
        }
        let contour = trace_contour(&ring).unwrap();
        assert_eq!(contour.len(), 16);
        contour.fill_interior(&mut ring);
        assert_eq!(ring, m);
    }
}
