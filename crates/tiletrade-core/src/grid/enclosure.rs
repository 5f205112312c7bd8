//! Region enclosure analysis.
//!
//! A region is enclosed when a 4-directional flood from a passable tile can
//! never reach the edge of the map. Walls and doors are barriers. The boolean
//! check and the cell enumeration share one flood so they always agree.

use std::collections::{HashSet, VecDeque};

use super::{Cell, Grid, Tile};

/// Flood from `start`. Returns the visited passable cells, or `None` as soon
/// as the flood would step outside the grid.
fn flood(grid: &Grid, start: Cell) -> Option<Vec<Cell>> {
    let start_tile = grid.get(start)?;
    if start_tile.kind.is_barrier() {
        return None;
    }

    let mut visited: HashSet<Cell> = HashSet::new();
    let mut queue: VecDeque<Cell> = VecDeque::new();
    let mut region = Vec::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        region.push(cell);

        for (dr, dc) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
            let row = cell.row as i64 + dr;
            let col = cell.col as i64 + dc;
            if !grid.in_bounds(row, col) {
                // Escaped into the open world
                return None;
            }
            let next = Cell::new(row as usize, col as usize);
            if visited.contains(&next) {
                continue;
            }
            let passable = grid
                .get(next)
                .map(|t| !t.kind.is_barrier())
                .unwrap_or(false);
            if passable {
                visited.insert(next);
                queue.push_back(next);
            }
        }
    }

    Some(region)
}

/// Whether the point lies inside a region fully bounded by walls and doors.
/// Points off the grid or on a barrier tile are never enclosed.
pub fn is_fully_enclosed(grid: &Grid, x: f32, y: f32) -> bool {
    grid.cell_at(x, y)
        .map(|cell| flood(grid, cell).is_some())
        .unwrap_or(false)
}

/// Every passable cell of the enclosed region containing `(col, row)`,
/// or `None` if that region is open to the map edge.
pub fn gather_enclosed_cells(grid: &Grid, col: usize, row: usize) -> Option<Vec<Cell>> {
    flood(grid, Cell::new(row, col))
}

/// Whether the enclosed region around a cell holds a tile matching the predicate.
/// Useful for finding furniture inside a room.
pub fn room_contains(grid: &Grid, col: usize, row: usize, pred: impl Fn(&Tile) -> bool) -> bool {
    gather_enclosed_cells(grid, col, row)
        .map(|cells| cells.iter().filter_map(|c| grid.get(*c)).any(pred))
        .unwrap_or(false)
}
