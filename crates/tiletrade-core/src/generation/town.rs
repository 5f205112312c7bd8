//! Town generation - lays out shoreline, orchard, shop and seating

use rand::Rng;

use crate::components::Good;
use crate::grid::{Cell, Grid, Station, StationKind, TileType};

/// Smallest map the fixed layout fits on
const MIN_ROWS: usize = 24;
const MIN_COLS: usize = 32;

/// Configuration for town generation
#[derive(Debug, Clone)]
pub struct TownConfig {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub agent_count: u32,
    /// Chance that an orchard tile starts with a tree
    pub tree_density: f64,
}

impl Default for TownConfig {
    fn default() -> Self {
        Self {
            name: "Harbor Town".to_string(),
            rows: MIN_ROWS,
            cols: MIN_COLS,
            agent_count: 12,
            tree_density: 0.6,
        }
    }
}

/// Build the town map.
///
/// The west edge is sea with a sandy shore and fishing docks. The orchard
/// sits in the south-west. A walled shop with one door holds the counters,
/// fridges, registers and a table; more tables stand outside.
pub fn generate_town(config: &TownConfig, tile_size: f32, rng: &mut impl Rng) -> Grid {
    let rows = config.rows.max(MIN_ROWS);
    let cols = config.cols.max(MIN_COLS);
    if rows != config.rows || cols != config.cols {
        log::warn!(
            "town {}x{} too small, using {}x{}",
            config.rows,
            config.cols,
            rows,
            cols
        );
    }
    let mut grid = Grid::new(rows, cols, tile_size);

    lay_shore(&mut grid);
    plant_orchard(&mut grid, config.tree_density, rng);
    build_shop(&mut grid, Cell::new(3, 14), Cell::new(12, 25));

    // Outdoor seating
    for (row, col, good) in [
        (16, 18, Good::Fish),
        (16, 21, Good::Apple),
        (19, 18, Good::Fish),
        (19, 21, Good::Apple),
    ] {
        place(&mut grid, row, col, StationKind::Table, good);
    }

    log::info!(
        "generated {} ({}x{}, {} trees)",
        config.name,
        rows,
        cols,
        grid.find(|t| t.has_tree).len()
    );
    grid
}

fn place(grid: &mut Grid, row: usize, col: usize, kind: StationKind, good: Good) {
    grid.set_kind(Cell::new(row, col), TileType::Station(Station::new(kind, good)));
}

fn lay_shore(grid: &mut Grid) {
    for row in 0..grid.rows() {
        for col in 0..3 {
            grid.set_kind(Cell::new(row, col), TileType::Water);
        }
        grid.set_kind(Cell::new(row, 3), TileType::Sand);
    }
    for row in [3, 8, 13] {
        place(grid, row, 3, StationKind::Dock, Good::Fish);
    }
}

fn plant_orchard(grid: &mut Grid, density: f64, rng: &mut impl Rng) {
    let rows = grid.rows();
    let density = density.clamp(0.0, 1.0);
    let mut planted = 0;
    for row in rows - 7..rows - 1 {
        for col in 6..12 {
            if rng.gen_bool(density) {
                if let Some(tile) = grid.get_mut(Cell::new(row, col)) {
                    tile.has_tree = true;
                    planted += 1;
                }
            }
        }
    }
    // An orchard needs at least one tree to work
    if planted == 0 {
        if let Some(tile) = grid.get_mut(Cell::new(rows - 4, 8)) {
            tile.has_tree = true;
        }
    }
    place(grid, rows - 8, 7, StationKind::Orchard, Good::Apple);
    place(grid, rows - 8, 10, StationKind::Orchard, Good::Apple);
}

/// Walls around the rectangle from `top_left` to `bottom_right`, a door in
/// the south wall, fixtures inside
fn build_shop(grid: &mut Grid, top_left: Cell, bottom_right: Cell) {
    let (top, left) = (top_left.row, top_left.col);
    let (bottom, right) = (bottom_right.row, bottom_right.col);
    for col in left..=right {
        grid.set_kind(Cell::new(top, col), TileType::Wall);
        grid.set_kind(Cell::new(bottom, col), TileType::Wall);
    }
    for row in top..=bottom {
        grid.set_kind(Cell::new(row, left), TileType::Wall);
        grid.set_kind(Cell::new(row, right), TileType::Wall);
    }
    grid.set_kind(Cell::new(bottom, (left + right) / 2), TileType::Door);

    let (west, east) = (left + 1, right - 1);
    place(grid, top + 1, west, StationKind::Counter, Good::Fish);
    place(grid, top + 2, west, StationKind::Counter, Good::Fish);
    place(grid, top + 1, east, StationKind::Counter, Good::Apple);
    place(grid, top + 2, east, StationKind::Counter, Good::Apple);
    place(grid, top + 4, west, StationKind::Fridge, Good::Fish);
    place(grid, top + 4, east, StationKind::Fridge, Good::Apple);
    place(grid, bottom - 2, west + 2, StationKind::Register, Good::Fish);
    place(grid, bottom - 2, east - 2, StationKind::Register, Good::Apple);
    place(grid, top + 5, (left + right) / 2, StationKind::Table, Good::Fish);
}
