//! Tile grid - the owned 2D world map.
//!
//! The grid stores terrain, structures and stations together with their
//! banked inventories and claim bindings. Systems borrow it explicitly;
//! there is no global map.

mod enclosure;

pub use enclosure::*;

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::components::{Good, Inventory, Vec2};

/// Grid coordinate of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Function of a station tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    /// Fishing pier, worked from adjacent water
    Dock,
    /// Fruit picking post, worked from nearby trees
    Orchard,
    /// Raw-stage drop-off. Shared, never claimed.
    Counter,
    /// Refrigerated storage. Goods never rot here.
    Fridge,
    /// Point of sale
    Register,
    /// Consumption station; its claimant becomes a buyer
    Table,
}

impl StationKind {
    pub fn is_claimable(&self) -> bool {
        !matches!(self, StationKind::Counter)
    }

    /// Stations whose inventory is exempt from decay
    pub fn is_cold_storage(&self) -> bool {
        matches!(self, StationKind::Fridge)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StationKind::Dock => "dock",
            StationKind::Orchard => "orchard",
            StationKind::Counter => "counter",
            StationKind::Fridge => "fridge",
            StationKind::Register => "register",
            StationKind::Table => "table",
        }
    }
}

/// A station tile handles exactly one good family.
/// `(kind, good)` is the unit the claim price schedule is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Station {
    pub kind: StationKind,
    pub good: Good,
}

impl Station {
    pub fn new(kind: StationKind, good: Good) -> Self {
        Self {
            kind,
            good: good.fresh(),
        }
    }
}

/// Tile types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    #[default]
    Grass,
    Sand,
    Water,
    Wall,
    Door,
    Station(Station),
}

impl TileType {
    /// Walls and doors bound enclosed regions
    pub fn is_barrier(&self) -> bool {
        matches!(self, TileType::Wall | TileType::Door)
    }

    /// Built tiles revert to terrain under sustained damage
    pub fn is_built(&self) -> bool {
        matches!(self, TileType::Wall | TileType::Door | TileType::Station(_))
    }

    pub fn station(&self) -> Option<Station> {
        match self {
            TileType::Station(station) => Some(*station),
            _ => None,
        }
    }

    pub fn station_kind(&self) -> Option<StationKind> {
        self.station().map(|s| s.kind)
    }
}

/// One grid cell
#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub kind: TileType,
    /// Blueprint flag: placed but not yet built
    pub transparent: bool,
    pub inventory: Inventory,
    pub claimed: Option<Entity>,
    pub damage: f32,
    pub has_tree: bool,
    /// Sim time at which a harvested tree grows back
    pub regen_time: Option<f64>,
}

impl Tile {
    pub fn new(kind: TileType) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// A finished station of the given kind and good family
    pub fn is_station(&self, station: Station) -> bool {
        !self.transparent && self.kind == TileType::Station(station)
    }

    /// Built station open for a claim
    pub fn is_claimable(&self) -> bool {
        !self.transparent
            && self.claimed.is_none()
            && self
                .kind
                .station_kind()
                .map(|k| k.is_claimable())
                .unwrap_or(false)
    }
}

/// Rectangular tile map
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    tile_size: f32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Create a grid of grass tiles
    pub fn new(rows: usize, cols: usize, tile_size: f32) -> Self {
        Self {
            rows,
            cols,
            tile_size,
            tiles: vec![Tile::default(); rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn in_bounds(&self, row: i64, col: i64) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        (cell.row < self.rows && cell.col < self.cols).then(|| cell.row * self.cols + cell.col)
    }

    pub fn get(&self, cell: Cell) -> Option<&Tile> {
        self.index(cell).map(|i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, cell: Cell) -> Option<&mut Tile> {
        self.index(cell).map(move |i| &mut self.tiles[i])
    }

    /// Change a tile's type in place, keeping inventory and claim
    pub fn set_kind(&mut self, cell: Cell, kind: TileType) {
        if let Some(tile) = self.get_mut(cell) {
            tile.kind = kind;
        }
    }

    /// Tile containing a world-space point
    pub fn cell_at(&self, x: f32, y: f32) -> Option<Cell> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let col = (x / self.tile_size).floor() as usize;
        let row = (y / self.tile_size).floor() as usize;
        (row < self.rows && col < self.cols).then(|| Cell::new(row, col))
    }

    /// World-space center of a tile
    pub fn center(&self, cell: Cell) -> Vec2 {
        Vec2::new(
            (cell.col as f32 + 0.5) * self.tile_size,
            (cell.row as f32 + 0.5) * self.tile_size,
        )
    }

    /// All cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Cell::new(row, col)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, &Tile)> + '_ {
        let cols = self.cols;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, tile)| (Cell::new(i / cols, i % cols), tile))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Cell, &mut Tile)> + '_ {
        let cols = self.cols;
        self.tiles
            .iter_mut()
            .enumerate()
            .map(move |(i, tile)| (Cell::new(i / cols, i % cols), tile))
    }

    /// Cells whose tile satisfies the predicate, row-major
    pub fn find(&self, pred: impl Fn(&Tile) -> bool) -> Vec<Cell> {
        self.iter()
            .filter(|(_, tile)| pred(tile))
            .map(|(cell, _)| cell)
            .collect()
    }

    /// Finished stations of a kind and good family, row-major
    pub fn stations(&self, station: Station) -> Vec<Cell> {
        self.find(|tile| tile.is_station(station))
    }

    /// Closest tile center satisfying the predicate. Ties go to the first in row-major order.
    pub fn nearest(&self, from: Vec2, pred: impl Fn(&Tile) -> bool) -> Option<Cell> {
        let mut best: Option<(Cell, f32)> = None;
        for (cell, tile) in self.iter() {
            if !pred(tile) {
                continue;
            }
            let d = self.center(cell).distance_squared(&from);
            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((cell, d));
            }
        }
        best.map(|(cell, _)| cell)
    }

    /// Bind a tile to an entity. Fails if the tile is already claimed.
    pub fn claim(&mut self, cell: Cell, entity: Entity) -> bool {
        match self.get_mut(cell) {
            Some(tile) if tile.claimed.is_none() => {
                tile.claimed = Some(entity);
                true
            }
            _ => false,
        }
    }

    /// Release a claim. Only the claiming entity can release it.
    pub fn release(&mut self, cell: Cell, entity: Entity) -> bool {
        match self.get_mut(cell) {
            Some(tile) if tile.claimed == Some(entity) => {
                tile.claimed = None;
                true
            }
            _ => false,
        }
    }

    /// Accumulate damage on a built tile. Once the threshold is reached the
    /// tile reverts to grass and its stock is lost. Returns true on revert.
    pub fn damage(&mut self, cell: Cell, amount: f32, threshold: f32) -> bool {
        let Some(tile) = self.get_mut(cell) else {
            return false;
        };
        if !tile.kind.is_built() {
            return false;
        }
        tile.damage += amount;
        if tile.damage < threshold {
            return false;
        }
        log::debug!("tile ({}, {}) destroyed", cell.row, cell.col);
        tile.kind = TileType::Grass;
        tile.transparent = false;
        tile.damage = 0.0;
        tile.inventory = Inventory::new();
        true
    }
}
