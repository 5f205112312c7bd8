//! Perishable decay clock and renewable resources.
//!
//! Each (tile, good) slot ages as a batch: when its accumulator reaches the
//! rot threshold the whole fresh stock turns into the wasted counterpart at
//! once. Cold storage never ages.

use std::collections::HashMap;

use crate::components::Good;
use crate::grid::{Cell, Grid};

/// Per-(tile, good) rot accumulators
#[derive(Debug, Clone, Default)]
pub struct DecayClock {
    elapsed: HashMap<(Cell, Good), f32>,
}

impl DecayClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rate-weighted seconds accumulated by a slot
    pub fn elapsed(&self, cell: Cell, good: Good) -> f32 {
        self.elapsed.get(&(cell, good)).copied().unwrap_or(0.0)
    }

    pub fn tracked_slots(&self) -> usize {
        self.elapsed.len()
    }

    /// Age every perishable slot by `dt`. Returns the number of units that rotted.
    pub fn advance(&mut self, grid: &mut Grid, dt: f32, rot_threshold: f32) -> i32 {
        let mut rotted = 0;
        for (cell, tile) in grid.iter_mut() {
            let exempt = tile
                .kind
                .station_kind()
                .map(|k| k.is_cold_storage())
                .unwrap_or(false);
            if exempt {
                continue;
            }
            for good in Good::PERISHABLE {
                let quantity = tile.inventory.get(good);
                if quantity <= 0 {
                    continue;
                }
                let Some(wasted) = good.wasted() else {
                    continue;
                };
                let timer = self.elapsed.entry((cell, good)).or_insert(0.0);
                *timer += dt * good.decay_rate();
                if *timer >= rot_threshold {
                    let spoiled = tile.inventory.take_all(good);
                    tile.inventory.add(wasted, spoiled);
                    *timer = 0.0;
                    rotted += spoiled;
                    log::debug!(
                        "{} {} rotted at ({}, {})",
                        spoiled,
                        good,
                        cell.row,
                        cell.col
                    );
                }
            }
        }

        // Forget slots that emptied out
        self.elapsed.retain(|(cell, good), _| {
            grid.get(*cell)
                .map(|tile| tile.inventory.get(*good) > 0)
                .unwrap_or(false)
        });
        rotted
    }
}

/// Regrow a harvested tree if its regrowth time has come.
/// Stale events (tile rebuilt or tree already back) are ignored.
pub fn regrow_tree(grid: &mut Grid, cell: Cell, now: f64) -> bool {
    let Some(tile) = grid.get_mut(cell) else {
        return false;
    };
    if tile.has_tree || tile.kind.is_built() {
        return false;
    }
    match tile.regen_time {
        Some(at) if at <= now => {
            tile.has_tree = true;
            tile.regen_time = None;
            true
        }
        _ => false,
    }
}
