//! Station claim protocol - binds idle agents to free stations.
//!
//! The first idle agent to reach for a station gets it. Each newly claimed
//! station of a kind costs more than the last, so capacity of a saturating
//! station type becomes progressively more expensive.

use std::collections::HashMap;

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::components::{Agent, Constructing, Position, Role, Waiting};
use crate::config::{PriceSchedule, SimConfig};
use crate::grid::{Cell, Grid, Station};

/// Running price state of one station kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KindPricing {
    pub count: u32,
    pub last_price: f64,
}

/// Claim counters and last prices per station kind
#[derive(Debug, Clone, Default)]
pub struct ClaimBook {
    kinds: HashMap<Station, KindPricing>,
}

impl ClaimBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Price the next claim of this kind would get
    pub fn next_price(&self, station: Station, schedule: &PriceSchedule) -> f64 {
        let current = self.kinds.get(&station).copied().unwrap_or_default();
        let last = if current.count == 0 {
            schedule.initial_price
        } else {
            current.last_price
        };
        last + schedule.step(current.count + 1)
    }

    /// Whether the next claim of this kind stays under the ceiling
    pub fn can_afford(&self, station: Station, schedule: &PriceSchedule) -> bool {
        self.next_price(station, schedule) <= schedule.price_ceiling
    }

    fn commit(&mut self, station: Station, schedule: &PriceSchedule) -> f64 {
        let price = self.next_price(station, schedule);
        let entry = self.kinds.entry(station).or_default();
        entry.count += 1;
        entry.last_price = price;
        price
    }

    pub fn pricing(&self, station: Station) -> KindPricing {
        self.kinds.get(&station).copied().unwrap_or_default()
    }
}

/// Claim a station for an entity. Returns the role the claim grants, or
/// `None` when the tile is not a free claimable station or the price ceiling
/// was hit. A claimed tile is never overwritten.
pub fn claim_station(
    grid: &mut Grid,
    book: &mut ClaimBook,
    config: &SimConfig,
    cell: Cell,
    entity: Entity,
) -> Option<Role> {
    let tile = grid.get(cell)?;
    if !tile.is_claimable() {
        return None;
    }
    let station = tile.kind.station()?;
    if !book.can_afford(station, &config.pricing) {
        return None;
    }
    if !grid.claim(cell, entity) {
        return None;
    }
    let price = book.commit(station, &config.pricing);
    log::debug!(
        "{:?} claimed {} ({}) at ({}, {}) for {:.2}",
        entity,
        station.kind.name(),
        station.good,
        cell.row,
        cell.col,
        price
    );
    Role::for_station(station, cell, price, config.demand_markup)
}

/// Whether an agent is free to take a station or a construction job
pub fn is_available(role: &Role, waiting: Option<&Waiting>, constructing: Option<&Constructing>) -> bool {
    role.is_idle() && constructing.is_none() && !waiting.map(|w| w.is_busy()).unwrap_or(false)
}

/// Idle agents claim the nearest free station, in stable entity order.
/// Returns the number of claims made.
pub fn claim_system(world: &mut World, grid: &mut Grid, book: &mut ClaimBook, config: &SimConfig) -> usize {
    let mut idle: Vec<(Entity, Position)> = world
        .query::<(&Agent, &Role, &Position, Option<&Waiting>, Option<&Constructing>)>()
        .iter()
        .filter(|(_, (_, role, _, waiting, constructing))| is_available(role, *waiting, *constructing))
        .map(|(entity, (_, _, pos, _, _))| (entity, *pos))
        .collect();
    idle.sort_by_key(|(entity, _)| entity.to_bits());

    let mut claims = 0;
    for (entity, pos) in idle {
        let target = grid.nearest(pos.vec(), |tile| {
            tile.is_claimable()
                && tile
                    .kind
                    .station()
                    .map(|s| book.can_afford(s, &config.pricing))
                    .unwrap_or(false)
        });
        let Some(cell) = target else {
            continue;
        };
        if let Some(role) = claim_station(grid, book, config, cell, entity) {
            let _ = world.insert_one(entity, role);
            claims += 1;
        }
    }
    claims
}

/// Give up a station: clear the claim if it is still ours and go idle
pub fn release_station(world: &mut World, grid: &mut Grid, entity: Entity, cell: Cell) {
    grid.release(cell, entity);
    let _ = world.insert_one(entity, Role::Idle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Good;
    use crate::grid::{StationKind, TileType};

    fn grid_with(stations: &[(Cell, Station)]) -> Grid {
        let mut grid = Grid::new(4, 4, 1.0);
        for (cell, station) in stations {
            grid.set_kind(*cell, TileType::Station(*station));
        }
        grid
    }

    #[test]
    fn test_price_schedule_escalates() {
        let schedule = PriceSchedule::default();
        let mut book = ClaimBook::new();
        let dock = Station::new(StationKind::Dock, Good::Fish);

        let prices: Vec<f64> = (0..9).map(|_| book.commit(dock, &schedule)).collect();
        assert_eq!(prices, vec![5.5, 6.0, 6.5, 7.0, 8.0, 9.0, 10.0, 12.0, 14.0]);
        assert_eq!(book.pricing(dock).count, 9);

        // Other kinds keep their own counter
        let register = Station::new(StationKind::Register, Good::Fish);
        assert_eq!(book.next_price(register, &schedule), 5.5);
    }

    #[test]
    fn test_claim_station_rejects_double_claim() {
        let mut world = World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let cell = Cell::new(1, 1);
        let mut grid = grid_with(&[(cell, Station::new(StationKind::Register, Good::Fish))]);
        let mut book = ClaimBook::new();
        let config = SimConfig::default();

        let role = claim_station(&mut grid, &mut book, &config, cell, a).unwrap();
        assert_eq!(role.label(), "selling");
        assert!(claim_station(&mut grid, &mut book, &config, cell, b).is_none());
        assert_eq!(grid.get(cell).unwrap().claimed, Some(a));
        assert_eq!(book.pricing(Station::new(StationKind::Register, Good::Fish)).count, 1);
    }

    #[test]
    fn test_price_ceiling_refuses_claim() {
        let mut world = World::new();
        let a = world.spawn(());
        let cell = Cell::new(0, 0);
        let mut grid = grid_with(&[(cell, Station::new(StationKind::Dock, Good::Fish))]);
        let mut book = ClaimBook::new();
        let mut config = SimConfig::default();
        config.pricing.price_ceiling = 5.0;

        assert!(claim_station(&mut grid, &mut book, &config, cell, a).is_none());
        assert!(grid.get(cell).unwrap().claimed.is_none());
    }

    #[test]
    fn test_claim_system_picks_nearest() {
        let mut world = World::new();
        let near = Cell::new(0, 0);
        let far = Cell::new(3, 3);
        let mut grid = grid_with(&[
            (near, Station::new(StationKind::Dock, Good::Fish)),
            (far, Station::new(StationKind::Table, Good::Apple)),
        ]);
        let mut book = ClaimBook::new();
        let config = SimConfig::default();

        let agent = world.spawn((Agent, Role::Idle, Position::new(0.2, 0.2), Waiting(0.0)));
        let busy = world.spawn((Agent, Role::Idle, Position::new(3.5, 3.5), Waiting(1.0)));

        assert_eq!(claim_system(&mut world, &mut grid, &mut book, &config), 1);
        assert_eq!(grid.get(near).unwrap().claimed, Some(agent));
        assert!(grid.get(far).unwrap().claimed.is_none());
        assert!(world.get::<&Role>(busy).unwrap().is_idle());
        assert_eq!(world.get::<&Role>(agent).unwrap().station(), Some(near));
    }

    #[test]
    fn test_release_station() {
        let mut world = World::new();
        let cell = Cell::new(2, 2);
        let mut grid = grid_with(&[(cell, Station::new(StationKind::Fridge, Good::Fish))]);
        let mut book = ClaimBook::new();
        let config = SimConfig::default();
        let agent = world.spawn((Agent, Role::Idle));

        let role = claim_station(&mut grid, &mut book, &config, cell, agent).unwrap();
        world.insert_one(agent, role).unwrap();
        release_station(&mut world, &mut grid, agent, cell);

        assert!(grid.get(cell).unwrap().is_claimable());
        assert!(world.get::<&Role>(agent).unwrap().is_idle());
    }
}
