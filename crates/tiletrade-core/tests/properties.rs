//! Property checks over randomized inputs.
//!
//! All randomness is seeded so failures reproduce.

use std::collections::{HashMap, HashSet};

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tiletrade_core::config::PriceSchedule;
use tiletrade_core::generation::spawn_agent;
use tiletrade_core::grid::{gather_enclosed_cells, is_fully_enclosed};
use tiletrade_core::prelude::*;
use tiletrade_core::systems::{
    bailout, claim_station, claim_system, total_money, transfer, ClaimBook, DecayClock, Ledger,
};

fn random_grid(rng: &mut StdRng, rows: usize, cols: usize, density: f64) -> Grid {
    let mut grid = Grid::new(rows, cols, 1.0);
    for row in 0..rows {
        for col in 0..cols {
            if rng.gen_bool(density) {
                let kind = if rng.gen_bool(0.8) { TileType::Wall } else { TileType::Door };
                grid.set_kind(Cell::new(row, col), kind);
            }
        }
    }
    grid
}

// ── Enclosure ──────────────────────────────────────────────────────────

#[test]
fn enclosure_check_agrees_with_cell_gathering() {
    let mut rng = StdRng::seed_from_u64(0xE1C1_05ED);
    for _ in 0..200 {
        let rows = rng.gen_range(1..12);
        let cols = rng.gen_range(1..12);
        let density = rng.gen_range(0.1..0.6);
        let grid = random_grid(&mut rng, rows, cols, density);

        for cell in grid.cells() {
            let center = grid.center(cell);
            let enclosed = is_fully_enclosed(&grid, center.x, center.y);
            let region = gather_enclosed_cells(&grid, cell.col, cell.row);
            assert_eq!(enclosed, region.is_some(), "disagreement at {:?}", cell);

            if let Some(region) = region {
                assert!(region.contains(&cell));
                // Every member of an enclosed region is itself enclosed, in the same region
                let members: HashSet<Cell> = region.iter().copied().collect();
                for member in &region {
                    assert!(!grid.get(*member).unwrap().kind.is_barrier());
                    let theirs = gather_enclosed_cells(&grid, member.col, member.row).unwrap();
                    assert_eq!(theirs.len(), members.len());
                }
            }
        }
    }
}

#[test]
fn nothing_on_the_border_is_enclosed() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..50 {
        let grid = random_grid(&mut rng, 8, 8, 0.4);
        for cell in grid.cells() {
            let edge = cell.row == 0 || cell.col == 0 || cell.row == 7 || cell.col == 7;
            if edge {
                let center = grid.center(cell);
                assert!(!is_fully_enclosed(&grid, center.x, center.y));
            }
        }
    }
}

// ── Claims ─────────────────────────────────────────────────────────────

#[test]
fn claims_stay_exclusive_under_contention() {
    let mut rng = StdRng::seed_from_u64(99);
    let config = SimConfig::default();

    for _ in 0..20 {
        let mut world = World::new();
        let mut grid = Grid::new(10, 10, 1.0);
        let mut book = ClaimBook::new();
        let kinds = [
            StationKind::Dock,
            StationKind::Fridge,
            StationKind::Register,
            StationKind::Table,
        ];
        let mut stations = 0;
        for cell in grid.cells().collect::<Vec<_>>() {
            if rng.gen_bool(0.1) {
                let kind = kinds[rng.gen_range(0..kinds.len())];
                grid.set_kind(cell, TileType::Station(Station::new(kind, Good::Fish)));
                stations += 1;
            }
        }
        let agents = rng.gen_range(1..30);
        for _ in 0..agents {
            let x = rng.gen_range(0.0..10.0);
            let y = rng.gen_range(0.0..10.0);
            spawn_agent(&mut world, x, y, 100.0, Name::new("A", "B"));
        }

        let mut claimed = 0;
        for _ in 0..3 {
            claimed += claim_system(&mut world, &mut grid, &mut book, &config);
        }

        assert_eq!(claimed, agents.min(stations));
        let mut owners = HashSet::new();
        for (cell, tile) in grid.iter() {
            if let Some(owner) = tile.claimed {
                assert!(owners.insert(owner), "{:?} holds two stations", owner);
                let role = *world.get::<&Role>(owner).unwrap();
                assert_eq!(role.station(), Some(cell));
            }
        }
    }
}

#[test]
fn claim_prices_follow_the_step_schedule() {
    let config = SimConfig::default();
    let mut world = World::new();
    let mut grid = Grid::new(1, 40, 1.0);
    let mut book = ClaimBook::new();
    let dock = Station::new(StationKind::Dock, Good::Fish);
    for col in 0..40 {
        grid.set_kind(Cell::new(0, col), TileType::Station(dock));
    }

    let mut prices = Vec::new();
    for col in 0..40 {
        let agent = world.spawn(());
        match claim_station(&mut grid, &mut book, &config, Cell::new(0, col), agent) {
            Some(role) => prices.push(role.reservation_price().unwrap()),
            None => break,
        }
    }

    let schedule = PriceSchedule::default();
    let mut expected = schedule.initial_price;
    for (i, price) in prices.iter().enumerate() {
        expected += schedule.step(i as u32 + 1);
        assert_eq!(*price, expected);
    }
    assert!(prices.windows(2).all(|w| w[1] > w[0]));
    assert!(prices.iter().all(|p| *p <= schedule.price_ceiling));

    // The first refused claim would have crossed the ceiling
    assert!(prices.len() < 40);
    assert!(book.next_price(dock, &schedule) > schedule.price_ceiling);
    assert_eq!(grid.find(|t| t.claimed.is_some()).len(), prices.len());
}

// ── Ledger ─────────────────────────────────────────────────────────────

fn ledger_world(rng: &mut StdRng) -> (World, Ledger, Vec<Entity>) {
    let mut world = World::new();
    let player = world.spawn((Player, Proxy, Money(500.0)));
    let mut accounts = vec![player];
    for _ in 0..10 {
        let e = world.spawn((Agent, Money(rng.gen_range(0.0..200.0))));
        if rng.gen_bool(0.3) {
            world.insert_one(e, Proxy).unwrap();
        }
        accounts.push(e);
    }
    (world, Ledger::new(Some(player)), accounts)
}

#[test]
fn random_transfers_conserve_money() {
    let mut rng = StdRng::seed_from_u64(4242);
    let (mut world, ledger, accounts) = ledger_world(&mut rng);
    let start = total_money(&world);

    for _ in 0..2000 {
        let from = accounts[rng.gen_range(0..accounts.len())];
        let to = accounts[rng.gen_range(0..accounts.len())];
        let amount = rng.gen_range(0.0..50.0);
        transfer(&mut world, &ledger, from, to, amount);
    }
    assert!((total_money(&world) - start).abs() < 1e-6);

    bailout(&mut world);
    assert!((total_money(&world) - start).abs() < 1e-6);
    assert!(world.query::<&Money>().iter().all(|(_, m)| m.0 >= 0.0));
}

#[test]
fn proxy_transfers_settle_against_the_player() {
    let mut rng = StdRng::seed_from_u64(5);
    let (mut world, ledger, _) = ledger_world(&mut rng);
    let player = ledger.player.unwrap();
    let proxy = world.spawn((Agent, Proxy, Money(100.0)));
    let other_proxy = world.spawn((Agent, Proxy, Money(100.0)));
    let plain = world.spawn((Agent, Money(100.0)));
    let balance = |w: &World, e: Entity| w.get::<&Money>(e).unwrap().0;
    let player_start = balance(&world, player);

    // Paying a proxy: the player pays instead of the buyer
    assert!(transfer(&mut world, &ledger, plain, proxy, 10.0));
    assert_eq!(balance(&world, proxy), 110.0);
    assert_eq!(balance(&world, player), player_start - 10.0);
    assert_eq!(balance(&world, plain), 100.0);

    // A proxy paying out: the player is credited instead of the payee
    assert!(transfer(&mut world, &ledger, proxy, plain, 4.0));
    assert_eq!(balance(&world, proxy), 106.0);
    assert_eq!(balance(&world, player), player_start - 6.0);
    assert_eq!(balance(&world, plain), 100.0);

    // Proxy to proxy moves nothing
    assert!(!transfer(&mut world, &ledger, proxy, other_proxy, 25.0));
    assert_eq!(balance(&world, proxy), 106.0);
    assert_eq!(balance(&world, other_proxy), 100.0);
}

#[test]
fn proxy_books_balance_in_aggregate() {
    let mut rng = StdRng::seed_from_u64(77);
    let (mut world, ledger, accounts) = ledger_world(&mut rng);
    let books = |w: &World| -> f64 {
        w.query::<(&Money, &Proxy)>().iter().map(|(_, (m, _))| m.0).sum()
    };
    let outside = |w: &World| -> f64 {
        w.query::<(&Money, Option<&Proxy>)>()
            .iter()
            .filter(|(_, (_, proxy))| proxy.is_none())
            .map(|(_, (m, _))| m.0)
            .sum()
    };
    let books_start = books(&world);
    let outside_start = outside(&world);

    for _ in 0..2000 {
        let from = accounts[rng.gen_range(0..accounts.len())];
        let to = accounts[rng.gen_range(0..accounts.len())];
        transfer(&mut world, &ledger, from, to, rng.gen_range(0.0..50.0));
    }

    // Only plain-to-plain trades touch outside balances, and they net out
    assert!((books(&world) - books_start).abs() < 1e-6);
    assert!((outside(&world) - outside_start).abs() < 1e-6);
}

// ── Decay ──────────────────────────────────────────────────────────────

#[test]
fn decay_preserves_units_and_spares_fridges() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut grid = Grid::new(4, 4, 1.0);
    let mut fridges = HashMap::new();
    let mut totals = HashMap::new();
    for cell in grid.cells().collect::<Vec<_>>() {
        let good = if rng.gen_bool(0.5) { Good::Fish } else { Good::Apple };
        let kind = if rng.gen_bool(0.3) { StationKind::Fridge } else { StationKind::Counter };
        let quantity = rng.gen_range(0..6);
        grid.set_kind(cell, TileType::Station(Station::new(kind, good)));
        grid.get_mut(cell).unwrap().inventory.add(good, quantity);
        if kind == StationKind::Fridge {
            fridges.insert(cell, (good, quantity));
        }
        totals.insert(cell, (good, quantity));
    }

    let mut clock = DecayClock::new();
    let mut elapsed = 0.0f32;
    for _ in 0..500 {
        let dt = rng.gen_range(0.05..0.5);
        elapsed += dt;
        clock.advance(&mut grid, dt, 60.0);
    }

    for (cell, (good, quantity)) in totals {
        let inv = &grid.get(cell).unwrap().inventory;
        assert_eq!(inv.family_count(good), quantity, "units lost at {:?}", cell);
        if fridges.contains_key(&cell) {
            assert_eq!(inv.get(good), quantity);
        } else if quantity > 0 && elapsed * good.decay_rate() >= 60.0 {
            assert!(inv.get(good.wasted().unwrap()) > 0, "{} never rotted at {:?}", good, cell);
        }
    }
}

// ── Buyers ─────────────────────────────────────────────────────────────

#[test]
fn buyer_stays_locked_to_its_register() {
    let config = SimConfig::default();
    let mut grid = Grid::new(8, 8, config.tile_size);
    let first = Cell::new(1, 1);
    let second = Cell::new(1, 6);
    let register = TileType::Station(Station::new(StationKind::Register, Good::Fish));
    grid.set_kind(first, register);
    grid.set_kind(second, register);
    grid.set_kind(Cell::new(6, 3), TileType::Station(Station::new(StationKind::Table, Good::Fish)));
    grid.get_mut(first).unwrap().inventory.add(Good::Fish, 1);
    let mut engine = SimulationEngine::new(config, grid);

    let spawn = |engine: &mut SimulationEngine, row, col| {
        let at = engine.grid.center(Cell::new(row, col));
        spawn_agent(&mut engine.world, at.x, at.y, 100.0, Name::new("B", "C"))
    };
    spawn(&mut engine, 2, 1);
    spawn(&mut engine, 2, 6);
    let buyer = spawn(&mut engine, 5, 3);

    engine.update(0.1);
    let locked = engine.world.get::<&Role>(buyer).unwrap().demand().unwrap().register;
    assert_eq!(locked, Some(first));

    // A better stocked register appears; the buyer does not switch
    engine.grid.get_mut(second).unwrap().inventory.add(Good::Fish, 5);
    for _ in 0..400 {
        engine.update(0.1);
        let demand = *engine.world.get::<&Role>(buyer).unwrap().demand().unwrap();
        assert_eq!(demand.register, Some(first));
    }
    assert_eq!(engine.grid.get(second).unwrap().inventory.get(Good::Fish), 5);
}
