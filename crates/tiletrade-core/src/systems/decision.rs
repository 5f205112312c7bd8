//! Decision system - the per-tick agent state machine.
//!
//! Every agent acts according to its `Role`:
//! - producers gather a raw good and bank it at the emptiest counter
//! - assistants move stock from counters into fridges
//! - sellers stock the registers
//! - buyers lock onto a register, purchase, and eat at home
//!
//! A positive `Waiting` countdown suspends all of it. Agents that find
//! nothing to do simply stand still for the tick.

use hecs::{Entity, World};

use super::claims::release_station;
use super::construction::work_on_site;
use super::events::{MessageLog, Scheduler, TimedEvent};
use super::ledger::{transfer, Economy, Ledger};
use super::movement::{steer_toward, stop};
use crate::components::{
    move_goods, Agent, Constructing, Demand, Emotion, Good, Inventory, Mood, Name, Origin,
    Position, Role, Supply, Vec2, Waiting,
};
use crate::config::SimConfig;
use crate::grid::{room_contains, Cell, Grid, Station, StationKind, TileType};

/// Shared state the decision system reads and writes
pub struct DecisionContext<'a> {
    pub grid: &'a mut Grid,
    pub ledger: &'a Ledger,
    pub economy: &'a mut Economy,
    pub messages: &'a mut MessageLog,
    pub scheduler: &'a mut Scheduler,
    pub config: &'a SimConfig,
    pub now: f64,
}

/// Run one decision pass over every agent
pub fn decision_system(world: &mut World, ctx: &mut DecisionContext, delta_seconds: f32) {
    // Snapshot first: roles and components change during the pass
    let mut agents: Vec<Entity> = world
        .query::<(&Agent, &Role)>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    agents.sort_by_key(|e| e.to_bits());

    for entity in agents {
        if tick_waiting(world, entity, delta_seconds) {
            continue;
        }
        if world.get::<&Constructing>(entity).is_ok() {
            work_on_site(world, ctx.grid, ctx.scheduler, ctx.config, ctx.now, entity);
            continue;
        }
        let Some(role) = world.get::<&Role>(entity).ok().map(|r| *r) else {
            continue;
        };
        if !holds_station(ctx.grid, entity, &role) {
            if let Some(cell) = role.station() {
                log::debug!("{:?} lost its station at ({}, {})", entity, cell.row, cell.col);
                release_station(world, ctx.grid, entity, cell);
            }
            stop(world, entity);
            continue;
        }

        match role {
            Role::Idle => stop(world, entity),
            Role::Producing(supply) => produce(world, ctx, entity, supply),
            Role::Assisting(supply) => assist(world, ctx, entity, supply),
            Role::Selling(supply) => sell(world, ctx, entity, supply),
            Role::Demanding(demand) => consume(world, ctx, entity, demand),
        }
    }
}

/// Count down a busy agent. Returns true if the agent is busy this tick.
fn tick_waiting(world: &mut World, entity: Entity, delta_seconds: f32) -> bool {
    let busy = match world.get::<&mut Waiting>(entity) {
        Ok(mut waiting) if waiting.is_busy() => {
            waiting.0 = (waiting.0 - delta_seconds).max(0.0);
            true
        }
        _ => false,
    };
    if busy {
        stop(world, entity);
    }
    busy
}

/// Whether the agent's claimed tile still backs its role
fn holds_station(grid: &Grid, entity: Entity, role: &Role) -> bool {
    let (Some(cell), Some(good)) = (role.station(), role.good()) else {
        return true;
    };
    grid.get(cell)
        .map(|tile| {
            !tile.transparent
                && tile.claimed == Some(entity)
                && tile
                    .kind
                    .station()
                    .map(|s| s.good == good && role.accepts_station(s.kind))
                    .unwrap_or(false)
        })
        .unwrap_or(false)
}

fn set_role(world: &mut World, entity: Entity, role: Role) {
    if let Ok(mut current) = world.get::<&mut Role>(entity) {
        *current = role;
    }
}

fn set_waiting(world: &mut World, entity: Entity, seconds: f32) {
    if let Ok(mut waiting) = world.get::<&mut Waiting>(entity) {
        waiting.0 = seconds;
    }
}

fn carried(world: &World, entity: Entity, good: Good) -> i32 {
    world
        .get::<&Inventory>(entity)
        .map(|inv| inv.get(good))
        .unwrap_or(0)
}

fn position(world: &World, entity: Entity) -> Option<Vec2> {
    world.get::<&Position>(entity).ok().map(|p| p.vec())
}

fn go(world: &mut World, ctx: &DecisionContext, entity: Entity, target: Vec2) -> bool {
    steer_toward(
        world,
        entity,
        target,
        ctx.config.agent_speed,
        ctx.config.interact_range,
    )
}

/// Station of the kind holding the fewest units of `good`
fn least_stocked(grid: &Grid, station: Station, good: Good) -> Option<Cell> {
    grid.stations(station)
        .into_iter()
        .min_by_key(|cell| grid.get(*cell).map(|t| t.inventory.get(good)).unwrap_or(0))
}

/// Station of the kind holding the most units of `good`, if any has stock
fn most_stocked(grid: &Grid, station: Station, good: Good) -> Option<Cell> {
    let mut best: Option<(Cell, i32)> = None;
    for cell in grid.stations(station) {
        let units = grid.get(cell).map(|t| t.inventory.get(good)).unwrap_or(0);
        if units > 0 && best.map(|(_, b)| units > b).unwrap_or(true) {
            best = Some((cell, units));
        }
    }
    best.map(|(cell, _)| cell)
}

/// Move goods from the agent onto a tile. Returns units moved.
fn deposit(world: &mut World, grid: &mut Grid, entity: Entity, cell: Cell, good: Good) -> i32 {
    let (Ok(mut inv), Some(tile)) = (world.get::<&mut Inventory>(entity), grid.get_mut(cell)) else {
        return 0;
    };
    let quantity = inv.get(good);
    move_goods(&mut inv, &mut tile.inventory, good, quantity)
}

/// Move up to `quantity` goods from a tile onto the agent. Returns units moved.
fn pick_up(world: &mut World, grid: &mut Grid, entity: Entity, cell: Cell, good: Good, quantity: i32) -> i32 {
    let (Ok(mut inv), Some(tile)) = (world.get::<&mut Inventory>(entity), grid.get_mut(cell)) else {
        return 0;
    };
    move_goods(&mut tile.inventory, &mut inv, good, quantity)
}

/// The entity running the point of sale for a good
fn sale_station_owner(grid: &Grid, good: Good) -> Option<Entity> {
    grid.stations(Station::new(StationKind::Register, good))
        .into_iter()
        .find_map(|cell| grid.get(cell).and_then(|t| t.claimed))
}

/// Pay a worker for delivered units out of the seller's pocket
fn collect_wages(world: &mut World, ctx: &DecisionContext, worker: Entity, supply: &Supply, units: i32) {
    if units <= 0 {
        return;
    }
    if let Some(seller) = sale_station_owner(ctx.grid, supply.good) {
        transfer(world, ctx.ledger, seller, worker, supply.reservation_price * units as f64);
    }
}

fn find_resource(grid: &Grid, good: Good, from: Vec2) -> Option<Cell> {
    match good.fresh() {
        Good::Apple => grid.nearest(from, |t| t.has_tree && !t.kind.is_built()),
        _ => grid.nearest(from, |t| t.kind == TileType::Water),
    }
}

fn produce(world: &mut World, ctx: &mut DecisionContext, entity: Entity, mut supply: Supply) {
    let good = supply.good;
    let Some(pos) = position(world, entity) else {
        return;
    };

    if carried(world, entity, good) <= 0 {
        let Some(resource) = find_resource(ctx.grid, good, pos) else {
            stop(world, entity);
            return;
        };
        if !go(world, ctx, entity, ctx.grid.center(resource)) {
            return;
        }
        if good == Good::Apple {
            if let Some(tile) = ctx.grid.get_mut(resource) {
                let regrow_at = ctx.now + ctx.config.tree_regen_time;
                tile.has_tree = false;
                tile.regen_time = Some(regrow_at);
                ctx.scheduler
                    .schedule(regrow_at, TimedEvent::RegrowTree { cell: resource });
            }
        }
        if let Ok(mut inv) = world.get::<&mut Inventory>(entity) {
            inv.add(good, 1);
        }
        set_waiting(world, entity, ctx.config.harvest_time);
        return;
    }

    let Some(counter) = least_stocked(ctx.grid, Station::new(StationKind::Counter, good), good) else {
        stop(world, entity);
        return;
    };
    if !go(world, ctx, entity, ctx.grid.center(counter)) {
        return;
    }
    let units = deposit(world, ctx.grid, entity, counter, good);
    supply.quantity += units;
    collect_wages(world, ctx, entity, &supply, units);
    set_role(world, entity, Role::Producing(supply));
}

fn assist(world: &mut World, ctx: &mut DecisionContext, entity: Entity, mut supply: Supply) {
    let good = supply.good;

    if carried(world, entity, good) <= 0 {
        let Some(counter) = most_stocked(ctx.grid, Station::new(StationKind::Counter, good), good) else {
            stop(world, entity);
            return;
        };
        if go(world, ctx, entity, ctx.grid.center(counter)) {
            pick_up(world, ctx.grid, entity, counter, good, ctx.config.carry_capacity);
        }
        return;
    }

    let Some(fridge) = least_stocked(ctx.grid, Station::new(StationKind::Fridge, good), good) else {
        stop(world, entity);
        return;
    };
    if !go(world, ctx, entity, ctx.grid.center(fridge)) {
        return;
    }
    let units = deposit(world, ctx.grid, entity, fridge, good);
    supply.quantity += units;
    collect_wages(world, ctx, entity, &supply, units);
    set_role(world, entity, Role::Assisting(supply));
}

fn sell(world: &mut World, ctx: &mut DecisionContext, entity: Entity, mut supply: Supply) {
    let good = supply.good;
    let registers = ctx.grid.stations(Station::new(StationKind::Register, good));
    supply.open_for_business = registers.iter().any(|cell| {
        ctx.grid
            .get(*cell)
            .map(|t| t.inventory.family_count(good) > 0)
            .unwrap_or(false)
    });

    if carried(world, entity, good) <= 0 {
        // Prefer cold storage whenever the town has any
        let fridge = Station::new(StationKind::Fridge, good);
        let source = if ctx.grid.stations(fridge).is_empty() {
            most_stocked(ctx.grid, Station::new(StationKind::Counter, good), good)
        } else {
            most_stocked(ctx.grid, fridge, good)
        };
        match source {
            Some(cell) => {
                if go(world, ctx, entity, ctx.grid.center(cell)) {
                    pick_up(world, ctx.grid, entity, cell, good, ctx.config.carry_capacity);
                }
            }
            None => stop(world, entity),
        }
        set_role(world, entity, Role::Selling(supply));
        return;
    }

    match least_stocked(ctx.grid, Station::new(StationKind::Register, good), good) {
        Some(register) => {
            if go(world, ctx, entity, ctx.grid.center(register)) {
                let units = deposit(world, ctx.grid, entity, register, good);
                supply.quantity += units;
                supply.open_for_business |= units > 0;
            }
        }
        None => stop(world, entity),
    }
    set_role(world, entity, Role::Selling(supply));
}

/// Pick the register a buyer sticks with: the first with any stock,
/// otherwise the emptiest one
fn choose_register(grid: &Grid, good: Good) -> Option<Cell> {
    let registers = grid.stations(Station::new(StationKind::Register, good));
    registers
        .iter()
        .copied()
        .find(|cell| {
            grid.get(*cell)
                .map(|t| t.inventory.family_count(good) > 0)
                .unwrap_or(false)
        })
        .or_else(|| {
            registers
                .iter()
                .copied()
                .min_by_key(|cell| grid.get(*cell).map(|t| t.inventory.total()).unwrap_or(0))
        })
}

fn fresh_anywhere(grid: &Grid, good: Good) -> bool {
    grid.stations(Station::new(StationKind::Register, good))
        .iter()
        .any(|cell| grid.get(*cell).map(|t| t.inventory.get(good) > 0).unwrap_or(false))
}

fn consume(world: &mut World, ctx: &mut DecisionContext, entity: Entity, mut demand: Demand) {
    let good = demand.good;
    let wasted = good.wasted().unwrap_or(good);

    if demand.consuming {
        // Finished eating: free the unit, fresh first
        if let Ok(mut inv) = world.get::<&mut Inventory>(entity) {
            let eaten = if inv.get(good) > 0 { good } else { wasted };
            if inv.get(eaten) > 0 {
                inv.remove(eaten, 1);
            }
        }
        demand.consuming = false;
        demand.quantity += 1;
        set_role(world, entity, Role::Demanding(demand));
        return;
    }

    let holding = world
        .get::<&Inventory>(entity)
        .map(|inv| inv.family_count(good))
        .unwrap_or(0);
    if holding > 0 {
        let Some(home) = world.get::<&Origin>(entity).ok().map(|o| o.vec()) else {
            return;
        };
        if go(world, ctx, entity, home) {
            demand.consuming = true;
            set_waiting(world, entity, ctx.config.consume_time);
            set_role(world, entity, Role::Demanding(demand));
        }
        return;
    }

    // Keep the locked register until it stops being one
    let register_station = Station::new(StationKind::Register, good);
    let locked = demand.register.filter(|cell| {
        ctx.grid
            .get(*cell)
            .map(|t| t.is_station(register_station))
            .unwrap_or(false)
    });
    let register = match locked {
        Some(cell) => cell,
        None => match choose_register(ctx.grid, good) {
            Some(cell) => cell,
            None => {
                demand.register = None;
                set_role(world, entity, Role::Demanding(demand));
                stop(world, entity);
                return;
            }
        },
    };
    demand.register = Some(register);

    if go(world, ctx, entity, ctx.grid.center(register))
        && demand.can_buy(ctx.now, ctx.config.purchase_interval)
    {
        buy(world, ctx, entity, &mut demand, register);
    }
    set_role(world, entity, Role::Demanding(demand));
}

fn buy(world: &mut World, ctx: &mut DecisionContext, entity: Entity, demand: &mut Demand, register: Cell) {
    let good = demand.good;
    let Some(tile) = ctx.grid.get(register) else {
        return;
    };
    let item = if tile.inventory.get(good) > 0 {
        good
    } else {
        match good.wasted() {
            Some(wasted) if tile.inventory.get(wasted) > 0 && !fresh_anywhere(ctx.grid, good) => wasted,
            _ => return,
        }
    };
    let Some(seller) = tile.claimed else {
        return;
    };
    let price = match world.get::<&Role>(seller).ok().map(|r| *r) {
        Some(Role::Selling(supply)) if supply.good == good => supply.reservation_price,
        _ => return,
    };
    if price > demand.reservation_price {
        return;
    }

    if pick_up(world, ctx.grid, entity, register, item, 1) == 0 {
        return;
    }
    transfer(world, ctx.ledger, entity, seller, price);
    demand.last_purchase_at = Some(ctx.now);

    let mood_duration = ctx.config.mood_duration;
    if item.is_wasted() {
        ctx.economy.reputation -= ctx.config.wasted_reputation_penalty;
        if let Ok(mut emotion) = world.get::<&mut Emotion>(entity) {
            emotion.feel(Mood::Angry, ctx.now, mood_duration);
        }
        let who = world
            .get::<&Name>(entity)
            .map(|n| n.given.clone())
            .unwrap_or_else(|_| "A customer".to_string());
        ctx.messages.post(
            format!("{}: this {} is rotten!", who, good),
            ctx.now,
            ctx.config.message_duration,
        );
    } else {
        let mut gain = ctx.config.fresh_reputation;
        let seated = room_contains(ctx.grid, register.col, register.row, |t| {
            !t.transparent && t.kind.station_kind() == Some(StationKind::Table)
        });
        if seated {
            gain += ctx.config.seating_bonus;
        }
        ctx.economy.reputation += gain;
        if let Ok(mut emotion) = world.get::<&mut Emotion>(entity) {
            emotion.feel(Mood::Happy, ctx.now, mood_duration);
        }
    }
}
