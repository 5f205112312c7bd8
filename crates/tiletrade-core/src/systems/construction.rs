//! Construction system - blueprint placement and worker assignment

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::claims::{is_available, ClaimBook};
use super::events::{Scheduler, TimedEvent};
use super::movement::{steer_toward, stop};
use crate::components::{Agent, Constructing, Position, Proxy, Role, Vec2, Waiting};
use crate::config::SimConfig;
use crate::grid::{Cell, Grid, TileType};

/// Rejected placement intents
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("({x}, {y}) is outside the map")]
    OutOfBounds { x: f32, y: f32 },
    #[error("tile ({row}, {col}) is claimed or already being built")]
    Occupied { row: usize, col: usize },
}

/// A blueprint waiting for a worker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstructionTask {
    pub id: u32,
    pub kind: TileType,
    pub row: usize,
    pub col: usize,
}

impl ConstructionTask {
    pub fn cell(&self) -> Cell {
        Cell::new(self.row, self.col)
    }
}

/// Pending construction tasks (singleton-like, stored in engine)
#[derive(Debug, Clone, Default)]
pub struct ConstructionQueue {
    pending: Vec<ConstructionTask>,
    next_id: u32,
}

impl ConstructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: TileType, cell: Cell) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(ConstructionTask {
            id,
            kind,
            row: cell.row,
            col: cell.col,
        });
        id
    }

    pub fn pending(&self) -> &[ConstructionTask] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn is_blueprint_of(grid: &Grid, cell: Cell, kind: TileType) -> bool {
    grid.get(cell)
        .map(|tile| tile.transparent && tile.kind == kind)
        .unwrap_or(false)
}

/// Turn the tile under a world point into a blueprint and queue its construction
pub fn place_object(
    grid: &mut Grid,
    queue: &mut ConstructionQueue,
    x: f32,
    y: f32,
    kind: TileType,
) -> Result<u32, PlacementError> {
    let cell = grid
        .cell_at(x, y)
        .ok_or(PlacementError::OutOfBounds { x, y })?;
    let tile = grid
        .get_mut(cell)
        .ok_or(PlacementError::OutOfBounds { x, y })?;
    if tile.claimed.is_some() || tile.transparent {
        return Err(PlacementError::Occupied {
            row: cell.row,
            col: cell.col,
        });
    }

    tile.kind = kind;
    tile.transparent = true;
    tile.damage = 0.0;
    tile.has_tree = false;
    tile.regen_time = None;
    Ok(queue.push(kind, cell))
}

/// Match pending tasks to the nearest available worker. Tasks without a
/// taker stay queued; tasks whose blueprint disappeared are dropped.
/// Returns the number of tasks handed out.
pub fn assign_construction_workers(
    world: &mut World,
    grid: &Grid,
    queue: &mut ConstructionQueue,
    book: &ClaimBook,
    config: &SimConfig,
) -> usize {
    let mut workers: Vec<(Entity, Vec2)> = world
        .query::<(&Agent, &Role, &Position, Option<&Waiting>, Option<&Constructing>)>()
        .iter()
        .filter(|(_, (_, role, _, waiting, constructing))| is_available(role, *waiting, *constructing))
        .map(|(entity, (_, _, pos, _, _))| (entity, pos.vec()))
        .collect();
    workers.sort_by_key(|(entity, _)| entity.to_bits());

    let mut assigned = 0;
    let mut remaining = Vec::new();
    for task in std::mem::take(&mut queue.pending) {
        let cell = task.cell();
        if !is_blueprint_of(grid, cell, task.kind) {
            log::debug!("dropping stale construction task {}", task.id);
            continue;
        }
        // Don't build stations nobody could afford to claim
        let affordable = task
            .kind
            .station()
            .filter(|s| s.kind.is_claimable())
            .map(|s| book.can_afford(s, &config.pricing))
            .unwrap_or(true);
        if !affordable {
            remaining.push(task);
            continue;
        }

        let site = grid.center(cell);
        let nearest = workers
            .iter()
            .enumerate()
            .min_by(|(_, (_, a)), (_, (_, b))| {
                a.distance_squared(&site)
                    .partial_cmp(&b.distance_squared(&site))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(idx, _)| idx);

        match nearest {
            Some(idx) => {
                let (worker, _) = workers.remove(idx);
                let _ = world.insert(worker, (Constructing::new(task.id, task.kind, cell), Proxy));
                log::info!(
                    "{:?} commandeered for task {} at ({}, {})",
                    worker,
                    task.id,
                    cell.row,
                    cell.col
                );
                assigned += 1;
            }
            None => remaining.push(task),
        }
    }
    queue.pending = remaining;
    assigned
}

/// Drive a constructing worker: walk to the site, then start building
pub fn work_on_site(
    world: &mut World,
    grid: &Grid,
    scheduler: &mut Scheduler,
    config: &SimConfig,
    now: f64,
    entity: Entity,
) {
    let Some(job) = world.get::<&Constructing>(entity).ok().map(|c| *c) else {
        return;
    };
    if job.started {
        stop(world, entity);
        return;
    }
    if !is_blueprint_of(grid, job.cell, job.kind) {
        let _ = world.remove_one::<Constructing>(entity);
        stop(world, entity);
        return;
    }
    if steer_toward(world, entity, grid.center(job.cell), config.agent_speed, config.interact_range) {
        if let Ok(mut c) = world.get::<&mut Constructing>(entity) {
            c.started = true;
        }
        if let Ok(mut waiting) = world.get::<&mut Waiting>(entity) {
            waiting.0 = config.build_time as f32;
        }
        scheduler.schedule(
            now + config.build_time,
            TimedEvent::FinishConstruction {
                worker: entity,
                cell: job.cell,
            },
        );
    }
}

/// Finish a blueprint. Frees the worker either way; returns the built tile
/// type, or `None` if the event was stale.
pub fn complete_construction(world: &mut World, grid: &mut Grid, worker: Entity, cell: Cell) -> Option<TileType> {
    let job = world
        .get::<&Constructing>(worker)
        .ok()
        .map(|c| *c)
        .filter(|c| c.cell == cell)?;
    let _ = world.remove_one::<Constructing>(worker);

    let tile = grid.get_mut(cell)?;
    if !tile.transparent || tile.kind != job.kind {
        return None;
    }
    tile.transparent = false;
    Some(job.kind)
}
