//! Simulation engine - main entry point for running the simulation

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::components::*;
use crate::config::SimConfig;
use crate::generation::{generate_name, generate_town, populate_agents, spawn_agent, TownConfig};
use crate::grid::{is_fully_enclosed, Cell, Grid, StationKind, TileType};
use crate::snapshot::{capture, SnapshotSource, WorldSnapshot};
use crate::systems::*;

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing all entities
    pub world: World,
    /// The town map
    pub grid: Grid,
    /// Simulation time in seconds since start
    pub sim_time: f64,
    pub config: SimConfig,
    /// Per-kind claim counters and prices
    pub claims: ClaimBook,
    pub decay: DecayClock,
    pub construction: ConstructionQueue,
    pub scheduler: Scheduler,
    pub ledger: Ledger,
    pub economy: Economy,
    pub messages: MessageLog,

    rng: StdRng,
    last_bailout_update: f64,
    time_scale: f32,
}

impl SimulationEngine {
    /// Create a simulation over an existing map. Spawns the player account.
    pub fn new(config: SimConfig, grid: Grid) -> Self {
        let mut world = World::new();
        let player = spawn_player(&mut world, &grid, config.player_money);
        Self {
            world,
            grid,
            sim_time: 0.0,
            claims: ClaimBook::new(),
            decay: DecayClock::new(),
            construction: ConstructionQueue::new(),
            scheduler: Scheduler::new(),
            ledger: Ledger::new(Some(player)),
            economy: Economy::new(config.starting_reputation),
            messages: MessageLog::new(),
            rng: StdRng::seed_from_u64(config.seed),
            last_bailout_update: 0.0,
            time_scale: 1.0,
            config,
        }
    }

    /// Generate a fresh town with its population. Replaces the current map
    /// and every entity.
    pub fn generate(&mut self, town: TownConfig) {
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.grid = generate_town(&town, self.config.tile_size, &mut self.rng);
        self.world = World::new();
        let player = spawn_player(&mut self.world, &self.grid, self.config.player_money);
        self.ledger = Ledger::new(Some(player));
        self.claims = ClaimBook::new();
        self.decay = DecayClock::new();
        self.construction = ConstructionQueue::new();
        self.scheduler = Scheduler::new();
        self.messages = MessageLog::new();
        self.economy = Economy::new(self.config.starting_reputation);
        self.sim_time = 0.0;
        self.last_bailout_update = 0.0;

        let agents = populate_agents(
            &mut self.world,
            &self.grid,
            town.agent_count,
            self.config.starting_money,
            &mut self.rng,
        );
        log::info!("{} populated with {} agents", town.name, agents.len());
    }

    /// Update the simulation by delta_seconds
    pub fn update(&mut self, delta_seconds: f32) {
        let dt = delta_seconds * self.time_scale;
        self.sim_time += dt as f64;
        let now = self.sim_time;

        self.fire_due_events();

        expire_moods(&mut self.world, now);
        self.messages.prune(now);

        assign_construction_workers(
            &mut self.world,
            &self.grid,
            &mut self.construction,
            &self.claims,
            &self.config,
        );

        self.decay.advance(&mut self.grid, dt, self.config.rot_threshold);

        claim_system(&mut self.world, &mut self.grid, &mut self.claims, &self.config);

        let mut ctx = DecisionContext {
            grid: &mut self.grid,
            ledger: &self.ledger,
            economy: &mut self.economy,
            messages: &mut self.messages,
            scheduler: &mut self.scheduler,
            config: &self.config,
            now,
        };
        decision_system(&mut self.world, &mut ctx, dt);

        separation_system(
            &mut self.world,
            self.config.separation_radius,
            self.config.separation_strength,
        );
        movement_system(&mut self.world, dt);

        if now - self.last_bailout_update >= self.config.bailout_interval {
            bailout(&mut self.world);
            self.last_bailout_update = now;
        }
    }

    fn fire_due_events(&mut self) {
        for event in self.scheduler.pop_due(self.sim_time) {
            match event {
                TimedEvent::RegrowTree { cell } => {
                    regrow_tree(&mut self.grid, cell, self.sim_time);
                }
                TimedEvent::FinishConstruction { worker, cell } => {
                    if let Some(kind) = complete_construction(&mut self.world, &mut self.grid, worker, cell) {
                        self.on_built(kind, cell);
                    }
                }
            }
        }
    }

    /// Follow-up effects of a finished building
    fn on_built(&mut self, kind: TileType, cell: Cell) {
        let Some(station) = kind.station() else {
            return;
        };
        let center = self.grid.center(cell);
        match station.kind {
            StationKind::Table => {
                // New seating draws a new customer
                let offset = self.grid.tile_size() * 0.5;
                let name = generate_name(&mut self.rng);
                let consumer = spawn_agent(
                    &mut self.world,
                    center.x + offset,
                    center.y,
                    self.config.starting_money,
                    name,
                );
                log::info!("{:?} arrived for the new {} table", consumer, station.good);
            }
            StationKind::Register if is_fully_enclosed(&self.grid, center.x, center.y) => {
                self.economy.reputation += self.config.grand_opening_bonus;
                self.messages.post(
                    format!("Grand opening of the {} register!", station.good),
                    self.sim_time,
                    self.config.message_duration,
                );
            }
            _ => {}
        }
    }

    /// Movement intent. Returns false if the entity cannot move.
    pub fn set_velocity(&mut self, entity: Entity, dx: f32, dy: f32) -> bool {
        match self.world.get::<&mut Velocity>(entity) {
            Ok(mut vel) => {
                *vel = Velocity::new(dx, dy);
                true
            }
            Err(_) => false,
        }
    }

    /// Placement intent. Rejected placements are logged and returned.
    pub fn place_object(&mut self, x: f32, y: f32, kind: TileType) -> Result<u32, PlacementError> {
        place_object(&mut self.grid, &mut self.construction, x, y, kind).map_err(|e| {
            log::warn!("placement rejected: {}", e);
            e
        })
    }

    /// Wear down a built tile. Its claimant notices the loss on its next decision.
    pub fn damage_tile(&mut self, cell: Cell, amount: f32) -> bool {
        self.grid.damage(cell, amount, self.config.damage_threshold)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        capture(SnapshotSource {
            world: &self.world,
            grid: &self.grid,
            construction: &self.construction,
            messages: &self.messages,
            player: self.ledger.player,
            reputation: self.economy.reputation,
            sim_time: self.sim_time,
        })
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Current simulation time in seconds
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn player(&self) -> Option<Entity> {
        self.ledger.player
    }

    /// Count agents in simulation
    pub fn agent_count(&self) -> usize {
        self.world.query::<&Agent>().iter().count()
    }

    /// Count agents currently holding each role label
    pub fn role_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for (_, (_, role)) in self.world.query::<(&Agent, &Role)>().iter() {
            match counts.iter_mut().find(|(label, _)| *label == role.label()) {
                Some((_, n)) => *n += 1,
                None => counts.push((role.label(), 1)),
            }
        }
        counts.sort();
        counts
    }

    pub fn total_money(&self) -> f64 {
        total_money(&self.world)
    }

    pub fn reputation(&self) -> f32 {
        self.economy.reputation
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(SimConfig::default(), Grid::new(0, 0, SimConfig::default().tile_size))
    }
}

fn spawn_player(world: &mut World, grid: &Grid, money: f64) -> Entity {
    let start = grid.center(Cell::new(grid.rows() / 2, grid.cols() / 2));
    world.spawn((
        Player,
        Proxy,
        Name::new("Player", ""),
        Position::new(start.x, start.y),
        Velocity::ZERO,
        Money(money),
    ))
}
