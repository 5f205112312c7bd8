//! Read-only view of the simulation for renderers and tooling

use hecs::{Entity, World};
use serde::Serialize;

use crate::components::*;
use crate::grid::{Grid, StationKind};
use crate::systems::{ConstructionQueue, ConstructionTask, Message, MessageLog};

/// One agent as seen from outside
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub id: u64,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub role: &'static str,
    pub good: Option<Good>,
    pub reservation_price: Option<f64>,
    pub inventory: Inventory,
    pub money: f64,
    pub mood: Mood,
    pub waiting: f32,
    pub constructing: bool,
    pub proxy: bool,
}

/// One station tile, built or blueprint
#[derive(Debug, Clone, Serialize)]
pub struct StationView {
    pub row: usize,
    pub col: usize,
    pub kind: StationKind,
    pub good: Good,
    pub blueprint: bool,
    pub claimed_by: Option<u64>,
    /// Reservation price of the claimant
    pub price: Option<f64>,
    pub inventory: Inventory,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub sim_time: f64,
    pub reputation: f32,
    pub total_money: f64,
    pub player_money: Option<f64>,
    pub agents: Vec<AgentView>,
    pub stations: Vec<StationView>,
    pub messages: Vec<Message>,
    pub pending_tasks: Vec<ConstructionTask>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn agent_view(world: &World, entity: Entity) -> Option<AgentView> {
    let pos = *world.get::<&Position>(entity).ok()?;
    let role = *world.get::<&Role>(entity).ok()?;
    Some(AgentView {
        id: entity.to_bits().get(),
        name: world
            .get::<&Name>(entity)
            .map(|n| n.full_name())
            .unwrap_or_default(),
        x: pos.x,
        y: pos.y,
        role: role.label(),
        good: role.good(),
        reservation_price: role.reservation_price(),
        inventory: world
            .get::<&Inventory>(entity)
            .map(|inv| (*inv).clone())
            .unwrap_or_default(),
        money: world.get::<&Money>(entity).map(|m| m.0).unwrap_or(0.0),
        mood: world.get::<&Emotion>(entity).map(|e| e.mood).unwrap_or_default(),
        waiting: world.get::<&Waiting>(entity).map(|w| w.0).unwrap_or(0.0),
        constructing: world.get::<&Constructing>(entity).is_ok(),
        proxy: world.get::<&Proxy>(entity).is_ok(),
    })
}

pub(crate) struct SnapshotSource<'a> {
    pub world: &'a World,
    pub grid: &'a Grid,
    pub construction: &'a ConstructionQueue,
    pub messages: &'a MessageLog,
    pub player: Option<Entity>,
    pub reputation: f32,
    pub sim_time: f64,
}

pub(crate) fn capture(src: SnapshotSource) -> WorldSnapshot {
    let mut agents: Vec<Entity> = src
        .world
        .query::<&Agent>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    agents.sort_by_key(|e| e.to_bits());

    let stations = src
        .grid
        .iter()
        .filter_map(|(cell, tile)| {
            let station = tile.kind.station()?;
            let price = tile
                .claimed
                .and_then(|owner| src.world.get::<&Role>(owner).ok().and_then(|r| r.reservation_price()));
            Some(StationView {
                row: cell.row,
                col: cell.col,
                kind: station.kind,
                good: station.good,
                blueprint: tile.transparent,
                claimed_by: tile.claimed.map(|e| e.to_bits().get()),
                price,
                inventory: tile.inventory.clone(),
            })
        })
        .collect();

    WorldSnapshot {
        sim_time: src.sim_time,
        reputation: src.reputation,
        total_money: crate::systems::total_money(src.world),
        player_money: src
            .player
            .and_then(|p| src.world.get::<&Money>(p).ok().map(|m| m.0)),
        agents: agents
            .into_iter()
            .filter_map(|e| agent_view(src.world, e))
            .collect(),
        stations,
        messages: src.messages.active(src.sim_time).cloned().collect(),
        pending_tasks: src.construction.pending().to_vec(),
    }
}
