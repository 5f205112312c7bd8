//! Agent factory - spawns townspeople with the full component set

use hecs::{Entity, World};
use rand::Rng;

use super::names::generate_name;
use crate::components::*;
use crate::grid::{Grid, TileType};

/// Spawn one idle agent at a world position.
///
/// Every agent starts with an empty inventory, a neutral mood, no pending
/// wait and its spawn point recorded as home.
pub fn spawn_agent(world: &mut World, x: f32, y: f32, money: f64, name: Name) -> Entity {
    world.spawn((
        Agent,
        name,
        Position::new(x, y),
        Velocity::ZERO,
        Inventory::new(),
        Money(money),
        Emotion::default(),
        Waiting(0.0),
        Origin { x, y },
        Role::Idle,
    ))
}

/// Spawn `count` agents on random open ground
pub fn populate_agents(
    world: &mut World,
    grid: &Grid,
    count: u32,
    money: f64,
    rng: &mut impl Rng,
) -> Vec<Entity> {
    let open = grid.find(|tile| {
        matches!(tile.kind, TileType::Grass | TileType::Sand) && !tile.has_tree
    });
    if open.is_empty() {
        log::warn!("no open ground to spawn agents on");
        return Vec::new();
    }

    let jitter = grid.tile_size() * 0.25;
    let mut agents = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let cell = open[rng.gen_range(0..open.len())];
        let center = grid.center(cell);
        let x = center.x + rng.gen_range(-jitter..=jitter);
        let y = center.y + rng.gen_range(-jitter..=jitter);
        let entity = spawn_agent(world, x, y, money, generate_name(rng));
        agents.push(entity);
    }
    agents
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_spawn_agent_has_every_component() {
        let mut world = World::new();
        let e = spawn_agent(&mut world, 3.0, 4.0, 100.0, Name::new("Ada", "Fisher"));

        assert!(world.get::<&Agent>(e).is_ok());
        assert!(world.get::<&Role>(e).unwrap().is_idle());
        assert!(world.get::<&Inventory>(e).unwrap().is_empty());
        assert_eq!(world.get::<&Money>(e).unwrap().0, 100.0);
        assert_eq!(world.get::<&Emotion>(e).unwrap().mood, Mood::Neutral);
        assert!(!world.get::<&Waiting>(e).unwrap().is_busy());
        assert_eq!(world.get::<&Origin>(e).unwrap().vec(), Vec2::new(3.0, 4.0));
        assert_eq!(*world.get::<&Velocity>(e).unwrap(), Velocity::ZERO);
        assert!(world.get::<&Constructing>(e).is_err());
    }

    #[test]
    fn test_populate_avoids_water_and_walls() {
        let mut world = World::new();
        let mut grid = Grid::new(4, 4, 10.0);
        for cell in grid.cells().collect::<Vec<_>>() {
            if cell.col < 3 {
                grid.set_kind(cell, TileType::Water);
            }
        }
        let mut rng = StdRng::seed_from_u64(3);

        let agents = populate_agents(&mut world, &grid, 20, 50.0, &mut rng);

        assert_eq!(agents.len(), 20);
        for e in agents {
            let pos = world.get::<&Position>(e).unwrap().vec();
            let cell = grid.cell_at(pos.x, pos.y).unwrap();
            assert_eq!(cell.col, 3);
        }
    }

    #[test]
    fn test_populate_without_ground_spawns_nothing() {
        let mut world = World::new();
        let mut grid = Grid::new(1, 1, 10.0);
        grid.set_kind(crate::grid::Cell::new(0, 0), TileType::Wall);
        let mut rng = StdRng::seed_from_u64(3);

        assert!(populate_agents(&mut world, &grid, 5, 50.0, &mut rng).is_empty());
        assert_eq!(world.len(), 0);
    }
}
