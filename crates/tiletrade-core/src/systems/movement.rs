//! Movement system - steering, separation and position integration

use hecs::{Entity, World};

use crate::components::{Agent, Player, Position, Vec2, Velocity};

/// Point an entity's velocity at a target. Returns true once the entity is
/// within `range` of the target, in which case it stops.
pub fn steer_toward(world: &mut World, entity: Entity, target: Vec2, speed: f32, range: f32) -> bool {
    let Ok(pos) = world.get::<&Position>(entity).map(|p| p.vec()) else {
        return false;
    };
    let arrived = pos.distance(&target) <= range;
    let heading = if arrived {
        Velocity::ZERO
    } else {
        let dir = (target - pos).normalize();
        Velocity::new(dir.x * speed, dir.y * speed)
    };
    if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
        *vel = heading;
    }
    arrived
}

pub fn stop(world: &mut World, entity: Entity) {
    if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
        *vel = Velocity::ZERO;
    }
}

/// Integrate velocities into positions
pub fn movement_system(world: &mut World, delta_seconds: f32) {
    for (_, (pos, vel)) in world.query_mut::<(&mut Position, &Velocity)>() {
        pos.x += vel.dx * delta_seconds;
        pos.y += vel.dy * delta_seconds;
    }
}

/// Push moving agents apart from any agent closer than `radius`. The
/// player's avatar counts as an agent here.
/// The nudge grows with the overlap; exactly coincident agents are split
/// along the x axis by entity order.
pub fn separation_system(world: &mut World, radius: f32, strength: f32) {
    let mut agents: Vec<(Entity, Vec2, bool)> = world
        .query::<(&Position, Option<&Velocity>, Option<&Agent>, Option<&Player>)>()
        .iter()
        .filter(|(_, (_, _, agent, player))| agent.is_some() || player.is_some())
        .map(|(entity, (pos, vel, _, _))| {
            (entity, pos.vec(), vel.map(|v| v.is_moving()).unwrap_or(false))
        })
        .collect();
    agents.sort_by_key(|(entity, _, _)| entity.to_bits());

    // Collect updates (can't mutate while iterating)
    let mut nudges: Vec<(Entity, Vec2)> = Vec::new();
    for (i, (entity, pos, moving)) in agents.iter().enumerate() {
        if !moving {
            continue;
        }
        let mut push = Vec2::ZERO;
        for (j, (_, other, _)) in agents.iter().enumerate() {
            if i == j {
                continue;
            }
            let diff = *pos - *other;
            let dist = diff.length();
            if dist >= radius {
                continue;
            }
            let away = if dist > f32::EPSILON {
                diff.normalize()
            } else if i < j {
                Vec2::new(-1.0, 0.0)
            } else {
                Vec2::new(1.0, 0.0)
            };
            push = push + away * ((radius - dist) * strength);
        }
        if push != Vec2::ZERO {
            nudges.push((*entity, push));
        }
    }

    for (entity, push) in nudges {
        if let Ok(mut pos) = world.get::<&mut Position>(entity) {
            pos.x += push.x;
            pos.y += push.y;
        }
    }
}
