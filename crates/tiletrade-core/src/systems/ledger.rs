//! Exchange ledger - currency transfers between agents.
//!
//! Trades involving exactly one proxy keep the proxy's side and settle the
//! other side against the player's account: the player pays a proxy's wages
//! and receives what a proxy spends. Trades between two proxies cancel out
//! and move nothing. Money is conserved in aggregate across the player and
//! all proxies.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::components::{Money, Proxy};

/// Designated accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct Ledger {
    /// The player ledger entity that settles with proxies' counterparties
    pub player: Option<Entity>,
}

impl Ledger {
    pub fn new(player: Option<Entity>) -> Self {
        Self { player }
    }
}

/// Town-wide economic standing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Economy {
    pub reputation: f32,
}

impl Economy {
    pub fn new(reputation: f32) -> Self {
        Self { reputation }
    }
}

fn is_proxy(world: &World, entity: Entity) -> bool {
    world.get::<&Proxy>(entity).is_ok()
}

/// Move `amount` from one balance to another.
///
/// Returns false when nothing moved: both sides are proxies, an account has
/// no `Money`, or payer and payee resolve to the same account.
pub fn transfer(world: &mut World, ledger: &Ledger, from: Entity, to: Entity, amount: f64) -> bool {
    let (payer, payee) = match (is_proxy(world, from), is_proxy(world, to)) {
        (true, true) => return false,
        (true, false) => (from, ledger.player.unwrap_or(to)),
        (false, true) => (ledger.player.unwrap_or(from), to),
        (false, false) => (from, to),
    };
    if payer == payee {
        return false;
    }
    if world.get::<&Money>(payer).is_err() || world.get::<&Money>(payee).is_err() {
        return false;
    }

    if let Ok(mut money) = world.get::<&mut Money>(payer) {
        money.0 -= amount;
    }
    if let Ok(mut money) = world.get::<&mut Money>(payee) {
        money.0 += amount;
    }
    log::trace!("transfer {:.2} {:?} -> {:?}", amount, payer, payee);
    true
}

/// Sum of every balance
pub fn total_money(world: &World) -> f64 {
    world.query::<&Money>().iter().map(|(_, m)| m.0).sum()
}

/// Zero every negative balance and charge the combined deficit to solvent
/// accounts in proportion to their balances. Returns the deficit covered;
/// zero if there was none or the solvent pool could not cover it.
pub fn bailout(world: &mut World) -> f64 {
    let balances: Vec<(Entity, f64)> = world
        .query::<&Money>()
        .iter()
        .map(|(entity, money)| (entity, money.0))
        .collect();

    let deficit: f64 = balances.iter().filter(|(_, b)| *b < 0.0).map(|(_, b)| -b).sum();
    if deficit <= 0.0 {
        return 0.0;
    }
    let solvent: f64 = balances.iter().filter(|(_, b)| *b > 0.0).map(|(_, b)| b).sum();
    if solvent < deficit {
        log::warn!(
            "bailout skipped: deficit {:.2} exceeds solvent pool {:.2}",
            deficit,
            solvent
        );
        return 0.0;
    }

    for (entity, balance) in balances {
        if let Ok(mut money) = world.get::<&mut Money>(entity) {
            if balance < 0.0 {
                money.0 = 0.0;
            } else if balance > 0.0 {
                money.0 = balance - deficit * (balance / solvent);
            }
        }
    }
    log::info!("bailout redistributed {:.2}", deficit);
    deficit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(world: &World, e: Entity) -> f64 {
        world.get::<&Money>(e).unwrap().0
    }

    #[test]
    fn test_plain_transfer() {
        let mut world = World::new();
        let a = world.spawn((Money(10.0),));
        let b = world.spawn((Money(0.0),));

        assert!(transfer(&mut world, &Ledger::default(), a, b, 4.0));
        assert_eq!(balance(&world, a), 6.0);
        assert_eq!(balance(&world, b), 4.0);
    }

    #[test]
    fn test_both_proxies_is_noop() {
        let mut world = World::new();
        let player = world.spawn((Money(100.0), Proxy));
        let worker = world.spawn((Money(5.0), Proxy));
        let ledger = Ledger::new(Some(player));

        assert!(!transfer(&mut world, &ledger, worker, player, 3.0));
        assert_eq!(balance(&world, player), 100.0);
        assert_eq!(balance(&world, worker), 5.0);
    }

    #[test]
    fn test_single_proxy_settles_against_player() {
        let mut world = World::new();
        let player = world.spawn((Money(100.0), Proxy));
        let worker = world.spawn((Money(5.0), Proxy));
        let shopper = world.spawn((Money(20.0),));
        let ledger = Ledger::new(Some(player));
        let books = |w: &World| balance(w, player) + balance(w, worker);

        // Shopper pays the proxy: the player pays in the shopper's place
        assert!(transfer(&mut world, &ledger, shopper, worker, 3.0));
        assert_eq!(balance(&world, shopper), 20.0);
        assert_eq!(balance(&world, worker), 8.0);
        assert_eq!(balance(&world, player), 97.0);
        assert_eq!(books(&world), 105.0);

        // Proxy pays the shopper: the player is credited in the shopper's place
        assert!(transfer(&mut world, &ledger, worker, shopper, 2.0));
        assert_eq!(balance(&world, shopper), 20.0);
        assert_eq!(balance(&world, worker), 6.0);
        assert_eq!(balance(&world, player), 99.0);
        assert_eq!(books(&world), 105.0);
    }

    #[test]
    fn test_single_proxy_without_player_is_plain() {
        let mut world = World::new();
        let worker = world.spawn((Money(5.0), Proxy));
        let shopper = world.spawn((Money(20.0),));

        assert!(transfer(&mut world, &Ledger::default(), shopper, worker, 3.0));
        assert_eq!(balance(&world, shopper), 17.0);
        assert_eq!(balance(&world, worker), 8.0);
    }

    #[test]
    fn test_missing_money_is_noop() {
        let mut world = World::new();
        let a = world.spawn((Money(10.0),));
        let b = world.spawn(());
        assert!(!transfer(&mut world, &Ledger::default(), a, b, 4.0));
        assert_eq!(balance(&world, a), 10.0);
    }

    #[test]
    fn test_bailout_conserves_total() {
        let mut world = World::new();
        let broke = world.spawn((Money(-30.0),));
        let rich = world.spawn((Money(90.0),));
        let modest = world.spawn((Money(30.0),));
        let before = total_money(&world);

        assert_eq!(bailout(&mut world), 30.0);
        assert_eq!(balance(&world, broke), 0.0);
        assert!((balance(&world, rich) - 67.5).abs() < 1e-9);
        assert!((balance(&world, modest) - 22.5).abs() < 1e-9);
        assert!((total_money(&world) - before).abs() < 1e-9);
    }

    #[test]
    fn test_bailout_skips_when_pool_too_small() {
        let mut world = World::new();
        let broke = world.spawn((Money(-50.0),));
        world.spawn((Money(10.0),));
        assert_eq!(bailout(&mut world), 0.0);
        assert_eq!(balance(&world, broke), -50.0);
    }
}
