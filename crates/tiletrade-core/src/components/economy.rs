//! Economic components: goods, inventories and the agent role state machine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Station, StationKind};

/// Tradeable goods. Every perishable good has a wasted counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Good {
    #[default]
    Fish,
    Apple,
    WastedFish,
    WastedApple,
}

impl Good {
    pub const ALL: [Good; 4] = [Good::Fish, Good::Apple, Good::WastedFish, Good::WastedApple];

    /// Goods that rot on tiles
    pub const PERISHABLE: [Good; 2] = [Good::Fish, Good::Apple];

    pub fn name(&self) -> &'static str {
        match self {
            Good::Fish => "fish",
            Good::Apple => "apple",
            Good::WastedFish => "wasted_fish",
            Good::WastedApple => "wasted_apple",
        }
    }

    pub fn try_parse(name: &str) -> Option<Good> {
        Good::ALL
            .iter()
            .copied()
            .find(|good| good.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Parse a good name, falling back to the default good on unknown input
    pub fn parse(name: &str) -> Good {
        Good::try_parse(name).unwrap_or_else(|| {
            log::warn!(
                "unknown good '{}', falling back to '{}'",
                name,
                Good::default().name()
            );
            Good::default()
        })
    }

    /// The wasted counterpart, if this good perishes
    pub fn wasted(&self) -> Option<Good> {
        match self {
            Good::Fish => Some(Good::WastedFish),
            Good::Apple => Some(Good::WastedApple),
            Good::WastedFish | Good::WastedApple => None,
        }
    }

    /// The fresh good this belongs to
    pub fn fresh(&self) -> Good {
        match self {
            Good::WastedFish => Good::Fish,
            Good::WastedApple => Good::Apple,
            fresh => *fresh,
        }
    }

    pub fn is_wasted(&self) -> bool {
        matches!(self, Good::WastedFish | Good::WastedApple)
    }

    pub fn is_perishable(&self) -> bool {
        self.wasted().is_some()
    }

    /// Multiplier applied to elapsed time when aging this good
    pub fn decay_rate(&self) -> f32 {
        match self {
            Good::Fish => 1.0,
            // Apples keep twice as long as fish
            Good::Apple => 0.5,
            Good::WastedFish | Good::WastedApple => 0.0,
        }
    }
}

impl fmt::Display for Good {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Good -> quantity. Quantities may go negative for owed bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<Good, i32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, good: Good, quantity: i32) -> Self {
        self.add(good, quantity);
        self
    }

    pub fn get(&self, good: Good) -> i32 {
        self.items.get(&good).copied().unwrap_or(0)
    }

    pub fn add(&mut self, good: Good, quantity: i32) {
        let entry = self.items.entry(good).or_insert(0);
        *entry += quantity;
        if *entry == 0 {
            self.items.remove(&good);
        }
    }

    pub fn remove(&mut self, good: Good, quantity: i32) {
        self.add(good, -quantity);
    }

    /// Remove and return every positive unit of a good
    pub fn take_all(&mut self, good: Good) -> i32 {
        let quantity = self.get(good).max(0);
        self.remove(good, quantity);
        quantity
    }

    /// Fresh plus wasted units of the good's family
    pub fn family_count(&self, good: Good) -> i32 {
        let fresh = good.fresh();
        self.get(fresh).max(0) + fresh.wasted().map(|w| self.get(w).max(0)).unwrap_or(0)
    }

    pub fn total(&self) -> i32 {
        self.items.values().filter(|q| **q > 0).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Good, i32)> + '_ {
        self.items.iter().map(|(good, quantity)| (*good, *quantity))
    }
}

/// Move up to `quantity` positive units of `good` between two inventories.
/// Returns the number of units actually moved.
pub fn move_goods(from: &mut Inventory, to: &mut Inventory, good: Good, quantity: i32) -> i32 {
    let moved = quantity.min(from.get(good)).max(0);
    if moved > 0 {
        from.remove(good, moved);
        to.add(good, moved);
    }
    moved
}

/// Seller/producer side of a trade relationship
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Supply {
    pub good: Good,
    /// Minimum price this agent accepts per unit
    pub reservation_price: f64,
    /// Units handled so far
    pub quantity: i32,
    pub open_for_business: bool,
    /// The station this agent claimed
    pub station: Cell,
}

impl Supply {
    pub fn new(good: Good, reservation_price: f64, station: Cell) -> Self {
        Self {
            good,
            reservation_price,
            quantity: 0,
            open_for_business: true,
            station,
        }
    }

    pub fn from_name(name: &str, reservation_price: f64, station: Cell) -> Self {
        Self::new(Good::parse(name), reservation_price, station)
    }
}

/// Buyer side of a trade relationship
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub good: Good,
    /// Maximum price this agent pays per unit
    pub reservation_price: f64,
    /// Units consumed so far
    pub quantity: i32,
    pub open_for_business: bool,
    /// The consumption station this agent claimed
    pub station: Cell,
    /// Register this buyer is locked onto
    pub register: Option<Cell>,
    pub last_purchase_at: Option<f64>,
    /// Set while eating a purchase at home
    pub consuming: bool,
}

impl Demand {
    pub fn new(good: Good, reservation_price: f64, station: Cell) -> Self {
        Self {
            good,
            reservation_price,
            quantity: 0,
            open_for_business: true,
            station,
            register: None,
            last_purchase_at: None,
            consuming: false,
        }
    }

    pub fn from_name(name: &str, reservation_price: f64, station: Cell) -> Self {
        Self::new(Good::parse(name), reservation_price, station)
    }

    /// Whether enough time passed since the last purchase
    pub fn can_buy(&self, now: f64, interval: f64) -> bool {
        self.last_purchase_at
            .map(|last| now - last >= interval)
            .unwrap_or(true)
    }
}

/// Economic role of an agent. Exactly one per agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Role {
    #[default]
    Idle,
    /// Gathers a raw good and banks it at a counter
    Producing(Supply),
    /// Moves stock from counters into fridges
    Assisting(Supply),
    /// Moves stock to registers and collects from buyers
    Selling(Supply),
    /// Buys from a register and consumes at home
    Demanding(Demand),
}

impl Role {
    /// Role granted by claiming a station at the given price
    pub fn for_station(station: Station, cell: Cell, price: f64, demand_markup: f64) -> Option<Role> {
        let supply = Supply::new(station.good, price, cell);
        match station.kind {
            StationKind::Dock | StationKind::Orchard => Some(Role::Producing(supply)),
            StationKind::Fridge => Some(Role::Assisting(supply)),
            StationKind::Register => Some(Role::Selling(supply)),
            StationKind::Table => Some(Role::Demanding(Demand::new(
                station.good,
                price * demand_markup,
                cell,
            ))),
            StationKind::Counter => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Role::Idle)
    }

    pub fn supply(&self) -> Option<&Supply> {
        match self {
            Role::Producing(s) | Role::Assisting(s) | Role::Selling(s) => Some(s),
            Role::Idle | Role::Demanding(_) => None,
        }
    }

    pub fn demand(&self) -> Option<&Demand> {
        match self {
            Role::Demanding(d) => Some(d),
            _ => None,
        }
    }

    pub fn good(&self) -> Option<Good> {
        match self {
            Role::Idle => None,
            Role::Producing(s) | Role::Assisting(s) | Role::Selling(s) => Some(s.good),
            Role::Demanding(d) => Some(d.good),
        }
    }

    pub fn station(&self) -> Option<Cell> {
        match self {
            Role::Idle => None,
            Role::Producing(s) | Role::Assisting(s) | Role::Selling(s) => Some(s.station),
            Role::Demanding(d) => Some(d.station),
        }
    }

    pub fn reservation_price(&self) -> Option<f64> {
        match self {
            Role::Idle => None,
            Role::Producing(s) | Role::Assisting(s) | Role::Selling(s) => Some(s.reservation_price),
            Role::Demanding(d) => Some(d.reservation_price),
        }
    }

    /// Station kinds that may back this role
    pub fn accepts_station(&self, kind: StationKind) -> bool {
        match self {
            Role::Idle => false,
            Role::Producing(_) => matches!(kind, StationKind::Dock | StationKind::Orchard),
            Role::Assisting(_) => kind == StationKind::Fridge,
            Role::Selling(_) => kind == StationKind::Register,
            Role::Demanding(_) => kind == StationKind::Table,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Idle => "idle",
            Role::Producing(_) => "producing",
            Role::Assisting(_) => "assisting",
            Role::Selling(_) => "selling",
            Role::Demanding(_) => "demanding",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_good_parse_falls_back() {
        assert_eq!(Good::parse("apple"), Good::Apple);
        assert_eq!(Good::parse("Wasted_Fish"), Good::WastedFish);
        assert_eq!(Good::parse("caviar"), Good::Fish);
        assert_eq!(Good::try_parse("caviar"), None);
    }

    #[test]
    fn test_roles_from_names() {
        let cell = Cell::new(2, 3);
        let supply = Supply::from_name("apple", 5.5, cell);
        assert_eq!(supply.good, Good::Apple);
        assert_eq!(supply.station, cell);
        assert_eq!(supply.quantity, 0);

        // Unknown names fall back to the default good
        let demand = Demand::from_name("truffle", 11.0, cell);
        assert_eq!(demand.good, Good::default());
        assert_eq!(demand.reservation_price, 11.0);
        assert!(demand.register.is_none());
        assert!(Supply::from_name("", 1.0, cell).good == Good::Fish);
    }

    #[test]
    fn test_good_families() {
        assert_eq!(Good::Fish.wasted(), Some(Good::WastedFish));
        assert_eq!(Good::WastedApple.fresh(), Good::Apple);
        assert!(!Good::WastedFish.is_perishable());
        assert_eq!(Good::Apple.decay_rate(), 0.5);
    }

    #[test]
    fn test_inventory_add_remove() {
        let mut inv = Inventory::new();
        inv.add(Good::Fish, 3);
        inv.remove(Good::Fish, 5);
        assert_eq!(inv.get(Good::Fish), -2);
        assert_eq!(inv.total(), 0);

        inv.add(Good::Fish, 2);
        assert_eq!(inv.get(Good::Fish), 0);
        assert_eq!(inv.iter().count(), 0);
    }

    #[test]
    fn test_move_goods_is_paired() {
        let mut agent = Inventory::new().with(Good::Fish, 2);
        let mut tile = Inventory::new();

        assert_eq!(move_goods(&mut agent, &mut tile, Good::Fish, 5), 2);
        assert_eq!(agent.get(Good::Fish), 0);
        assert_eq!(tile.get(Good::Fish), 2);

        assert_eq!(move_goods(&mut agent, &mut tile, Good::Fish, 1), 0);
    }

    #[test]
    fn test_family_count() {
        let inv = Inventory::new().with(Good::Fish, 1).with(Good::WastedFish, 2);
        assert_eq!(inv.family_count(Good::Fish), 3);
        assert_eq!(inv.family_count(Good::WastedFish), 3);
        assert_eq!(inv.family_count(Good::Apple), 0);
    }

    #[test]
    fn test_role_for_station() {
        let cell = Cell::new(1, 2);
        let dock = Station::new(StationKind::Dock, Good::Fish);
        let role = Role::for_station(dock, cell, 5.5, 2.0).unwrap();
        assert_eq!(role.label(), "producing");
        assert_eq!(role.reservation_price(), Some(5.5));

        let table = Station::new(StationKind::Table, Good::Apple);
        let role = Role::for_station(table, cell, 5.5, 2.0).unwrap();
        assert_eq!(role.reservation_price(), Some(11.0));
        assert_eq!(role.good(), Some(Good::Apple));

        let counter = Station::new(StationKind::Counter, Good::Fish);
        assert!(Role::for_station(counter, cell, 5.5, 2.0).is_none());
    }

    #[test]
    fn test_demand_purchase_interval() {
        let mut demand = Demand::new(Good::Fish, 10.0, Cell::new(0, 0));
        assert!(demand.can_buy(0.0, 30.0));
        demand.last_purchase_at = Some(5.0);
        assert!(!demand.can_buy(20.0, 30.0));
        assert!(demand.can_buy(35.0, 30.0));
    }
}
