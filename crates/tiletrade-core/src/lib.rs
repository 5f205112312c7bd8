//! TileTrade Core - Tile-Based Market Town Simulation Engine
//!
//! An ECS-based simulation of a small trading town. Autonomous agents claim
//! stations on a tile map and become producers, assistants, sellers or
//! buyers; goods flow from the shore and the orchard through counters and
//! fridges to registers, and rot along the way if nobody moves them.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Agents and the player account
//! - **Components**: Pure data attached to entities (Position, Role, Inventory, etc.)
//! - **Systems**: Logic that queries and updates components and the tile grid
//!
//! The tile map is not made of entities. It is an owned [`grid::Grid`] that
//! systems borrow explicitly.
//!
//! # Example
//!
//! ```rust,no_run
//! use tiletrade_core::prelude::*;
//! use tiletrade_core::generation::TownConfig;
//!
//! let mut engine = SimulationEngine::default();
//!
//! // Generate a town with its population
//! engine.generate(TownConfig::default());
//!
//! // Run simulation
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod generation;
pub mod grid;
pub mod snapshot;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::SimConfig;
    pub use crate::engine::SimulationEngine;
    pub use crate::grid::{Cell, Grid, Station, StationKind, TileType};
    pub use crate::snapshot::WorldSnapshot;
}
