//! Systems - logic that operates on components and the grid

mod claims;
mod construction;
mod decay;
mod decision;
mod events;
mod ledger;
mod movement;

pub use claims::*;
pub use construction::*;
pub use decay::*;
pub use decision::*;
pub use events::*;
pub use ledger::*;
pub use movement::*;
