//! Generation - procedural creation of the town and its people

mod agents;
mod names;
mod town;

pub use agents::*;
pub use names::*;
pub use town::*;
