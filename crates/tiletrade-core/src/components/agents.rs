//! Agent-related components: Agent, Money, Emotion, Waiting, Proxy, Constructing.

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, TileType};

/// Marker component identifying an entity as an autonomous agent
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Agent;

/// Marker for the human-controlled actor. Its entity doubles as the player ledger account.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Player;

/// Tracked account. Trades involving exactly one proxy settle against the player ledger.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Proxy;

/// Currency balance
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Money(pub f64);

/// Busy countdown in seconds. While positive the agent makes no decisions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Waiting(pub f32);

impl Waiting {
    pub fn is_busy(&self) -> bool {
        self.0 > 0.0
    }
}

/// Displayed mood of an agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Angry,
}

/// Current mood plus the sim time at which it fades back to neutral
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Emotion {
    pub mood: Mood,
    pub until: f64,
}

impl Emotion {
    pub fn feel(&mut self, mood: Mood, now: f64, duration: f64) {
        self.mood = mood;
        self.until = now + duration;
    }

    /// Returns true if the mood faded this call
    pub fn expire(&mut self, now: f64) -> bool {
        if self.mood != Mood::Neutral && now >= self.until {
            self.mood = Mood::Neutral;
            return true;
        }
        false
    }
}

/// Transient sub-state of a worker building a blueprint tile.
/// Blocks the normal role logic until the construction completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Constructing {
    pub task_id: u32,
    pub kind: TileType,
    pub cell: Cell,
    /// Set once the worker reached the site and started building
    pub started: bool,
}

impl Constructing {
    pub fn new(task_id: u32, kind: TileType, cell: Cell) -> Self {
        Self {
            task_id,
            kind,
            cell,
            started: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_expires() {
        let mut emotion = Emotion::default();
        emotion.feel(Mood::Angry, 10.0, 5.0);
        assert!(!emotion.expire(12.0));
        assert_eq!(emotion.mood, Mood::Angry);
        assert!(emotion.expire(15.0));
        assert_eq!(emotion.mood, Mood::Neutral);
    }

    #[test]
    fn test_waiting_busy() {
        assert!(Waiting(0.5).is_busy());
        assert!(!Waiting(0.0).is_busy());
    }
}
