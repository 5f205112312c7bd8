//! Timed effects - a min-heap of scheduled events plus expiring messages.
//!
//! Nothing here fires callbacks. The engine drains due events once per tick
//! and every handler re-validates its target, so an event whose subject
//! changed in the meantime is simply stale.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::components::Emotion;
use crate::grid::Cell;

/// Events that fire at a sim time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimedEvent {
    /// A harvested tree grows back
    RegrowTree { cell: Cell },
    /// A worker finishes the blueprint it is standing on
    FinishConstruction { worker: Entity, cell: Cell },
}

#[derive(Debug, Clone)]
struct Scheduled {
    at: f64,
    seq: u64,
    event: TimedEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Same-time events fire in submission order
        self.at
            .total_cmp(&other.at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-heap of pending timed events
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: f64, event: TimedEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { at, seq, event }));
    }

    /// Remove and return every event due at or before `now`, earliest first
    pub fn pop_due(&mut self, now: f64) -> Vec<TimedEvent> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.at > now {
                break;
            }
            if let Some(Reverse(scheduled)) = self.heap.pop() {
                due.push(scheduled.event);
            }
        }
        due
    }

    pub fn next_due(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(s)| s.at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// A line shown to the player until it expires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub posted_at: f64,
    pub expires_at: f64,
}

/// Complaints and announcements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLog {
    pub messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, text: impl Into<String>, now: f64, duration: f64) {
        let text = text.into();
        log::info!("[{:.1}s] {}", now, text);
        self.messages.push(Message {
            text,
            posted_at: now,
            expires_at: now + duration,
        });
    }

    pub fn active(&self, now: f64) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter().filter(move |m| m.expires_at > now)
    }

    /// Drop expired messages
    pub fn prune(&mut self, now: f64) {
        self.messages.retain(|m| m.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Fade expired moods back to neutral
pub fn expire_moods(world: &mut World, now: f64) {
    for (_, emotion) in world.query_mut::<&mut Emotion>() {
        emotion.expire(now);
    }
}
