//! Per-tick state snapshot handed to the episode stages

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::command::compound::CompoundAction;
use crate::core::types::Coord;
use crate::world::objects::{Building, Resource, Worker, WorkerAction};
use crate::world::state::WorldState;

/// Events generated during a simulator tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickEvent {
    /// A worker stepped onto a Nexus from a resource site
    Gathered { worker: Worker, resource: Resource },
    /// A construction attempt succeeded
    Constructed {
        worker: Worker,
        building: Building,
        location: Coord,
    },
    /// A building was lost to random destruction
    Destroyed { building: Building, location: Coord },
}

/// Immutable view of one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub world: WorldState,
    /// What each worker's assignment will do on the next tick
    pub next_actions: BTreeMap<Worker, WorkerAction>,
    pub pointer: usize,
    /// Last compound action folded in, complete or not
    pub action: CompoundAction,
    pub time_remaining: u32,
    /// Every required building is standing
    pub success: bool,
    pub events: Vec<TickEvent>,
}

impl State {
    pub fn destroyed(&self) -> impl Iterator<Item = (Building, Coord)> + '_ {
        self.events.iter().filter_map(|e| match e {
            TickEvent::Destroyed { building, location } => Some((*building, *location)),
            _ => None,
        })
    }
}
