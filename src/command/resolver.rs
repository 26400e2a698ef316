//! Assignment resolution - converts a worker's standing goal into a concrete action

use serde::{Deserialize, Serialize};

use crate::core::types::{Coord, Movement};
use crate::world::objects::{Building, Resource, WorkerAction};
use crate::world::state::WorldState;

/// A worker's current goal, kept until the agent replaces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    /// Shuttle between a resource site and the nearest Nexus
    Gather(Resource),
    /// Walk to `location` and try to construct `building` there
    Build { building: Building, location: Coord },
}

impl Default for Assignment {
    fn default() -> Self {
        Assignment::Gather(Resource::Minerals)
    }
}

impl Assignment {
    pub fn is_build(&self) -> bool {
        matches!(self, Assignment::Build { .. })
    }

    /// Action this assignment produces for a worker standing at `current`
    pub fn action(
        &self,
        current: Coord,
        world: &WorldState,
        nexus_positions: &[Coord],
    ) -> WorkerAction {
        match *self {
            Assignment::Gather(resource) => {
                let Some(site) = world.resource_site(resource) else {
                    return WorkerAction::Move(Movement::STAY);
                };
                let target = if current == site {
                    nearest(current, nexus_positions).unwrap_or(current)
                } else {
                    site
                };
                WorkerAction::Move(Movement::toward(current, target))
            }
            Assignment::Build { building, location } => {
                if current == location {
                    WorkerAction::Build(building)
                } else {
                    WorkerAction::Move(Movement::toward(current, location))
                }
            }
        }
    }
}

/// Closest candidate by Manhattan distance, ties broken by coordinate order
fn nearest(from: Coord, candidates: &[Coord]) -> Option<Coord> {
    candidates
        .iter()
        .copied()
        .min_by_key(|c| (from.manhattan(c), *c))
}
