//! Compound action decoding
//!
//! The policy emits one fixed-shape `RawAction` per call. A worker command
//! can take more than one call to assemble:
//!
//! ```text
//! WorkerTarget (worker, target) ──target is a resource──▶ complete
//!          │
//!          └──target is a building──▶ Location (i, j) ──▶ complete
//! ```
//!
//! Only a complete (`is_op`) action advances the simulation.

use serde::{Deserialize, Serialize};

use crate::command::resolver::Assignment;
use crate::core::error::{EnvError, Result};
use crate::core::types::Coord;
use crate::world::objects::{Building, Resource, Worker};

/// What a worker can be pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Resource(Resource),
    Building(Building),
}

/// Resources first, then buildings
pub const NUM_TARGETS: usize = Resource::ALL.len() + Building::ALL.len();

impl Target {
    pub fn from_index(index: usize) -> Option<Target> {
        if let Some(r) = Resource::ALL.get(index) {
            return Some(Target::Resource(*r));
        }
        Building::ALL
            .get(index - Resource::ALL.len())
            .map(|b| Target::Building(*b))
    }

    pub fn index(&self) -> usize {
        match self {
            Target::Resource(r) => r.index(),
            Target::Building(b) => Resource::ALL.len() + b.index(),
        }
    }

    pub fn needs_location(&self) -> bool {
        matches!(self, Target::Building(_))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Resource(r) => write!(f, "{:?}", r),
            Target::Building(b) => write!(f, "{}", b),
        }
    }
}

/// One raw action vector from the policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAction {
    /// Pointer movement sampled by the policy; carried, not interpreted
    pub delta: usize,
    /// Gate bit: 1 commits `a` to the active sub-action
    pub dg: usize,
    /// Sub-action value, decoded by the active class
    pub a: usize,
    /// Pointer into the instruction lines
    pub ptr: usize,
}

impl RawAction {
    /// Commit a worker/target choice
    pub fn select_worker_target(worker: Worker, target: Target, ptr: usize) -> Self {
        Self {
            delta: 0,
            dg: 1,
            a: worker.index() * NUM_TARGETS + target.index(),
            ptr,
        }
    }

    /// Commit a location choice
    pub fn select_location(location: Coord, world_size: usize, ptr: usize) -> Self {
        Self {
            delta: 0,
            dg: 1,
            a: location.cell_index(world_size),
            ptr,
        }
    }

    /// Leave the gate closed: nothing is committed
    pub fn hold(ptr: usize) -> Self {
        Self {
            delta: 0,
            dg: 0,
            a: 0,
            ptr,
        }
    }

    /// Parse a `[delta, dg, a, ptr]` vector
    pub fn from_slice(values: &[usize]) -> Result<Self> {
        match *values {
            [delta, dg, a, ptr] => Ok(Self { delta, dg, a, ptr }),
            _ => Err(EnvError::InvalidAction(format!(
                "expected 4 components, got {}",
                values.len()
            ))),
        }
    }

    pub fn to_array(&self) -> [usize; 4] {
        [self.delta, self.dg, self.a, self.ptr]
    }

    /// Upper bounds of each component, in `to_array` order
    pub fn nvec(max_lines: usize, world_size: usize) -> [usize; 4] {
        [2 * max_lines, 2, ActionClass::max_size_a(world_size), max_lines]
    }
}

/// Sub-action classes, in assembly order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionClass {
    WorkerTarget,
    Location,
}

impl ActionClass {
    pub const ALL: [ActionClass; 2] = [ActionClass::WorkerTarget, ActionClass::Location];

    /// Number of distinct `a` values this class accepts
    pub fn size_a(&self, world_size: usize) -> usize {
        self.num_values(world_size).iter().product()
    }

    /// Cardinality of each component of this class
    pub fn num_values(&self, world_size: usize) -> Vec<usize> {
        match self {
            ActionClass::WorkerTarget => vec![Worker::ALL.len(), NUM_TARGETS],
            ActionClass::Location => vec![world_size, world_size],
        }
    }

    pub fn max_size_a(world_size: usize) -> usize {
        Self::ALL
            .iter()
            .map(|c| c.size_a(world_size))
            .max()
            .unwrap_or(0)
    }
}

/// A worker command assembled from one or more raw actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundAction {
    world_size: usize,
    worker_target: Option<(Worker, Target)>,
    location: Option<Coord>,
    ptr: usize,
}

impl CompoundAction {
    pub fn new(world_size: usize) -> Self {
        Self {
            world_size,
            worker_target: None,
            location: None,
            ptr: 0,
        }
    }

    pub fn classes() -> [ActionClass; 2] {
        ActionClass::ALL
    }

    /// Class the next committed `a` will be decoded by
    pub fn active_class(&self) -> ActionClass {
        match self.worker_target {
            Some((_, target)) if !self.is_op() && target.needs_location() => ActionClass::Location,
            _ => ActionClass::WorkerTarget,
        }
    }

    pub fn is_op(&self) -> bool {
        match self.worker_target {
            Some((_, target)) => !target.needs_location() || self.location.is_some(),
            None => false,
        }
    }

    /// Fold one raw action into this command
    ///
    /// A complete command is replaced by a fresh one before decoding, so each
    /// completed command is observed by exactly one simulator tick.
    pub fn update(&self, raw: RawAction) -> Result<CompoundAction> {
        let mut next = if self.is_op() {
            Self::new(self.world_size)
        } else {
            self.clone()
        };
        next.ptr = raw.ptr;

        match raw.dg {
            0 => return Ok(next),
            1 => {}
            other => {
                return Err(EnvError::InvalidAction(format!(
                    "gate bit must be 0 or 1, got {}",
                    other
                )))
            }
        }

        let class = next.active_class();
        let size_a = class.size_a(self.world_size);
        if raw.a >= size_a {
            return Err(EnvError::InvalidAction(format!(
                "{:?} value {} out of range 0..{}",
                class, raw.a, size_a
            )));
        }

        match class {
            ActionClass::WorkerTarget => {
                let worker = Worker::from_index(raw.a / NUM_TARGETS);
                let target = Target::from_index(raw.a % NUM_TARGETS);
                next.worker_target = worker.zip(target);
            }
            ActionClass::Location => {
                let ws = self.world_size;
                next.location = Some(Coord::new((raw.a / ws) as i32, (raw.a % ws) as i32));
            }
        }
        Ok(next)
    }

    pub fn worker(&self) -> Option<Worker> {
        self.worker_target.map(|(w, _)| w)
    }

    pub fn target(&self) -> Option<Target> {
        self.worker_target.map(|(_, t)| t)
    }

    /// Assignment carried by a complete command
    pub fn assignment(&self) -> Option<Assignment> {
        if !self.is_op() {
            return None;
        }
        match self.target()? {
            Target::Resource(resource) => Some(Assignment::Gather(resource)),
            Target::Building(building) => Some(Assignment::Build {
                building,
                location: self.location?,
            }),
        }
    }

    pub fn ptr(&self) -> usize {
        self.ptr
    }

    /// Legal `a` values for the active class, padded to `size`
    pub fn mask(&self, size: usize) -> Vec<bool> {
        let size_a = self.active_class().size_a(self.world_size);
        (0..size).map(|a| a < size_a).collect()
    }

    /// `a` values that complete the command when committed, padded to `size`
    pub fn can_open_gate(&self, size: usize) -> Vec<bool> {
        let class = self.active_class();
        let size_a = class.size_a(self.world_size);
        (0..size)
            .map(|a| {
                a < size_a
                    && match class {
                        ActionClass::WorkerTarget => Target::from_index(a % NUM_TARGETS)
                            .is_some_and(|t| !t.needs_location()),
                        ActionClass::Location => true,
                    }
            })
            .collect()
    }

    /// `[worker, target, i, j]`, each `value + 1`, or 0 while unset
    pub fn partial_actions(&self) -> Vec<usize> {
        let worker = self.worker().map_or(0, |w| w.index() + 1);
        let target = self.target().map_or(0, |t| t.index() + 1);
        let (i, j) = self
            .location
            .map_or((0, 0), |c| (c.i as usize + 1, c.j as usize + 1));
        vec![worker, target, i, j]
    }

    /// Upper bounds of `partial_actions`
    pub fn partial_nvec(world_size: usize) -> Vec<usize> {
        ActionClass::ALL
            .iter()
            .flat_map(|c| c.num_values(world_size))
            .map(|n| n + 1)
            .collect()
    }
}

impl std::fmt::Display for CompoundAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.worker_target, self.location) {
            (None, _) => write!(f, "<empty> ptr={}", self.ptr),
            (Some((w, t)), None) => write!(f, "{:?} -> {} ptr={}", w, t, self.ptr),
            (Some((w, t)), Some(c)) => write!(f, "{:?} -> {} at {} ptr={}", w, t, c, self.ptr),
        }
    }
}
