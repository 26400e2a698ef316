//! World object variants and their lookup tables
//!
//! Everything that can occupy a grid cell is one of three closed kinds:
//! resources, buildings or workers. Costs, symbols and observation channels
//! are table lookups keyed by the variant.

use serde::{Deserialize, Serialize};

use crate::core::types::Movement;

/// Gatherable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Minerals,
    Gas,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Minerals, Resource::Gas];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn symbol(&self) -> char {
        match self {
            Resource::Minerals => 'm',
            Resource::Gas => 'g',
        }
    }
}

/// Construction cost of a building
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub minerals: u32,
    pub gas: u32,
}

impl Cost {
    pub const fn new(minerals: u32, gas: u32) -> Self {
        Self { minerals, gas }
    }

    pub fn amount(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Minerals => self.minerals,
            Resource::Gas => self.gas,
        }
    }

    /// Cost as `(resource, amount)` pairs, zero amounts included
    pub fn requirements(&self) -> [(Resource, u32); 2] {
        [
            (Resource::Minerals, self.minerals),
            (Resource::Gas, self.gas),
        ]
    }
}

impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m/{}g", self.minerals, self.gas)
    }
}

/// Type of building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Building {
    Nexus,
    Pylon,
    Gateway,
    Assimilator,
    Forge,
    CyberneticsCore,
    PhotonCannon,
    ShieldBattery,
    TwilightCouncil,
    Stargate,
    RoboticsFacility,
    TemplarArchives,
    DarkShrine,
    RoboticsBay,
    FleetBeacon,
}

impl Building {
    pub const ALL: [Building; 15] = [
        Building::Nexus,
        Building::Pylon,
        Building::Gateway,
        Building::Assimilator,
        Building::Forge,
        Building::CyberneticsCore,
        Building::PhotonCannon,
        Building::ShieldBattery,
        Building::TwilightCouncil,
        Building::Stargate,
        Building::RoboticsFacility,
        Building::TemplarArchives,
        Building::DarkShrine,
        Building::RoboticsBay,
        Building::FleetBeacon,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Resources consumed when construction succeeds
    pub fn cost(&self) -> Cost {
        match self {
            Building::Nexus => Cost::new(4, 0),
            Building::Pylon => Cost::new(1, 0),
            Building::Gateway => Cost::new(2, 0),
            Building::Assimilator => Cost::new(1, 0),
            Building::Forge => Cost::new(2, 0),
            Building::CyberneticsCore => Cost::new(2, 0),
            Building::PhotonCannon => Cost::new(2, 0),
            Building::ShieldBattery => Cost::new(1, 0),
            Building::TwilightCouncil => Cost::new(2, 1),
            Building::Stargate => Cost::new(2, 2),
            Building::RoboticsFacility => Cost::new(2, 1),
            Building::TemplarArchives => Cost::new(2, 2),
            Building::DarkShrine => Cost::new(2, 2),
            Building::RoboticsBay => Cost::new(2, 2),
            Building::FleetBeacon => Cost::new(3, 2),
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Building::Nexus => 'N',
            Building::Pylon => 'P',
            Building::Gateway => 'G',
            Building::Assimilator => 'A',
            Building::Forge => 'F',
            Building::CyberneticsCore => 'C',
            Building::PhotonCannon => 'K',
            Building::ShieldBattery => 'S',
            Building::TwilightCouncil => 'T',
            Building::Stargate => 'R',
            Building::RoboticsFacility => 'O',
            Building::TemplarArchives => 'H',
            Building::DarkShrine => 'D',
            Building::RoboticsBay => 'B',
            Building::FleetBeacon => 'L',
        }
    }

    pub fn is_nexus(&self) -> bool {
        *self == Building::Nexus
    }

    pub fn is_assimilator(&self) -> bool {
        *self == Building::Assimilator
    }
}

impl std::fmt::Display for Building {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Worker identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Worker {
    A,
    B,
    C,
}

impl Worker {
    pub const ALL: [Worker; 3] = [Worker::A, Worker::B, Worker::C];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Worker> {
        Self::ALL.get(index).copied()
    }

    pub fn symbol(&self) -> char {
        match self {
            Worker::A => '1',
            Worker::B => '2',
            Worker::C => '3',
        }
    }
}

/// Anything that can occupy a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorldObject {
    Building(Building),
    Worker(Worker),
    Resource(Resource),
}

/// Number of observation channels: buildings, then workers, then resources
pub const NUM_CHANNELS: usize = Building::ALL.len() + Worker::ALL.len() + Resource::ALL.len();

impl WorldObject {
    /// Observation channel of this object
    pub fn channel(&self) -> usize {
        match self {
            WorldObject::Building(b) => b.index(),
            WorldObject::Worker(w) => Building::ALL.len() + w.index(),
            WorldObject::Resource(r) => Building::ALL.len() + Worker::ALL.len() + r.index(),
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            WorldObject::Building(b) => b.symbol(),
            WorldObject::Worker(w) => w.symbol(),
            WorldObject::Resource(r) => r.symbol(),
        }
    }
}

/// Concrete per-tick effect of a worker's assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerAction {
    Move(Movement),
    Build(Building),
}

/// Number of distinct worker actions (movements, then one per building)
pub const NUM_WORKER_ACTIONS: usize = Movement::ALL.len() + Building::ALL.len();

impl WorkerAction {
    /// Stable id used in the `next_actions` observation
    pub fn id(&self) -> usize {
        match self {
            WorkerAction::Move(m) => m.index(),
            WorkerAction::Build(b) => Movement::ALL.len() + b.index(),
        }
    }
}

impl Default for WorkerAction {
    fn default() -> Self {
        WorkerAction::Move(Movement::STAY)
    }
}
