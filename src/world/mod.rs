//! World model: object variants, owned world state and initial placement

pub mod objects;
pub mod placement;
pub mod state;
pub mod stockpile;

pub use objects::{Building, Cost, Resource, Worker, WorkerAction, WorldObject};
pub use placement::{place_objects, PlacementParams};
pub use state::WorldState;
pub use stockpile::Stockpile;
