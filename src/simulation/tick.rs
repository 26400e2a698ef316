//! Turn simulator - advances the world one tick per complete worker command
//!
//! Tick order:
//! destroy buildings -> check success -> snapshot -> (await command) ->
//! apply command -> resolve gatherers -> resolve builders -> repeat

use ahash::AHashMap;
use rand::Rng;
use std::collections::BTreeMap;

use crate::command::compound::CompoundAction;
use crate::command::resolver::Assignment;
use crate::core::error::{EnvError, Result};
use crate::core::types::{Coord, Movement};
use crate::instructions::dependencies::Dependencies;
use crate::instructions::lines::Line;
use crate::simulation::state::{State, TickEvent};
use crate::world::objects::{Building, Resource, Worker, WorkerAction};
use crate::world::state::WorldState;

/// Owns all mutable simulation state for one episode
#[derive(Debug, Clone)]
pub struct TurnSimulator {
    world: WorldState,
    dependencies: Dependencies,
    /// Multiset of buildings that must be standing for success
    required: AHashMap<Building, usize>,
    assignments: BTreeMap<Worker, Assignment>,
    pointer: usize,
    action: CompoundAction,
    time_remaining: u32,
    destroy_building_prob: f64,
    events: Vec<TickEvent>,
}

impl TurnSimulator {
    pub fn new(
        world: WorldState,
        lines: &[Line],
        dependencies: Dependencies,
        time_remaining: u32,
        destroy_building_prob: f64,
    ) -> Self {
        let mut required = AHashMap::new();
        for line in lines.iter().filter(|l| l.required) {
            *required.entry(line.building).or_insert(0) += 1;
        }
        let assignments = world
            .workers
            .keys()
            .map(|w| (*w, Assignment::default()))
            .collect();
        let action = CompoundAction::new(world.size);

        Self {
            world,
            dependencies,
            required,
            assignments,
            pointer: 0,
            action,
            time_remaining,
            destroy_building_prob,
            events: Vec::new(),
        }
    }

    /// Override a worker's starting assignment
    pub fn with_assignment(mut self, worker: Worker, assignment: Assignment) -> Self {
        self.assignments.insert(worker, assignment);
        self
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn assignment(&self, worker: Worker) -> Option<Assignment> {
        self.assignments.get(&worker).copied()
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// Produce the first snapshot of the episode
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> State {
        self.observe(rng)
    }

    /// Apply one complete command and return the next snapshot
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        action: &CompoundAction,
        rng: &mut R,
    ) -> Result<State> {
        let (Some(worker), Some(assignment)) = (action.worker(), action.assignment()) else {
            return Err(EnvError::IncompleteAction);
        };

        self.action = action.clone();
        self.pointer = action.ptr();
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.world.workers.contains_key(&worker) {
            self.assignments.insert(worker, assignment);
        } else {
            tracing::debug!("Ignoring command for absent worker {:?}", worker);
        }

        self.resolve_workers();
        Ok(self.observe(rng))
    }

    /// Destruction, success check and snapshot
    fn observe<R: Rng + ?Sized>(&mut self, rng: &mut R) -> State {
        for (location, building) in self
            .world
            .destroy_buildings(rng, self.destroy_building_prob)
        {
            tracing::debug!("Destroyed {} at {}", building, location);
            self.events.push(TickEvent::Destroyed { building, location });
        }

        let nexus_positions = self.world.nexus_positions();
        let next_actions = self
            .assignments
            .iter()
            .filter_map(|(worker, assignment)| {
                let position = self.world.worker_position(*worker)?;
                Some((*worker, assignment.action(position, &self.world, &nexus_positions)))
            })
            .collect();

        State {
            world: self.world.clone(),
            next_actions,
            pointer: self.pointer,
            action: self.action.clone(),
            time_remaining: self.time_remaining,
            success: self.is_success(),
            events: std::mem::take(&mut self.events),
        }
    }

    /// Every required building (with multiplicity) is standing
    pub fn is_success(&self) -> bool {
        let standing = self.world.building_counts();
        self.required
            .iter()
            .all(|(building, count)| standing.get(building).copied().unwrap_or(0) >= *count)
    }

    /// Resolve every worker's effect, gatherers before builders
    ///
    /// Gathering first lets resources deposited this tick pay for
    /// construction attempts in the same tick.
    fn resolve_workers(&mut self) {
        let nexus_positions = self.world.nexus_positions();
        let mut order: Vec<(Worker, Assignment)> =
            self.assignments.iter().map(|(w, a)| (*w, *a)).collect();
        order.sort_by_key(|(_, assignment)| assignment.is_build());

        for (worker, assignment) in order {
            let Some(position) = self.world.worker_position(worker) else {
                continue;
            };
            match assignment.action(position, &self.world, &nexus_positions) {
                WorkerAction::Move(movement) => self.apply_movement(worker, position, movement),
                WorkerAction::Build(building) => self.try_construct(worker, building, position),
            }
        }
    }

    fn apply_movement(&mut self, worker: Worker, from: Coord, movement: Movement) {
        let to = from + movement;
        if !to.in_bounds(self.world.size) {
            return;
        }
        self.world.workers.insert(worker, to);

        if !self.world.building_at(to).is_some_and(|b| b.is_nexus()) {
            return;
        }
        for resource in Resource::ALL {
            let from_site = self.world.resource_site(resource) == Some(from);
            let extractable = resource != Resource::Gas || self.world.gas_extractable();
            if from_site && extractable {
                self.world.stockpile.add(resource, 1);
                self.events.push(TickEvent::Gathered { worker, resource });
            }
        }
    }

    fn try_construct(&mut self, worker: Worker, building: Building, location: Coord) {
        if !self.building_allowed(building, location) {
            tracing::trace!("{:?} cannot build {} at {}", worker, building, location);
            return;
        }
        if !self.world.stockpile.consume_materials(&building.cost()) {
            return;
        }
        self.world.building_positions.insert(location, building);
        tracing::debug!("{:?} built {} at {}", worker, building, location);
        self.events.push(TickEvent::Constructed {
            worker,
            building,
            location,
        });
    }

    /// Construction rules
    ///
    /// - the stockpile covers the cost
    /// - no building stands on `location`
    /// - the prerequisite, if any, is standing
    /// - an Assimilator goes exactly on the gas site; anything else avoids
    ///   both resource sites
    pub fn building_allowed(&self, building: Building, location: Coord) -> bool {
        if !self.world.stockpile.has_materials(&building.cost())
            || self.world.building_at(location).is_some()
        {
            return false;
        }
        if let Some(dependency) = self.dependencies.get(building) {
            if !self.world.contains_building(dependency) {
                return false;
            }
        }
        if building.is_assimilator() {
            self.world.resource_site(Resource::Gas) == Some(location)
        } else {
            !self.world.is_resource_site(location)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::compound::{RawAction, Target};
    use crate::world::stockpile::Stockpile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// 4x4 world: Nexus at (1,1), minerals (1,2), gas (2,1), one worker on the Nexus
    fn small_world() -> WorldState {
        let mut world = WorldState::new(4);
        world.building_positions.insert(Coord::new(1, 1), Building::Nexus);
        world.resource_sites.insert(Resource::Minerals, Coord::new(1, 2));
        world.resource_sites.insert(Resource::Gas, Coord::new(2, 1));
        world.workers.insert(Worker::A, Coord::new(1, 1));
        world
    }

    fn gather(worker: Worker, resource: Resource) -> CompoundAction {
        CompoundAction::new(4)
            .update(RawAction::select_worker_target(worker, Target::Resource(resource), 0))
            .unwrap()
    }

    fn build(worker: Worker, building: Building, location: Coord) -> CompoundAction {
        CompoundAction::new(4)
            .update(RawAction::select_worker_target(worker, Target::Building(building), 0))
            .unwrap()
            .update(RawAction::select_location(location, 4, 0))
            .unwrap()
    }

    fn no_deps() -> Dependencies {
        Dependencies::default()
    }

    #[test]
    fn test_minerals_round_trip_deposits_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sim = TurnSimulator::new(small_world(), &[], no_deps(), 10, 0.0);
        sim.start(&mut rng);

        // Walk to minerals, then back onto the Nexus
        let state = sim.advance(&gather(Worker::A, Resource::Minerals), &mut rng).unwrap();
        assert_eq!(state.world.worker_position(Worker::A), Some(Coord::new(1, 2)));
        assert_eq!(state.world.stockpile.get(Resource::Minerals), 0);

        let state = sim.advance(&gather(Worker::A, Resource::Minerals), &mut rng).unwrap();
        assert_eq!(state.world.worker_position(Worker::A), Some(Coord::new(1, 1)));
        assert_eq!(state.world.stockpile.get(Resource::Minerals), 1);
        assert!(state.events.contains(&TickEvent::Gathered {
            worker: Worker::A,
            resource: Resource::Minerals,
        }));
    }

    #[test]
    fn test_gas_needs_assimilator() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sim = TurnSimulator::new(small_world(), &[], no_deps(), 10, 0.0);
        sim.start(&mut rng);

        for _ in 0..4 {
            sim.advance(&gather(Worker::A, Resource::Gas), &mut rng).unwrap();
        }
        assert_eq!(sim.world().stockpile.get(Resource::Gas), 0);
    }

    #[test]
    fn test_gas_with_assimilator_deposits() {
        let mut world = small_world();
        world.building_positions.insert(Coord::new(2, 1), Building::Assimilator);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sim = TurnSimulator::new(world, &[], no_deps(), 10, 0.0);
        sim.start(&mut rng);

        sim.advance(&gather(Worker::A, Resource::Gas), &mut rng).unwrap();
        let state = sim.advance(&gather(Worker::A, Resource::Gas), &mut rng).unwrap();
        assert_eq!(state.world.stockpile.get(Resource::Gas), 1);
    }

    #[test]
    fn test_incomplete_action_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sim = TurnSimulator::new(small_world(), &[], no_deps(), 10, 0.0);
        sim.start(&mut rng);

        let partial = CompoundAction::new(4)
            .update(RawAction::select_worker_target(
                Worker::A,
                Target::Building(Building::Pylon),
                0,
            ))
            .unwrap();
        assert!(matches!(
            sim.advance(&partial, &mut rng),
            Err(EnvError::IncompleteAction)
        ));
        assert_eq!(sim.time_remaining(), 10);
    }

    #[test]
    fn test_building_waits_for_dependency() {
        let mut world = small_world();
        world.stockpile = Stockpile::with_amounts(10, 0);
        world.workers.insert(Worker::A, Coord::new(3, 3));
        let deps = Dependencies::from_pairs([
            (Building::Pylon, None),
            (Building::Gateway, Some(Building::Pylon)),
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sim = TurnSimulator::new(world, &[], deps, 10, 0.0);
        sim.start(&mut rng);

        let state = sim
            .advance(&build(Worker::A, Building::Gateway, Coord::new(3, 3)), &mut rng)
            .unwrap();
        assert_eq!(state.world.building_at(Coord::new(3, 3)), None);
        assert_eq!(state.world.stockpile.get(Resource::Minerals), 10);

        // Prerequisite elsewhere on the map unlocks it
        sim.world.building_positions.insert(Coord::new(0, 0), Building::Pylon);
        let state = sim
            .advance(&build(Worker::A, Building::Gateway, Coord::new(3, 3)), &mut rng)
            .unwrap();
        assert_eq!(state.world.building_at(Coord::new(3, 3)), Some(Building::Gateway));
        assert_eq!(state.world.stockpile.get(Resource::Minerals), 8);
    }

    #[test]
    fn test_no_building_on_minerals() {
        let mut world = small_world();
        world.stockpile = Stockpile::with_amounts(10, 0);
        let sim = TurnSimulator::new(world, &[], no_deps(), 10, 0.0);

        assert!(!sim.building_allowed(Building::Pylon, Coord::new(1, 2)));
        assert!(!sim.building_allowed(Building::Pylon, Coord::new(2, 1)));
        assert!(!sim.building_allowed(Building::Pylon, Coord::new(1, 1)));
        assert!(sim.building_allowed(Building::Pylon, Coord::new(0, 0)));
    }

    #[test]
    fn test_gatherers_resolve_before_builders() {
        // B deposits the mineral that lets A afford a Pylon on the same tick
        let mut world = small_world();
        world.workers.insert(Worker::A, Coord::new(0, 0));
        world.workers.insert(Worker::B, Coord::new(1, 2));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sim = TurnSimulator::new(world, &[], no_deps(), 10, 0.0);
        sim.start(&mut rng);

        let state = sim
            .advance(&build(Worker::A, Building::Pylon, Coord::new(0, 0)), &mut rng)
            .unwrap();
        assert_eq!(state.world.building_at(Coord::new(0, 0)), Some(Building::Pylon));
        assert_eq!(state.world.stockpile.get(Resource::Minerals), 0);
    }

    #[test]
    fn test_required_multiset_needs_every_copy() {
        let mut world = small_world();
        world.building_positions.insert(Coord::new(0, 0), Building::Pylon);
        let lines = [Line::new(true, Building::Pylon), Line::new(true, Building::Pylon)];
        let sim = TurnSimulator::new(world.clone(), &lines, no_deps(), 10, 0.0);
        assert!(!sim.is_success());

        world.building_positions.insert(Coord::new(3, 3), Building::Pylon);
        let sim = TurnSimulator::new(world, &lines, no_deps(), 10, 0.0);
        assert!(sim.is_success());
    }

    #[test]
    fn test_next_actions_reflect_assignments() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sim = TurnSimulator::new(small_world(), &[], no_deps(), 10, 0.0);
        let state = sim.start(&mut rng);
        assert_eq!(
            state.next_actions.get(&Worker::A),
            Some(&WorkerAction::Move(Movement::new(0, 1)))
        );
    }
}
