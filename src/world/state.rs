//! Owned world state and occupancy queries

use ahash::AHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::Coord;
use crate::world::objects::{Building, Resource, Worker, WorldObject};
use crate::world::stockpile::Stockpile;

/// Positions of everything in the grid plus the gathered stockpile
///
/// Buildings are tracked only in `building_positions`; workers and resource
/// sites only in their own maps. A worker may stand on a building's cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub size: usize,
    pub building_positions: BTreeMap<Coord, Building>,
    pub workers: BTreeMap<Worker, Coord>,
    pub resource_sites: BTreeMap<Resource, Coord>,
    pub stockpile: Stockpile,
}

impl WorldState {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            building_positions: BTreeMap::new(),
            workers: BTreeMap::new(),
            resource_sites: BTreeMap::new(),
            stockpile: Stockpile::new(),
        }
    }

    pub fn building_at(&self, coord: Coord) -> Option<Building> {
        self.building_positions.get(&coord).copied()
    }

    pub fn resource_site(&self, resource: Resource) -> Option<Coord> {
        self.resource_sites.get(&resource).copied()
    }

    pub fn worker_position(&self, worker: Worker) -> Option<Coord> {
        self.workers.get(&worker).copied()
    }

    pub fn nexus_positions(&self) -> Vec<Coord> {
        self.building_positions
            .iter()
            .filter(|(_, b)| b.is_nexus())
            .map(|(c, _)| *c)
            .collect()
    }

    /// True if `coord` is either resource site
    pub fn is_resource_site(&self, coord: Coord) -> bool {
        self.resource_sites.values().any(|c| *c == coord)
    }

    /// Gas can only be gathered through an Assimilator on the gas site
    pub fn gas_extractable(&self) -> bool {
        self.resource_site(Resource::Gas)
            .and_then(|c| self.building_at(c))
            .is_some_and(|b| b.is_assimilator())
    }

    /// Multiset of standing buildings
    pub fn building_counts(&self) -> AHashMap<Building, usize> {
        let mut counts = AHashMap::new();
        for building in self.building_positions.values() {
            *counts.entry(*building).or_insert(0) += 1;
        }
        counts
    }

    pub fn contains_building(&self, building: Building) -> bool {
        self.building_positions.values().any(|b| *b == building)
    }

    /// Every placed object with its cell
    pub fn objects(&self) -> impl Iterator<Item = (WorldObject, Coord)> + '_ {
        let buildings = self
            .building_positions
            .iter()
            .map(|(c, b)| (WorldObject::Building(*b), *c));
        let workers = self.workers.iter().map(|(w, c)| (WorldObject::Worker(*w), *c));
        let resources = self
            .resource_sites
            .iter()
            .map(|(r, c)| (WorldObject::Resource(*r), *c));
        buildings.chain(workers).chain(resources)
    }

    /// Independently remove each non-Nexus building with probability `prob`
    ///
    /// Rolls are taken in coordinate order, so a seeded RNG reproduces the
    /// same destruction sequence.
    pub fn destroy_buildings<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        prob: f64,
    ) -> Vec<(Coord, Building)> {
        if prob <= 0.0 {
            return Vec::new();
        }
        let destroyed: Vec<(Coord, Building)> = self
            .building_positions
            .iter()
            .filter(|(_, b)| !b.is_nexus())
            .filter(|_| rng.gen::<f64>() < prob)
            .map(|(c, b)| (*c, *b))
            .collect();
        for (coord, _) in &destroyed {
            self.building_positions.remove(coord);
        }
        destroyed
    }
}
