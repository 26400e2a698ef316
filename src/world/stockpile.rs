//! Stockpile - gathered resource counts

use serde::{Deserialize, Serialize};

use crate::world::objects::{Cost, Resource};

/// Resources deposited at any Nexus, indexed by `Resource::index`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stockpile {
    counts: [u32; 2],
}

impl Stockpile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amounts(minerals: u32, gas: u32) -> Self {
        Self {
            counts: [minerals, gas],
        }
    }

    /// Get current amount of a resource
    pub fn get(&self, resource: Resource) -> u32 {
        self.counts[resource.index()]
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        self.counts[resource.index()] += amount;
    }

    /// Check if the stockpile covers every component of `cost`
    pub fn has_materials(&self, cost: &Cost) -> bool {
        cost.requirements()
            .iter()
            .all(|(res, amount)| self.get(*res) >= *amount)
    }

    /// Deduct `cost` atomically, returns true if successful
    pub fn consume_materials(&mut self, cost: &Cost) -> bool {
        if !self.has_materials(cost) {
            return false;
        }
        for (res, amount) in cost.requirements() {
            self.counts[res.index()] -= amount;
        }
        true
    }

    /// Counts in `Resource::ALL` order
    pub fn counts(&self) -> [u32; 2] {
        self.counts
    }
}
