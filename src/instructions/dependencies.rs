//! Random dependency forest over building types

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::error::{EnvError, Result};
use crate::world::objects::Building;

/// Building -> optional prerequisite, acyclic by construction
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    /// Generation order, Assimilator first
    pairs: Vec<(Building, Option<Building>)>,
    lookup: AHashMap<Building, Option<Building>>,
}

impl Dependencies {
    /// Build from explicit pairs, rejecting duplicates and cycles
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (Building, Option<Building>)>,
    ) -> Result<Self> {
        let mut deps = Self::default();
        for (building, dependency) in pairs {
            if deps.lookup.insert(building, dependency).is_some() {
                return Err(EnvError::Generation(format!(
                    "{} listed twice in dependencies",
                    building
                )));
            }
            deps.pairs.push((building, dependency));
        }
        if let Some(building) = deps.find_cycle() {
            return Err(EnvError::Generation(format!(
                "dependency cycle through {}",
                building
            )));
        }
        Ok(deps)
    }

    /// Direct prerequisite of `building` (unlisted buildings have none)
    pub fn get(&self, building: Building) -> Option<Building> {
        self.lookup.get(&building).copied().flatten()
    }

    pub fn pairs(&self) -> &[(Building, Option<Building>)] {
        &self.pairs
    }

    /// Full chain ending in `building`, root prerequisite first
    pub fn chain(&self, building: Building) -> Vec<Building> {
        let mut chain = vec![building];
        let mut current = building;
        while let Some(dependency) = self.get(current) {
            chain.push(dependency);
            current = dependency;
        }
        chain.reverse();
        chain
    }

    fn find_cycle(&self) -> Option<Building> {
        let limit = self.pairs.len();
        self.pairs.iter().map(|(b, _)| *b).find(|start| {
            let mut current = *start;
            for _ in 0..=limit {
                match self.get(current) {
                    Some(next) => current = next,
                    None => return false,
                }
            }
            true
        })
    }
}

/// Generate a dependency forest
///
/// The Assimilator never has a prerequisite. The other buildings are
/// shuffled; the i-th of the first `min(max_depth, n)` gets the building at
/// shuffled index `round(u * i) - 1` (none when negative), so a prerequisite
/// always precedes its dependent and no cycle can form.
pub fn build_dependencies<R: Rng + ?Sized>(rng: &mut R, max_depth: usize) -> Dependencies {
    let mut buildings: Vec<Building> = Building::ALL
        .iter()
        .copied()
        .filter(|b| !b.is_assimilator())
        .collect();
    buildings.shuffle(rng);

    let n = max_depth.min(buildings.len());
    let mut pairs = Vec::with_capacity(Building::ALL.len());
    pairs.push((Building::Assimilator, None));

    for (i, building) in buildings.iter().enumerate() {
        let dependency = if i < n {
            let index = (rng.gen::<f64>() * i as f64).round() as i64 - 1;
            usize::try_from(index).ok().map(|k| buildings[k])
        } else {
            None
        };
        pairs.push((*building, dependency));
    }

    let lookup = pairs.iter().copied().collect();
    Dependencies { pairs, lookup }
}
