//! Initial object placement for a fresh episode
//!
//! Layout rules:
//! - One Nexus at a uniformly random cell, with every worker standing on it
//! - Minerals and gas on two distinct in-bounds neighbours of the Nexus
//! - Optionally an Assimilator already on the gas site
//! - `num_initial_buildings` random buildings on distinct free cells
//!   (an Assimilator always goes to the gas site instead)

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::error::{EnvError, Result};
use crate::core::types::Coord;
use crate::world::objects::{Building, Resource, Worker};
use crate::world::state::WorldState;

/// Parameters controlling initial placement
#[derive(Debug, Clone, Copy)]
pub struct PlacementParams {
    pub world_size: usize,
    pub assimilator_prob: f64,
    pub num_initial_buildings: usize,
}

/// Build the starting world for an episode
pub fn place_objects<R: Rng + ?Sized>(rng: &mut R, params: &PlacementParams) -> Result<WorldState> {
    let size = params.world_size;
    let mut world = WorldState::new(size);

    let nexus = Coord::new(rng.gen_range(0..size as i32), rng.gen_range(0..size as i32));
    world.building_positions.insert(nexus, Building::Nexus);
    for worker in Worker::ALL {
        world.workers.insert(worker, nexus);
    }

    let sites: Vec<Coord> = nexus
        .neighbours()
        .into_iter()
        .filter(|c| c.in_bounds(size))
        .collect();
    let chosen: Vec<Coord> = sites.choose_multiple(rng, 2).copied().collect();
    let &[minerals, gas] = chosen.as_slice() else {
        return Err(EnvError::Placement(format!(
            "nexus at {} has fewer than two free neighbours",
            nexus
        )));
    };
    world.resource_sites.insert(Resource::Minerals, minerals);
    world.resource_sites.insert(Resource::Gas, gas);

    if rng.gen::<f64>() < params.assimilator_prob {
        world.building_positions.insert(gas, Building::Assimilator);
    }

    place_initial_buildings(rng, &mut world, params.num_initial_buildings, [nexus, minerals, gas])?;

    Ok(world)
}

fn place_initial_buildings<R: Rng + ?Sized>(
    rng: &mut R,
    world: &mut WorldState,
    count: usize,
    occupied: [Coord; 3],
) -> Result<()> {
    if count == 0 {
        return Ok(());
    }

    let size = world.size as i32;
    let free: Vec<Coord> = (0..size)
        .flat_map(|i| (0..size).map(move |j| Coord::new(i, j)))
        .filter(|c| !occupied.contains(c))
        .collect();
    if free.len() < count {
        return Err(EnvError::Placement(format!(
            "{} initial buildings requested but only {} free cells",
            count,
            free.len()
        )));
    }

    let cells: Vec<Coord> = free.choose_multiple(rng, count).copied().collect();
    let gas = occupied[2];
    for cell in cells {
        let building = *Building::ALL
            .choose(rng)
            .ok_or_else(|| EnvError::Placement("no building types".into()))?;
        let target = if building.is_assimilator() { gas } else { cell };
        world.building_positions.insert(target, building);
    }
    Ok(())
}
