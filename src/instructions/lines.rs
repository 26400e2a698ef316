//! Instruction line generation
//!
//! An instruction list is a concatenation of dependency chains. Every
//! building in a chain except the last is an intermediate step
//! (`required = false`); the last is the goal (`required = true`).

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::CurriculumSetting;
use crate::core::error::{EnvError, Result};
use crate::instructions::dependencies::Dependencies;
use crate::world::objects::Building;

/// One instruction entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub required: bool,
    pub building: Building,
}

impl Line {
    pub fn new(required: bool, building: Building) -> Self {
        Self { required, building }
    }

    /// `[required, building id]` as fed to the policy
    pub fn encode(&self) -> [usize; 2] {
        [self.required as usize, self.building.index()]
    }
}

/// Sample an instruction count from the curriculum and fill it with chains
pub fn build_lines<R: Rng + ?Sized>(
    rng: &mut R,
    dependencies: &Dependencies,
    curriculum: &CurriculumSetting,
) -> Result<Vec<Line>> {
    let n_lines = curriculum.n_lines.sample(rng);
    if n_lines == 0 || n_lines > curriculum.max_lines {
        return Err(EnvError::Generation(format!(
            "instruction budget {} outside 1..={}",
            n_lines, curriculum.max_lines
        )));
    }

    let lines = lines_within_budget(rng, dependencies, n_lines)?;

    let required_assimilators = lines
        .iter()
        .filter(|l| l.required && l.building.is_assimilator())
        .count();
    if required_assimilators > 1 {
        return Err(EnvError::Generation(format!(
            "{} required Assimilator lines",
            required_assimilators
        )));
    }

    Ok(lines)
}

/// Fill exactly `budget` lines
///
/// Each round picks uniformly among buildings whose chain still fits, which
/// draws from the same distribution as retrying until a pick fits. Once the
/// Assimilator has been a goal it is no longer eligible.
pub fn lines_within_budget<R: Rng + ?Sized>(
    rng: &mut R,
    dependencies: &Dependencies,
    budget: usize,
) -> Result<Vec<Line>> {
    let mut lines = Vec::with_capacity(budget);
    let mut remaining = budget;
    let mut include_assimilator = true;

    while remaining > 0 {
        let candidates: Vec<Vec<Building>> = Building::ALL
            .iter()
            .filter(|b| include_assimilator || !b.is_assimilator())
            .map(|b| dependencies.chain(*b))
            .filter(|chain| chain.len() <= remaining)
            .collect();

        let chain = candidates.choose(rng).ok_or_else(|| {
            EnvError::Generation(format!("no dependency chain fits {} lines", remaining))
        })?;
        let Some((goal, intermediate)) = chain.split_last() else {
            return Err(EnvError::Generation("empty dependency chain".into()));
        };

        lines.extend(intermediate.iter().map(|b| Line::new(false, *b)));
        lines.push(Line::new(true, *goal));

        remaining -= chain.len();
        include_assimilator &= !goal.is_assimilator();
    }

    Ok(lines)
}
