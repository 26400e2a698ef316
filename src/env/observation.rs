//! Observation encoding for the policy

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::command::compound::{ActionClass, CompoundAction, Target};
use crate::instructions::lines::Line;
use crate::simulation::state::State;
use crate::world::objects::{Resource, Worker, NUM_CHANNELS};
use crate::world::state::WorldState;

/// Everything the policy sees after a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// One-hot object grid, `[channel][i][j]` flattened
    pub grid: Vec<f32>,
    /// Stockpile counts in `Resource::ALL` order
    pub resources: Vec<u32>,
    /// `[required, building id]` per line, padded with `[0, 0]`
    pub lines: Vec<[usize; 2]>,
    /// True for padding entries
    pub line_mask: Vec<bool>,
    pub ptr: usize,
    /// Next `WorkerAction` id per worker in `Worker::ALL` order
    pub next_actions: Vec<usize>,
    pub action_mask: Vec<bool>,
    pub can_open_gate: Vec<bool>,
    pub partial_action: Vec<usize>,
}

/// Dimensions of each observation component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationShape {
    pub grid: [usize; 3],
    pub resources: usize,
    pub lines: [usize; 2],
    pub next_actions: usize,
    pub action_mask: usize,
    pub partial_action: usize,
}

impl ObservationShape {
    pub fn new(world_size: usize, max_lines: usize) -> Self {
        Self {
            grid: [NUM_CHANNELS, world_size, world_size],
            resources: Resource::ALL.len(),
            lines: [max_lines, 2],
            next_actions: Worker::ALL.len(),
            action_mask: ActionClass::max_size_a(world_size),
            partial_action: CompoundAction::partial_nvec(world_size).len(),
        }
    }
}

/// Encodes per-tick states for one episode's instruction list
#[derive(Debug, Clone)]
pub struct ObservationEncoder {
    shape: ObservationShape,
    lines: Vec<Line>,
    padded: Vec<[usize; 2]>,
    line_mask: Vec<bool>,
}

impl ObservationEncoder {
    pub fn new(lines: &[Line], world_size: usize, max_lines: usize) -> Self {
        let padded = (0..max_lines)
            .map(|k| lines.get(k).map_or([0, 0], Line::encode))
            .collect();
        let line_mask = (0..max_lines).map(|k| k >= lines.len()).collect();
        Self {
            shape: ObservationShape::new(world_size, max_lines),
            lines: lines.to_vec(),
            padded,
            line_mask,
        }
    }

    pub fn shape(&self) -> ObservationShape {
        self.shape
    }

    pub fn advance(&self, state: &State) -> Observation {
        let [channels, rows, cols] = self.shape.grid;
        let mut grid = vec![0.0; channels * rows * cols];
        for (object, coord) in state.world.objects() {
            if coord.in_bounds(state.world.size) {
                grid[object.channel() * rows * cols + coord.cell_index(cols)] = 1.0;
            }
        }

        let next_actions = Worker::ALL
            .iter()
            .map(|w| state.next_actions.get(w).map_or(0, |a| a.id()))
            .collect();

        Observation {
            grid,
            resources: state.world.stockpile.counts().to_vec(),
            lines: self.padded.clone(),
            line_mask: self.line_mask.clone(),
            ptr: state.pointer,
            next_actions,
            action_mask: state.action.mask(self.shape.action_mask),
            can_open_gate: state.action.can_open_gate(self.shape.action_mask),
            partial_action: state.action.partial_actions(),
        }
    }

    /// Text view of the lines and grid
    ///
    /// Required lines already satisfied by a standing building lose their `*`,
    /// each standing building satisfying at most one line.
    pub fn render(&self, state: &State) -> String {
        let mut out = String::new();
        let mut standing: Vec<_> = state.world.building_positions.values().copied().collect();

        for (k, line) in self.lines.iter().enumerate() {
            let built = standing.iter().position(|b| *b == line.building);
            if line.required {
                if let Some(idx) = built {
                    standing.swap_remove(idx);
                }
            }
            let _ = writeln!(
                out,
                "{:2}{}{} ({}) {}: {}",
                k,
                if k == state.pointer { '-' } else { ' ' },
                if line.required && built.is_none() { '*' } else { ' ' },
                Target::Building(line.building).index(),
                line.building,
                line.building.cost(),
            );
        }
        out.push_str(&render_grid(&state.world));
        out
    }
}

const CELL_WIDTH: usize = 5;

/// One cell per column, symbols of every object in the cell
pub fn render_grid(world: &WorldState) -> String {
    let width = CELL_WIDTH;
    let mut cells = vec![String::new(); world.size * world.size];
    for (object, coord) in world.objects() {
        if coord.in_bounds(world.size) {
            cells[coord.cell_index(world.size)].push(object.symbol());
        }
    }

    let mut out = String::new();
    for row in cells.chunks(world.size) {
        for cell in row {
            let _ = write!(out, "{:<width$}|", cell, width = width);
        }
        out.push('\n');
        out.push_str(&"-".repeat((width + 1) * world.size));
        out.push('\n');
    }
    out
}
