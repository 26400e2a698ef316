//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Grid cell coordinate
///
/// Ordered (row-major) so that maps keyed by `Coord` iterate deterministically.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coord {
    pub i: i32,
    pub j: i32,
}

impl Coord {
    pub fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    pub fn manhattan(&self, other: &Self) -> i32 {
        (self.i - other.i).abs() + (self.j - other.j).abs()
    }

    /// True if the coordinate lies inside a `size` x `size` grid
    pub fn in_bounds(&self, size: usize) -> bool {
        let size = size as i32;
        (0..size).contains(&self.i) && (0..size).contains(&self.j)
    }

    /// Row-major cell index inside a `size` x `size` grid
    pub fn cell_index(&self, size: usize) -> usize {
        self.i as usize * size + self.j as usize
    }

    /// The four axis-aligned neighbours, in `+i, -i, +j, -j` order
    pub fn neighbours(&self) -> [Coord; 4] {
        [
            *self + Movement::new(1, 0),
            *self + Movement::new(-1, 0),
            *self + Movement::new(0, 1),
            *self + Movement::new(0, -1),
        ]
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// Single-step movement delta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Movement {
    pub di: i32,
    pub dj: i32,
}

impl Movement {
    pub const STAY: Movement = Movement { di: 0, dj: 0 };

    /// Every movement a worker can take, in id order
    pub const ALL: [Movement; 5] = [
        Movement::STAY,
        Movement { di: 1, dj: 0 },
        Movement { di: -1, dj: 0 },
        Movement { di: 0, dj: 1 },
        Movement { di: 0, dj: -1 },
    ];

    pub fn new(di: i32, dj: i32) -> Self {
        Self { di, dj }
    }

    /// One axis-aligned step from `from` toward `to`
    ///
    /// Closes the `i` gap before the `j` gap. No obstacle avoidance.
    pub fn toward(from: Coord, to: Coord) -> Self {
        if from.i != to.i {
            Self::new((to.i - from.i).signum(), 0)
        } else {
            Self::new(0, (to.j - from.j).signum())
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|m| m == self)
            .unwrap_or(0)
    }
}

impl std::ops::Add<Movement> for Coord {
    type Output = Coord;
    fn add(self, rhs: Movement) -> Coord {
        Coord {
            i: self.i + rhs.di,
            j: self.j + rhs.dj,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_toward_closes_i_first() {
        let from = Coord::new(0, 0);
        assert_eq!(Movement::toward(from, Coord::new(3, 2)), Movement::new(1, 0));
        assert_eq!(Movement::toward(from, Coord::new(0, 2)), Movement::new(0, 1));
        assert_eq!(Movement::toward(Coord::new(2, 2), Coord::new(2, 0)), Movement::new(0, -1));
    }

    #[test]
    fn test_movement_toward_self_is_stay() {
        let c = Coord::new(1, 1);
        assert_eq!(Movement::toward(c, c), Movement::STAY);
    }

    #[test]
    fn test_repeated_steps_reach_target() {
        let target = Coord::new(3, 1);
        let mut pos = Coord::new(0, 3);
        for _ in 0..pos.manhattan(&target) {
            pos = pos + Movement::toward(pos, target);
        }
        assert_eq!(pos, target);
    }

    #[test]
    fn test_in_bounds() {
        assert!(Coord::new(0, 3).in_bounds(4));
        assert!(!Coord::new(4, 0).in_bounds(4));
        assert!(!Coord::new(-1, 0).in_bounds(4));
    }

    #[test]
    fn test_movement_index_round_trips_table() {
        for (idx, m) in Movement::ALL.iter().enumerate() {
            assert_eq!(m.index(), idx);
        }
    }

    #[test]
    fn test_coord_ordering_is_row_major() {
        assert!(Coord::new(0, 3) < Coord::new(1, 0));
        assert!(Coord::new(1, 0) < Coord::new(1, 1));
    }
}
