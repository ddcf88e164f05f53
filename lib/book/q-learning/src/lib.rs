/*
 * Copyright (C) 2023 Asim Ihsan
 * SPDX-License-Identifier: AGPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU Affero General Public License as published by the Free
 * Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A
 * PARTICULAR PURPOSE. See the GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License along
 * with this program. If not, see <https://www.gnu.org/licenses/>
 */

//! Tabular state-action values for a grid agent, with an epsilon-greedy
//! exploration choice.
//!
//! See Chapter 22: Reinforcement Learning, section 22.3. This is the
//! simplified single-step variant: entries are seeded from a model-based
//! prior the first time they are touched, and afterwards adjusted by the
//! whole temporal difference in one step. The table is deliberately
//! process-lived: one table is shared across every episode so that what one
//! run learns, the next run keeps.

use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng as _;
use serde::{Deserialize, Serialize};
use wumpus_world_logic::{Direction, Grid, Room};

pub type Rng = rand_pcg::Pcg64;

/// Discount factor for the single-step adjustment. The cave is small and
/// episodes are short; the update is undiscounted.
pub const DISCOUNT: f64 = 1.0;

/// State-action values: one slot per (room, direction) pair. Unset slots
/// stay unset until their first update, at which point they take the prior
/// passed in rather than an arbitrary zero.
///
/// Share it as `Rc<RefCell<ValueTable>>` and hand clones of the handle to
/// each agent; `reset()` on the agent must leave the table alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTable {
    grid: Grid,
    entries: Vec<Option<f64>>,
}

impl ValueTable {
    pub fn new(grid: Grid) -> Self {
        let entries = vec![None; grid.side() * grid.side() * Direction::ALL.len()];
        Self { grid, entries }
    }

    fn slot(&self, room: Room, direction: Direction) -> usize {
        (room.col * self.grid.side() + room.row) * Direction::ALL.len() + direction.index()
    }

    pub fn get(&self, room: Room, direction: Direction) -> Option<f64> {
        self.entries[self.slot(room, direction)]
    }

    /// Apply one transition's worth of learning to the (state, action) slot.
    ///
    /// A slot touched for the first time is initialized to `prior` (the
    /// caller's safety estimate for the state room). A slot already set
    /// moves by the full temporal difference `reward + DISCOUNT * 1 - v`.
    pub fn record_transition(&mut self, state: Room, action: Direction, reward: f64, prior: f64) {
        let slot = self.slot(state, action);
        match self.entries[slot] {
            None => self.entries[slot] = Some(prior),
            Some(value) => {
                self.entries[slot] = Some(value + (reward + DISCOUNT * 1.0 - value));
            }
        }
    }

    /// The candidate direction with the highest value for `state`. Unset
    /// slots read as zero; ties keep the earliest candidate, so the caller's
    /// enumeration order decides. `None` only when `candidates` is empty.
    pub fn best_direction(&self, state: Room, candidates: &[Direction]) -> Option<Direction> {
        let (&first, rest) = candidates.split_first()?;
        let mut best = first;
        let mut best_value = self.get(state, first).unwrap_or(0.0);
        for &candidate in rest {
            let value = self.get(state, candidate).unwrap_or(0.0);
            if value > best_value {
                best = candidate;
                best_value = value;
            }
        }
        Some(best)
    }
}

/// The two-armed choice between exploiting a model-based policy and
/// exploring by table values: explore with probability epsilon.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    epsilon: f64,
    rng: Rc<RefCell<Rng>>,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64, rng: Rc<RefCell<Rng>>) -> Self {
        Self { epsilon, rng }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// True when this step should take the exploration branch. With epsilon
    /// zero this never fires, whatever the generator yields.
    pub fn explores(&mut self) -> bool {
        self.rng.borrow_mut().gen::<f64>() < self.epsilon
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_first_touch_takes_the_prior() {
        let mut table = ValueTable::new(Grid::default());
        let state = Room::new(0, 3);
        table.record_transition(state, Direction::Right, -1.0, 1.0);
        assert_abs_diff_eq!(table.get(state, Direction::Right).unwrap(), 1.0);
    }

    #[test]
    fn test_set_slot_moves_by_the_whole_temporal_difference() {
        let mut table = ValueTable::new(Grid::default());
        let state = Room::new(0, 3);
        table.record_transition(state, Direction::Right, -1.0, 1.0);
        // v + (reward + 1 - v) collapses to reward + 1
        table.record_transition(state, Direction::Right, -1.0, 1.0);
        assert_abs_diff_eq!(table.get(state, Direction::Right).unwrap(), 0.0);
        table.record_transition(state, Direction::Right, 1000.0, 1.0);
        assert_abs_diff_eq!(table.get(state, Direction::Right).unwrap(), 1001.0);
    }

    #[test]
    fn test_slots_are_independent() {
        let mut table = ValueTable::new(Grid::default());
        table.record_transition(Room::new(1, 1), Direction::Up, -1.0, 0.5);
        assert_eq!(table.get(Room::new(1, 1), Direction::Down), None);
        assert_eq!(table.get(Room::new(1, 2), Direction::Up), None);
        assert_abs_diff_eq!(table.get(Room::new(1, 1), Direction::Up).unwrap(), 0.5);
    }

    #[test]
    fn test_best_direction_breaks_ties_by_candidate_order() {
        let table = ValueTable::new(Grid::default());
        let state = Room::new(2, 2);
        // all slots unset: the first enumerated candidate wins
        assert_eq!(
            table.best_direction(state, &[Direction::Left, Direction::Up]),
            Some(Direction::Left)
        );
        assert_eq!(table.best_direction(state, &[]), None);
    }

    #[test]
    fn test_best_direction_prefers_strictly_higher_values() {
        let mut table = ValueTable::new(Grid::default());
        let state = Room::new(2, 2);
        table.record_transition(state, Direction::Down, 3.0, 3.0);
        assert_eq!(
            table.best_direction(
                state,
                &[Direction::Left, Direction::Down, Direction::Up]
            ),
            Some(Direction::Down)
        );
        // a negative value loses to an unset slot read as zero
        table.record_transition(state, Direction::Down, -5.0, 0.0);
        table.record_transition(state, Direction::Down, -5.0, 0.0);
        assert!(table.get(state, Direction::Down).unwrap() < 0.0);
        assert_eq!(
            table.best_direction(state, &[Direction::Left, Direction::Down]),
            Some(Direction::Left)
        );
    }

    #[test]
    fn test_epsilon_zero_never_explores() {
        let rng = Rc::new(RefCell::new(Rng::seed_from_u64(42)));
        let mut greedy = EpsilonGreedy::new(0.0, rng);
        for _ in 0..1000 {
            assert!(!greedy.explores());
        }
    }

    #[test]
    fn test_epsilon_one_always_explores() {
        let rng = Rc::new(RefCell::new(Rng::seed_from_u64(42)));
        let mut greedy = EpsilonGreedy::new(1.0, rng);
        for _ in 0..1000 {
            assert!(greedy.explores());
        }
    }
}
