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

#![warn(missing_docs)]

//! Wumpus World game logic.
//!
//! This is a library for the Wumpus World cave. It holds the value types an
//! agent and an environment exchange (rooms, directions, percepts, actions)
//! and the grid geometry. See Chapter 7, section 7.2.

use serde::{Deserialize, Serialize};

/// Default cave side length. The book's cave is 4x4.
pub const DEFAULT_SIDE: usize = 4;

/// Wumpus World error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WumpusWorldError {
    /// Room coordinates fall outside the grid.
    #[error("room ({0}, {1}) is outside the grid")]
    OutOfBounds(usize, usize),

    /// Grid side is too small to hold a cave.
    #[error("grid side must be at least 2, got {0}")]
    GridTooSmall(usize),
}

/// A room in the cave, addressed column-first. Row 0 is the top of the map;
/// the conventional start room is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Room {
    /// Column, increasing to the right.
    pub col: usize,

    /// Row, increasing downward.
    pub row: usize,
}

impl Room {
    /// Create a room without bounds checking. Use [`Grid::room`] when the
    /// coordinates come from outside.
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    /// Direction from this room to an orthogonally adjacent one. `None` for
    /// identical or non-adjacent rooms.
    pub fn direction_to(&self, other: Room) -> Option<Direction> {
        let dcol = other.col as isize - self.col as isize;
        let drow = other.row as isize - self.row as isize;
        match (dcol, drow) {
            (0, -1) => Some(Direction::Up),
            (1, 0) => Some(Direction::Right),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            _ => None,
        }
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A facing or movement direction. The index order Up, Right, Down, Left is
/// load-bearing: turn arithmetic and value-table columns both use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward row 0.
    Up,

    /// Toward the last column.
    Right,

    /// Toward the last row.
    Down,

    /// Toward column 0.
    Left,
}

impl Direction {
    /// All directions in index order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Index of this direction in [`Direction::ALL`].
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }

    /// Facing after a left (counter-clockwise) turn.
    pub fn turned_left(self) -> Direction {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }

    /// Facing after a right (clockwise) turn.
    pub fn turned_right(self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// The single turn that makes progress toward facing `target`: `Right`
    /// when the target is exactly one clockwise turn away, `Left` otherwise.
    /// A 180-degree reversal therefore takes two consecutive left turns.
    pub fn turn_toward(self, target: Direction) -> Turn {
        if target == self.turned_right() {
            Turn::Right
        } else {
            Turn::Left
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Right => write!(f, "right"),
            Direction::Down => write!(f, "down"),
            Direction::Left => write!(f, "left"),
        }
    }
}

/// A single turn step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Turn {
    /// Counter-clockwise.
    Left,

    /// Clockwise.
    Right,
}

/// The square cave grid. Only geometry lives here; hazards belong to the
/// environment and the agent's beliefs about them to its knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    side: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Self { side: DEFAULT_SIDE }
    }
}

impl Grid {
    /// Create a grid with the given side length.
    pub fn new(side: usize) -> Result<Self, WumpusWorldError> {
        if side < 2 {
            return Err(WumpusWorldError::GridTooSmall(side));
        }
        Ok(Self { side })
    }

    /// Side length.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Whether the room lies inside the grid.
    pub fn contains(&self, room: Room) -> bool {
        room.col < self.side && room.row < self.side
    }

    /// Checked room constructor.
    pub fn room(&self, col: usize, row: usize) -> Result<Room, WumpusWorldError> {
        if col < self.side && row < self.side {
            Ok(Room::new(col, row))
        } else {
            Err(WumpusWorldError::OutOfBounds(col, row))
        }
    }

    /// All rooms, column-major.
    pub fn rooms(&self) -> impl Iterator<Item = Room> {
        let side = self.side;
        (0..side).flat_map(move |col| (0..side).map(move |row| Room::new(col, row)))
    }

    /// Orthogonal neighbors clipped to the grid, always in the order west,
    /// east, north, south. Tie-breaking in the agent's policies relies on
    /// this enumeration order.
    pub fn neighbors(&self, room: Room) -> Vec<Room> {
        let mut rooms = Vec::with_capacity(4);
        if room.col > 0 {
            rooms.push(Room::new(room.col - 1, room.row));
        }
        if room.col + 1 < self.side {
            rooms.push(Room::new(room.col + 1, room.row));
        }
        if room.row > 0 {
            rooms.push(Room::new(room.col, room.row - 1));
        }
        if room.row + 1 < self.side {
            rooms.push(Room::new(room.col, room.row + 1));
        }
        rooms
    }

    /// Room one step in `direction`, clamped at the boundary. Walking into a
    /// wall stays put; the environment reports it as a bump.
    pub fn step(&self, room: Room, direction: Direction) -> Room {
        match direction {
            Direction::Up => Room::new(room.col, room.row.saturating_sub(1)),
            Direction::Right => Room::new((room.col + 1).min(self.side - 1), room.row),
            Direction::Down => Room::new(room.col, (room.row + 1).min(self.side - 1)),
            Direction::Left => Room::new(room.col.saturating_sub(1), room.row),
        }
    }
}

/// What the agent senses in its current room, produced once per step by the
/// environment and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Percept {
    /// A wumpus is in an adjacent room.
    pub stench: bool,

    /// A pit is in an adjacent room.
    pub breeze: bool,

    /// The gold is in this room.
    pub glitter: bool,

    /// The previous move ran into a wall.
    pub bump: bool,

    /// The wumpus has died.
    pub scream: bool,
}

/// One action per step, returned by the agent to the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Step forward in the current facing.
    Move,

    /// Rotate counter-clockwise.
    TurnLeft,

    /// Rotate clockwise.
    TurnRight,

    /// Pick up the gold.
    Grab,

    /// Fire the arrow along the current facing.
    Shoot,

    /// Leave the cave, ending the episode.
    Exit,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Move => write!(f, "move"),
            Action::TurnLeft => write!(f, "turn left"),
            Action::TurnRight => write!(f, "turn right"),
            Action::Grab => write!(f, "grab"),
            Action::Shoot => write!(f, "shoot"),
            Action::Exit => write!(f, "exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_corner_has_two_neighbors() {
        let grid = Grid::default();
        let neighbors = grid.neighbors(Room::new(0, 3));
        assert_eq!(neighbors, vec![Room::new(1, 3), Room::new(0, 2)]);
    }

    #[test]
    fn test_edge_has_three_neighbors() {
        let grid = Grid::default();
        let neighbors = grid.neighbors(Room::new(0, 1));
        assert_eq!(
            neighbors,
            vec![Room::new(1, 1), Room::new(0, 0), Room::new(0, 2)]
        );
    }

    #[test]
    fn test_interior_neighbors_are_ordered_west_east_north_south() {
        let grid = Grid::default();
        let neighbors = grid.neighbors(Room::new(1, 1));
        assert_eq!(
            neighbors,
            vec![
                Room::new(0, 1),
                Room::new(2, 1),
                Room::new(1, 0),
                Room::new(1, 2)
            ]
        );
    }

    #[test]
    fn test_direction_to_adjacent_rooms() {
        let room = Room::new(1, 1);
        assert_eq!(room.direction_to(Room::new(1, 0)), Some(Direction::Up));
        assert_eq!(room.direction_to(Room::new(2, 1)), Some(Direction::Right));
        assert_eq!(room.direction_to(Room::new(1, 2)), Some(Direction::Down));
        assert_eq!(room.direction_to(Room::new(0, 1)), Some(Direction::Left));
    }

    #[test]
    fn test_direction_to_rejects_non_adjacent_rooms() {
        let room = Room::new(1, 1);
        assert_eq!(room.direction_to(Room::new(1, 1)), None);
        assert_eq!(room.direction_to(Room::new(2, 2)), None);
        assert_eq!(room.direction_to(Room::new(3, 1)), None);
    }

    #[test]
    fn test_turn_toward_single_right_turn() {
        assert_eq!(Direction::Up.turn_toward(Direction::Right), Turn::Right);
        assert_eq!(Direction::Right.turn_toward(Direction::Down), Turn::Right);
        assert_eq!(Direction::Down.turn_toward(Direction::Left), Turn::Right);
        assert_eq!(Direction::Left.turn_toward(Direction::Up), Turn::Right);
    }

    #[test]
    fn test_turn_toward_prefers_left_otherwise() {
        assert_eq!(Direction::Up.turn_toward(Direction::Left), Turn::Left);
        // a reversal starts with a left turn and finishes with another
        assert_eq!(Direction::Up.turn_toward(Direction::Down), Turn::Left);
        assert_eq!(
            Direction::Up.turned_left().turn_toward(Direction::Down),
            Turn::Left
        );
    }

    #[test]
    fn test_step_clamps_at_walls() {
        let grid = Grid::default();
        assert_eq!(
            grid.step(Room::new(0, 0), Direction::Up),
            Room::new(0, 0)
        );
        assert_eq!(
            grid.step(Room::new(0, 0), Direction::Left),
            Room::new(0, 0)
        );
        assert_eq!(
            grid.step(Room::new(3, 3), Direction::Down),
            Room::new(3, 3)
        );
        assert_eq!(
            grid.step(Room::new(3, 3), Direction::Right),
            Room::new(3, 3)
        );
    }

    #[test]
    fn test_checked_room_constructor() {
        let grid = Grid::default();
        assert_eq!(grid.room(2, 3), Ok(Room::new(2, 3)));
        assert_eq!(grid.room(4, 0), Err(WumpusWorldError::OutOfBounds(4, 0)));
    }

    #[test]
    fn test_grid_rejects_degenerate_side() {
        assert_eq!(Grid::new(1), Err(WumpusWorldError::GridTooSmall(1)));
        assert_eq!(Grid::new(0), Err(WumpusWorldError::GridTooSmall(0)));
        assert!(Grid::new(4).is_ok());
    }

    #[test]
    fn test_rooms_covers_the_whole_grid() {
        let grid = Grid::default();
        let rooms: Vec<Room> = grid.rooms().collect();
        assert_eq!(rooms.len(), 16);
        assert!(rooms.iter().all(|&r| grid.contains(r)));
    }

    fn arb_room() -> impl Strategy<Value = Room> {
        (0..DEFAULT_SIDE, 0..DEFAULT_SIDE).prop_map(|(col, row)| Room::new(col, row))
    }

    fn arb_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Right),
            Just(Direction::Down),
            Just(Direction::Left),
        ]
    }

    proptest! {
        #[test]
        fn prop_neighbors_stay_in_bounds_and_adjacent(room in arb_room()) {
            let grid = Grid::default();
            for neighbor in grid.neighbors(room) {
                prop_assert!(grid.contains(neighbor));
                prop_assert!(room.direction_to(neighbor).is_some());
            }
        }

        #[test]
        fn prop_step_stays_in_bounds(room in arb_room(), direction in arb_direction()) {
            let grid = Grid::default();
            prop_assert!(grid.contains(grid.step(room, direction)));
        }

        #[test]
        fn prop_unclamped_step_round_trips(room in arb_room(), direction in arb_direction()) {
            let grid = Grid::default();
            let next = grid.step(room, direction);
            if next != room {
                prop_assert_eq!(room.direction_to(next), Some(direction));
            }
        }

        #[test]
        fn prop_four_turns_return_to_start(direction in arb_direction()) {
            prop_assert_eq!(
                direction
                    .turned_left()
                    .turned_left()
                    .turned_left()
                    .turned_left(),
                direction
            );
            prop_assert_eq!(direction.turned_left().turned_right(), direction);
        }
    }
}
