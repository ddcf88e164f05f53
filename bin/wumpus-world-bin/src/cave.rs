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

//! A small cave simulator to drive the agent. Demo and test scaffolding;
//! the agent only ever sees its percepts.

use agents::Environment;
use wumpus_world_logic::{Action, Direction, Grid, Percept, Room, WumpusWorldError};

pub struct Cave {
    grid: Grid,
    pits: Vec<Room>,
    wumpus: Room,
    wumpus_alive: bool,
    gold: Option<Room>,
    agent_position: Room,
    agent_facing: Direction,
    has_arrow: bool,
    bumped: bool,
    scream: bool,
    holding_gold: bool,
    exited: bool,
    dead: bool,
    score_delta: i32,
}

impl Cave {
    pub fn new(
        grid: Grid,
        pits: Vec<Room>,
        wumpus: Room,
        gold: Room,
        start: Room,
        start_facing: Direction,
    ) -> Result<Self, WumpusWorldError> {
        for &room in pits.iter().chain([&wumpus, &gold, &start]) {
            if !grid.contains(room) {
                return Err(WumpusWorldError::OutOfBounds(room.col, room.row));
            }
        }
        Ok(Self {
            grid,
            pits,
            wumpus,
            wumpus_alive: true,
            gold: Some(gold),
            agent_position: start,
            agent_facing: start_facing,
            has_arrow: true,
            bumped: false,
            scream: false,
            holding_gold: false,
            exited: false,
            dead: false,
            score_delta: 0,
        })
    }

    /// The cave from Chapter 7, figure 7.2: pits in three rooms, the wumpus
    /// in the left column, the gold next to it, start in the bottom-left
    /// corner facing right.
    pub fn chapter_seven() -> Self {
        let grid = Grid::default();
        Cave::new(
            grid,
            vec![Room::new(2, 3), Room::new(2, 1), Room::new(3, 0)],
            Room::new(0, 1),
            Room::new(1, 1),
            Room::new(0, 3),
            Direction::Right,
        )
        .expect("figure 7.2 layout fits the default grid")
    }

    pub fn agent_position(&self) -> Room {
        self.agent_position
    }

    pub fn is_agent_dead(&self) -> bool {
        self.dead
    }

    pub fn is_gold_taken(&self) -> bool {
        self.holding_gold
    }

    fn deadly(&self, room: Room) -> bool {
        self.pits.contains(&room) || (self.wumpus_alive && room == self.wumpus)
    }

    fn stench_at(&self, room: Room) -> bool {
        self.wumpus_alive
            && (room == self.wumpus || self.grid.neighbors(room).contains(&self.wumpus))
    }

    fn breeze_at(&self, room: Room) -> bool {
        self.grid
            .neighbors(room)
            .iter()
            .any(|neighbor| self.pits.contains(neighbor))
    }
}

impl Environment for Cave {
    type Action = Action;
    type Percept = Percept;
    type Score = i32;

    fn percept(&self) -> Percept {
        Percept {
            stench: self.stench_at(self.agent_position),
            breeze: self.breeze_at(self.agent_position),
            glitter: self.gold == Some(self.agent_position),
            bump: self.bumped,
            scream: self.scream,
        }
    }

    fn execute_action(&mut self, action: &Action) {
        self.score_delta = -1;
        self.bumped = false;
        match action {
            Action::Move => {
                let next = self.grid.step(self.agent_position, self.agent_facing);
                self.bumped = next == self.agent_position;
                self.agent_position = next;
                if self.deadly(next) {
                    self.dead = true;
                    self.score_delta -= 1000;
                }
            }
            Action::TurnLeft => {
                self.agent_facing = self.agent_facing.turned_left();
            }
            Action::TurnRight => {
                self.agent_facing = self.agent_facing.turned_right();
            }
            Action::Grab => {
                if self.gold == Some(self.agent_position) {
                    self.gold = None;
                    self.holding_gold = true;
                    self.score_delta += 1000;
                }
            }
            Action::Shoot => {
                if self.has_arrow {
                    self.has_arrow = false;
                    // the arrow flies in a straight line until a wall
                    let mut room = self.agent_position;
                    loop {
                        let next = self.grid.step(room, self.agent_facing);
                        if next == room {
                            break;
                        }
                        room = next;
                        if self.wumpus_alive && room == self.wumpus {
                            self.wumpus_alive = false;
                            self.scream = true;
                            break;
                        }
                    }
                }
            }
            Action::Exit => {
                self.exited = true;
            }
        }
    }

    fn score(&self) -> i32 {
        self.score_delta
    }

    fn is_done(&self) -> bool {
        self.exited || self.dead
    }
}
