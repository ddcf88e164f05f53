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

//! The hybrid Wumpus World agent: model checking chooses where it is safe to
//! go, a shared value table learns where it is worthwhile to go, and an
//! epsilon-greedy coin decides which voice to listen to each step.
//!
//! The agent talks to its environment through exactly two calls per step:
//! it receives one percept and returns one action. Everything else (the
//! knowledge base, the safety probabilities, the exploration frontier, the
//! backtracking trail) is private deliberation.

use std::cell::RefCell;
use std::rc::Rc;

use serde_derive::{Deserialize, Serialize};
use tracing::{debug, error, info};

use model_checking::{count_models, KnowledgeBase};
use q_learning::{EpsilonGreedy, Rng, ValueTable};
use wumpus_world_logic::{Action, Direction, Grid, Percept, Room, Turn};

/// Agent parameters. The defaults are the conventional cave: 4x4 grid,
/// start in the bottom-left corner facing right, a small exploration rate,
/// a unit cost per step and a large prize for the gold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub grid: Grid,
    pub start: Room,
    pub start_facing: Direction,
    pub epsilon: f64,
    pub step_reward: f64,
    pub goal_reward: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            grid: Grid::default(),
            start: Room::new(0, 3),
            start_facing: Direction::Right,
            epsilon: 0.1,
            step_reward: -1.0,
            goal_reward: 1000.0,
        }
    }
}

/// Per-room safety estimates from model counting.
///
/// Rooms the agent has stood in are pinned at 1.0. A room once estimated at
/// exactly zero stays there: the estimate is refined upward over time for
/// every other room, but a provably deadly room is never rehabilitated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTable {
    grid: Grid,
    entries: Vec<Option<f64>>,
}

impl ProbabilityTable {
    pub fn new(grid: Grid) -> Self {
        let entries = vec![None; grid.side() * grid.side()];
        Self { grid, entries }
    }

    fn slot(&self, room: Room) -> usize {
        room.col * self.grid.side() + room.row
    }

    pub fn get(&self, room: Room) -> Option<f64> {
        self.entries[self.slot(room)]
    }

    /// A survived room is certainly safe.
    pub fn mark_visited(&mut self, room: Room) {
        let slot = self.slot(room);
        self.entries[slot] = Some(1.0);
    }

    /// Replace the estimate, except for rooms already marked at zero.
    pub fn refine(&mut self, room: Room, probability: f64) {
        let slot = self.slot(room);
        if self.entries[slot] == Some(0.0) {
            return;
        }
        self.entries[slot] = Some(probability);
    }
}

// An armed return journey: walk `route` front to back, or cut it short the
// moment `goal` is adjacent.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Backtrack {
    goal: Room,
    route: Vec<Room>,
}

/// The decision-making agent. One instance per cave run; the value table and
/// generator are shared handles so that learning and randomness both outlive
/// [`WumpusAgent::reset`].
pub struct WumpusAgent {
    config: AgentConfig,
    grid: Grid,
    position: Room,
    facing: Direction,
    percepts: Percept,
    kb: KnowledgeBase,
    probabilities: ProbabilityTable,
    values: Rc<RefCell<ValueTable>>,
    greedy: EpsilonGreedy,
    visited: Vec<Room>,
    unvisited: Vec<Room>,
    trail: Vec<Room>,
    pending_move: Option<Room>,
    backtrack: Option<Backtrack>,
    previous: Option<(Room, Direction)>,
    done: bool,
}

impl WumpusAgent {
    pub fn new(
        config: AgentConfig,
        values: Rc<RefCell<ValueTable>>,
        rng: Rc<RefCell<Rng>>,
    ) -> Self {
        let grid = config.grid;
        Self {
            config,
            grid,
            position: config.start,
            facing: config.start_facing,
            percepts: Percept::default(),
            kb: KnowledgeBase::new(grid),
            probabilities: ProbabilityTable::new(grid),
            values,
            greedy: EpsilonGreedy::new(config.epsilon, rng),
            visited: vec![config.start],
            unvisited: Vec::new(),
            trail: vec![config.start],
            pending_move: None,
            backtrack: None,
            previous: None,
            done: false,
        }
    }

    /// Start a new episode: fresh position, facing, knowledge, estimates and
    /// trail. The shared value table survives resets; that is its contract.
    pub fn reset(&mut self) {
        self.position = self.config.start;
        self.facing = self.config.start_facing;
        self.percepts = Percept::default();
        self.kb = KnowledgeBase::new(self.grid);
        self.probabilities = ProbabilityTable::new(self.grid);
        self.visited = vec![self.config.start];
        self.unvisited.clear();
        self.trail = vec![self.config.start];
        self.pending_move = None;
        self.backtrack = None;
        self.previous = None;
        self.done = false;
    }

    /// Store this step's percepts. Call once per step, before
    /// [`WumpusAgent::decide_action`].
    pub fn receive_percept(&mut self, percept: Percept) {
        self.percepts = percept;
    }

    /// Choose this step's action. The priority chain: exit after the gold is
    /// taken, grab when it glitters, finish a pending turn, follow an armed
    /// return route, and only then deliberate.
    pub fn decide_action(&mut self) -> Action {
        if self.done {
            info!("agent exiting the cave");
            return Action::Exit;
        }
        if self.percepts.glitter {
            info!("glitter underfoot, grabbing the gold");
            self.done = true;
            self.apply_reward(self.config.goal_reward);
            return Action::Grab;
        }
        if let Some(target) = self.pending_move {
            return self.advance_toward(target);
        }
        if let Some(action) = self.continue_backtracking() {
            return action;
        }

        self.apply_reward(self.config.step_reward);
        self.kb.record_percept(self.position, self.percepts);
        if !self.visited.contains(&self.position) {
            self.visited.push(self.position);
        }
        let position = self.position;
        self.unvisited.retain(|&room| room != position);
        self.probabilities.mark_visited(position);

        if self.greedy.explores() {
            self.decide_by_values()
        } else {
            self.decide_by_probabilities()
        }
    }

    pub fn position(&self) -> Room {
        self.position
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_backtracking(&self) -> bool {
        self.backtrack.is_some()
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn probabilities(&self) -> &ProbabilityTable {
        &self.probabilities
    }

    pub fn visited(&self) -> &[Room] {
        &self.visited
    }

    // Credit the transition that brought us here. Nothing to credit before
    // the first completed move. A slot touched for the first time takes the
    // safety estimate of its room as prior.
    fn apply_reward(&mut self, reward: f64) {
        if let Some((room, direction)) = self.previous {
            let prior = self.probabilities.get(room).unwrap_or(0.0);
            self.values
                .borrow_mut()
                .record_transition(room, direction, reward, prior);
        }
    }

    // One step of progress toward an adjacent room: a move if already facing
    // it, otherwise a single turn (a reversal needs two lefts over two
    // steps). Non-adjacent targets cannot happen; treated as fatal for the
    // episode.
    fn advance_toward(&mut self, target: Room) -> Action {
        let Some(direction) = self.position.direction_to(target) else {
            error!("{} is not adjacent to {}", target, self.position);
            return Action::Exit;
        };
        if self.facing == direction {
            self.pending_move = None;
            let from = self.position;
            self.position = target;
            self.trail.insert(0, target);
            self.previous = Some((from, direction));
            debug!("moving from {} into {}", from, target);
            Action::Move
        } else {
            self.pending_move = Some(target);
            let turn = self.facing.turn_toward(direction);
            self.facing = match turn {
                Turn::Left => self.facing.turned_left(),
                Turn::Right => self.facing.turned_right(),
            };
            debug!("turning toward {}", target);
            match turn {
                Turn::Left => Action::TurnLeft,
                Turn::Right => Action::TurnRight,
            }
        }
    }

    // While a return route is armed, normal deliberation is suspended. The
    // route was computed from the trail, so every hop should be adjacent
    // when its turn comes; a dead end means the trail bookkeeping was
    // violated and the episode is abandoned.
    fn continue_backtracking(&mut self) -> Option<Action> {
        let backtrack = self.backtrack.clone()?;
        if backtrack.route.is_empty() {
            self.backtrack = None;
            return None;
        }
        let adjacent = self.grid.neighbors(self.position);
        if adjacent.contains(&backtrack.goal) {
            debug!("backtracking done, {} is adjacent", backtrack.goal);
            self.backtrack = None;
            return Some(self.advance_toward(backtrack.goal));
        }
        let next = backtrack.route[0];
        if adjacent.contains(&next) {
            if let Some(active) = self.backtrack.as_mut() {
                active.route.remove(0);
            }
            return Some(self.advance_toward(next));
        }
        error!("backtracking route hit a dead end at {}", self.position);
        Some(Action::Exit)
    }

    // The exploration branch: trust the value table and walk the best-valued
    // direction among the adjacent rooms.
    fn decide_by_values(&mut self) -> Action {
        let candidates = self.grid.neighbors(self.position);
        let directions: Vec<Direction> = candidates
            .iter()
            .filter_map(|&room| self.position.direction_to(room))
            .collect();
        let best = self.values.borrow().best_direction(self.position, &directions);
        let Some(direction) = best else {
            return Action::Exit;
        };
        let target = self.grid.step(self.position, direction);
        debug!("value table prefers {} into {}", direction, target);
        self.advance_toward(target)
    }

    // The model-checking branch: estimate safety for every unexplored
    // neighbor, then go to the best room the frontier offers, backtracking
    // through visited territory when it is not next door.
    fn decide_by_probabilities(&mut self) -> Action {
        let candidates = self.grid.neighbors(self.position);
        let mut valid_moves: Vec<Room> = Vec::new();
        for &candidate in &candidates {
            if self.visited.contains(&candidate) {
                // visited rooms were model checked before they were entered
                valid_moves.push(candidate);
                continue;
            }
            if self.unvisited.contains(&candidate) {
                valid_moves.insert(0, candidate);
            }
            let counts = count_models(&self.kb, self.position, candidate);
            match counts.probability() {
                None => info!("room {} safe in no models", candidate),
                Some(probability) => {
                    self.probabilities.refine(candidate, probability);
                    if probability == 1.0 {
                        if !self.unvisited.contains(&candidate) {
                            self.unvisited.insert(0, candidate);
                        }
                    } else if !self.unvisited.contains(&candidate) {
                        self.unvisited.push(candidate);
                    }
                }
            }
        }

        if !self.unvisited.is_empty() {
            // provably safe rooms first, in frontier order
            for index in 0..self.unvisited.len() {
                let target = self.unvisited[index];
                if self.probabilities.get(target) != Some(1.0) {
                    continue;
                }
                debug!("room {} unvisited and certainly safe", target);
                if candidates.contains(&target) {
                    return self.advance_toward(target);
                }
                if let Some(action) = self.begin_backtracking(target, &valid_moves) {
                    return action;
                }
            }

            // otherwise the strictly best estimate wins, first found on ties
            let mut best: Option<(Room, f64)> = None;
            for &target in &self.unvisited {
                let probability = self.probabilities.get(target).unwrap_or(0.0);
                let better = match best {
                    None => probability > 0.0,
                    Some((_, best_probability)) => probability > best_probability,
                };
                if better {
                    best = Some((target, probability));
                }
            }
            if let Some((target, probability)) = best {
                info!("best frontier room {} at probability {:.3}", target, probability);
                if candidates.contains(&target) {
                    return self.advance_toward(target);
                }
                if let Some(action) = self.begin_backtracking(target, &valid_moves) {
                    return action;
                }
            }

            // nothing reachable on the frontier: shuffle through a visited
            // neighbor rather than stall
            for &room in &valid_moves {
                if candidates.contains(&room) {
                    return self.advance_toward(room);
                }
            }
        }

        info!("no more safe rooms to explore");
        Action::Exit
    }

    // Arm a return journey to a non-adjacent goal: find the most recent
    // trail room adjacent to the goal, and re-walk the trail up to it. Only
    // arms when the first hop is immediately walkable; otherwise reports
    // failure so the caller can try the next target.
    fn begin_backtracking(&mut self, goal: Room, valid_moves: &[Room]) -> Option<Action> {
        for waypoint in self.grid.neighbors(goal) {
            let Some(index) = self.trail.iter().position(|&room| room == waypoint) else {
                continue;
            };
            if index == 0 {
                continue;
            }
            let mut route: Vec<Room> = self.trail[1..=index].to_vec();
            let first = route[0];
            if !valid_moves.contains(&first) {
                continue;
            }
            route.remove(0);
            info!("backtracking toward {} via {}", goal, first);
            self.backtrack = Some(Backtrack { goal, route });
            return Some(self.advance_toward(first));
        }
        None
    }
}

impl agents::Agent for WumpusAgent {
    type Action = Action;
    type Percept = Percept;

    fn act(&mut self, percept: &Percept) -> Action {
        self.receive_percept(*percept);
        self.decide_action()
    }
}

/// Pretty JSON of a learned value table, e.g. to dump at the end of a run.
pub fn serialize_value_table(values: &ValueTable) -> String {
    let output = serde_json::to_string_pretty(values);
    output.unwrap()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn quiet() -> Percept {
        Percept::default()
    }

    fn breeze() -> Percept {
        Percept {
            breeze: true,
            ..Percept::default()
        }
    }

    fn glitter() -> Percept {
        Percept {
            glitter: true,
            ..Percept::default()
        }
    }

    struct Fixture {
        agent: WumpusAgent,
        values: Rc<RefCell<ValueTable>>,
    }

    fn fixture_with_epsilon(epsilon: f64) -> Fixture {
        let values = Rc::new(RefCell::new(ValueTable::new(Grid::default())));
        let rng = Rc::new(RefCell::new(Rng::seed_from_u64(42)));
        let agent = WumpusAgent::new(
            AgentConfig {
                epsilon,
                ..AgentConfig::default()
            },
            Rc::clone(&values),
            rng,
        );
        Fixture { agent, values }
    }

    fn step(agent: &mut WumpusAgent, percept: Percept) -> Action {
        agent.receive_percept(percept);
        agent.decide_action()
    }

    #[test]
    fn test_probability_table_pins_zero_estimates() {
        let mut table = ProbabilityTable::new(Grid::default());
        let room = Room::new(2, 2);
        assert_eq!(table.get(room), None);
        table.refine(room, 0.5);
        assert_eq!(table.get(room), Some(0.5));
        table.refine(room, 0.0);
        table.refine(room, 0.9);
        assert_eq!(table.get(room), Some(0.0));
        table.mark_visited(room);
        assert_eq!(table.get(room), Some(1.0));
    }

    // A quiet start: both neighbors of (0, 3) are provably safe, so the
    // agent heads for the front of the frontier. The target is north while
    // the agent faces right, so the first action is a turn.
    #[test]
    fn test_quiet_start_turns_toward_a_safe_neighbor() {
        let mut fixture = fixture_with_epsilon(0.0);
        let action = step(&mut fixture.agent, quiet());
        assert_eq!(action, Action::TurnLeft);
        assert_eq!(fixture.agent.facing(), Direction::Up);
        assert_eq!(fixture.agent.position(), Room::new(0, 3));

        // both candidates were model checked to certainty
        assert_eq!(fixture.agent.probabilities().get(Room::new(1, 3)), Some(1.0));
        assert_eq!(fixture.agent.probabilities().get(Room::new(0, 2)), Some(1.0));
        // the start room's own percepts were recorded exactly once
        assert_eq!(fixture.agent.knowledge_base().len(), 8);

        // now aligned: the pending move completes
        let action = step(&mut fixture.agent, quiet());
        assert_eq!(action, Action::Move);
        assert_eq!(fixture.agent.position(), Room::new(0, 2));
    }

    #[test]
    fn test_visited_rooms_stay_at_probability_one() {
        let mut fixture = fixture_with_epsilon(0.0);
        for _ in 0..8 {
            let action = step(&mut fixture.agent, quiet());
            if action == Action::Exit {
                break;
            }
        }
        for &room in fixture.agent.visited() {
            assert_eq!(fixture.agent.probabilities().get(room), Some(1.0));
        }
    }

    // Scenario: glitter. The next action is exactly grab, the terminal
    // reward lands on the (previous room, previous action) slot, and the
    // agent leaves on the following step.
    #[test]
    fn test_glitter_grabs_and_credits_the_last_move() {
        let mut fixture = fixture_with_epsilon(0.0);
        // pre-touch the slot the first move will credit, so the terminal
        // update exercises the adjustment rather than the prior
        fixture
            .values
            .borrow_mut()
            .record_transition(Room::new(0, 3), Direction::Up, 0.0, 1.0);

        assert_eq!(step(&mut fixture.agent, quiet()), Action::TurnLeft);
        assert_eq!(step(&mut fixture.agent, quiet()), Action::Move);
        assert_eq!(fixture.agent.position(), Room::new(0, 2));

        assert_eq!(step(&mut fixture.agent, glitter()), Action::Grab);
        assert!(fixture.agent.is_done());
        // v + (1000 + 1 - v) with v = 1.0
        assert_eq!(
            fixture.values.borrow().get(Room::new(0, 3), Direction::Up),
            Some(1001.0)
        );

        assert_eq!(step(&mut fixture.agent, quiet()), Action::Exit);
    }

    // Scenario: epsilon pinned to zero always deliberates from the
    // probability table; epsilon pinned to one always consults the value
    // table. The two branches pick different first moves from a cold start:
    // the frontier prefers the north room, an empty value table defaults to
    // the first candidate direction (east), which needs no turn.
    #[test]
    fn test_epsilon_selects_the_policy_branch() {
        let mut exploit = fixture_with_epsilon(0.0);
        assert_eq!(step(&mut exploit.agent, quiet()), Action::TurnLeft);

        let mut explore = fixture_with_epsilon(1.0);
        assert_eq!(step(&mut explore.agent, quiet()), Action::Move);
        assert_eq!(explore.agent.position(), Room::new(1, 3));
    }

    // Scenario: a safe room that is not adjacent. After a breeze at (0, 2)
    // the only certain frontier room is (1, 3), two moves away: the agent
    // must arm a backtracking route through the trail before it moves.
    #[test]
    fn test_distant_safe_room_triggers_backtracking() {
        let mut fixture = fixture_with_epsilon(0.0);
        assert_eq!(step(&mut fixture.agent, quiet()), Action::TurnLeft);
        assert_eq!(step(&mut fixture.agent, quiet()), Action::Move);
        assert_eq!(fixture.agent.position(), Room::new(0, 2));

        let action = step(&mut fixture.agent, breeze());
        assert!(fixture.agent.is_backtracking());
        // first hop of the return route is the start room, behind us
        assert_eq!(action, Action::TurnLeft);
        assert_eq!(fixture.agent.probabilities().get(Room::new(1, 3)), Some(1.0));

        // two-step reversal, then the move back onto the trail
        assert_eq!(step(&mut fixture.agent, breeze()), Action::TurnLeft);
        assert_eq!(step(&mut fixture.agent, breeze()), Action::Move);
        assert_eq!(fixture.agent.position(), Room::new(0, 3));
    }

    #[test]
    fn test_reset_preserves_the_value_table() {
        let mut fixture = fixture_with_epsilon(0.0);
        fixture
            .values
            .borrow_mut()
            .record_transition(Room::new(0, 3), Direction::Right, 0.0, 0.25);

        assert_eq!(step(&mut fixture.agent, quiet()), Action::TurnLeft);
        assert_eq!(step(&mut fixture.agent, quiet()), Action::Move);
        assert!(!fixture.agent.knowledge_base().is_empty());

        fixture.agent.reset();
        assert_eq!(fixture.agent.position(), Room::new(0, 3));
        assert_eq!(fixture.agent.facing(), Direction::Right);
        assert!(fixture.agent.knowledge_base().is_empty());
        assert_eq!(fixture.agent.visited(), &[Room::new(0, 3)]);
        assert!(!fixture.agent.is_done());
        // learning survives the episode boundary
        assert_eq!(
            fixture.values.borrow().get(Room::new(0, 3), Direction::Right),
            Some(0.25)
        );
    }

    #[test]
    fn test_act_is_receive_then_decide() {
        use agents::Agent as _;

        let mut fixture = fixture_with_epsilon(0.0);
        let action = fixture.agent.act(&quiet());
        assert_eq!(action, Action::TurnLeft);
        let action = fixture.agent.act(&glitter());
        assert_eq!(action, Action::Grab);
    }

    #[test]
    fn test_value_table_serializes_to_json() {
        let mut table = ValueTable::new(Grid::default());
        table.record_transition(Room::new(0, 3), Direction::Right, -1.0, 1.0);
        let json = serialize_value_table(&table);
        assert!(json.contains("entries"));
    }
}
