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

// PEAS - Performance, Environment, Action, Sensing
//
// See:
// -  Chapter 2: Intelligent Agents, page 40

use num_traits::Zero;

/// An Agent acts in a Performance, Environment, Action, Sensing (PEAS) cycle.
/// For a given Perception, the Agent will return an Action.
///
/// Stateful agents (a model-based agent keeping a knowledge base, a learning
/// agent keeping a value table) store whatever they need from previous
/// Perceptions; a reflex agent needs no state at all.
///
/// Notice that the Agent is not aware of an Environment, its only interface
/// is the Perception coming in then the Action going out.
pub trait Agent {
    type Action;
    type Percept;

    fn act(&mut self, percept: &Self::Percept) -> Self::Action;
}

/// An Environment runs a single Agent in a Performance, Environment, Action,
/// Sensing (PEAS) cycle.
///
/// Notice that the Environment is not aware of an Agent.
pub trait Environment {
    type Action;
    type Percept;
    type Score: num_traits::NumAssign + Copy;

    fn percept(&self) -> Self::Percept;
    fn execute_action(&mut self, action: &Self::Action);

    /// Returns the score of the Environment. This is not cumulative or
    /// stateful. This is the score of the Environment at the current state.
    fn score(&self) -> Self::Score;

    /// Whether the current episode has ended (the agent left, or something
    /// ended it). A never-terminating world can always return false.
    fn is_done(&self) -> bool;
}

/// A Simulation runs a single Agent through one episode of Performance,
/// Environment, Action, Sensing (PEAS) cycles: until the Environment reports
/// the episode done, or a step cap is reached. The Agent's score
/// (Performance) is continually kept up to date.
///
/// The Simulation is aware of both the Environment and the single Agent. The
/// Agent's generic Action and Percept come from the Environment, but the
/// Agent still does not need to know that the Environment exists.
pub struct Simulation<_Environment, _Agent>
where
    _Environment: Environment,
    _Agent: Agent<Action = _Environment::Action, Percept = _Environment::Percept>,
{
    environment: _Environment,
    agent: _Agent,
    max_time_steps: i32,
    time_steps_taken: i32,
    score: _Environment::Score,
}

impl<_Environment, _Agent> Simulation<_Environment, _Agent>
where
    _Environment: Environment,
    _Agent: Agent<Action = _Environment::Action, Percept = _Environment::Percept>,
{
    pub fn new(environment: _Environment, agent: _Agent, max_time_steps: i32) -> Self {
        Self {
            environment,
            agent,
            max_time_steps,
            time_steps_taken: 0,
            score: _Environment::Score::zero(),
        }
    }

    pub fn run(&mut self) {
        for _ in 0..self.max_time_steps {
            if self.environment.is_done() {
                break;
            }
            let percept = self.environment.percept();
            let action = self.agent.act(&percept);
            self.environment.execute_action(&action);
            self.score += self.environment.score();
            self.time_steps_taken += 1;
        }
    }

    pub fn score(&self) -> <_Environment as Environment>::Score {
        self.score
    }

    pub fn time_steps_taken(&self) -> i32 {
        self.time_steps_taken
    }

    /// Take the Environment and Agent back, e.g. to reuse a learning agent
    /// for another episode in a fresh Environment.
    pub fn into_parts(self) -> (_Environment, _Agent) {
        (self.environment, self.agent)
    }
}
