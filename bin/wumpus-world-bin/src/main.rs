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

use std::cell::RefCell;
use std::rc::Rc;

use agents::{Agent, Environment};
use model_checking_wumpus::{serialize_value_table, AgentConfig, WumpusAgent};
use q_learning::{Rng, ValueTable};
use rand::SeedableRng;

mod cave;

use cave::Cave;

const EPISODES: usize = 20;
const MAX_STEPS_PER_EPISODE: usize = 200;

fn main() {
    tracing_subscriber::fmt::init();

    let config = AgentConfig::default();
    let values = Rc::new(RefCell::new(ValueTable::new(config.grid)));
    let rng = Rc::new(RefCell::new(Rng::seed_from_u64(42)));
    let mut agent = WumpusAgent::new(config, Rc::clone(&values), rng);

    for episode in 0..EPISODES {
        let mut cave = Cave::chapter_seven();
        let mut score = 0;
        let mut steps = 0;
        while !cave.is_done() && steps < MAX_STEPS_PER_EPISODE {
            let percept = cave.percept();
            let action = agent.act(&percept);
            cave.execute_action(&action);
            score += cave.score();
            steps += 1;
        }
        let outcome = if cave.is_gold_taken() {
            "gold"
        } else if cave.is_agent_dead() {
            "died"
        } else {
            "gave up"
        };
        println!(
            "episode {}: {} after {} steps, score {}",
            episode, outcome, steps, score
        );
        agent.reset();
    }

    tracing::info!("dumping the value table after {} episodes", EPISODES);
    println!("{}", serialize_value_table(&values.borrow()));
}
