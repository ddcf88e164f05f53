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

//! Propositional model checking for Wumpus World safety queries.
//!
//! A knowledge base of signed literals accumulates what the agent's percepts
//! entail; a bounded truth-table enumeration then counts, for a candidate
//! room, how many hazard configurations consistent with the cave rules and
//! the knowledge base leave that room free of both pit and wumpus. The ratio
//! of the two counts is the agent's safety estimate for the room.
//!
//! See Chapter 7: Logical Agents, section 7.4 (TT-ENTAILS). The enumeration
//! here is restricted to the agent's current room and its orthogonal
//! neighbors, so a query inspects at most 2^10 models regardless of cave
//! size.

use serde::{Deserialize, Serialize};
use wumpus_world_logic::{Grid, Percept, Room};

pub type HashSet<T> = rustc_hash::FxHashSet<T>;

/// Kinds of atomic propositions about a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Pit,
    Wumpus,
    Stench,
    Breeze,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Pit => write!(f, "pit"),
            SymbolKind::Wumpus => write!(f, "wumpus"),
            SymbolKind::Stench => write!(f, "stench"),
            SymbolKind::Breeze => write!(f, "breeze"),
        }
    }
}

/// An atomic proposition: "there is a `kind` in `room`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub room: Room,
}

impl Symbol {
    pub fn new(kind: SymbolKind, room: Room) -> Self {
        Self { kind, room }
    }
}

/// A signed atomic proposition. Equality and hashing are structural; there is
/// no string encoding anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub symbol: Symbol,
    pub positive: bool,
}

impl Literal {
    pub fn positive(kind: SymbolKind, room: Room) -> Self {
        Self {
            symbol: Symbol::new(kind, room),
            positive: true,
        }
    }

    pub fn negative(kind: SymbolKind, room: Room) -> Self {
        Self {
            symbol: Symbol::new(kind, room),
            positive: false,
        }
    }

    pub fn negated(self) -> Self {
        Self {
            positive: !self.positive,
            ..self
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.positive {
            write!(f, "{} in {}", self.symbol.kind, self.symbol.room)
        } else {
            write!(f, "no {} in {}", self.symbol.kind, self.symbol.room)
        }
    }
}

/// What the agent knows for certain. Literals only ever accumulate; for any
/// symbol at most one polarity is present.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    grid: Grid,
    facts: HashSet<Literal>,
    recorded: HashSet<Room>,
}

impl KnowledgeBase {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            facts: HashSet::default(),
            recorded: HashSet::default(),
        }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Record a literal as known. No-op when the literal is already present,
    /// or when its negation is. Knowledge never flips sign.
    pub fn assert_literal(&mut self, literal: Literal) {
        if self.facts.contains(&literal.negated()) {
            return;
        }
        self.facts.insert(literal);
    }

    /// Whether this exact signed literal is recorded.
    pub fn holds(&self, literal: Literal) -> bool {
        self.facts.contains(&literal)
    }

    /// Fold a room's percepts into the knowledge base. Only the first call
    /// for a given room has any effect.
    ///
    /// The inference mirrors the cave physics: the visited room itself is
    /// hazard-free (the agent survived it); no stench clears all neighbors
    /// of the wumpus, while a stench clears every room *not* adjacent
    /// (there is only one wumpus); no breeze clears all neighbors of pits.
    /// A breeze on its own pins nothing down, since pits are plural.
    pub fn record_percept(&mut self, room: Room, percept: Percept) {
        if self.recorded.contains(&room) {
            return;
        }
        self.assert_literal(Literal::negative(SymbolKind::Wumpus, room));
        self.assert_literal(Literal::negative(SymbolKind::Pit, room));

        let grid = self.grid;
        let neighbors = grid.neighbors(room);
        if percept.stench {
            self.assert_literal(Literal::positive(SymbolKind::Stench, room));
            for other in grid.rooms() {
                if !neighbors.contains(&other) {
                    self.assert_literal(Literal::negative(SymbolKind::Wumpus, other));
                }
            }
        } else {
            self.assert_literal(Literal::negative(SymbolKind::Stench, room));
            for &neighbor in &neighbors {
                self.assert_literal(Literal::negative(SymbolKind::Wumpus, neighbor));
            }
        }
        if percept.breeze {
            self.assert_literal(Literal::positive(SymbolKind::Breeze, room));
        } else {
            self.assert_literal(Literal::negative(SymbolKind::Breeze, room));
            for &neighbor in &neighbors {
                self.assert_literal(Literal::negative(SymbolKind::Pit, neighbor));
            }
        }
        self.recorded.insert(room);
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.facts.iter()
    }
}

/// One hypothetical truth assignment over the enumerated symbols. Transient:
/// rebuilt for every leaf of the enumeration, never shared.
#[derive(Debug, Clone, Default)]
pub struct Model {
    assignments: Vec<(Symbol, bool)>,
}

impl Model {
    pub fn assign(&mut self, symbol: Symbol, value: bool) {
        self.assignments.push((symbol, value));
    }

    pub fn value_of(&self, symbol: Symbol) -> Option<bool> {
        self.assignments
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|&(_, value)| value)
    }

    pub fn assignments(&self) -> &[(Symbol, bool)] {
        &self.assignments
    }
}

/// A propositional sentence over literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proposition {
    Literal(Literal),
    And(Box<Proposition>, Box<Proposition>),
    Or(Box<Proposition>, Box<Proposition>),
    Implies(Box<Proposition>, Box<Proposition>),
    Iff(Box<Proposition>, Box<Proposition>),
}

impl Proposition {
    /// Disjunction of the given literals, `None` when there are none.
    pub fn any_of(literals: impl IntoIterator<Item = Literal>) -> Option<Proposition> {
        let mut iter = literals.into_iter();
        let first = Proposition::Literal(iter.next()?);
        Some(iter.fold(first, |acc, literal| {
            Proposition::Or(Box::new(acc), Box::new(Proposition::Literal(literal)))
        }))
    }

    /// Conjunction of the given literals, `None` when there are none.
    pub fn all_of(literals: impl IntoIterator<Item = Literal>) -> Option<Proposition> {
        let mut iter = literals.into_iter();
        let first = Proposition::Literal(iter.next()?);
        Some(iter.fold(first, |acc, literal| {
            Proposition::And(Box::new(acc), Box::new(Proposition::Literal(literal)))
        }))
    }

    /// Evaluate under a model, falling back to the knowledge base and then
    /// to `true` for symbols neither assigned nor known.
    ///
    /// The default-true fallback is deliberate: a symbol outside the model
    /// and outside the knowledge base is unconstrained, and an unconstrained
    /// symbol must not fail a neighbor rule. Safety estimates depend on this
    /// exact semantic.
    pub fn eval(&self, model: &Model, kb: &KnowledgeBase) -> bool {
        match self {
            Proposition::Literal(literal) => match model.value_of(literal.symbol) {
                Some(value) => {
                    if literal.positive {
                        value
                    } else {
                        !value
                    }
                }
                None => {
                    if kb.holds(*literal) {
                        true
                    } else if kb.holds(literal.negated()) {
                        false
                    } else {
                        true
                    }
                }
            },
            Proposition::And(a, b) => a.eval(model, kb) && b.eval(model, kb),
            Proposition::Or(a, b) => a.eval(model, kb) || b.eval(model, kb),
            Proposition::Implies(a, b) => !a.eval(model, kb) || b.eval(model, kb),
            Proposition::Iff(a, b) => a.eval(model, kb) == b.eval(model, kb),
        }
    }
}

/// Tallies from one safety query: `consistent` models survived both the cave
/// rules and the knowledge base; `safe` additionally keep the candidate room
/// hazard-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelCounts {
    pub consistent: u32,
    pub safe: u32,
}

impl ModelCounts {
    /// m/n as a probability, `None` on a no-information result (n == 0).
    pub fn probability(&self) -> Option<f64> {
        if self.consistent == 0 {
            None
        } else {
            Some(f64::from(self.safe) / f64::from(self.consistent))
        }
    }
}

/// Enumerate every truth assignment of pit/wumpus symbols over the anchor
/// room and its orthogonal neighbors, and count the models consistent with
/// the cave rules and the knowledge base, plus those where `candidate` is
/// safe. `candidate` must be the anchor or one of its neighbors so that its
/// symbols are part of the enumeration.
///
/// The symbol set is at most 10 variables, so a query visits at most 1024
/// models; the loop over bitmasks replaces the book's recursive TT-ENTAILS
/// enumeration without changing which leaves are counted.
pub fn count_models(kb: &KnowledgeBase, anchor: Room, candidate: Room) -> ModelCounts {
    let grid = kb.grid();
    let mut rooms = grid.neighbors(anchor);
    rooms.push(anchor);

    let mut symbols = Vec::with_capacity(rooms.len() * 2);
    for &room in &rooms {
        symbols.push(Symbol::new(SymbolKind::Pit, room));
        symbols.push(Symbol::new(SymbolKind::Wumpus, room));
    }

    let mut counts = ModelCounts::default();
    for mask in 0u32..(1u32 << symbols.len()) {
        let mut model = Model::default();
        for (i, &symbol) in symbols.iter().enumerate() {
            model.assign(symbol, mask & (1u32 << i) != 0);
        }
        if !obeys_cave_rules(&model, anchor, &grid, kb) {
            continue;
        }
        if !agrees_with_knowledge(&model, kb) {
            continue;
        }
        counts.consistent += 1;
        if is_safe(&model, candidate) {
            counts.safe += 1;
        }
    }
    counts
}

// The physics every model must satisfy: a single wumpus, hazards ringed by
// their telltale percepts, and the anchor's own percepts explained by at
// least one hazard next door.
fn obeys_cave_rules(model: &Model, anchor: Room, grid: &Grid, kb: &KnowledgeBase) -> bool {
    let mut wumpus_count = 0;
    for &(symbol, value) in model.assignments() {
        if !value {
            continue;
        }
        match symbol.kind {
            SymbolKind::Pit => {
                let breezes = Proposition::all_of(
                    grid.neighbors(symbol.room)
                        .into_iter()
                        .map(|r| Literal::positive(SymbolKind::Breeze, r)),
                );
                if let Some(rule) = breezes {
                    if !rule.eval(model, kb) {
                        return false;
                    }
                }
            }
            SymbolKind::Wumpus => {
                wumpus_count += 1;
                if wumpus_count > 1 {
                    return false;
                }
                let stenches = Proposition::all_of(
                    grid.neighbors(symbol.room)
                        .into_iter()
                        .map(|r| Literal::positive(SymbolKind::Stench, r)),
                );
                if let Some(rule) = stenches {
                    if !rule.eval(model, kb) {
                        return false;
                    }
                }
            }
            SymbolKind::Stench | SymbolKind::Breeze => {}
        }
    }

    if kb.holds(Literal::positive(SymbolKind::Breeze, anchor)) {
        let pit_nearby = Proposition::any_of(
            grid.neighbors(anchor)
                .into_iter()
                .map(|r| Literal::positive(SymbolKind::Pit, r)),
        );
        if let Some(rule) = pit_nearby {
            if !rule.eval(model, kb) {
                return false;
            }
        }
    }
    if kb.holds(Literal::positive(SymbolKind::Stench, anchor)) {
        let wumpus_nearby = Proposition::any_of(
            grid.neighbors(anchor)
                .into_iter()
                .map(|r| Literal::positive(SymbolKind::Wumpus, r)),
        );
        if let Some(rule) = wumpus_nearby {
            if !rule.eval(model, kb) {
                return false;
            }
        }
    }
    true
}

fn agrees_with_knowledge(model: &Model, kb: &KnowledgeBase) -> bool {
    for &(symbol, value) in model.assignments() {
        let contradicted = if value {
            kb.holds(Literal::negative(symbol.kind, symbol.room))
        } else {
            kb.holds(Literal::positive(symbol.kind, symbol.room))
        };
        if contradicted {
            return false;
        }
    }
    true
}

fn is_safe(model: &Model, candidate: Room) -> bool {
    model.value_of(Symbol::new(SymbolKind::Wumpus, candidate)) == Some(false)
        && model.value_of(Symbol::new(SymbolKind::Pit, candidate)) == Some(false)
}
