//! LALR(1) lookahead computation.
//!
//! The lookaheads of the kernel items are determined by the classic
//! two-phase method: each kernel item is closed over with a placeholder
//! lookahead (`#`) to find out which lookaheads are generated spontaneously
//! in the successor states and which are propagated from the kernel item
//! itself, and then the propagation edges are followed until nothing changes.

use super::lr0::{LR0Automaton, LR0Item, StateID};
use crate::{
    grammar::{Grammar, SymbolID, TerminalID, TerminalSet},
    types::{Map, Queue, Set},
};

/// A lookahead set that may contain the placeholder symbol.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Lookahead {
    pub terminals: TerminalSet,
    /// Whether the placeholder `#` is in the set.
    pub free: bool,
}

impl Lookahead {
    /// The set that only contains the placeholder.
    pub fn free() -> Self {
        Self {
            terminals: TerminalSet::default(),
            free: true,
        }
    }

    pub fn from_terminals(terminals: TerminalSet) -> Self {
        Self {
            terminals,
            free: false,
        }
    }

    fn merge(&mut self, other: &Self) -> bool {
        let mut changed = self.terminals.union_with(&other.terminals);
        if other.free && !self.free {
            self.free = true;
            changed = true;
        }
        changed
    }
}

/// Compute the LR(1) closure of the seed items.
///
/// The lookahead of `B -> . γ` derived from `A -> α . B β` is
/// `FIRST(β)`, plus the lookahead of the latter when `β` is nullable.
pub fn closure<I>(g: &Grammar, seeds: I) -> Map<LR0Item, Lookahead>
where
    I: IntoIterator<Item = (LR0Item, Lookahead)>,
{
    let mut items = Map::<LR0Item, Lookahead>::default();
    let mut queue = Queue::default();
    for (item, lookahead) in seeds {
        items.entry(item).or_default().merge(&lookahead);
        queue.push(item);
    }

    while let Some(item) = queue.pop() {
        let Some(SymbolID::N(n)) = item.next_symbol(g) else {
            continue;
        };
        let first = g.first(item.rest(g));
        let mut lookahead = Lookahead::from_terminals(first.terminals);
        if first.nullable {
            lookahead.merge(&items[&item]);
        }

        for (rule, _) in g.productions_of(n) {
            let new_item = LR0Item::new(rule);
            let is_new = !items.contains_key(&new_item);
            let changed = items.entry(new_item).or_default().merge(&lookahead);
            if is_new || changed {
                queue.push(new_item);
            }
        }
    }

    items
}

/// A kernel item of a state, addressed by its position in `LR0State::kernels`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KernelRef {
    pub state: StateID,
    pub index: usize,
}

#[derive(Debug)]
pub struct LALRData {
    /// The lookaheads of each kernel item, aligned with `LR0State::kernels`.
    pub lookaheads: Map<StateID, Vec<TerminalSet>>,
}

impl LALRData {
    pub fn get(&self, kernel: KernelRef) -> &TerminalSet {
        &self.lookaheads[&kernel.state][kernel.index]
    }
}

/// Compute the lookahead sets of every kernel item in the LR(0) automaton.
#[tracing::instrument(skip_all)]
pub fn lalr(g: &Grammar, lr0: &LR0Automaton) -> LALRData {
    let mut lookaheads: Map<StateID, Vec<TerminalSet>> = lr0
        .states
        .iter()
        .map(|(id, state)| (*id, vec![TerminalSet::default(); state.kernels.len()]))
        .collect();
    let mut edges = Map::<KernelRef, Set<KernelRef>>::default();

    // The augmented start item is the only kernel item of the initial state.
    lookaheads[&StateID::INITIAL][0].insert(TerminalID::EOI);

    for (&id, state) in &lr0.states {
        for (index, kernel) in state.kernels.iter().enumerate() {
            let from = KernelRef { state: id, index };
            for (item, lookahead) in closure(g, Some((*kernel, Lookahead::free()))) {
                let Some(symbol) = item.next_symbol(g) else {
                    continue;
                };
                // Every transition of a closure item exists by construction.
                let Some(target) = lr0.goto(id, symbol) else {
                    continue;
                };
                let advanced = item.advance();
                let Some(to_index) = lr0.states[&target]
                    .kernels
                    .binary_search(&advanced)
                    .ok()
                else {
                    continue;
                };

                lookaheads[&target][to_index].union_with(&lookahead.terminals);
                if lookahead.free {
                    edges.entry(from).or_default().insert(KernelRef {
                        state: target,
                        index: to_index,
                    });
                }
            }
        }
    }

    tracing::debug!(
        "{} propagation edges",
        edges.values().map(|to| to.len()).sum::<usize>()
    );

    let mut queue: Queue<KernelRef> = lookaheads
        .iter()
        .flat_map(|(&state, sets)| {
            sets.iter()
                .enumerate()
                .filter(|(_, set)| !set.is_empty())
                .map(move |(index, _)| KernelRef { state, index })
        })
        .collect();
    let mut rounds = 0usize;
    while let Some(from) = queue.pop() {
        rounds += 1;
        let Some(targets) = edges.get(&from) else {
            continue;
        };
        let propagated = lookaheads[&from.state][from.index].clone();
        for to in targets {
            if lookaheads[&to.state][to.index].union_with(&propagated) {
                queue.push(*to);
            }
        }
    }
    tracing::trace!("lookahead propagation settled after {} visits", rounds);

    LALRData { lookaheads }
}
