//! The canonical collection of LR(0) item sets.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    types::{Map, Queue, Set},
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl StateID {
    /// The state that contains the augmented start item.
    pub const INITIAL: Self = Self(0);

    pub const fn into_raw(self) -> u32 {
        self.0
    }
}

/// The LR(0) item, a.k.a. LR item core.
///
/// `index` counts grammar symbols only, so it ranges over `0..=rule.body.len()`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub rule: RuleID,
    pub index: u16,
}
impl LR0Item {
    pub const fn new(rule: RuleID) -> Self {
        Self { rule, index: 0 }
    }

    /// The symbol right after the dot, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).body.get(usize::from(self.index)).copied()
    }

    /// The symbols after the symbol right after the dot.
    pub fn rest<'g>(&self, g: &'g Grammar) -> &'g [SymbolID] {
        let body = &g.rule(self.rule).body;
        body.get(usize::from(self.index) + 1..).unwrap_or(&[])
    }

    pub fn advance(self) -> Self {
        Self {
            index: self.index + 1,
            ..self
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{} -> [", g.nonterminal_name(rule.left))?;
            for (i, symbol) in rule.body.iter().enumerate() {
                if i == usize::from(self.index) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if rule.body.len() == usize::from(self.index) {
                f.write_str(" .")?;
            }
            write!(f, " ]")
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LR0State {
    /// The kernel items, sorted.
    pub kernels: Vec<LR0Item>,
    pub shifts: Map<TerminalID, StateID>,
    pub gotos: Map<NonterminalID, StateID>,
    /// Rules whose item is completed in this state, non-kernel ones included.
    pub reduces: Set<RuleID>,
}

impl LR0State {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(f, "## kernels:")?;
            for kernel in &self.kernels {
                writeln!(f, "- {}", kernel.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {:?}", g.terminal_name(*t), to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", g.nonterminal_name(*n), to)?;
                }
            }
            if !self.reduces.is_empty() {
                writeln!(f, "## reduces:")?;
                for reduce in &self.reduces {
                    writeln!(f, "- {}", g.rule(*reduce).display(g))?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
}

impl LR0Automaton {
    pub fn goto(&self, state: StateID, symbol: SymbolID) -> Option<StateID> {
        let state = self.states.get(&state)?;
        match symbol {
            SymbolID::T(t) => state.shifts.get(&t).copied(),
            SymbolID::N(n) => state.gotos.get(&n).copied(),
            SymbolID::A(..) => None,
        }
    }
}

/// Calculate the LR(0) automaton based on the specified grammar.
#[tracing::instrument(skip_all)]
pub fn lr0(g: &Grammar) -> LR0Automaton {
    let nonkernels = nonkernels(g);

    let mut states = Map::<StateID, LR0State>::default();
    let mut state_id = {
        let mut next_state_id = 0;
        move || {
            let id = StateID(next_state_id);
            next_state_id += 1;
            id
        }
    };

    let mut pending_states = VecDeque::<(StateID, Vec<LR0Item>)>::new();
    pending_states.push_back((state_id(), vec![LR0Item::new(RuleID::ACCEPT)]));

    let mut items = Set::default();
    let mut new_kernels = Map::<SymbolID, Set<LR0Item>>::default();
    // 状態はカーネル項の集合そのもので同一視する
    let mut isocores = Map::<Vec<LR0Item>, StateID>::default();
    isocores.insert(vec![LR0Item::new(RuleID::ACCEPT)], StateID::INITIAL);
    while let Some((current, kernels)) = pending_states.pop_front() {
        items.clear();
        for kernel in &kernels {
            items.insert(*kernel);
            if let Some(SymbolID::N(n)) = kernel.next_symbol(g) {
                items.extend(&nonkernels[&n]);
            }
        }

        let mut reduces = Set::default();
        new_kernels.clear();
        for item in items.drain(..) {
            match item.next_symbol(g) {
                Some(sym) => {
                    new_kernels.entry(sym).or_default().insert(item.advance());
                }
                None => {
                    reduces.insert(item.rule);
                }
            }
        }

        let mut shifts = Map::default();
        let mut gotos = Map::default();
        for (sym, new_kernel) in new_kernels.drain(..) {
            let mut new_kernel: Vec<_> = new_kernel.into_iter().collect();
            new_kernel.sort();
            let next = match isocores.get(&new_kernel) {
                Some(id) => *id,
                None => {
                    let id = state_id();
                    isocores.insert(new_kernel.clone(), id);
                    pending_states.push_back((id, new_kernel));
                    id
                }
            };
            match sym {
                SymbolID::T(t) => {
                    shifts.insert(t, next);
                }
                SymbolID::N(n) => {
                    gotos.insert(n, next);
                }
                SymbolID::A(..) => unreachable!("action markers are not part of rule bodies"),
            }
        }

        states.insert(
            current,
            LR0State {
                kernels,
                shifts,
                gotos,
                reduces,
            },
        );
    }

    tracing::debug!("{} LR(0) states", states.len());

    LR0Automaton { states }
}

/// The closure of the items `N -> . α` for each nonterminal `N`.
fn nonkernels(g: &Grammar) -> Map<NonterminalID, Set<LR0Item>> {
    let mut nonkernels: Map<NonterminalID, Set<LR0Item>> = Map::default();
    for &n in g.nonterminals.keys() {
        let mut items = Set::default();
        let mut reached: Set<NonterminalID> = Some(n).into_iter().collect();
        let mut queue: Queue<NonterminalID> = Some(n).into_iter().collect();
        while let Some(m) = queue.pop() {
            for (id, rule) in g.productions_of(m) {
                items.insert(LR0Item::new(id));
                if let Some(&SymbolID::N(next)) = rule.body.first() {
                    if reached.insert(next) {
                        queue.push(next);
                    }
                }
            }
        }
        nonkernels.insert(n, items);
    }
    nonkernels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{ProductionDesc, Symbol};
    use std::collections::BTreeSet;

    pub(crate) fn grammar(source: &[(&str, &[&str])]) -> Grammar {
        let productions: Vec<_> = source
            .iter()
            .map(|(left, right)| ProductionDesc {
                left: left.to_string(),
                right: right
                    .iter()
                    .map(|s| {
                        if s.starts_with(char::is_uppercase) {
                            Symbol::Nonterminal(s.to_string())
                        } else {
                            Symbol::Terminal(s.to_string())
                        }
                    })
                    .collect(),
            })
            .collect();
        Grammar::from_productions(&productions, None).unwrap()
    }

    /// The automaton with state numbers replaced by kernel item sets.
    fn structure(lr0: &LR0Automaton) -> BTreeSet<(Vec<LR0Item>, Vec<(SymbolID, Vec<LR0Item>)>)> {
        lr0.states
            .values()
            .map(|state| {
                let mut edges: Vec<_> = state
                    .shifts
                    .iter()
                    .map(|(t, to)| (SymbolID::T(*t), to))
                    .chain(state.gotos.iter().map(|(n, to)| (SymbolID::N(*n), to)))
                    .map(|(sym, to)| (sym, lr0.states[to].kernels.clone()))
                    .collect();
                edges.sort();
                (state.kernels.clone(), edges)
            })
            .collect()
    }

    #[test]
    fn single_production() {
        let g = grammar(&[("S", &["a"])]);
        let lr0 = lr0(&g);
        // {$start -> . S}, {$start -> S .}, {S -> a .}
        assert_eq!(lr0.states.len(), 3);

        let s = g.nonterminal("S").unwrap();
        let a = g.terminal("a").unwrap();
        let initial = &lr0.states[&StateID::INITIAL];
        assert_eq!(initial.kernels, vec![LR0Item::new(RuleID::ACCEPT)]);

        let accepted = &lr0.states[&initial.gotos[&s]];
        assert_eq!(accepted.kernels, vec![LR0Item::new(RuleID::ACCEPT).advance()]);
        assert!(accepted.reduces.contains(&RuleID::ACCEPT));
        assert!(accepted.shifts.is_empty());

        let shifted = &lr0.states[&initial.shifts[&a]];
        assert_eq!(shifted.reduces.len(), 1);
    }

    #[test]
    fn expression_grammar_states() {
        let g = grammar(&[
            ("E", &["E", "+", "T"]),
            ("E", &["T"]),
            ("T", &["T", "*", "F"]),
            ("T", &["F"]),
            ("F", &["(", "E", ")"]),
            ("F", &["id"]),
        ]);
        // The dragon book example has 12 states.
        assert_eq!(lr0(&g).states.len(), 12);
    }

    #[test]
    fn closure_follows_leading_nonterminals() {
        let g = grammar(&[
            ("S", &["A", "x"]),
            ("S", &["b"]),
            ("A", &["A", "a"]),
            ("A", &["B"]),
            ("B", &["c", "S"]),
            ("C", &["S"]),
        ]);
        let nonkernels = nonkernels(&g);
        let rules = |n: &str| -> Vec<u16> {
            nonkernels[&g.nonterminal(n).unwrap()]
                .iter()
                .map(|item| {
                    assert_eq!(item.index, 0);
                    item.rule.into_raw()
                })
                .collect()
        };
        // `S' after `c' is not at the head, so the closure of `B' stops there.
        assert_eq!(rules("B"), vec![5]);
        assert_eq!(rules("A"), vec![3, 4, 5]);
        assert_eq!(rules("S"), vec![1, 2, 3, 4, 5]);
        assert_eq!(rules("C"), vec![6, 1, 2, 3, 4, 5]);
        assert_eq!(nonkernels[&NonterminalID::START].len(), 6);
    }

    #[test]
    fn epsilon_items_are_reduced_in_place() {
        let g = grammar(&[("S", &["A", "b"]), ("A", &[])]);
        let lr0 = lr0(&g);
        let a_rule = g
            .productions_of(g.nonterminal("A").unwrap())
            .next()
            .map(|(id, _)| id)
            .unwrap();
        assert!(lr0.states[&StateID::INITIAL].reduces.contains(&a_rule));
    }

    #[test]
    fn rebuilding_is_structurally_identical() {
        let source: &[(&str, &[&str])] = &[
            ("S", &["L", "=", "R"]),
            ("S", &["R"]),
            ("L", &["*", "R"]),
            ("L", &["id"]),
            ("R", &["L"]),
        ];
        let g1 = grammar(source);
        let g2 = grammar(source);
        assert_eq!(structure(&lr0(&g1)), structure(&lr0(&g2)));
        assert_eq!(lr0(&g1).states.len(), 10);
    }
}
