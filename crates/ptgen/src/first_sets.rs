//! Calculation of nullability and first set function.

use crate::{
    grammar::{NonterminalID, Rule, RuleID, SymbolID, TerminalSet},
    types::{Map, Queue, Set},
};

/// `FIRST` of a symbol string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct First {
    pub terminals: TerminalSet,
    /// Whether the string derives the empty string.
    pub nullable: bool,
}

#[derive(Debug)]
pub struct FirstSets {
    nullables: Set<NonterminalID>,
    first_sets: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub(crate) fn new(nonterminals: &Map<NonterminalID, String>, rules: &Map<RuleID, Rule>) -> Self {
        let nullables = nullables(rules);
        let first_sets = first_sets(nonterminals, rules, &nullables);
        Self {
            nullables,
            first_sets,
        }
    }

    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.nullables.contains(&n)
    }

    /// `FIRST` of a single nonterminal.
    pub fn get(&self, n: NonterminalID) -> &TerminalSet {
        &self.first_sets[&n]
    }

    /// `FIRST(X1 X2 ... Xn)`
    pub fn first(&self, symbols: &[SymbolID]) -> First {
        let mut first = First::default();
        for symbol in symbols {
            match symbol {
                SymbolID::T(t) => {
                    first.terminals.insert(*t);
                    return first;
                }
                SymbolID::N(n) => {
                    first.terminals.union_with(self.get(*n));
                    if !self.is_nullable(*n) {
                        return first;
                    }
                }
                SymbolID::A(..) => (),
            }
        }
        first.nullable = true;
        first
    }
}

/// Calculate the set of nullable symbols in this grammar.
fn nullables(rules: &Map<RuleID, Rule>) -> Set<NonterminalID> {
    // 右辺に終端記号を含まない規則について、まだ nullable と判明していない非終端記号の出現数を数える
    let mut pending = Map::<RuleID, usize>::default();
    let mut occurrences = Map::<NonterminalID, Vec<RuleID>>::default();
    let mut queue = Queue::default();
    let mut nullables = Set::default();
    for (&id, rule) in rules {
        if rule.body.iter().any(|s| matches!(s, SymbolID::T(..))) {
            continue;
        }
        for symbol in &rule.body {
            if let SymbolID::N(n) = symbol {
                occurrences.entry(*n).or_default().push(id);
            }
        }
        pending.insert(id, rule.body.len());
        if rule.body.is_empty() && nullables.insert(rule.left) {
            queue.push(rule.left);
        }
    }

    while let Some(n) = queue.pop() {
        let Some(ids) = occurrences.get(&n) else {
            continue;
        };
        for id in ids {
            let count = &mut pending[id];
            *count -= 1;
            if *count == 0 {
                let left = rules[id].left;
                if nullables.insert(left) {
                    queue.push(left);
                }
            }
        }
    }

    nullables
}

fn first_sets(
    nonterminals: &Map<NonterminalID, String>,
    rules: &Map<RuleID, Rule>,
    nullables: &Set<NonterminalID>,
) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = nonterminals
        .keys()
        .map(|&n| (n, TerminalSet::default()))
        .collect();

    // X -> Y1 Y2 ... Yn という構文規則に対し、最初の非nullableな記号 Yk までの
    // 各 Yi について First(X) ⊇ First(Yi) という制約を追加する
    let mut dependents = Map::<NonterminalID, Set<NonterminalID>>::default();
    for rule in rules.values() {
        for symbol in &rule.body {
            match symbol {
                SymbolID::T(t) => {
                    map[&rule.left].insert(*t);
                    break;
                }
                SymbolID::N(n) => {
                    if *n != rule.left {
                        dependents.entry(*n).or_default().insert(rule.left);
                    }
                    if !nullables.contains(n) {
                        break;
                    }
                }
                SymbolID::A(..) => (),
            }
        }
    }

    let mut rounds = 0usize;
    let mut queue: Queue<NonterminalID> = map
        .iter()
        .filter(|(_, first)| !first.is_empty())
        .map(|(n, _)| *n)
        .collect();
    while let Some(sub) = queue.pop() {
        rounds += 1;
        let Some(sups) = dependents.get(&sub) else {
            continue;
        };
        let subset = map[&sub].clone();
        for sup in sups {
            if map[sup].union_with(&subset) {
                queue.push(*sup);
            }
        }
    }
    tracing::trace!("first sets settled after {} visits", rounds);

    map
}
