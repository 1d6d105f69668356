//! Calculation of FOLLOW and PREDICT sets.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID, TerminalSet},
    types::{Map, Queue, Set},
    util::{display_fn, write_joined},
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictSets {
    pub follow: Map<NonterminalID, TerminalSet>,
    pub predict: Map<RuleID, TerminalSet>,
}

impl PredictSets {
    /// Compute FOLLOW of every nonterminal and PREDICT of every rule.
    #[tracing::instrument(skip_all)]
    pub fn new(g: &Grammar) -> Self {
        let follow = follow_sets(g);
        let predict = g
            .rules
            .iter()
            .filter(|(id, _)| **id != RuleID::ACCEPT)
            .map(|(&id, rule)| {
                let first = g.first(&rule.body);
                let mut predict = first.terminals;
                if first.nullable {
                    predict.union_with(&follow[&rule.left]);
                }
                (id, predict)
            })
            .collect();
        Self { follow, predict }
    }

    /// The dump of FIRST, FOLLOW and PREDICT.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let names = |set: &TerminalSet| {
                let mut names: Vec<_> = set.iter().map(|t| g.terminal_name(t)).collect();
                names.sort_unstable();
                names
            };

            writeln!(f, "## first:")?;
            for &n in g.nonterminals.keys() {
                if n == NonterminalID::START {
                    continue;
                }
                let first = g.first(&[SymbolID::N(n)]);
                write!(f, "{}: {{", g.nonterminal_name(n))?;
                write_joined(f, ", ", names(&first.terminals))?;
                if first.nullable {
                    f.write_str(if first.terminals.is_empty() { "ε" } else { ", ε" })?;
                }
                writeln!(f, "}}")?;
            }

            writeln!(f, "\n## follow:")?;
            for (&n, follow) in &self.follow {
                write!(f, "{}: {{", g.nonterminal_name(n))?;
                write_joined(f, ", ", names(follow))?;
                writeln!(f, "}}")?;
            }

            writeln!(f, "\n## predict:")?;
            for (&id, predict) in &self.predict {
                write!(f, "{:<5}{}: {{", id.into_raw(), g.rule(id).display(g))?;
                write_joined(f, ", ", names(predict))?;
                writeln!(f, "}}")?;
            }
            Ok(())
        })
    }
}

/// Compute FOLLOW of every nonterminal except the augmented start symbol.
fn follow_sets(g: &Grammar) -> Map<NonterminalID, TerminalSet> {
    let mut follow: Map<NonterminalID, TerminalSet> = g
        .nonterminals
        .keys()
        .filter(|n| **n != NonterminalID::START)
        .map(|&n| (n, TerminalSet::default()))
        .collect();
    follow[&g.start_symbol].insert(TerminalID::EOI);

    // A -> α B β に対し FOLLOW(B) ⊇ FIRST(β)、β が nullable なら FOLLOW(B) ⊇ FOLLOW(A)
    let mut dependents = Map::<NonterminalID, Set<NonterminalID>>::default();
    for (_, rule) in g.rules.iter().filter(|(id, _)| **id != RuleID::ACCEPT) {
        for (i, symbol) in rule.body.iter().enumerate() {
            let SymbolID::N(b) = symbol else {
                continue;
            };
            let first = g.first(&rule.body[i + 1..]);
            follow[b].union_with(&first.terminals);
            if first.nullable && *b != rule.left {
                dependents.entry(rule.left).or_default().insert(*b);
            }
        }
    }

    let mut queue: Queue<NonterminalID> = follow
        .iter()
        .filter(|(_, set)| !set.is_empty())
        .map(|(n, _)| *n)
        .collect();
    while let Some(a) = queue.pop() {
        let Some(targets) = dependents.get(&a) else {
            continue;
        };
        let propagated = follow[&a].clone();
        for b in targets {
            if follow[b].union_with(&propagated) {
                queue.push(*b);
            }
        }
    }

    follow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{ProductionDesc, Symbol};

    fn grammar(source: &[(&str, &[&str])]) -> Grammar {
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

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        let mut names: Vec<_> = set.iter().map(|t| g.terminal_name(t).to_owned()).collect();
        names.sort();
        names
    }

    fn expression() -> Grammar {
        grammar(&[
            ("E", &["T", "E'"]),
            ("E'", &["+", "T", "E'"]),
            ("E'", &[]),
            ("T", &["F", "T'"]),
            ("T'", &["*", "F", "T'"]),
            ("T'", &[]),
            ("F", &["(", "E", ")"]),
            ("F", &["id"]),
        ])
    }

    #[test]
    fn follow_of_expression_grammar() {
        let g = expression();
        let sets = PredictSets::new(&g);
        let follow = |name: &str| names(&g, &sets.follow[&g.nonterminal(name).unwrap()]);
        assert_eq!(follow("E"), vec!["$", ")"]);
        assert_eq!(follow("E'"), vec!["$", ")"]);
        assert_eq!(follow("T"), vec!["$", ")", "+"]);
        assert_eq!(follow("T'"), vec!["$", ")", "+"]);
        assert_eq!(follow("F"), vec!["$", ")", "*", "+"]);
        assert!(!sets.follow.contains_key(&NonterminalID::START));
    }

    #[test]
    fn predict_of_epsilon_is_follow() {
        let g = expression();
        let sets = PredictSets::new(&g);
        for name in ["E'", "T'"] {
            let n = g.nonterminal(name).unwrap();
            let (eps, _) = g
                .productions_of(n)
                .find(|(_, rule)| rule.body.is_empty())
                .unwrap();
            assert_eq!(sets.predict[&eps], sets.follow[&n], "PREDICT of {} -> ε", name);
        }
    }

    #[test]
    fn predict_of_nonnullable_is_first() {
        let g = expression();
        let sets = PredictSets::new(&g);
        let f = g.nonterminal("F").unwrap();
        let predicts: Vec<_> = g
            .productions_of(f)
            .map(|(id, _)| names(&g, &sets.predict[&id]))
            .collect();
        assert_eq!(predicts, vec![vec!["("], vec!["id"]]);
        assert!(!sets.predict.contains_key(&RuleID::ACCEPT));
    }

    #[test]
    fn follow_through_nullable_tail() {
        // S -> A B c ; A -> a ; B -> b | ε
        let g = grammar(&[
            ("S", &["A", "B", "c"]),
            ("A", &["a"]),
            ("B", &["b"]),
            ("B", &[]),
        ]);
        let sets = PredictSets::new(&g);
        let follow = |name: &str| names(&g, &sets.follow[&g.nonterminal(name).unwrap()]);
        assert_eq!(follow("A"), vec!["b", "c"]);
        assert_eq!(follow("B"), vec!["c"]);
        assert_eq!(follow("S"), vec!["$"]);
    }

    #[test]
    fn display_sets() {
        let g = grammar(&[("S", &["a", "B"]), ("B", &["b"]), ("B", &[])]);
        let dump = PredictSets::new(&g).display(&g).to_string();
        assert!(dump.contains("S: {a}\n"), "{}", dump);
        assert!(dump.contains("B: {b, ε}\n"), "{}", dump);
        assert!(dump.contains("B: {$}\n"), "{}", dump);
        assert!(dump.contains("3    B -> ε: {$}\n"), "{}", dump);
    }
}
