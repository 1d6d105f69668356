//! The LL(1) predictive table.

use super::follow::PredictSets;
use crate::{
    grammar::{ActionID, Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    types::Map,
    util::display_fn,
};
use ptgen_runtime::definition::{self as rt, StackSymbol};
use std::fmt;

/// Two rules of a nonterminal are predicted on the same lookahead symbol.
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "the grammar is not LL(1): both {first_rule:?} and {second_rule:?} of `{nonterminal}' are predicted on `{terminal}'"
)]
pub struct NotLl1Error {
    pub nonterminal: String,
    pub terminal: String,
    pub first_rule: RuleID,
    pub second_rule: RuleID,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ll1Table {
    pub start_symbol: NonterminalID,
    /// The valid cells. A missing cell is `INVALID`.
    pub entries: Map<NonterminalID, Map<TerminalID, RuleID>>,
}

impl Ll1Table {
    pub fn get(&self, nonterminal: NonterminalID, terminal: TerminalID) -> Option<RuleID> {
        self.entries.get(&nonterminal)?.get(&terminal).copied()
    }

    /// Bind this table to its grammar so that it can drive `PredictiveParser`.
    pub fn definition<'g>(&'g self, g: &'g Grammar) -> Ll1ParserDef<'g> {
        Ll1ParserDef {
            grammar: g,
            table: self,
        }
    }

    /// The table as a matrix of rule numbers, `-1` standing for an invalid cell.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let terminals: Vec<_> = g
                .terminals
                .keys()
                .filter(|t| **t != TerminalID::EOI)
                .copied()
                .chain(Some(TerminalID::EOI))
                .collect();

            f.write_str("        ")?;
            for t in &terminals {
                write!(f, " {:>6}", g.terminal_name(*t))?;
            }
            writeln!(f)?;

            for (&n, row) in &self.entries {
                write!(f, "{:<8}", g.nonterminal_name(n))?;
                for t in &terminals {
                    match row.get(t) {
                        Some(rule) => write!(f, " {:>6}", rule.into_raw())?,
                        None => write!(f, " {:>6}", -1)?,
                    }
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

/// Insert every rule at `[lhs][t]` for each `t` in its PREDICT set.
#[tracing::instrument(skip_all)]
pub fn generate(g: &Grammar, sets: &PredictSets) -> Result<Ll1Table, NotLl1Error> {
    let mut entries: Map<NonterminalID, Map<TerminalID, RuleID>> = g
        .nonterminals
        .keys()
        .filter(|n| **n != NonterminalID::START)
        .map(|&n| (n, Map::default()))
        .collect();

    for (&id, predict) in &sets.predict {
        let left = g.rule(id).left;
        let row = entries.entry(left).or_default();
        for t in predict.iter() {
            if let Some(&existing) = row.get(&t) {
                return Err(NotLl1Error {
                    nonterminal: g.nonterminal_name(left).to_owned(),
                    terminal: g.terminal_name(t).to_owned(),
                    first_rule: existing,
                    second_rule: id,
                });
            }
            row.insert(t, id);
        }
    }

    tracing::debug!(
        "{} valid cells",
        entries.values().map(|row| row.len()).sum::<usize>()
    );

    Ok(Ll1Table {
        start_symbol: g.start_symbol,
        entries,
    })
}

/// A LL(1) table bound to its grammar, usable as a `PredictiveParser` definition.
#[derive(Debug, Copy, Clone)]
pub struct Ll1ParserDef<'g> {
    grammar: &'g Grammar,
    table: &'g Ll1Table,
}

impl rt::Symbols for Ll1ParserDef<'_> {
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Rule = RuleID;
    type Action = ActionID;

    fn terminal(&self, name: &str) -> Option<TerminalID> {
        self.grammar.terminal(name)
    }
    fn terminal_name(&self, terminal: TerminalID) -> &str {
        self.grammar.terminal_name(terminal)
    }
    fn nonterminal_name(&self, nonterminal: NonterminalID) -> &str {
        self.grammar.nonterminal_name(nonterminal)
    }
    fn action_name(&self, action: ActionID) -> &str {
        self.grammar.action_name(action)
    }
}

impl rt::PredictiveTable for Ll1ParserDef<'_> {
    fn start_symbol(&self) -> NonterminalID {
        self.table.start_symbol
    }

    fn predict(&self, nonterminal: NonterminalID, lookahead: Option<TerminalID>) -> Option<RuleID> {
        self.table
            .get(nonterminal, lookahead.unwrap_or(TerminalID::EOI))
    }

    fn expand(
        &self,
        rule: RuleID,
        stack: &mut Vec<StackSymbol<TerminalID, NonterminalID, ActionID>>,
    ) {
        stack.extend(self.grammar.rule(rule).right.iter().rev().map(|s| match *s {
            SymbolID::T(t) => StackSymbol::T(t),
            SymbolID::N(n) => StackSymbol::N(n),
            SymbolID::A(a) => StackSymbol::A(a),
        }));
    }

    fn expected(&self, nonterminal: NonterminalID) -> Vec<Option<TerminalID>> {
        self.table
            .entries
            .get(&nonterminal)
            .map(|row| {
                row.keys()
                    .map(|&t| (t != TerminalID::EOI).then_some(t))
                    .collect()
            })
            .unwrap_or_default()
    }
}
