//! Building the tables of the two cooperating grammars.

use crate::{
    grammar::{Grammar, NonterminalID, TerminalID},
    lalr::{
        self,
        table::{ConflictReport, LalrTable},
    },
    ll1::{
        self,
        follow::PredictSets,
        table::{Ll1Table, NotLl1Error},
    },
    util::write_joined,
};
use std::fmt;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("error during building the LL(1) table")]
    NotLl1(
        #[from]
        #[source]
        NotLl1Error,
    ),

    #[error("error during building the LALR(1) table")]
    Conflicts(
        #[from]
        #[source]
        ConflictReport,
    ),
}

#[derive(Debug, Clone)]
pub struct Config {
    deny_conflicts: bool,
    skip_ll1: bool,
    skip_lalr: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            deny_conflicts: false,
            skip_ll1: false,
            skip_lalr: false,
        }
    }

    /// Treat LALR(1) conflicts as a build failure.
    ///
    /// By default, a conflicting table is returned and flagged unusable.
    pub fn deny_conflicts(&mut self, enabled: bool) -> &mut Self {
        self.deny_conflicts = enabled;
        self
    }

    /// Do not build the LL(1) table.
    pub fn skip_ll1(&mut self, enabled: bool) -> &mut Self {
        self.skip_ll1 = enabled;
        self
    }

    /// Do not build the LALR(1) table.
    pub fn skip_lalr(&mut self, enabled: bool) -> &mut Self {
        self.skip_lalr = enabled;
        self
    }

    /// Build the LL(1) table of `ll1_grammar` and the LALR(1) table of
    /// `lalr_grammar`. The builds are independent of each other.
    pub fn build(&self, ll1_grammar: &Grammar, lalr_grammar: &Grammar) -> Result<Tables, BuildError> {
        let ll1 = if self.skip_ll1 {
            None
        } else {
            Some(self.build_ll1(ll1_grammar)?)
        };
        let lalr = if self.skip_lalr {
            None
        } else {
            Some(self.build_lalr(lalr_grammar)?)
        };
        Ok(Tables { ll1, lalr })
    }

    pub fn build_ll1(&self, g: &Grammar) -> Result<Ll1Output, BuildError> {
        let (sets, table) = ll1::compute(g)?;
        Ok(Ll1Output {
            sets,
            table,
            summary: Summary::new(g, None),
        })
    }

    pub fn build_lalr(&self, g: &Grammar) -> Result<LalrOutput, BuildError> {
        let table = lalr::compute(g);
        if !table.is_lalr1() {
            if self.deny_conflicts {
                return Err(ConflictReport {
                    conflicts: table.conflicts,
                }
                .into());
            }
            tracing::warn!(
                "the grammar is not LALR(1); the table cannot be used for parsing"
            );
        }
        Ok(LalrOutput {
            summary: Summary::new(g, Some(table.states.len())),
            table,
        })
    }
}

#[derive(Debug)]
pub struct Tables {
    pub ll1: Option<Ll1Output>,
    pub lalr: Option<LalrOutput>,
}

#[derive(Debug)]
pub struct Ll1Output {
    pub sets: PredictSets,
    pub table: Ll1Table,
    pub summary: Summary,
}

#[derive(Debug)]
pub struct LalrOutput {
    pub table: LalrTable,
    pub summary: Summary,
}

/// The figures of a grammar that a table consumer needs besides the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// The number of rules, the augmented one excluded.
    pub rule_count: usize,
    pub terminals: Vec<String>,
    pub nonterminals: Vec<String>,
    pub start_symbol: String,
    /// The longest right-hand side, action markers included.
    pub max_rhs_len: usize,
    /// The number of LALR(1) states, for a LALR(1) build.
    pub state_count: Option<usize>,
    /// The trailing semantic action of each rule, in rule order.
    pub semantic_rules: Vec<Option<String>>,
}

impl Summary {
    pub fn new(g: &Grammar, state_count: Option<usize>) -> Self {
        let rules: Vec<_> = g.rules.values().skip(1).collect();
        Self {
            rule_count: rules.len(),
            terminals: g
                .terminals
                .iter()
                .filter(|(id, _)| **id != TerminalID::EOI)
                .map(|(_, name)| name.clone())
                .collect(),
            nonterminals: g
                .nonterminals
                .iter()
                .filter(|(id, _)| **id != NonterminalID::START)
                .map(|(_, name)| name.clone())
                .collect(),
            start_symbol: g.nonterminal_name(g.start_symbol).to_owned(),
            max_rhs_len: rules.iter().map(|rule| rule.right.len()).max().unwrap_or(0),
            state_count,
            semantic_rules: rules
                .iter()
                .map(|rule| rule.trailing_action().map(|a| g.action_name(a).to_owned()))
                .collect(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rules: {}", self.rule_count)?;
        write!(f, "terminals ({}): ", self.terminals.len())?;
        write_joined(f, " ", &self.terminals)?;
        writeln!(f)?;
        write!(f, "nonterminals ({}): ", self.nonterminals.len())?;
        write_joined(f, " ", &self.nonterminals)?;
        writeln!(f)?;
        writeln!(f, "start: {}", self.start_symbol)?;
        writeln!(f, "max rhs length: {}", self.max_rhs_len)?;
        if let Some(count) = self.state_count {
            writeln!(f, "states: {}", count)?;
        }
        Ok(())
    }
}
