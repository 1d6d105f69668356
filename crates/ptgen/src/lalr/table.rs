//! Calculation of the LALR(1) ACTION/GOTO table with conflict classification.

use super::{
    lookahead::{self, LALRData, Lookahead},
    lr0::{LR0Automaton, LR0Item, StateID},
};
use crate::{
    grammar::{ActionID, Grammar, NonterminalID, RuleID, TerminalID, TerminalSet},
    types::{Map, Set},
    util::{display_fn, write_joined},
};
use ptgen_runtime::definition::{self as rt, LalrAction, Reduction};
use std::fmt;

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

/// The kind of a conflicting cell. A shift/reduce conflict is considered
/// less severe than a reduce/reduce conflict.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftReduce => f.write_str("shift/reduce"),
            Self::ReduceReduce => f.write_str("reduce/reduce"),
        }
    }
}

/// A cell of the ACTION table that holds more than one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub terminal: TerminalID,
    pub kind: ConflictKind,
    pub actions: Vec<Action>,
}

impl Conflict {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "{} conflict in state {:?} on {}:",
                self.kind,
                self.state,
                g.terminal_name(self.terminal)
            )?;
            for action in &self.actions {
                write!(f, " {};", display_action(g, action))?;
            }
            Ok(())
        })
    }
}

/// The conflicts of a table that was required to be LALR(1).
#[derive(Debug, Clone, thiserror::Error)]
#[error("the grammar is not LALR(1): {} conflicting cell(s)", .conflicts.len())]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct LalrState {
    /// The kernel items, with their lookaheads.
    pub kernels: Vec<(LR0Item, TerminalSet)>,
    /// The actions of each lookahead symbol, sorted. More than one action
    /// in a cell is a conflict.
    pub actions: Map<TerminalID, Vec<Action>>,
    pub gotos: Map<NonterminalID, StateID>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LalrTable {
    pub states: Map<StateID, LalrState>,
    pub conflicts: Vec<Conflict>,
}

impl LalrTable {
    /// Whether the table is free of conflicts and can drive a parser.
    pub fn is_lalr1(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// The most severe conflict in the state, or `None` if the state is consistent.
    pub fn state_status(&self, state: StateID) -> Option<ConflictKind> {
        self.conflicts
            .iter()
            .filter(|c| c.state == state)
            .map(|c| c.kind)
            .max()
    }

    pub fn action(&self, state: StateID, terminal: TerminalID) -> &[Action] {
        self.states
            .get(&state)
            .and_then(|s| s.actions.get(&terminal))
            .map_or(&[][..], |actions| &actions[..])
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states.get(&state)?.gotos.get(&symbol).copied()
    }

    /// Bind this table to its grammar so that it can drive `LalrParser`.
    pub fn definition<'g>(&'g self, g: &'g Grammar) -> LalrParserDef<'g> {
        LalrParserDef { grammar: g, table: self }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(
                f,
                "is LALR(1): {}",
                if self.is_lalr1() { "yes" } else { "no" }
            )?;
            writeln!(f, "{} states", self.states.len())?;

            for (id, state) in &self.states {
                writeln!(f)?;
                write!(f, "#### State {:?}", id)?;
                if let Some(kind) = self.state_status(*id) {
                    write!(f, " ({})", kind)?;
                }
                writeln!(f)?;

                writeln!(f, "## kernels")?;
                for (item, lookaheads) in &state.kernels {
                    write!(f, "- {}  {{", item.display(g))?;
                    write_joined(f, ", ", lookaheads.iter().map(|t| g.terminal_name(t)))?;
                    writeln!(f, "}}")?;
                }

                writeln!(f, "## actions")?;
                for (token, actions) in &state.actions {
                    write!(f, "- {} => ", g.terminal_name(*token))?;
                    write_joined(f, " | ", actions.iter().map(|a| display_action(g, a)))?;
                    writeln!(f)?;
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in &state.gotos {
                    writeln!(f, "- {} => goto({:?})", g.nonterminal_name(*symbol), goto)?;
                }
            }

            if !self.conflicts.is_empty() {
                writeln!(f, "\n#### Conflicts")?;
                for conflict in &self.conflicts {
                    writeln!(f, "- {}", conflict.display(g))?;
                }
            }
            Ok(())
        })
    }
}

fn display_action<'g>(g: &'g Grammar, action: &'g Action) -> impl fmt::Display + 'g {
    display_fn(move |f| match action {
        Action::Shift(n) => write!(f, "shift({:?})", n),
        Action::Reduce(rule) => write!(f, "reduce({})", g.rule(*rule).display(g)),
        Action::Accept => write!(f, "accept"),
    })
}

/// Fill the ACTION/GOTO table from the LR(0) automaton and its lookaheads.
#[tracing::instrument(skip_all)]
pub fn generate(g: &Grammar, lr0: &LR0Automaton, lalr: &LALRData) -> LalrTable {
    let mut states = Map::default();
    let mut conflicts = vec![];

    for (&id, lr0_state) in &lr0.states {
        let kernel_lookaheads = &lalr.lookaheads[&id];

        let mut pending_actions = Map::<TerminalID, Set<Action>>::default();
        for (&t, &next) in &lr0_state.shifts {
            pending_actions.entry(t).or_default().insert(Action::Shift(next));
        }

        // Completed non-kernel items (ε-rules) get their lookaheads from
        // the closure of the kernel lookaheads.
        let closure = lookahead::closure(
            g,
            lr0_state
                .kernels
                .iter()
                .zip(kernel_lookaheads)
                .map(|(item, la)| (*item, Lookahead::from_terminals(la.clone()))),
        );
        for (item, la) in &closure {
            if item.next_symbol(g).is_some() {
                continue;
            }
            if item.rule == RuleID::ACCEPT {
                pending_actions
                    .entry(TerminalID::EOI)
                    .or_default()
                    .insert(Action::Accept);
                continue;
            }
            for t in la.terminals.iter() {
                pending_actions
                    .entry(t)
                    .or_default()
                    .insert(Action::Reduce(item.rule));
            }
        }

        let mut actions = Map::default();
        for (t, cell) in pending_actions {
            let mut cell: Vec<_> = cell.into_iter().collect();
            cell.sort();
            if cell.len() > 1 {
                let kind = if cell.iter().any(|a| matches!(a, Action::Shift(..))) {
                    ConflictKind::ShiftReduce
                } else {
                    ConflictKind::ReduceReduce
                };
                tracing::warn!("{} conflict in state {:?} on {:?}", kind, id, t);
                conflicts.push(Conflict {
                    state: id,
                    terminal: t,
                    kind,
                    actions: cell.clone(),
                });
            }
            actions.insert(t, cell);
        }

        states.insert(
            id,
            LalrState {
                kernels: lr0_state
                    .kernels
                    .iter()
                    .copied()
                    .zip(kernel_lookaheads.iter().cloned())
                    .collect(),
                actions,
                gotos: lr0_state.gotos.clone(),
            },
        );
    }

    tracing::debug!(
        "{} LALR(1) states, {} conflicts",
        states.len(),
        conflicts.len()
    );

    LalrTable { states, conflicts }
}

/// A LALR(1) table bound to its grammar, usable as a `LalrParser` definition.
#[derive(Debug, Copy, Clone)]
pub struct LalrParserDef<'g> {
    grammar: &'g Grammar,
    table: &'g LalrTable,
}

impl rt::Symbols for LalrParserDef<'_> {
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

impl rt::LalrTable for LalrParserDef<'_> {
    type State = StateID;

    fn initial_state(&self) -> StateID {
        StateID::INITIAL
    }

    fn is_usable(&self) -> bool {
        self.table.is_lalr1()
    }

    fn action(&self, current: StateID, lookahead: Option<TerminalID>) -> LalrAction<StateID, RuleID> {
        match self.table.action(current, lookahead.unwrap_or(TerminalID::EOI)) {
            [] => LalrAction::Error,
            [Action::Shift(next)] => LalrAction::Shift(*next),
            [Action::Reduce(rule)] => LalrAction::Reduce(*rule),
            [Action::Accept] => LalrAction::Accept,
            _ => LalrAction::Conflict,
        }
    }

    fn reduction(&self, rule: RuleID) -> Reduction<NonterminalID, ActionID> {
        let rule = self.grammar.rule(rule);
        Reduction {
            left: rule.left,
            len: rule.body.len(),
            action: rule.trailing_action(),
        }
    }

    fn goto(&self, current: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.table.goto(current, symbol)
    }

    fn expected(&self, current: StateID) -> Vec<Option<TerminalID>> {
        self.table
            .states
            .get(&current)
            .map(|state| {
                state
                    .actions
                    .keys()
                    .map(|&t| (t != TerminalID::EOI).then_some(t))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::{ProductionDesc, Symbol},
        lalr::compute,
    };

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

    /// Run the table on a sentence and record the actions taken.
    fn trace(g: &Grammar, table: &LalrTable, input: &[&str]) -> Vec<String> {
        let mut states = vec![StateID::INITIAL];
        let mut input = input.iter().map(|name| g.terminal(name).unwrap());
        let mut lookahead = input.next().unwrap_or(TerminalID::EOI);
        let mut trace = vec![];
        loop {
            let current = *states.last().unwrap();
            match table.action(current, lookahead) {
                [Action::Shift(next)] => {
                    trace.push(format!("shift {}", g.terminal_name(lookahead)));
                    states.push(*next);
                    lookahead = input.next().unwrap_or(TerminalID::EOI);
                }
                [Action::Reduce(rule)] => {
                    let rule = g.rule(*rule);
                    trace.push(format!("reduce {}", rule.display(g)));
                    states.truncate(states.len() - rule.body.len());
                    let top = *states.last().unwrap();
                    states.push(table.goto(top, rule.left).unwrap());
                }
                [Action::Accept] => {
                    trace.push("accept".into());
                    return trace;
                }
                actions => panic!("unexpected actions: {:?}", actions),
            }
        }
    }

    #[test]
    fn left_recursive_expression() {
        let g = grammar(&[("E", &["E", "+", "T"]), ("E", &["T"]), ("T", &["id"])]);
        let table = compute(&g);
        assert!(table.is_lalr1());
        assert_eq!(
            trace(&g, &table, &["id", "+", "id"]),
            vec![
                "shift id",
                "reduce T -> id",
                "reduce E -> T",
                "shift +",
                "shift id",
                "reduce T -> id",
                "reduce E -> E + T",
                "accept",
            ]
        );
    }

    #[test]
    fn single_production_is_minimal() {
        let g = grammar(&[("S", &["a"])]);
        let table = compute(&g);
        assert!(table.is_lalr1());
        assert_eq!(table.states.len(), 3);
        assert_eq!(trace(&g, &table, &["a"]), vec!["shift a", "reduce S -> a", "accept"]);
    }

    #[test]
    fn epsilon_rule_reduced_on_closure_lookahead() {
        let g = grammar(&[("S", &["A", "b"]), ("A", &[])]);
        let table = compute(&g);
        assert!(table.is_lalr1());
        assert_eq!(
            trace(&g, &table, &["b"]),
            vec!["reduce A -> ε", "shift b", "reduce S -> A b", "accept"]
        );
    }

    #[test]
    fn lalr_but_not_slr() {
        let g = grammar(&[
            ("S", &["L", "=", "R"]),
            ("S", &["R"]),
            ("L", &["*", "R"]),
            ("L", &["id"]),
            ("R", &["L"]),
        ]);
        let table = compute(&g);
        assert!(table.is_lalr1(), "{}", table.display(&g));
        assert_eq!(
            trace(&g, &table, &["*", "id", "=", "id"]).last().map(String::as_str),
            Some("accept")
        );
    }

    #[test]
    fn reduce_reduce_conflict() {
        // S -> a A d | b B d | a B e | b A e ; A -> c ; B -> c
        let g = grammar(&[
            ("S", &["a", "A", "d"]),
            ("S", &["b", "B", "d"]),
            ("S", &["a", "B", "e"]),
            ("S", &["b", "A", "e"]),
            ("A", &["c"]),
            ("B", &["c"]),
        ]);
        let table = compute(&g);
        assert!(!table.is_lalr1());
        assert!(table
            .conflicts
            .iter()
            .all(|c| c.kind == ConflictKind::ReduceReduce));

        // The conflicting state is the one reached by `c`, where both
        // `A -> c .` and `B -> c .` are completed.
        let a = g.nonterminal("A").unwrap();
        let b = g.nonterminal("B").unwrap();
        let reduce_a = g.productions_of(a).next().unwrap().0;
        let reduce_b = g.productions_of(b).next().unwrap().0;
        let conflict = &table.conflicts[0];
        let kernels: Vec<_> = table.states[&conflict.state]
            .kernels
            .iter()
            .map(|(item, _)| item.rule)
            .collect();
        assert_eq!(kernels.len(), 2);
        assert!(kernels.contains(&reduce_a) && kernels.contains(&reduce_b));
        assert_eq!(
            conflict.actions,
            vec![Action::Reduce(reduce_a), Action::Reduce(reduce_b)]
        );
        assert_eq!(
            table.state_status(conflict.state),
            Some(ConflictKind::ReduceReduce)
        );

        let terminals: Vec<_> = table
            .conflicts
            .iter()
            .map(|c| g.terminal_name(c.terminal))
            .collect();
        assert_eq!(terminals.len(), 2);
        assert!(terminals.contains(&"d") && terminals.contains(&"e"));
    }

    #[test]
    fn shift_reduce_conflict() {
        let g = grammar(&[("E", &["E", "+", "E"]), ("E", &["id"])]);
        let table = compute(&g);
        assert!(!table.is_lalr1());
        assert_eq!(table.conflicts.len(), 1);
        let conflict = &table.conflicts[0];
        assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
        assert_eq!(g.terminal_name(conflict.terminal), "+");
        assert_eq!(
            table.state_status(conflict.state),
            Some(ConflictKind::ShiftReduce)
        );
        assert_eq!(table.state_status(StateID::INITIAL), None);
        assert!(table.display(&g).to_string().contains("is LALR(1): no"));
    }

    #[test]
    fn severity_order() {
        assert!(ConflictKind::ShiftReduce < ConflictKind::ReduceReduce);
    }

    #[test]
    fn rebuilding_is_identical() {
        let source: &[(&str, &[&str])] = &[
            ("E", &["E", "+", "T"]),
            ("E", &["T"]),
            ("T", &["T", "*", "F"]),
            ("T", &["F"]),
            ("F", &["(", "E", ")"]),
            ("F", &["id"]),
        ];
        let g1 = grammar(source);
        let g2 = grammar(source);
        assert_eq!(compute(&g1), compute(&g2));
        assert_eq!(compute(&g1).states.len(), 12);
    }

    #[test]
    fn display_dump() {
        let g = grammar(&[("S", &["a"])]);
        let dump = compute(&g).display(&g).to_string();
        assert!(dump.starts_with("is LALR(1): yes\n3 states\n"), "{}", dump);
        assert!(dump.contains("#### State S#000\n"), "{}", dump);
        assert!(dump.contains("- $start -> [ . S ]  {$}\n"), "{}", dump);
        assert!(dump.contains("- $ => accept\n"), "{}", dump);
        assert!(dump.contains("- $ => reduce(S -> a)\n"), "{}", dump);
    }
}
