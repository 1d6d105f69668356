//! Parser definitions.
//!
//! The machines in this crate never look at a grammar directly. They only
//! see the tables through the traits below, so any table representation
//! (in-memory tables built by `ptgen`, or constant arrays emitted by some
//! downstream tool) can drive them.

use std::fmt;

/// The symbol vocabulary shared by both kinds of parse table.
pub trait Symbols {
    /// The number to identify a terminal symbol.
    type Terminal: Copy + Eq + fmt::Debug;

    /// The number to identify a nonterminal symbol.
    type Nonterminal: Copy + Eq + fmt::Debug;

    /// The number to identify a production rule.
    type Rule: Copy + Eq + fmt::Debug;

    /// The number to identify a semantic action marker.
    type Action: Copy + Eq + fmt::Debug;

    /// Resolve a terminal from its name.
    fn terminal(&self, name: &str) -> Option<Self::Terminal>;

    fn terminal_name(&self, terminal: Self::Terminal) -> &str;

    fn nonterminal_name(&self, nonterminal: Self::Nonterminal) -> &str;

    fn action_name(&self, action: Self::Action) -> &str;
}

/// A symbol stored in the stack of the predictive machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StackSymbol<T, N, A> {
    T(T),
    N(N),
    A(A),
}

/// The trait for abstracting a LL(1) predictive table.
pub trait PredictiveTable: Symbols {
    /// Return the start symbol that the stack is seeded with.
    fn start_symbol(&self) -> Self::Nonterminal;

    /// Return the rule to expand `nonterminal` with on the lookahead symbol.
    ///
    /// `None` as the lookahead means the end of input, and `None` as the
    /// return value means that the cell is invalid.
    fn predict(
        &self,
        nonterminal: Self::Nonterminal,
        lookahead: Option<Self::Terminal>,
    ) -> Option<Self::Rule>;

    /// Push the right-hand side of `rule` onto `stack` in reverse order.
    fn expand(
        &self,
        rule: Self::Rule,
        stack: &mut Vec<StackSymbol<Self::Terminal, Self::Nonterminal, Self::Action>>,
    );

    /// Return the lookahead symbols that have a valid entry for `nonterminal`.
    fn expected(&self, nonterminal: Self::Nonterminal) -> Vec<Option<Self::Terminal>>;
}

/// The action that the LR automaton performs in a state on a lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LalrAction<TState, TRule> {
    Shift(TState),
    Reduce(TRule),
    Accept,
    /// There is no action for the lookahead symbol.
    Error,
    /// The cell holds more than one action.
    Conflict,
}

/// The summary of a production rule needed to perform a reduction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reduction<N, A> {
    /// The left-hand side of the rule.
    pub left: N,
    /// The number of grammar symbols on the right-hand side.
    ///
    /// Semantic action markers are not counted.
    pub len: usize,
    /// The semantic action marker at the end of the right-hand side, if any.
    pub action: Option<A>,
}

/// The trait for abstracting a LALR(1) ACTION/GOTO table.
pub trait LalrTable: Symbols {
    /// The number to identify the state of LR automaton.
    type State: Copy + Eq + fmt::Debug;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Whether the table is free of conflicts.
    fn is_usable(&self) -> bool;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol.
    ///
    /// If there is no lookahead symbol, a `None` is passed as the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> LalrAction<Self::State, Self::Rule>;

    fn reduction(&self, rule: Self::Rule) -> Reduction<Self::Nonterminal, Self::Action>;

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;

    /// Return the lookahead symbols that have an action in the state.
    fn expected(&self, current: Self::State) -> Vec<Option<Self::Terminal>>;
}

impl<T: ?Sized> Symbols for &T
where
    T: Symbols,
{
    type Terminal = T::Terminal;
    type Nonterminal = T::Nonterminal;
    type Rule = T::Rule;
    type Action = T::Action;

    fn terminal(&self, name: &str) -> Option<Self::Terminal> {
        (**self).terminal(name)
    }
    fn terminal_name(&self, terminal: Self::Terminal) -> &str {
        (**self).terminal_name(terminal)
    }
    fn nonterminal_name(&self, nonterminal: Self::Nonterminal) -> &str {
        (**self).nonterminal_name(nonterminal)
    }
    fn action_name(&self, action: Self::Action) -> &str {
        (**self).action_name(action)
    }
}

impl<T: ?Sized> PredictiveTable for &T
where
    T: PredictiveTable,
{
    fn start_symbol(&self) -> Self::Nonterminal {
        (**self).start_symbol()
    }
    fn predict(
        &self,
        nonterminal: Self::Nonterminal,
        lookahead: Option<Self::Terminal>,
    ) -> Option<Self::Rule> {
        (**self).predict(nonterminal, lookahead)
    }
    fn expand(
        &self,
        rule: Self::Rule,
        stack: &mut Vec<StackSymbol<Self::Terminal, Self::Nonterminal, Self::Action>>,
    ) {
        (**self).expand(rule, stack)
    }
    fn expected(&self, nonterminal: Self::Nonterminal) -> Vec<Option<Self::Terminal>> {
        (**self).expected(nonterminal)
    }
}

impl<T: ?Sized> LalrTable for &T
where
    T: LalrTable,
{
    type State = T::State;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }
    fn is_usable(&self) -> bool {
        (**self).is_usable()
    }
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> LalrAction<Self::State, Self::Rule> {
        (**self).action(current, lookahead)
    }
    fn reduction(&self, rule: Self::Rule) -> Reduction<Self::Nonterminal, Self::Action> {
        (**self).reduction(rule)
    }
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, symbol)
    }
    fn expected(&self, current: Self::State) -> Vec<Option<Self::Terminal>> {
        (**self).expected(current)
    }
}

/// A trait for abstracting token symbols.
pub trait Token<TDef: ?Sized + Symbols> {
    /// Return the terminal symbol corresponding to this token, if the
    /// definition knows it.
    fn terminal(&self, definition: &TDef) -> Option<TDef::Terminal>;
}

impl<TDef: ?Sized + Symbols> Token<TDef> for &str {
    fn terminal(&self, definition: &TDef) -> Option<TDef::Terminal> {
        definition.terminal(self)
    }
}

impl<TDef: ?Sized + Symbols> Token<TDef> for String {
    fn terminal(&self, definition: &TDef) -> Option<TDef::Terminal> {
        definition.terminal(self)
    }
}

/// The error type returned from semantic action handlers.
pub type SemanticError = Box<dyn std::error::Error + Send + Sync>;

/// Callbacks invoked by the machines while they consume the input.
///
/// Every method has a no-op default, so handlers only override what they
/// are interested in. The matched/operand stacks of a downstream
/// interpreter live in the implementor, never in the machines.
pub trait Semantics<TTok> {
    /// A terminal has been matched (LL) or shifted (LR).
    fn shift(&mut self, token: &TTok) -> Result<(), SemanticError> {
        let _ = token;
        Ok(())
    }

    /// A nonterminal has been expanded (LL) or reduced (LR).
    fn reduce(&mut self, left: &str) -> Result<(), SemanticError> {
        let _ = left;
        Ok(())
    }

    /// A semantic action marker has been reached.
    ///
    /// `operands` are the terminal tokens the action applies to: the most
    /// recently matched token for the predictive machine, the terminals of
    /// the reduced handle (left to right) for the LR machine.
    fn action(&mut self, name: &str, operands: &[TTok]) -> Result<(), SemanticError> {
        let _ = (name, operands);
        Ok(())
    }

    fn accept(&mut self) -> Result<(), SemanticError> {
        Ok(())
    }
}

impl<TTok> Semantics<TTok> for () {}

impl<TTok, S: ?Sized> Semantics<TTok> for &mut S
where
    S: Semantics<TTok>,
{
    fn shift(&mut self, token: &TTok) -> Result<(), SemanticError> {
        (**self).shift(token)
    }
    fn reduce(&mut self, left: &str) -> Result<(), SemanticError> {
        (**self).reduce(left)
    }
    fn action(&mut self, name: &str, operands: &[TTok]) -> Result<(), SemanticError> {
        (**self).action(name, operands)
    }
    fn accept(&mut self) -> Result<(), SemanticError> {
        (**self).accept()
    }
}
