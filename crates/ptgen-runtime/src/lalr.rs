//! The LALR(1) shift-reduce machine.

use crate::{
    definition::{LalrAction, LalrTable, Semantics, Token},
    error::{ParseError, END_OF_INPUT},
};
use std::fmt;

/// A shift-reduce machine driven by a conflict-free LALR(1) table.
#[derive(Debug, Clone)]
pub struct LalrParser<TDef> {
    definition: TDef,
}

/// An entry of the symbol stack, parallel to the state stack.
#[derive(Debug)]
enum StackItem<TTok, N> {
    T(TTok),
    N(N),
}

impl<TDef> LalrParser<TDef>
where
    TDef: LalrTable,
{
    /// Create a machine driven by the specified table.
    ///
    /// A table that was flagged as conflicting is refused up front.
    pub fn new(definition: TDef) -> Result<Self, ParseError> {
        if !definition.is_usable() {
            return Err(ParseError::UnusableTable);
        }
        Ok(Self { definition })
    }

    pub fn definition(&self) -> &TDef {
        &self.definition
    }

    /// Consume the whole token stream.
    pub fn parse<I, TTok, S>(&self, tokens: I, mut semantics: S) -> Result<(), ParseError>
    where
        I: IntoIterator<Item = TTok>,
        TTok: Token<TDef> + fmt::Debug,
        S: Semantics<TTok>,
    {
        self.drive(tokens.into_iter(), &mut semantics)
    }

    pub(crate) fn drive<I, TTok, S>(&self, mut tokens: I, semantics: &mut S) -> Result<(), ParseError>
    where
        I: Iterator<Item = TTok>,
        TTok: Token<TDef> + fmt::Debug,
        S: Semantics<TTok>,
    {
        let def = &self.definition;

        let mut states = vec![def.initial_state()];
        let mut symbols: Vec<StackItem<TTok, TDef::Nonterminal>> = vec![];
        let mut operands: Vec<TTok> = vec![];
        let mut lookahead = self.next_lookahead(tokens.next())?;

        loop {
            // The state stack is never emptied: reductions always leave the
            // initial state in place.
            let current = states[states.len() - 1];
            let t = lookahead.as_ref().map(|(_, t)| *t);

            match def.action(current, t) {
                LalrAction::Shift(next) => {
                    let Some((token, _)) = lookahead.take() else {
                        return Err(self.syntax_error(current, None));
                    };
                    tracing::trace!("shift {:?} -> {:?}", token, next);
                    semantics.shift(&token).map_err(ParseError::Semantic)?;
                    symbols.push(StackItem::T(token));
                    states.push(next);
                    lookahead = self.next_lookahead(tokens.next())?;
                }

                LalrAction::Reduce(rule) => {
                    let reduction = def.reduction(rule);
                    if reduction.len >= states.len() {
                        return Err(ParseError::MissingGoto {
                            state: format!("{:?}", current),
                            symbol: def.nonterminal_name(reduction.left).to_owned(),
                        });
                    }
                    tracing::trace!("reduce {:?}", rule);

                    states.truncate(states.len() - reduction.len);
                    operands.clear();
                    operands.extend(
                        symbols
                            .drain(symbols.len() - reduction.len..)
                            .filter_map(|item| match item {
                                StackItem::T(token) => Some(token),
                                StackItem::N(..) => None,
                            }),
                    );

                    semantics
                        .reduce(def.nonterminal_name(reduction.left))
                        .map_err(ParseError::Semantic)?;
                    if let Some(action) = reduction.action {
                        semantics
                            .action(def.action_name(action), &operands)
                            .map_err(ParseError::Semantic)?;
                    }

                    let top = states[states.len() - 1];
                    let next = def.goto(top, reduction.left).ok_or_else(|| {
                        ParseError::MissingGoto {
                            state: format!("{:?}", top),
                            symbol: def.nonterminal_name(reduction.left).to_owned(),
                        }
                    })?;
                    symbols.push(StackItem::N(reduction.left));
                    states.push(next);
                }

                LalrAction::Accept => {
                    tracing::trace!("accept");
                    return semantics.accept().map_err(ParseError::Semantic);
                }

                LalrAction::Conflict => {
                    return Err(ParseError::Conflict {
                        state: format!("{:?}", current),
                        lookahead: self.lookahead_name(t),
                    });
                }

                _ => return Err(self.syntax_error(current, t)),
            }
        }
    }

    fn next_lookahead<TTok>(
        &self,
        token: Option<TTok>,
    ) -> Result<Option<(TTok, TDef::Terminal)>, ParseError>
    where
        TTok: Token<TDef> + fmt::Debug,
    {
        let Some(token) = token else {
            return Ok(None);
        };
        match token.terminal(&self.definition) {
            Some(t) => Ok(Some((token, t))),
            None => Err(ParseError::UnknownToken {
                token: format!("{:?}", token),
            }),
        }
    }

    fn lookahead_name(&self, t: Option<TDef::Terminal>) -> String {
        match t {
            Some(t) => format!("`{}'", self.definition.terminal_name(t)),
            None => END_OF_INPUT.to_owned(),
        }
    }

    fn syntax_error(&self, current: TDef::State, found: Option<TDef::Terminal>) -> ParseError {
        ParseError::Syntax {
            context: format!("state {:?}", current),
            found: self.lookahead_name(found),
            expected: self
                .definition
                .expected(current)
                .into_iter()
                .map(|t| self.lookahead_name(t))
                .collect(),
        }
    }
}
