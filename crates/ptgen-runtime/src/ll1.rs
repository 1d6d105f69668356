//! The LL(1) predictive machine.

use crate::{
    definition::{PredictiveTable, Semantics, StackSymbol, Token},
    error::{ParseError, END_OF_INPUT},
};
use std::fmt;

/// A stack machine that consumes a token stream against a LL(1) table.
#[derive(Debug, Clone)]
pub struct PredictiveParser<TDef> {
    definition: TDef,
}

impl<TDef> PredictiveParser<TDef>
where
    TDef: PredictiveTable,
{
    /// Create a machine driven by the specified table.
    pub fn new(definition: TDef) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &TDef {
        &self.definition
    }

    /// Consume the whole token stream.
    ///
    /// The input is accepted when the stack has been emptied down to the
    /// end marker exactly when the tokens run out.
    pub fn parse<I, TTok, S>(&self, tokens: I, mut semantics: S) -> Result<(), ParseError>
    where
        I: IntoIterator<Item = TTok>,
        TTok: Token<TDef> + fmt::Debug,
        S: Semantics<TTok>,
    {
        let mut tokens = tokens.into_iter();
        self.drive(&mut tokens, &mut semantics, &mut NoDelegate)
    }

    pub(crate) fn drive<I, TTok, S, D>(
        &self,
        tokens: &mut I,
        semantics: &mut S,
        delegate: &mut D,
    ) -> Result<(), ParseError>
    where
        I: Iterator<Item = TTok>,
        TTok: Token<TDef> + fmt::Debug,
        S: Semantics<TTok>,
        D: Delegate<TDef::Nonterminal, I, TTok, S>,
    {
        let def = &self.definition;

        // The end marker sits implicitly below the bottom of this stack.
        let mut stack = vec![StackSymbol::N(def.start_symbol())];
        // The lookahead is resolved only where this machine consumes it, since
        // a delegated segment may begin with a token unknown to this table.
        let mut lookahead = tokens.next();
        let mut matched: Option<TTok> = None;

        while let Some(&top) = stack.last() {
            match top {
                StackSymbol::T(expected) => {
                    let found = self.terminal_of(lookahead.as_ref())?;
                    if found != Some(expected) {
                        return Err(self.syntax_error(
                            format!("`{}'", def.terminal_name(expected)),
                            found,
                            vec![Some(expected)],
                        ));
                    }
                    stack.pop();
                    if let Some(token) = lookahead.take() {
                        semantics.shift(&token).map_err(ParseError::Semantic)?;
                        matched = Some(token);
                    }
                    lookahead = tokens.next();
                }

                StackSymbol::N(n) if delegate.handles(n) => {
                    stack.pop();
                    tracing::trace!("delegate {} at {:?}", def.nonterminal_name(n), lookahead);
                    lookahead = delegate.run(lookahead.take(), tokens, semantics)?;
                }

                StackSymbol::N(n) => {
                    let t = self.terminal_of(lookahead.as_ref())?;
                    let rule = match def.predict(n, t) {
                        Some(rule) => rule,
                        None => {
                            return Err(self.syntax_error(
                                def.nonterminal_name(n).to_owned(),
                                t,
                                def.expected(n),
                            ));
                        }
                    };
                    tracing::trace!("expand {} with {:?}", def.nonterminal_name(n), rule);
                    stack.pop();
                    semantics
                        .reduce(def.nonterminal_name(n))
                        .map_err(ParseError::Semantic)?;
                    def.expand(rule, &mut stack);
                }

                StackSymbol::A(a) => {
                    stack.pop();
                    let operands = matched.as_ref().map_or(&[][..], std::slice::from_ref);
                    semantics
                        .action(def.action_name(a), operands)
                        .map_err(ParseError::Semantic)?;
                }
            }
        }

        match self.terminal_of(lookahead.as_ref())? {
            None => semantics.accept().map_err(ParseError::Semantic),
            Some(t) => Err(self.syntax_error(END_OF_INPUT.into(), Some(t), vec![None])),
        }
    }

    /// The terminal of the lookahead token, `None` standing for the end of input.
    fn terminal_of<TTok>(&self, token: Option<&TTok>) -> Result<Option<TDef::Terminal>, ParseError>
    where
        TTok: Token<TDef> + fmt::Debug,
    {
        let Some(token) = token else {
            return Ok(None);
        };
        match token.terminal(&self.definition) {
            Some(t) => Ok(Some(t)),
            None => Err(ParseError::UnknownToken {
                token: format!("{:?}", token),
            }),
        }
    }

    fn syntax_error(
        &self,
        context: String,
        found: Option<TDef::Terminal>,
        expected: Vec<Option<TDef::Terminal>>,
    ) -> ParseError {
        let name = |t: Option<TDef::Terminal>| match t {
            Some(t) => format!("`{}'", self.definition.terminal_name(t)),
            None => END_OF_INPUT.to_owned(),
        };
        ParseError::Syntax {
            context,
            found: name(found),
            expected: expected.into_iter().map(name).collect(),
        }
    }
}

/// The hook through which the predictive machine hands a part of the
/// input over to another machine.
pub(crate) trait Delegate<N, I, TTok, S> {
    fn handles(&self, nonterminal: N) -> bool;

    /// Consume the delegated segment, starting with `first`, and return the
    /// token at which the predictive machine resumes.
    fn run(
        &mut self,
        first: Option<TTok>,
        tokens: &mut I,
        semantics: &mut S,
    ) -> Result<Option<TTok>, ParseError>;
}

struct NoDelegate;

impl<N, I, TTok, S> Delegate<N, I, TTok, S> for NoDelegate {
    fn handles(&self, _: N) -> bool {
        false
    }

    fn run(&mut self, first: Option<TTok>, _: &mut I, _: &mut S) -> Result<Option<TTok>, ParseError> {
        Ok(first)
    }
}
