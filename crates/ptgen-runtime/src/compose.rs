//! Running a LALR(1) machine inside a predictive parse.
//!
//! Some languages are mostly LL(1) but carry a sublanguage (boolean
//! expressions, say) that is only LALR(1). The composite machine runs the
//! predictive machine and, whenever the delegated nonterminal reaches the
//! top of its stack, collects the tokens up to the matching closing
//! bracket and feeds them to the LALR(1) machine instead.

use crate::{
    definition::{LalrTable, PredictiveTable, Semantics, Token},
    error::ParseError,
    lalr::LalrParser,
    ll1::{Delegate, PredictiveParser},
};
use std::fmt;

/// Where the delegated segment begins and ends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Boundary<N, T> {
    /// The nonterminal of the predictive grammar that is delegated.
    pub nonterminal: N,
    /// The bracket that nests inside the delegated segment.
    pub open: T,
    /// The bracket that terminates the delegated segment when unmatched.
    ///
    /// This token is left in the input and matched by the predictive
    /// machine afterwards.
    pub close: T,
}

/// A predictive machine that hands one nonterminal over to a LALR(1) machine.
#[derive(Debug)]
pub struct Composite<L, R>
where
    L: PredictiveTable,
{
    ll1: PredictiveParser<L>,
    lalr: LalrParser<R>,
    boundary: Boundary<L::Nonterminal, L::Terminal>,
}

impl<L, R> Composite<L, R>
where
    L: PredictiveTable,
    R: LalrTable,
{
    pub fn new(
        ll1: PredictiveParser<L>,
        lalr: LalrParser<R>,
        boundary: Boundary<L::Nonterminal, L::Terminal>,
    ) -> Self {
        Self {
            ll1,
            lalr,
            boundary,
        }
    }

    pub fn parse<I, TTok, S>(&self, tokens: I, mut semantics: S) -> Result<(), ParseError>
    where
        I: IntoIterator<Item = TTok>,
        TTok: Token<L> + Token<R> + fmt::Debug,
        S: Semantics<TTok>,
    {
        let mut tokens = tokens.into_iter();
        let mut delegation = Delegation {
            ll1: self.ll1.definition(),
            lalr: &self.lalr,
            boundary: self.boundary,
        };
        self.ll1.drive(&mut tokens, &mut semantics, &mut delegation)
    }
}

struct Delegation<'a, L, R>
where
    L: PredictiveTable,
{
    ll1: &'a L,
    lalr: &'a LalrParser<R>,
    boundary: Boundary<L::Nonterminal, L::Terminal>,
}

impl<L, R, I, TTok, S> Delegate<L::Nonterminal, I, TTok, S> for Delegation<'_, L, R>
where
    L: PredictiveTable,
    R: LalrTable,
    I: Iterator<Item = TTok>,
    TTok: Token<L> + Token<R> + fmt::Debug,
    S: Semantics<TTok>,
{
    fn handles(&self, nonterminal: L::Nonterminal) -> bool {
        nonterminal == self.boundary.nonterminal
    }

    fn run(
        &mut self,
        first: Option<TTok>,
        tokens: &mut I,
        semantics: &mut S,
    ) -> Result<Option<TTok>, ParseError> {
        // The segment is entered right after an opening bracket.
        let mut depth = 1usize;
        let mut segment = vec![];
        let mut next = first;
        loop {
            let Some(token) = next.take() else {
                return Err(ParseError::UnbalancedDelegation {
                    close: self.ll1.terminal_name(self.boundary.close).to_owned(),
                });
            };
            match <TTok as Token<L>>::terminal(&token, self.ll1) {
                Some(t) if t == self.boundary.open => depth += 1,
                Some(t) if t == self.boundary.close => {
                    depth -= 1;
                    if depth == 0 {
                        tracing::trace!("delegated segment of {} tokens", segment.len());
                        self.lalr.drive(segment.into_iter(), semantics)?;
                        return Ok(Some(token));
                    }
                }
                _ => (),
            }
            segment.push(token);
            next = tokens.next();
        }
    }
}
