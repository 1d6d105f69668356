//! The LL(1) construction.

pub mod follow;
pub mod table;

use self::{
    follow::PredictSets,
    table::{Ll1Table, NotLl1Error},
};
use crate::grammar::Grammar;

/// Compute the PREDICT sets and the LL(1) table of the specified grammar.
pub fn compute(g: &Grammar) -> Result<(PredictSets, Ll1Table), NotLl1Error> {
    let sets = PredictSets::new(g);
    let table = table::generate(g, &sets)?;
    Ok((sets, table))
}
