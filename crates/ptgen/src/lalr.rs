//! The LALR(1) construction.

pub mod lookahead;
pub mod lr0;
pub mod table;

use self::table::LalrTable;
use crate::grammar::Grammar;

/// Compute the LALR(1) parse table of the specified grammar.
///
/// The table is returned even if it has conflicts; see
/// [`LalrTable::is_lalr1`].
pub fn compute(g: &Grammar) -> LalrTable {
    let lr0 = lr0::lr0(g);
    let lookaheads = lookahead::lalr(g, &lr0);
    table::generate(g, &lr0, &lookaheads)
}
