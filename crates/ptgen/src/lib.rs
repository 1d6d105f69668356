//! A parser table compiler.
//!
//! From a context-free grammar this crate computes the LL(1) predictive
//! table (via FIRST, FOLLOW and PREDICT sets) and the LALR(1) ACTION/GOTO
//! table (via the LR(0) automaton and lookahead propagation). The tables
//! drive the validator machines in `ptgen-runtime`.

pub mod build;
pub mod first_sets;
pub mod grammar;
pub mod lalr;
pub mod ll1;
pub mod syntax;
pub mod types;
pub mod util;
