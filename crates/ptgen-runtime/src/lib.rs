//! Runtime library for the table-driven validators built from `ptgen` tables.
//!
//! Two machines are provided: [`PredictiveParser`] for LL(1) tables and
//! [`LalrParser`] for LALR(1) tables. [`Composite`] runs a LALR(1) machine
//! on a bracketed segment of a predictive parse.

pub mod compose;
pub mod definition;
pub mod error;
pub mod lalr;
pub mod ll1;

pub use crate::{
    compose::{Boundary, Composite},
    error::ParseError,
    lalr::LalrParser,
    ll1::PredictiveParser,
};
