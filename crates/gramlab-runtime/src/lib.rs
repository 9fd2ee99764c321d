//! Table-driven parser engines for `gramlab`.
//!
//! The engines do not know how the tables were built. The shift/reduce
//! engine is driven through [`definition::ParseTable`] and the predictive
//! engine through [`definition::PredictiveTable`].

pub mod definition;
pub mod outcome;
pub mod parser;
pub mod predictive;

pub use crate::{
    definition::{ParseAction, ParseActionError, ParseTable, PredictiveTable, Symbol},
    outcome::ParseOutcome,
    parser::{ParseError, Parser, Token},
    predictive::PredictiveParser,
};
