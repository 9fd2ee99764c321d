//! Grammar analysis and parse table construction.
//!
//! A [`grammar::Grammar`] is built once, either programmatically through
//! [`grammar::Grammar::define`] or from a grammar file. The predictive path
//! derives FIRST/FOLLOW sets and an LL(1) table from it ([`ll1`]); the
//! shift/reduce path derives the canonical LR(0) collection and its table
//! ([`lr0`]). Both tables drive the engines of `gramlab-runtime`.

pub mod first_sets;
pub mod follow_sets;
pub mod grammar;
pub mod ll1;
pub mod lr0;
pub mod syntax;
pub mod types;
pub mod util;
