//! Calculation of follow set function.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::{Map, TerminalSet},
    util::{display_fn, write_separated},
};
use std::fmt;

#[derive(Debug)]
pub struct FollowSets {
    follow_sets: Map<NonterminalID, TerminalSet>,
    empty: TerminalSet,
}

impl FollowSets {
    pub fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let span = tracing::trace_span!("follow_sets");
        let _entered = span.enter();

        let mut follow_sets: Map<NonterminalID, TerminalSet> = grammar
            .nonterminals
            .keys()
            .map(|id| (*id, TerminalSet::default()))
            .collect();
        if let Some(set) = follow_sets.get_mut(&grammar.start_symbol) {
            set.insert(TerminalID::EOI);
        }

        // `Follow(A) ⊇ Follow(L)` for `L -> ... A β` with a nullable `β`.
        let mut constraints: Vec<(NonterminalID, NonterminalID)> = vec![];
        for rule in grammar.user_rules() {
            for (i, symbol) in rule.right().iter().enumerate() {
                let n = match symbol {
                    SymbolID::N(n) => *n,
                    _ => continue,
                };
                let rest = first_sets.first_of(&rule.right()[i + 1..]);
                if let Some(set) = follow_sets.get_mut(&n) {
                    set.union_with(&rest.terminals);
                }
                if rest.nullable && rule.left() != n {
                    constraints.push((n, rule.left()));
                }
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for (sup, sub) in &constraints {
                let subset = follow_sets.get(sub).cloned().unwrap_or_default();
                if let Some(superset) = follow_sets.get_mut(sup) {
                    if !subset.is_subset(superset) {
                        superset.union_with(&subset);
                        changed = true;
                    }
                }
            }
        }

        Self {
            follow_sets,
            empty: TerminalSet::default(),
        }
    }

    /// `Follow(A)`
    ///
    /// Unknown nonterminals have an empty follow set.
    pub fn follow(&self, n: NonterminalID) -> &TerminalSet {
        self.follow_sets.get(&n).unwrap_or(&self.empty)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for n in g.user_nonterminals() {
                write!(f, "FOLLOW({}) = {{ ", n)?;
                let names = self
                    .follow(n.id())
                    .iter()
                    .map(|t| g.symbol_name(SymbolID::T(t)));
                write_separated(f, names, " ")?;
                writeln!(f, " }}")?;
            }
            Ok(())
        })
    }
}
