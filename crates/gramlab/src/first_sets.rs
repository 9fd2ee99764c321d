//! Calculation of first set function.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, EPSILON},
    types::{Map, Set, TerminalSet},
    util::{display_fn, write_separated},
};
use std::fmt;

/// The first set of a symbol or of a sequence of symbols.
///
/// `nullable` stands for the membership of `ε`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FirstSet {
    pub terminals: TerminalSet,
    pub nullable: bool,
}

impl FirstSet {
    /// `Epsilon` asks about the `nullable` flag.
    pub fn contains(&self, symbol: SymbolID) -> bool {
        match symbol {
            SymbolID::T(t) => self.terminals.contains(t),
            SymbolID::N(..) => false,
            SymbolID::Epsilon => self.nullable,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let names = self
                .terminals
                .iter()
                .map(|t| g.symbol_name(SymbolID::T(t)))
                .chain(self.nullable.then_some(EPSILON));
            f.write_str("{ ")?;
            write_separated(f, names, " ")?;
            f.write_str(" }")
        })
    }
}

#[derive(Debug)]
pub struct FirstSets {
    nulls: Set<NonterminalID>,
    first_sets: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let span = tracing::trace_span!("first_sets");
        let _entered = span.enter();

        let nulls = nulls_set(grammar);
        let first_sets = first_set(grammar, &nulls);
        Self { nulls, first_sets }
    }

    /// Whether `ε` is derivable from `n`.
    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.nulls.contains(&n)
    }

    /// `First(X)`
    pub fn first(&self, symbol: SymbolID) -> FirstSet {
        match symbol {
            SymbolID::T(t) => FirstSet {
                terminals: Some(t).into_iter().collect(),
                nullable: false,
            },
            SymbolID::N(n) => FirstSet {
                terminals: self.first_sets.get(&n).cloned().unwrap_or_default(),
                nullable: self.is_nullable(n),
            },
            SymbolID::Epsilon => FirstSet {
                terminals: TerminalSet::default(),
                nullable: true,
            },
        }
    }

    /// `First(Y1 Y2 ... Yn)`
    ///
    /// The empty sequence derives only `ε`.
    pub fn first_of(&self, symbols: &[SymbolID]) -> FirstSet {
        let mut res = FirstSet::default();
        for symbol in symbols {
            let first = self.first(*symbol);
            res.terminals.union_with(&first.terminals);
            if !first.nullable {
                return res;
            }
        }
        res.nullable = true;
        res
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for n in g.user_nonterminals() {
                let first = self.first(SymbolID::N(n.id()));
                writeln!(f, "FIRST({}) = {}", n, first.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    // epsilon rules seed the set.
    let mut nulls: Set<NonterminalID> = grammar
        .user_rules()
        .filter_map(|rule| rule.is_epsilon().then_some(rule.left()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.user_rules() {
            if nulls.contains(&rule.left()) {
                continue;
            }
            let is_rhs_nullable = rule.right().iter().all(|symbol| match symbol {
                SymbolID::N(n) => nulls.contains(n),
                _ => false,
            });
            if is_rhs_nullable {
                changed = true;
                nulls.insert(rule.left());
            }
        }
    }

    tracing::trace!(nulls = nulls.len(), "nullable nonterminals");
    nulls
}

fn first_set(grammar: &Grammar, nulls: &Set<NonterminalID>) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = grammar
        .nonterminals
        .keys()
        .map(|id| (*id, TerminalSet::default()))
        .collect();

    // For `X -> Y1 Y2 ... Yn`, scan up to the first non-nullable Yk:
    // a terminal Yk is added to First(X) directly, and each nonterminal Yi
    // (i <= k) yields the constraint First(X) ⊇ First(Yi).
    #[derive(Debug)]
    struct Constraint {
        sup: NonterminalID,
        sub: NonterminalID,
    }
    let mut constraints = vec![];
    for rule in grammar.user_rules() {
        for symbol in rule.right() {
            match symbol {
                SymbolID::T(t) => {
                    insert_terminal(&mut map, rule.left(), *t);
                    break;
                }
                SymbolID::N(n) => {
                    if *n != rule.left() {
                        constraints.push(Constraint {
                            sup: rule.left(),
                            sub: *n,
                        });
                    }
                    if !nulls.contains(n) {
                        break;
                    }
                }
                SymbolID::Epsilon => unreachable!("epsilon is normalized out of rules"),
            }
        }
    }

    // Grow the supersets until every constraint holds.
    let mut rounds = 0;
    let mut changed = true;
    while changed {
        changed = false;
        rounds += 1;

        for Constraint { sup, sub } in &constraints {
            let subset = map.get(sub).cloned().unwrap_or_default();
            if let Some(superset) = map.get_mut(sup) {
                if !subset.is_subset(superset) {
                    superset.union_with(&subset);
                    changed = true;
                }
            }
        }
    }
    tracing::trace!(rounds, "first sets converged");

    map
}

fn insert_terminal(map: &mut Map<NonterminalID, TerminalSet>, n: NonterminalID, t: TerminalID) {
    if let Some(set) = map.get_mut(&n) {
        set.insert(t);
    }
}
