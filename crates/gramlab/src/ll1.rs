//! Predictive (LL(1)) parse table.

use crate::{
    first_sets::FirstSets,
    follow_sets::FollowSets,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    types::{Map, Set},
    util::display_fn,
};
use gramlab_runtime::{
    predictive::{self, Mismatch},
    ParseActionError, ParseError, ParseOutcome, PredictiveTable, Symbol,
};
use std::fmt;

/// The reason why a grammar cannot drive a predictive parser.
#[derive(Debug, thiserror::Error)]
pub enum Unsuitable {
    #[error("every rule is both left and right recursive")]
    CertainlyAmbiguous,

    #[error("`{}' is left recursive", nonterminal)]
    LeftRecursive { nonterminal: String },

    #[error(
        "alternatives of `{}' are not left-factored: more than one starts with `{}'",
        nonterminal,
        terminal
    )]
    NotLeftFactored {
        nonterminal: String,
        terminal: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LL1Error {
    #[error("the grammar is unsuitable for predictive parsing: {}", _0)]
    Unsuitable(#[from] Unsuitable),

    #[error(
        "conflicted predictions for ({}, {}): `{}' and `{}'",
        nonterminal,
        terminal,
        existing,
        incoming
    )]
    Conflict {
        nonterminal: String,
        terminal: String,
        existing: String,
        incoming: String,
    },
}

/// Find every nonterminal `A` with `A =>+ A ...`, directly or through
/// other nonterminals, where the symbols skipped on the way are nullable.
pub fn left_recursive_nonterminals(g: &Grammar, first_sets: &FirstSets) -> Set<NonterminalID> {
    // A -> B when some rule `A -> α B β` has a nullable `α`.
    let mut leftmost: Map<NonterminalID, Set<NonterminalID>> = Map::default();
    for rule in g.user_rules() {
        let heads = leftmost.entry(rule.left()).or_default();
        for symbol in rule.right() {
            match symbol {
                SymbolID::N(n) => {
                    heads.insert(*n);
                    if !first_sets.is_nullable(*n) {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    let reachable = |from: NonterminalID| {
        let mut visited: Set<NonterminalID> = Set::default();
        let mut stack: Vec<NonterminalID> =
            leftmost.get(&from).into_iter().flatten().copied().collect();
        while let Some(n) = stack.pop() {
            if n == from {
                return true;
            }
            if visited.insert(n) {
                stack.extend(leftmost.get(&n).into_iter().flatten().copied());
            }
        }
        false
    };

    g.user_nonterminals()
        .map(|n| n.id())
        .filter(|n| reachable(*n))
        .collect()
}

/// The table mapping `(nonterminal, lookahead)` to the rule to expand with.
#[derive(Debug)]
pub struct LL1Table {
    entries: Map<NonterminalID, Map<TerminalID, RuleID>>,
}

impl LL1Table {
    pub fn generate(
        g: &Grammar,
        first_sets: &FirstSets,
        follow_sets: &FollowSets,
    ) -> Result<Self, LL1Error> {
        let span = tracing::trace_span!("ll1_table");
        let _entered = span.enter();

        check_suitable(g, first_sets)?;

        let mut entries: Map<NonterminalID, Map<TerminalID, RuleID>> = Map::default();
        for rule in g.user_rules() {
            let first = first_sets.first_of(rule.right());
            let mut lookaheads = first.terminals;
            if first.nullable {
                lookaheads.union_with(follow_sets.follow(rule.left()));
            }

            let row = entries.entry(rule.left()).or_default();
            for t in lookaheads.iter() {
                match row.get(&t).copied() {
                    Some(existing) if existing != rule.id() => {
                        return Err(LL1Error::Conflict {
                            nonterminal: g.nonterminals[&rule.left()].to_string(),
                            terminal: g.terminals[&t].to_string(),
                            existing: g.rule(existing).display(g).to_string(),
                            incoming: rule.display(g).to_string(),
                        });
                    }
                    _ => {
                        tracing::trace!("predict {} on {}", rule.display(g), g.terminals[&t]);
                        row.insert(t, rule.id());
                    }
                }
            }
        }

        Ok(Self { entries })
    }

    /// Return the rule predicted for `n` when `t` is the next input symbol.
    pub fn get(&self, n: NonterminalID, t: TerminalID) -> Option<RuleID> {
        self.entries.get(&n)?.get(&t).copied()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, n) in g.user_nonterminals().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### {}", n)?;
                let mut row: Vec<_> = self
                    .entries
                    .get(&n.id())
                    .into_iter()
                    .flatten()
                    .map(|(t, rule)| (*t, *rule))
                    .collect();
                row.sort_by_key(|(t, _)| *t);
                for (t, rule) in row {
                    writeln!(f, "- {} => {}", g.terminals[&t], g.rule(rule).display(g))?;
                }
            }
            Ok(())
        })
    }
}

fn check_suitable(g: &Grammar, first_sets: &FirstSets) -> Result<(), Unsuitable> {
    if g.is_certainly_ambiguous() {
        return Err(Unsuitable::CertainlyAmbiguous);
    }

    let left_recursive = left_recursive_nonterminals(g, first_sets);
    if g.is_left_recursive() || !left_recursive.is_empty() {
        let n = left_recursive.first().copied().unwrap_or(g.start_symbol);
        return Err(Unsuitable::LeftRecursive {
            nonterminal: g.nonterminals[&n].to_string(),
        });
    }

    for n in g.user_nonterminals() {
        let firsts: Vec<_> = g
            .rules_of(n.id())
            .map(|rule| first_sets.first_of(rule.right()).terminals)
            .collect();
        for (i, lhs) in firsts.iter().enumerate() {
            for rhs in &firsts[i + 1..] {
                if lhs.is_disjoint(rhs) {
                    continue;
                }
                if let Some(t) = lhs.iter().find(|t| rhs.contains(*t)) {
                    return Err(Unsuitable::NotLeftFactored {
                        nonterminal: n.to_string(),
                        terminal: g.terminals[&t].to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// A predictive parser for a grammar.
#[derive(Debug)]
pub struct LL1Parser<'g> {
    grammar: &'g Grammar,
    table: LL1Table,
}

impl<'g> LL1Parser<'g> {
    pub fn new(grammar: &'g Grammar) -> Result<Self, LL1Error> {
        let first_sets = FirstSets::new(grammar);
        let follow_sets = FollowSets::new(grammar, &first_sets);
        let table = LL1Table::generate(grammar, &first_sets, &follow_sets)?;
        Ok(Self { grammar, table })
    }

    pub fn table(&self) -> &LL1Table {
        &self.table
    }

    /// Decide whether `input` belongs to the language.
    pub fn parse(&self, input: &[TerminalID]) -> Result<bool, ParseError> {
        Ok(self.parse_with_trace(input)?.is_accepted())
    }

    /// Like `parse`, also returning the leftmost derivation that was
    /// followed, or where the input was rejected.
    pub fn parse_with_trace(
        &self,
        input: &[TerminalID],
    ) -> Result<ParseOutcome<RuleID, Mismatch<TerminalID, NonterminalID>>, ParseError> {
        for t in input {
            if *t == TerminalID::EOI || !self.grammar.terminals.contains_key(t) {
                return Err(ParseActionError::IncorrectSymbol.into());
            }
        }
        predictive::parse(self, input.iter().copied())
    }
}

impl PredictiveTable for LL1Parser<'_> {
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Rule = RuleID;

    fn start_symbol(&self) -> NonterminalID {
        self.grammar.start_symbol
    }

    fn predict(
        &self,
        top: NonterminalID,
        lookahead: Option<TerminalID>,
    ) -> Result<Option<RuleID>, ParseActionError> {
        if !self.grammar.nonterminals.contains_key(&top) {
            return Err(ParseActionError::IncorrectSymbol);
        }
        Ok(self.table.get(top, lookahead.unwrap_or(TerminalID::EOI)))
    }

    fn expand(
        &self,
        rule: RuleID,
        out: &mut Vec<Symbol<TerminalID, NonterminalID>>,
    ) -> Result<(), ParseActionError> {
        let rule = self
            .grammar
            .rules
            .get(&rule)
            .ok_or(ParseActionError::IncorrectSymbol)?;
        for symbol in rule.right() {
            match symbol {
                SymbolID::T(t) => out.push(Symbol::T(*t)),
                SymbolID::N(n) => out.push(Symbol::N(*n)),
                SymbolID::Epsilon => return Err(ParseActionError::IncorrectSymbol),
            }
        }
        Ok(())
    }
}
