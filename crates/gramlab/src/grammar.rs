//! Grammar types.

use crate::{
    syntax::{self, ast as s},
    types::Map,
    util::{display_fn, write_separated},
};
use std::{fmt, fs, io, marker::PhantomData, path::Path};

/// The spelling of the empty-string marker.
pub const EPSILON: &str = "ε";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl gramlab_runtime::Token<TerminalID> for TerminalID {
    #[inline]
    fn as_symbol(&self) -> TerminalID {
        *self
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}

impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    /// Reserved symbol used as the start symbol of the augmented grammar.
    pub const START: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}

impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
    /// The empty-string marker. Only meaningful as the whole right-hand side
    /// of a rule, or as the argument of `FirstSets::first`.
    Epsilon,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The augmented rule `$start -> S`.
    pub const ACCEPT: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }

    /// The position of this rule in the flat rule list of the grammar.
    ///
    /// The augmented rule takes position 0, so the declared rules count
    /// from 1 and reduction traces are offset by one from the order the
    /// rules were written in.
    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

/// The type that represents a production rule in grammar.
///
/// The right-hand side of an epsilon production is stored empty.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}

impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    /// Whether this is an epsilon production.
    pub fn is_epsilon(&self) -> bool {
        self.right.is_empty()
    }

    pub fn is_left_recursive(&self) -> bool {
        matches!(self.right.first(), Some(SymbolID::N(n)) if *n == self.left)
    }

    pub fn is_right_recursive(&self) -> bool {
        matches!(self.right.last(), Some(SymbolID::N(n)) if *n == self.left)
    }

    pub fn is_certainly_ambiguous(&self) -> bool {
        self.is_left_recursive() && self.is_right_recursive()
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} -> ", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                return f.write_str(EPSILON);
            }
            write_separated(f, self.right.iter().map(|s| g.symbol_name(*s)), " ")
        })
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left && self.right == other.right
    }
}

impl Eq for Rule {}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,
    groups: Map<NonterminalID, Vec<RuleID>>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.user_terminals() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.user_nonterminals() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.user_rules() {
            writeln!(f, "{}: {}", rule.id().index(), rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        let grammar = syntax::parse(source).map_err(GrammarDefError::Syntax)?;
        Grammar::define(|g| define_grammar_from_syntax(g, grammar))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
            _marker: PhantomData,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: "$".into(),
            },
        );

        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: "$start".into(),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Iterate over the declared rules, without the augmented one.
    pub fn user_rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules
            .values()
            .filter(|rule| rule.id() != RuleID::ACCEPT)
    }

    /// Iterate over the rules of `left` in declaration order.
    pub fn rules_of(&self, left: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.groups
            .get(&left)
            .into_iter()
            .flatten()
            .map(move |id| &self.rules[id])
    }

    /// Iterate over the declared terminals, without `$`.
    pub fn user_terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals
            .values()
            .filter(|t| t.id() != TerminalID::EOI)
    }

    /// Iterate over the declared nonterminals, without the augmented start.
    pub fn user_nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals
            .values()
            .filter(|n| n.id() != NonterminalID::START)
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name() == name)
            .map(|t| t.id())
    }

    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name() == name)
            .map(|n| n.id())
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
            SymbolID::Epsilon => EPSILON,
        }
    }

    /// Whether every rule is left recursive.
    pub fn is_left_recursive(&self) -> bool {
        self.user_rules().all(Rule::is_left_recursive)
    }

    /// Whether every rule is right recursive.
    pub fn is_right_recursive(&self) -> bool {
        self.user_rules().all(Rule::is_right_recursive)
    }

    /// Whether every rule is both left and right recursive.
    pub fn is_certainly_ambiguous(&self) -> bool {
        self.user_rules().all(Rule::is_certainly_ambiguous)
    }
}

fn define_grammar_from_syntax(
    g: &mut GrammarDef<'_>,
    mut grammar: s::Grammar,
) -> Result<(), GrammarDefError> {
    // vocabulary first, then rules, then the start symbol.
    grammar.stmts.sort_by_key(|stmt| match stmt {
        s::Stmt::TerminalDesc(..) => 0,
        s::Stmt::NonterminalDesc(..) => 1,
        s::Stmt::RuleDesc(..) => 2,
        s::Stmt::StartDesc(..) => 3,
    });

    let mut terminals = Map::default();
    let mut nonterminals = Map::default();

    for stmt in &grammar.stmts {
        match stmt {
            s::Stmt::TerminalDesc(s::TerminalDesc { idents }) => {
                for name in idents {
                    let symbol = g.terminal(name)?;
                    terminals.insert(name.as_str(), symbol);
                }
            }

            s::Stmt::NonterminalDesc(s::NonterminalDesc { idents }) => {
                for name in idents {
                    let symbol = g.nonterminal(name)?;
                    nonterminals.insert(name.as_str(), symbol);
                }
            }

            s::Stmt::StartDesc(s::StartDesc { name }) => {
                let start_symbol = nonterminals
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| format!("unknown start symbol: `{}'", name))?;
                g.start_symbol(start_symbol)?;
            }

            s::Stmt::RuleDesc(s::RuleDesc { left, productions }) => {
                if terminals.contains_key(left.as_str()) {
                    return Err(format!("the terminal `{}' has production rules", left).into());
                }
                let left = match nonterminals.get(left.as_str()) {
                    Some(id) => *id,
                    None => {
                        // undeclared symbols are nonterminals.
                        let id = g.nonterminal(left)?;
                        nonterminals.insert(left.as_str(), id);
                        id
                    }
                };

                for production in productions {
                    let mut right = vec![];
                    for elem in &production.elems {
                        let symbol = match terminals.get(elem.as_str()) {
                            Some(t) => SymbolID::T(*t),
                            None => match nonterminals.get(elem.as_str()) {
                                Some(n) => SymbolID::N(*n),
                                None => {
                                    let id = g.nonterminal(elem)?;
                                    nonterminals.insert(elem.as_str(), id);
                                    SymbolID::N(id)
                                }
                            },
                        };
                        right.push(symbol);
                    }
                    g.rule(left, right)?;
                }
            }
        }
    }

    Ok(())
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        self.verify_new_name(name)?;

        let id = TerminalID::from_raw(next_id(&mut self.next_terminal_id, "terminals")?);

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        self.verify_new_name(name)?;

        let raw = next_id(&mut self.next_nonterminal_id, "nonterminals")?;
        let id = NonterminalID::from_raw(raw);

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    /// Specify a production rule into this grammer.
    ///
    /// An epsilon production is written as `[SymbolID::Epsilon]` or as an
    /// empty sequence.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if left == NonterminalID::START || !self.nonterminals.contains_key(&left) {
            return Err("unknown nonterminal on the left-hand side of a rule".into());
        }

        let mut right: Vec<SymbolID> = right.into_iter().collect();
        if right.contains(&SymbolID::Epsilon) {
            if right.len() > 1 {
                return Err(format!(
                    "`{}' must be the whole right-hand side of a rule",
                    EPSILON
                )
                .into());
            }
            right.clear();
        }

        for symbol in &right {
            let known = match symbol {
                SymbolID::T(t) => *t != TerminalID::EOI && self.terminals.contains_key(t),
                SymbolID::N(n) => *n != NonterminalID::START && self.nonterminals.contains_key(n),
                SymbolID::Epsilon => false,
            };
            if !known {
                return Err("unknown symbol in the right-hand side of a rule".into());
            }
        }

        for rule in self.rules.values() {
            if rule.left == left && rule.right == right {
                return Err("Duplicate production rule detected".into());
            }
        }

        let id = RuleID::from_raw(next_id(&mut self.next_rule_id, "rules")?);
        self.rules.insert(id, Rule { id, left, right });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if symbol == NonterminalID::START || !self.nonterminals.contains_key(&symbol) {
            return Err("unknown start symbol".into());
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn verify_new_name(&self, name: &str) -> Result<(), GrammarDefError> {
        if !verify_name(name) {
            return Err(format!("incorrect symbol name: `{}'", name).into());
        }
        let exists = self.terminals.values().any(|t| t.name() == name)
            || self.nonterminals.values().any(|n| n.name() == name);
        if exists {
            return Err(format!("The symbol `{}' has already been declared", name).into());
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        let mut groups: Map<NonterminalID, Vec<RuleID>> = self
            .nonterminals
            .keys()
            .filter(|id| **id != NonterminalID::START)
            .map(|id| (*id, vec![]))
            .collect();
        for rule in self.rules.values() {
            groups[&rule.left].push(rule.id);
        }
        for (id, rules) in &groups {
            if rules.is_empty() {
                return Err(GrammarDefError::MissingRules {
                    name: self.nonterminals[id].name().to_owned(),
                });
            }
        }

        // The left-hand side of the first rule is the default start symbol.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .rules
                .values()
                .next()
                .map(|rule| rule.left)
                .ok_or("empty production rules")?,
        };

        groups.insert(NonterminalID::START, vec![RuleID::ACCEPT]);

        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        rules.extend(self.rules);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules,
            start_symbol: start,
            groups,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("Syntax error: {}", _0)]
    Syntax(anyhow::Error),

    #[error("No production rule found for nonterminal `{}'", name)]
    MissingRules { name: String },

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

fn next_id(next: &mut u16, what: &str) -> Result<u16, GrammarDefError> {
    let id = *next;
    *next = id
        .checked_add(1)
        .ok_or_else(|| format!("too many {} in a grammar", what))?;
    Ok(id)
}

fn verify_name(s: &str) -> bool {
    // `$...` names are reserved for the end marker and the augmented start.
    !s.is_empty() && !s.starts_with('$') && s != EPSILON && !s.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    fn scenario2() -> Grammar {
        Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let c = g.terminal("c")?;

            let s = g.nonterminal("S")?;
            let a_ = g.nonterminal("A")?;
            let b_ = g.nonterminal("B")?;

            g.rule(s, [N(a_), N(s), N(b_)])?;
            g.rule(s, [T(c)])?;
            g.rule(a_, [T(a)])?;
            g.rule(b_, [T(b)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn groups_rules_in_declaration_order() {
        let g = scenario2();
        let s = g.nonterminal_by_name("S").unwrap();
        assert_eq!(g.start_symbol, s);

        let rules: Vec<_> = g.rules_of(s).map(|r| r.display(&g).to_string()).collect();
        assert_eq!(rules, ["S -> A S B", "S -> c"]);

        // the augmented rule sits in front of the declared ones.
        let indices: Vec<_> = g.rules.keys().map(|id| id.index()).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
        assert_eq!(
            g.rule(RuleID::ACCEPT).display(&g).to_string(),
            "$start -> S"
        );
    }

    #[test]
    fn missing_rules() {
        let err = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let _b = g.nonterminal("B")?;
            g.rule(s, [T(a)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::MissingRules { ref name } if name == "B"));
    }

    #[test]
    fn epsilon_is_normalized() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a), N(s)])?;
            g.rule(s, [Epsilon])?;
            Ok(())
        })
        .unwrap();
        let rules: Vec<_> = g.user_rules().collect();
        assert!(!rules[0].is_epsilon());
        assert!(rules[1].is_epsilon());
        assert!(rules[1].right().is_empty());
        assert_eq!(rules[1].display(&g).to_string(), "S -> ε");
    }

    #[test]
    fn misplaced_epsilon() {
        let res = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a), Epsilon])?;
            Ok(())
        });
        assert!(matches!(res, Err(GrammarDefError::Other { .. })));
    }

    #[test]
    fn duplicate_rule_and_symbol() {
        let res = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)])?;
            g.rule(s, [T(a)])?;
            Ok(())
        });
        assert!(res.is_err());

        let res = Grammar::define(|g| {
            g.terminal("a")?;
            g.nonterminal("a")?;
            Ok(())
        });
        assert!(res.is_err());

        let res = Grammar::define(|g| {
            g.terminal("$")?;
            Ok(())
        });
        assert!(res.is_err());
    }

    #[test]
    fn start_symbol_defaults_to_first_rule() {
        // The vocabulary lists `S` last, but its rule comes first.
        let g = Grammar::from_str(
            "\
@terminal a b c;
@nonterminal A B S;
@rule S := A S B | c;
@rule A := a;
@rule B := b;
",
        )
        .unwrap();
        assert_eq!(g.start_symbol, g.nonterminal_by_name("S").unwrap());

        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let x = g.nonterminal("X")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [N(x)])?;
            g.rule(x, [T(a)])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(g.start_symbol, g.nonterminal_by_name("S").unwrap());
        assert_eq!(
            g.rule(RuleID::ACCEPT).display(&g).to_string(),
            "$start -> S"
        );
    }

    #[test]
    fn empty_grammar() {
        let res = Grammar::define(|_| Ok(()));
        assert!(matches!(res, Err(GrammarDefError::Other { .. })));
    }

    #[test]
    fn symbol_ids_do_not_wrap() {
        let res = Grammar::define(|g| {
            g.next_terminal_id = u16::MAX;
            g.terminal("a")?;
            Ok(())
        });
        assert!(matches!(res, Err(GrammarDefError::Other { ref msg }) if msg.contains("terminals")));

        let res = Grammar::define(|g| {
            g.next_nonterminal_id = u16::MAX;
            g.nonterminal("S")?;
            Ok(())
        });
        assert!(matches!(res, Err(GrammarDefError::Other { ref msg }) if msg.contains("nonterminals")));

        let res = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)])?;
            g.next_rule_id = u16::MAX;
            g.rule(s, [T(a), T(a)])?;
            Ok(())
        });
        assert!(matches!(res, Err(GrammarDefError::Other { ref msg }) if msg.contains("rules")));
    }

    #[test]
    fn whole_grammar_predicates() {
        // E -> E + E | E * E
        let g = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let star = g.terminal("*")?;
            let e = g.nonterminal("E")?;
            g.rule(e, [N(e), T(plus), N(e)])?;
            g.rule(e, [N(e), T(star), N(e)])?;
            Ok(())
        })
        .unwrap();
        assert!(g.is_left_recursive());
        assert!(g.is_right_recursive());
        assert!(g.is_certainly_ambiguous());

        // one rule that is not recursive is enough to clear the predicates.
        let g = scenario2();
        assert!(!g.is_left_recursive());
        assert!(!g.is_right_recursive());
        assert!(!g.is_certainly_ambiguous());
    }

    #[test]
    fn display_grammar() {
        let g = scenario2();
        assert_eq!(
            g.to_string(),
            "\
## terminals:
a
b
c

## nonterminals:
S (start)
A
B

## rules:
1: S -> A S B
2: S -> c
3: A -> a
4: B -> b
"
        );
    }
}
