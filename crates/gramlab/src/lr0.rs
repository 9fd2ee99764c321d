//! LR(0) automaton and shift/reduce table.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    types::{Map, Set},
    util::display_fn,
};
use gramlab_runtime::{
    parser::{self, Rejection},
    ParseAction, ParseActionError, ParseError, ParseOutcome, ParseTable,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl StateID {
    /// The state whose kernel is `$start -> . S`.
    pub const INITIAL: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

/// The LR(0) item: a rule with a dot position in its right-hand side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub rule: RuleID,
    pub index: u16,
}
impl LR0Item {
    /// The symbol right after the dot, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(usize::from(self.index)).copied()
    }

    // `"A -> a . B c"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let rule = g.rule(self.rule);
            write!(f, "{} ->", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == usize::from(self.index) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if rule.right().len() == usize::from(self.index) {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
pub struct LR0State {
    /// Sorted, so that a state is identified by its kernel alone.
    pub kernels: Vec<LR0Item>,
    /// The closure of `kernels`, kernels first.
    pub items: Vec<LR0Item>,
    pub shifts: Map<TerminalID, StateID>,
    pub gotos: Map<NonterminalID, StateID>,
    pub reduces: Set<RuleID>,
}

impl LR0State {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## items:")?;
            for item in &self.items {
                writeln!(f, "- {}", item.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {:?}", g.terminals[t], to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", g.nonterminals[n], to)?;
                }
            }
            if !self.reduces.is_empty() {
                writeln!(f, "## reduces:")?;
                for reduce in &self.reduces {
                    writeln!(f, "- {}", g.rule(*reduce).display(g))?;
                }
            }
            Ok(())
        })
    }
}

/// The canonical collection of LR(0) item sets.
#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
}

impl LR0Automaton {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, state)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the LR(0) automaton based on the specified grammar.
pub fn lr0(g: &Grammar) -> Result<LR0Automaton, LR0Error> {
    let span = tracing::trace_span!("lr0");
    let _entered = span.enter();

    let nonkernels = nonkernels(g);

    let mut states = Map::<StateID, LR0State>::default();
    let mut next_state_id = 0;

    let initial = vec![LR0Item {
        rule: RuleID::ACCEPT,
        index: 0,
    }];
    let mut kernel_ids = Map::<Vec<LR0Item>, StateID>::default();
    let mut pending_states = VecDeque::<(StateID, Vec<LR0Item>)>::new();
    let initial_id = next_id(&mut next_state_id)?;
    kernel_ids.insert(initial.clone(), initial_id);
    pending_states.push_back((initial_id, initial));

    let mut items = Set::default();
    let mut new_kernels = Map::<SymbolID, Set<LR0Item>>::default();
    while let Some((current, kernels)) = pending_states.pop_front() {
        items.clear();
        for kernel in &kernels {
            items.insert(*kernel);
        }
        for kernel in &kernels {
            if let Some(SymbolID::N(n)) = kernel.next_symbol(g) {
                if let Some(added) = nonkernels.get(&n) {
                    items.extend(added.iter().copied());
                }
            }
        }

        let mut reduces = Set::default();
        new_kernels.clear();
        for item in &items {
            match item.next_symbol(g) {
                Some(symbol) => {
                    new_kernels.entry(symbol).or_default().insert(LR0Item {
                        index: item.index + 1,
                        ..*item
                    });
                }
                None => {
                    reduces.insert(item.rule);
                }
            }
        }

        let mut shifts = Map::default();
        let mut gotos = Map::default();
        for (symbol, new_kernel) in new_kernels.drain(..) {
            let mut new_kernel: Vec<_> = new_kernel.into_iter().collect();
            new_kernel.sort();
            let next = match kernel_ids.get(&new_kernel) {
                Some(id) => *id,
                None => {
                    let id = next_id(&mut next_state_id)?;
                    tracing::trace!(?current, ?id, "new state");
                    kernel_ids.insert(new_kernel.clone(), id);
                    pending_states.push_back((id, new_kernel));
                    id
                }
            };
            match symbol {
                SymbolID::T(t) => {
                    shifts.insert(t, next);
                }
                SymbolID::N(n) => {
                    gotos.insert(n, next);
                }
                SymbolID::Epsilon => unreachable!("epsilon is normalized out of rules"),
            }
        }

        states.insert(
            current,
            LR0State {
                kernels,
                items: items.iter().copied().collect(),
                shifts,
                gotos,
                reduces,
            },
        );
    }
    tracing::trace!(states = states.len(), "canonical collection");

    Ok(LR0Automaton { states })
}

fn next_id(next: &mut u16) -> Result<StateID, LR0Error> {
    let id = StateID(*next);
    *next = next.checked_add(1).ok_or(LR0Error::TooManyStates)?;
    Ok(id)
}

/// The items `B -> . γ` added to a closure by an item `A -> α . B β`.
fn nonkernels(g: &Grammar) -> Map<NonterminalID, Set<LR0Item>> {
    let mut nonkernels: Map<NonterminalID, Set<LR0Item>> = Map::default();
    for &n in g.nonterminals.keys() {
        let mut items: Set<LR0Item> = g
            .rules_of(n)
            .map(|rule| LR0Item {
                rule: rule.id(),
                index: 0,
            })
            .collect();

        let mut added = Set::default();
        loop {
            added.clear();
            for item in &items {
                if let Some(SymbolID::N(n)) = item.next_symbol(g) {
                    added.extend(g.rules_of(n).map(|rule| LR0Item {
                        rule: rule.id(),
                        index: 0,
                    }));
                }
            }

            let changed = added
                .drain(..)
                .fold(false, |changed, item| changed | items.insert(item));
            if !changed {
                break;
            }
        }
        nonkernels.insert(n, items);
    }
    nonkernels
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(StateID),
    Reduce(RuleID),
    Accept,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    ReduceAccept,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ShiftReduce => "shift/reduce",
            Self::ReduceReduce => "reduce/reduce",
            Self::ReduceAccept => "reduce/accept",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LR0Error {
    #[error("{} conflict in state {:?} on `{}':\n{}", kind, state, terminal, items)]
    Conflict {
        state: StateID,
        kind: ConflictKind,
        terminal: String,
        /// The items of the conflicted state, one per line.
        items: String,
    },

    #[error("too many LR(0) states")]
    TooManyStates,
}

/// The shift/reduce table derived from an LR(0) automaton.
#[derive(Debug)]
pub struct LR0Table {
    actions: Map<StateID, Map<TerminalID, Action>>,
    gotos: Map<StateID, Map<NonterminalID, StateID>>,
}

impl LR0Table {
    pub fn generate(g: &Grammar, automaton: &LR0Automaton) -> Result<Self, LR0Error> {
        let span = tracing::trace_span!("lr0_table");
        let _entered = span.enter();

        let mut actions = Map::default();
        let mut gotos = Map::default();
        for (id, state) in &automaton.states {
            let mut row: Map<TerminalID, Action> = state
                .shifts
                .iter()
                .map(|(t, next)| (*t, Action::Shift(*next)))
                .collect();

            for reduce in &state.reduces {
                if *reduce == RuleID::ACCEPT {
                    add_action(g, *id, state, &mut row, TerminalID::EOI, Action::Accept)?;
                    continue;
                }
                for t in g.terminals.keys() {
                    add_action(g, *id, state, &mut row, *t, Action::Reduce(*reduce))?;
                }
            }

            actions.insert(*id, row);
            gotos.insert(*id, state.gotos.clone());
        }

        Ok(Self { actions, gotos })
    }

    pub fn action(&self, state: StateID, t: TerminalID) -> Option<Action> {
        self.actions.get(&state)?.get(&t).copied()
    }

    pub fn goto(&self, state: StateID, n: NonterminalID) -> Option<StateID> {
        self.gotos.get(&state)?.get(&n).copied()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, row)) in self.actions.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## actions")?;
                let mut row: Vec<_> = row.iter().map(|(t, a)| (*t, *a)).collect();
                row.sort_by_key(|(t, _)| *t);
                for (t, action) in row {
                    let t = &g.terminals[&t];
                    match action {
                        Action::Shift(n) => writeln!(f, "- {} => shift({:?})", t, n)?,
                        Action::Reduce(r) => {
                            writeln!(f, "- {} => reduce({})", t, g.rule(r).display(g))?
                        }
                        Action::Accept => writeln!(f, "- {} => accept", t)?,
                    }
                }
                let gotos = self.gotos.get(id).into_iter().flatten();
                for (j, (n, goto)) in gotos.enumerate() {
                    if j == 0 {
                        writeln!(f, "## gotos")?;
                    }
                    writeln!(f, "- {} => goto({:?})", g.nonterminals[n], goto)?;
                }
            }
            Ok(())
        })
    }
}

fn add_action(
    g: &Grammar,
    id: StateID,
    state: &LR0State,
    row: &mut Map<TerminalID, Action>,
    t: TerminalID,
    action: Action,
) -> Result<(), LR0Error> {
    match row.get(&t).copied() {
        Some(existing) if existing != action => {
            let kind = match (existing, action) {
                (Action::Shift(..), _) | (_, Action::Shift(..)) => ConflictKind::ShiftReduce,
                (Action::Accept, _) | (_, Action::Accept) => ConflictKind::ReduceAccept,
                _ => ConflictKind::ReduceReduce,
            };
            let items = state
                .items
                .iter()
                .map(|item| item.display(g).to_string())
                .collect::<Vec<_>>()
                .join("\n");
            Err(LR0Error::Conflict {
                state: id,
                kind,
                terminal: g.terminals[&t].to_string(),
                items,
            })
        }
        _ => {
            row.insert(t, action);
            Ok(())
        }
    }
}

/// A shift/reduce parser for a grammar.
#[derive(Debug)]
pub struct LR0Parser<'g> {
    grammar: &'g Grammar,
    automaton: LR0Automaton,
    table: LR0Table,
}

impl<'g> LR0Parser<'g> {
    pub fn new(grammar: &'g Grammar) -> Result<Self, LR0Error> {
        let automaton = lr0(grammar)?;
        let table = LR0Table::generate(grammar, &automaton)?;
        Ok(Self {
            grammar,
            automaton,
            table,
        })
    }

    pub fn automaton(&self) -> &LR0Automaton {
        &self.automaton
    }

    pub fn table(&self) -> &LR0Table {
        &self.table
    }

    /// Decide whether `input` belongs to the language.
    pub fn parse(&self, input: &[TerminalID]) -> Result<bool, ParseError> {
        Ok(self.parse_with_trace(input)?.is_accepted())
    }

    /// Like `parse`, also returning the reductions in the order they were
    /// applied, or where the input was rejected.
    pub fn parse_with_trace(
        &self,
        input: &[TerminalID],
    ) -> Result<ParseOutcome<RuleID, Rejection<StateID, TerminalID>>, ParseError> {
        for t in input {
            if *t == TerminalID::EOI || !self.grammar.terminals.contains_key(t) {
                return Err(ParseActionError::IncorrectSymbol.into());
            }
        }
        parser::parse(self, input.iter().copied())
    }
}

impl ParseTable for LR0Parser<'_> {
    type State = StateID;
    type Symbol = TerminalID;
    type Nonterminal = NonterminalID;
    type Reduce = RuleID;

    fn initial_state(&self) -> StateID {
        StateID::INITIAL
    }

    fn action(
        &self,
        current: StateID,
        lookahead: Option<TerminalID>,
    ) -> ParseAction<StateID, NonterminalID, RuleID> {
        let row = match self.table.actions.get(&current) {
            Some(row) => row,
            None => return ParseAction::Error(ParseActionError::IncorrectState),
        };
        match row.get(&lookahead.unwrap_or(TerminalID::EOI)) {
            Some(Action::Shift(next)) => ParseAction::Shift(*next),
            Some(Action::Reduce(rule)) => match self.grammar.rules.get(rule) {
                Some(rule) => ParseAction::Reduce(rule.id(), rule.left(), rule.right().len()),
                None => ParseAction::Error(ParseActionError::IncorrectSymbol),
            },
            Some(Action::Accept) => ParseAction::Accept,
            None => ParseAction::Fail,
        }
    }

    fn goto(&self, current: StateID, symbol: NonterminalID) -> Result<StateID, ParseActionError> {
        self.table
            .goto(current, symbol)
            .ok_or(ParseActionError::IncorrectState)
    }
}
