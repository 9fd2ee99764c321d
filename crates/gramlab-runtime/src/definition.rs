//! Parser definition.

use std::fmt;

/// The trait for abstracting a shift/reduce parse table.
pub trait ParseTable {
    /// The number to identify the state of LR automaton.
    type State: Copy + fmt::Debug;

    /// The number to identify the terminal symbols.
    type Symbol: Copy + fmt::Debug;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy + fmt::Debug;

    /// The context value corresponding to the matched production rule.
    type Reduce: Copy + fmt::Debug;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol.
    ///
    /// If there is no lookahead symbol, a `None` is passsed as the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Nonterminal, Self::Reduce>;

    /// Return the state reached from `current` after reducing to `symbol`.
    fn goto(
        &self,
        current: Self::State,
        symbol: Self::Nonterminal,
    ) -> Result<Self::State, ParseActionError>;
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    type State = T::State;
    type Symbol = T::Symbol;
    type Nonterminal = T::Nonterminal;
    type Reduce = T::Reduce;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Nonterminal, Self::Reduce> {
        (**self).action(current, lookahead)
    }

    fn goto(
        &self,
        current: Self::State,
        symbol: Self::Nonterminal,
    ) -> Result<Self::State, ParseActionError> {
        (**self).goto(current, symbol)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[non_exhaustive]
pub enum ParseAction<TState, TNonterminal, TReduce> {
    /// Push the lookahead symbol and move to the specified state.
    Shift(TState),

    /// Pop `n` entries and reduce them to the nonterminal.
    Reduce(TReduce, TNonterminal, usize),

    Accept,

    /// There is no action for the lookahead symbol in this state.
    Fail,

    Error(ParseActionError),
}

#[derive(Debug, Copy, Clone, PartialEq, thiserror::Error)]
pub enum ParseActionError {
    #[error("incorrect state")]
    IncorrectState,

    #[error("incorrect symbol")]
    IncorrectSymbol,
}

/// A grammar symbol as seen by the predictive engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Symbol<TTerminal, TNonterminal> {
    T(TTerminal),
    N(TNonterminal),
}

/// The trait for abstracting a predictive (LL(1)) parse table.
pub trait PredictiveTable {
    type Terminal: Copy + PartialEq + fmt::Debug;
    type Nonterminal: Copy + fmt::Debug;
    type Rule: Copy + fmt::Debug;

    /// Return the symbol pushed on top of the end marker at startup.
    fn start_symbol(&self) -> Self::Nonterminal;

    /// Return the rule to expand `top` with when `lookahead` is the next
    /// input symbol, or `None` if the table has no entry.
    fn predict(
        &self,
        top: Self::Nonterminal,
        lookahead: Option<Self::Terminal>,
    ) -> Result<Option<Self::Rule>, ParseActionError>;

    /// Append the right-hand side of `rule` to `out`, from left to right.
    ///
    /// Nothing is appended for an empty production.
    fn expand(
        &self,
        rule: Self::Rule,
        out: &mut Vec<Symbol<Self::Terminal, Self::Nonterminal>>,
    ) -> Result<(), ParseActionError>;
}

impl<T: ?Sized> PredictiveTable for &T
where
    T: PredictiveTable,
{
    type Terminal = T::Terminal;
    type Nonterminal = T::Nonterminal;
    type Rule = T::Rule;

    fn start_symbol(&self) -> Self::Nonterminal {
        (**self).start_symbol()
    }

    fn predict(
        &self,
        top: Self::Nonterminal,
        lookahead: Option<Self::Terminal>,
    ) -> Result<Option<Self::Rule>, ParseActionError> {
        (**self).predict(top, lookahead)
    }

    fn expand(
        &self,
        rule: Self::Rule,
        out: &mut Vec<Symbol<Self::Terminal, Self::Nonterminal>>,
    ) -> Result<(), ParseActionError> {
        (**self).expand(rule, out)
    }
}
