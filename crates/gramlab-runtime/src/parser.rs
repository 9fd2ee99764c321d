//! Shift/reduce parser.

use crate::{
    definition::{ParseAction, ParseActionError, ParseTable},
    outcome::ParseOutcome,
};

/// A trait for abstracting token symbols.
pub trait Token<TSym> {
    fn as_symbol(&self) -> TSym;
}

/// The parser driven based on a shift/reduce parse table.
#[derive(Debug)]
pub struct Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Symbol>,
{
    definition: TDef,
    state_stack: Vec<TDef::State>,
    item_stack: Vec<ParseItem<TTok, TDef::Nonterminal>>,
    parser_state: ParserState,
    peeked_token: Option<Option<TTok>>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum ParserState {
    Reading,
    Accepted,
    Rejected,
}

impl<TDef, TTok> Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Symbol>,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            state_stack: vec![initial_state],
            item_stack: vec![],
            parser_state: ParserState::Reading,
            peeked_token: None,
        }
    }

    /// Return the symbols shifted or reduced so far, bottom first.
    pub fn items(&self) -> &[ParseItem<TTok, TDef::Nonterminal>] {
        &self.item_stack[..]
    }

    /// Consume some tokens and drive the state machine
    /// until it matches a certain production rule.
    ///
    /// The end of `tokens` is the end of input.
    pub fn next_event<I>(&mut self, tokens: &mut I) -> Result<ParseEvent<TDef>, ParseError>
    where
        I: Iterator<Item = TTok>,
    {
        if self.parser_state != ParserState::Reading {
            return Err(ParseError::AlreadyFinished);
        }

        loop {
            let current = self
                .state_stack
                .last()
                .copied()
                .ok_or(ParseError::EmptyStateStack)?;

            if self.peeked_token.is_none() {
                self.peeked_token = Some(tokens.next());
            }
            let lookahead = match &self.peeked_token {
                Some(Some(t)) => Some(t.as_symbol()),
                _ => None,
            };

            match self.definition.action(current, lookahead) {
                ParseAction::Shift(next) => {
                    let t = match self.peeked_token.take() {
                        Some(Some(t)) => t,
                        _ => return Err(ParseError::UnexpectedEOI),
                    };
                    tracing::trace!(?current, ?lookahead, ?next, "shift");
                    self.item_stack.push(ParseItem::T(t));
                    self.state_stack.push(next);
                    continue;
                }

                ParseAction::Reduce(reduce, lhs, n) => {
                    // The initial state is never popped.
                    if self.state_stack.len() <= n {
                        return Err(ParseError::EmptyStateStack);
                    }
                    if self.item_stack.len() < n {
                        return Err(ParseError::EmptyItemStack);
                    }
                    self.state_stack.truncate(self.state_stack.len() - n);
                    self.item_stack.truncate(self.item_stack.len() - n);

                    let top = self
                        .state_stack
                        .last()
                        .copied()
                        .ok_or(ParseError::EmptyStateStack)?;
                    let next = self.definition.goto(top, lhs)?;
                    tracing::trace!(?current, ?reduce, ?lhs, ?next, "reduce");

                    self.item_stack.push(ParseItem::N(lhs));
                    self.state_stack.push(next);

                    return Ok(ParseEvent::Reduce(reduce));
                }

                ParseAction::Accept => {
                    tracing::trace!(?current, "accept");
                    self.parser_state = ParserState::Accepted;
                    return Ok(ParseEvent::Accept);
                }

                ParseAction::Fail => {
                    tracing::trace!(?current, ?lookahead, "no action found");
                    self.parser_state = ParserState::Rejected;
                    return Ok(ParseEvent::Reject(Rejection {
                        state: current,
                        lookahead,
                    }));
                }

                ParseAction::Error(err) => {
                    return Err(ParseError::ParserDef(err));
                }
            }
        }
    }
}

/// Run the shift/reduce engine over `tokens` until it accepts or rejects.
pub fn parse<TDef, TTok, I>(
    definition: TDef,
    tokens: I,
) -> Result<ParseOutcome<TDef::Reduce, Rejection<TDef::State, TDef::Symbol>>, ParseError>
where
    TDef: ParseTable,
    TTok: Token<TDef::Symbol>,
    I: IntoIterator<Item = TTok>,
{
    let span = tracing::trace_span!("shift_reduce");
    let _entered = span.enter();

    let mut tokens = tokens.into_iter();
    let mut parser = Parser::new(definition);
    let mut trace = vec![];
    loop {
        match parser.next_event(&mut tokens)? {
            ParseEvent::Reduce(reduce) => trace.push(reduce),
            ParseEvent::Accept => return Ok(ParseOutcome::accepted(trace)),
            ParseEvent::Reject(rejection) => return Ok(ParseOutcome::rejected(trace, rejection)),
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ParseItem<TTok, TSym> {
    T(TTok),
    N(TSym),
}

#[derive(Debug)]
pub enum ParseEvent<TDef>
where
    TDef: ParseTable,
{
    Reduce(TDef::Reduce),
    Accept,
    Reject(Rejection<TDef::State, TDef::Symbol>),
}

/// The state and lookahead symbol for which the table has no action.
///
/// A `None` lookahead means the end of input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rejection<TState, TSymbol> {
    pub state: TState,
    pub lookahead: Option<TSymbol>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("from parser definition: {}", _0)]
    ParserDef(#[from] ParseActionError),

    #[error("unexpected EOI")]
    UnexpectedEOI,

    #[error("empty state stack")]
    EmptyStateStack,

    #[error("empty item stack")]
    EmptyItemStack,

    #[error("the parser has already accepted or rejected its input")]
    AlreadyFinished,
}
