//! Predictive (LL(1)) parser.

use crate::{
    definition::{PredictiveTable, Symbol},
    outcome::ParseOutcome,
    parser::{ParseError, Token},
};

/// The parser driven based on a predictive parse table.
#[derive(Debug)]
pub struct PredictiveParser<TDef, TTok>
where
    TDef: PredictiveTable,
    TTok: Token<TDef::Terminal>,
{
    definition: TDef,
    stack: Vec<StackItem<TDef::Terminal, TDef::Nonterminal>>,
    expanded: Vec<Symbol<TDef::Terminal, TDef::Nonterminal>>,
    peeked_token: Option<Option<TTok>>,
    finished: bool,
}

/// An entry of the prediction stack.
///
/// `EOI` is the end marker pushed below the start symbol.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StackItem<TTerminal, TNonterminal> {
    EOI,
    Symbol(Symbol<TTerminal, TNonterminal>),
}

impl<TDef, TTok> PredictiveParser<TDef, TTok>
where
    TDef: PredictiveTable,
    TTok: Token<TDef::Terminal>,
{
    pub fn new(definition: TDef) -> Self {
        let start = definition.start_symbol();
        Self {
            definition,
            stack: vec![StackItem::EOI, StackItem::Symbol(Symbol::N(start))],
            expanded: vec![],
            peeked_token: None,
            finished: false,
        }
    }

    /// Return the prediction stack, bottom first.
    pub fn stack(&self) -> &[StackItem<TDef::Terminal, TDef::Nonterminal>] {
        &self.stack[..]
    }

    /// Drive the prediction stack until the next expansion, acceptance or
    /// rejection. Terminals on top of the stack are matched silently.
    pub fn next_event<I>(&mut self, tokens: &mut I) -> Result<PredictiveEvent<TDef>, ParseError>
    where
        I: Iterator<Item = TTok>,
    {
        if self.finished {
            return Err(ParseError::AlreadyFinished);
        }

        loop {
            if self.peeked_token.is_none() {
                self.peeked_token = Some(tokens.next());
            }
            let lookahead = match &self.peeked_token {
                Some(Some(t)) => Some(t.as_symbol()),
                _ => None,
            };

            let top = match self.stack.last().copied() {
                Some(top) => top,
                None => {
                    // The end marker is only popped by matching the end of input.
                    tracing::trace!("accept");
                    self.finished = true;
                    return Ok(PredictiveEvent::Accept);
                }
            };

            match top {
                StackItem::EOI if lookahead.is_none() => {
                    self.stack.pop();
                }

                StackItem::Symbol(Symbol::T(t)) if lookahead == Some(t) => {
                    tracing::trace!(?t, "match");
                    self.stack.pop();
                    self.peeked_token = None;
                }

                StackItem::Symbol(Symbol::N(n)) => {
                    let rule = match self.definition.predict(n, lookahead)? {
                        Some(rule) => rule,
                        None => return Ok(self.reject(top, lookahead)),
                    };
                    tracing::trace!(?n, ?lookahead, ?rule, "expand");

                    self.stack.pop();
                    self.expanded.clear();
                    self.definition.expand(rule, &mut self.expanded)?;
                    self.stack
                        .extend(self.expanded.drain(..).rev().map(StackItem::Symbol));

                    return Ok(PredictiveEvent::Predict(rule));
                }

                _ => return Ok(self.reject(top, lookahead)),
            }
        }
    }

    fn reject(
        &mut self,
        top: StackItem<TDef::Terminal, TDef::Nonterminal>,
        lookahead: Option<TDef::Terminal>,
    ) -> PredictiveEvent<TDef> {
        tracing::trace!(?top, ?lookahead, "no move found");
        self.finished = true;
        PredictiveEvent::Reject(Mismatch { top, lookahead })
    }
}

/// Run the predictive engine over `tokens` until it accepts or rejects.
pub fn parse<TDef, TTok, I>(
    definition: TDef,
    tokens: I,
) -> Result<ParseOutcome<TDef::Rule, Mismatch<TDef::Terminal, TDef::Nonterminal>>, ParseError>
where
    TDef: PredictiveTable,
    TTok: Token<TDef::Terminal>,
    I: IntoIterator<Item = TTok>,
{
    let span = tracing::trace_span!("predictive");
    let _entered = span.enter();

    let mut tokens = tokens.into_iter();
    let mut parser = PredictiveParser::new(definition);
    let mut trace = vec![];
    loop {
        match parser.next_event(&mut tokens)? {
            PredictiveEvent::Predict(rule) => trace.push(rule),
            PredictiveEvent::Accept => return Ok(ParseOutcome::accepted(trace)),
            PredictiveEvent::Reject(mismatch) => {
                return Ok(ParseOutcome::rejected(trace, mismatch))
            }
        }
    }
}

#[derive(Debug)]
pub enum PredictiveEvent<TDef>
where
    TDef: PredictiveTable,
{
    Predict(TDef::Rule),
    Accept,
    Reject(Mismatch<TDef::Terminal, TDef::Nonterminal>),
}

/// The top of the prediction stack and the lookahead symbol for which no
/// move exists. A `None` lookahead means the end of input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mismatch<TTerminal, TNonterminal> {
    pub top: StackItem<TTerminal, TNonterminal>,
    pub lookahead: Option<TTerminal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ParseActionError;

    // L -> x L | ε
    #[derive(Debug)]
    struct List;

    impl PredictiveTable for List {
        type Terminal = char;
        type Nonterminal = char;
        type Rule = u8;

        fn start_symbol(&self) -> char {
            'L'
        }

        fn predict(&self, top: char, lookahead: Option<char>) -> Result<Option<u8>, ParseActionError> {
            match (top, lookahead) {
                ('L', Some('x')) => Ok(Some(1)),
                ('L', None) => Ok(Some(2)),
                ('L', _) => Ok(None),
                _ => Err(ParseActionError::IncorrectSymbol),
            }
        }

        fn expand(&self, rule: u8, out: &mut Vec<Symbol<char, char>>) -> Result<(), ParseActionError> {
            match rule {
                1 => out.extend([Symbol::T('x'), Symbol::N('L')]),
                2 => (),
                _ => return Err(ParseActionError::IncorrectSymbol),
            }
            Ok(())
        }
    }

    impl Token<char> for char {
        fn as_symbol(&self) -> char {
            *self
        }
    }

    #[test]
    fn accepts_list() {
        let outcome = parse(List, "xxx".chars()).unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(outcome.trace(), &[1, 1, 1, 2]);
    }

    #[test]
    fn accepts_empty_input() {
        let outcome = parse(List, "".chars()).unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(outcome.trace(), &[2]);
    }

    #[test]
    fn stack_follows_expansions() {
        use StackItem::EOI;

        let mut tokens = "x".chars();
        let mut parser: PredictiveParser<_, char> = PredictiveParser::new(List);
        assert_eq!(parser.stack(), &[EOI, StackItem::Symbol(Symbol::N('L'))]);

        assert!(matches!(
            parser.next_event(&mut tokens),
            Ok(PredictiveEvent::Predict(1))
        ));
        assert_eq!(
            parser.stack(),
            &[
                EOI,
                StackItem::Symbol(Symbol::N('L')),
                StackItem::Symbol(Symbol::T('x')),
            ]
        );

        assert!(matches!(
            parser.next_event(&mut tokens),
            Ok(PredictiveEvent::Predict(2))
        ));
        assert_eq!(parser.stack(), &[EOI]);

        assert!(matches!(
            parser.next_event(&mut tokens),
            Ok(PredictiveEvent::Accept)
        ));
        assert!(parser.stack().is_empty());
    }

    #[test]
    fn rejects_unknown_lookahead() {
        let outcome = parse(List, "xy".chars()).unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(
            outcome.failure(),
            Some(&Mismatch {
                top: StackItem::Symbol(Symbol::N('L')),
                lookahead: Some('y'),
            })
        );
    }
}
