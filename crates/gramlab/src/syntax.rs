//! Syntax support for grammar files.

pub mod ast;
pub mod lexer;

use self::lexer::{Keyword, Lexer, Spanned, Token};
use crate::grammar::EPSILON;
use anyhow::{anyhow, bail};
use lexgen_util::Loc;
use std::{iter::Peekable, vec};

pub fn parse(source: &str) -> anyhow::Result<ast::Grammar> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let tokens = Lexer::new(source)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| anyhow!("lexer error: {:?}", err))?;

    let mut parser = StmtParser {
        tokens: tokens.into_iter().peekable(),
    };
    let mut stmts = vec![];
    while parser.peek().is_some() {
        let stmt = parser.stmt()?;
        tracing::trace!(" --> {:?}", stmt);
        stmts.push(stmt);
        parser.expect(Token::Semicolon)?;
    }

    Ok(ast::Grammar { stmts })
}

struct StmtParser<'input> {
    tokens: Peekable<vec::IntoIter<Spanned<'input>>>,
}

impl<'input> StmtParser<'input> {
    fn peek(&mut self) -> Option<Token<'input>> {
        self.tokens.peek().map(|(_, t, _)| *t)
    }

    fn bump(&mut self) -> Option<Spanned<'input>> {
        let next = self.tokens.next();
        if let Some((_, token, _)) = &next {
            tracing::trace!("consume token {:?}", token);
        }
        next
    }

    fn expect(&mut self, expected: Token<'input>) -> anyhow::Result<()> {
        match self.bump() {
            Some((_, token, _)) if token == expected => Ok(()),
            Some((loc, token, _)) => bail!(
                "{}: syntax error: expecting {:?}, found {:?}",
                display_loc(loc),
                expected,
                token
            ),
            None => bail!("syntax error: expecting {:?}, found end of input", expected),
        }
    }

    fn symbol(&mut self) -> anyhow::Result<&'input str> {
        match self.bump() {
            Some((_, Token::Symbol(s), _)) => Ok(s),
            Some((loc, token, _)) => bail!(
                "{}: syntax error: expecting a symbol, found {:?}",
                display_loc(loc),
                token
            ),
            None => bail!("syntax error: expecting a symbol, found end of input"),
        }
    }

    /// Zero or more symbols.
    fn symbols(&mut self) -> Vec<String> {
        let mut symbols = vec![];
        while let Some(Token::Symbol(s)) = self.peek() {
            self.bump();
            symbols.push(s.to_owned());
        }
        symbols
    }

    fn stmt(&mut self) -> anyhow::Result<ast::Stmt> {
        let (loc, token, _) = self
            .bump()
            .ok_or_else(|| anyhow!("syntax error: expecting a statement"))?;
        match token {
            Token::Kw(Keyword::Terminal) => Ok(ast::Stmt::TerminalDesc(ast::TerminalDesc {
                idents: self.symbols(),
            })),

            Token::Kw(Keyword::Nonterminal) => {
                Ok(ast::Stmt::NonterminalDesc(ast::NonterminalDesc {
                    idents: self.symbols(),
                }))
            }

            Token::Kw(Keyword::Start) => Ok(ast::Stmt::StartDesc(ast::StartDesc {
                name: self.symbol()?.to_owned(),
            })),

            Token::Kw(Keyword::Rule) => {
                let left = self.symbol()?.to_owned();
                self.expect(Token::ColonEq)?;
                // a leading `|` is allowed before the first alternative.
                if self.peek() == Some(Token::VertBar) {
                    self.bump();
                }
                let mut productions = vec![self.production()?];
                while self.peek() == Some(Token::VertBar) {
                    self.bump();
                    productions.push(self.production()?);
                }
                Ok(ast::Stmt::RuleDesc(ast::RuleDesc { left, productions }))
            }

            token => bail!(
                "{}: syntax error: expecting a statement, found {:?}",
                display_loc(loc),
                token
            ),
        }
    }

    fn production(&mut self) -> anyhow::Result<ast::Production> {
        if self.peek() == Some(Token::Kw(Keyword::Empty)) {
            self.bump();
            return Ok(ast::Production { elems: vec![] });
        }

        let loc = self.tokens.peek().map(|(loc, _, _)| *loc);
        let mut elems = self.symbols();
        if elems.is_empty() {
            match loc {
                Some(loc) => bail!("{}: syntax error: empty alternative", display_loc(loc)),
                None => bail!("syntax error: empty alternative at end of input"),
            }
        }
        if elems.iter().any(|e| e == EPSILON) {
            if elems.len() > 1 {
                bail!(
                    "syntax error: `{}' must be the only symbol of an alternative",
                    EPSILON
                );
            }
            elems.clear();
        }
        Ok(ast::Production { elems })
    }
}

fn display_loc(loc: Loc) -> String {
    format!("{}:{}", loc.line + 1, loc.col + 1)
}
