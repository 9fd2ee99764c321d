//! Abstract syntax of grammar files.

#[derive(Debug)]
pub struct Grammar {
    pub stmts: Vec<Stmt>,
}

/// A statement terminated by `;`.
#[derive(Debug)]
pub enum Stmt {
    TerminalDesc(TerminalDesc),
    NonterminalDesc(NonterminalDesc),
    RuleDesc(RuleDesc),
    StartDesc(StartDesc),
}

/// `@terminal a b c;`
#[derive(Debug)]
pub struct TerminalDesc {
    pub idents: Vec<String>,
}

/// `@nonterminal A B C;`
#[derive(Debug)]
pub struct NonterminalDesc {
    pub idents: Vec<String>,
}

/// `@rule A := x y | z | @empty;`
#[derive(Debug)]
pub struct RuleDesc {
    pub left: String,
    pub productions: Vec<Production>,
}

/// `@start A;`
#[derive(Debug)]
pub struct StartDesc {
    pub name: String,
}

/// One alternative of a rule. `@empty` and `ε` are parsed into no elements.
#[derive(Debug, PartialEq)]
pub struct Production {
    pub elems: Vec<String>,
}
