//! Lexer implementation.

use lexgen_util::Loc;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Token<'input> {
    ColonEq,
    Semicolon,
    VertBar,
    Kw(Keyword),
    Symbol(&'input str),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Keyword {
    Terminal,
    Nonterminal,
    Start,
    Rule,
    Empty,
}

pub type Spanned<'input> = (Loc, Token<'input>, Loc);

lexgen::lexer! {
    pub Lexer -> Token<'input>;

    let whitespace = [' ' '\t' '\n' '\r'];
    let comment_char = _ # ['\n' '\r'];

    // Grammar symbols are free-form: `+`, `(`, `id` and `ｔｒｕｅ` are all fine.
    let symbol_start = _ # [' ' '\t' '\n' '\r' ';' '|' '#' '@' ':'];
    let symbol_continue = _ # [' ' '\t' '\n' '\r' ';' '|' '#'];

    rule Init {
        $whitespace+,
        "#" $comment_char*,
        ":=" = Token::ColonEq,
        ";" = Token::Semicolon,
        "|" = Token::VertBar,
        "@terminal" = Token::Kw(Keyword::Terminal),
        "@nonterminal" = Token::Kw(Keyword::Nonterminal),
        "@start" = Token::Kw(Keyword::Start),
        "@rule" = Token::Kw(Keyword::Rule),
        "@empty" = Token::Kw(Keyword::Empty),
        $symbol_start $symbol_continue* => |lexer| {
            let token = Token::Symbol(lexer.match_());
            lexer.return_(token)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Keyword::*;
    use Token::*;

    fn tokenize(input: &str) -> Vec<Token<'_>> {
        Lexer::new(input)
            .map(|res| res.map(|(_, t, _)| t))
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn smoketest() {
        let input = "\
# arithmetic expressions
@terminal + * ( ) id;
@nonterminal E P;   # trailing comment
@start E;
@rule P := + T P | @empty | ε;
@rule ｔｒｕｅ := id";
        assert_eq!(
            tokenize(input),
            [
                // @terminal ... ;
                Kw(Terminal),
                Symbol("+"),
                Symbol("*"),
                Symbol("("),
                Symbol(")"),
                Symbol("id"),
                Semicolon,
                // @nonterminal ... ;
                Kw(Nonterminal),
                Symbol("E"),
                Symbol("P"),
                Semicolon,
                // @start ... ;
                Kw(Start),
                Symbol("E"),
                Semicolon,
                // @rule ... ;
                Kw(Rule),
                Symbol("P"),
                ColonEq,
                Symbol("+"),
                Symbol("T"),
                Symbol("P"),
                VertBar,
                Kw(Empty),
                VertBar,
                Symbol("ε"),
                Semicolon,
                // unterminated statement at the end of input
                Kw(Rule),
                Symbol("ｔｒｕｅ"),
                ColonEq,
                Symbol("id"),
            ]
        );
    }

    #[test]
    fn comment_at_end_of_input() {
        assert_eq!(tokenize("@start S; # no newline"), [Kw(Start), Symbol("S"), Semicolon]);
    }

    #[test]
    fn separators_end_symbols() {
        assert_eq!(
            tokenize("a|b;c"),
            [Symbol("a"), VertBar, Symbol("b"), Semicolon, Symbol("c")]
        );
    }
}
