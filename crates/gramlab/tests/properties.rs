use gramlab::{
    first_sets::FirstSets,
    follow_sets::FollowSets,
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    ll1::{LL1Error, LL1Parser, Unsuitable},
    lr0::{ConflictKind, LR0Error, LR0Parser, StateID},
};
use gramlab_runtime::parser::Rejection;
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    env,
    path::PathBuf,
};

const GRAMMARS: &[&str] = &[
    "expr",
    "expr_left_recursive",
    "nested",
    "overlapping",
    "dangling_else",
    "parens",
    "lists",
];

fn load(name: &str) -> Grammar {
    let path = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .join(format!("tests/{}.gram", name));
    Grammar::from_file(&path).unwrap()
}

fn tokens(g: &Grammar, input: &str) -> Vec<TerminalID> {
    input
        .split_whitespace()
        .map(|name| g.terminal_by_name(name).unwrap())
        .collect()
}

fn show(g: &Grammar, input: &[TerminalID]) -> String {
    let names: Vec<_> = input.iter().map(|t| g.terminals[t].name()).collect();
    format!("[{}]", names.join(" "))
}

/// The length of the shortest sentence derivable from each nonterminal.
fn min_lengths(g: &Grammar) -> HashMap<NonterminalID, usize> {
    let mut min_len: HashMap<NonterminalID, usize> =
        g.nonterminals.keys().map(|n| (*n, usize::MAX)).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for rule in g.rules.values() {
            let len = rule.right().iter().fold(0usize, |acc, symbol| match symbol {
                SymbolID::T(..) => acc.saturating_add(1),
                SymbolID::N(n) => acc.saturating_add(min_len[n]),
                SymbolID::Epsilon => acc,
            });
            if len < min_len[&rule.left()] {
                min_len.insert(rule.left(), len);
                changed = true;
            }
        }
    }
    min_len
}

/// Every sentence of at most `max_len` terminals, found by exhaustive
/// leftmost derivation.
fn sentences(g: &Grammar, max_len: usize) -> BTreeSet<Vec<TerminalID>> {
    let min_len = min_lengths(g);
    let weight = |form: &[SymbolID]| {
        form.iter().fold(0usize, |acc, symbol| match symbol {
            SymbolID::T(..) => acc.saturating_add(1),
            SymbolID::N(n) => acc.saturating_add(min_len[n]),
            SymbolID::Epsilon => acc,
        })
    };

    let mut language = BTreeSet::new();
    let mut visited = HashSet::new();
    let mut pending = vec![vec![SymbolID::N(g.start_symbol)]];
    while let Some(form) = pending.pop() {
        if weight(&form) > max_len || !visited.insert(form.clone()) {
            continue;
        }
        match form.iter().position(|s| matches!(s, SymbolID::N(..))) {
            Some(i) => {
                let n = match form[i] {
                    SymbolID::N(n) => n,
                    _ => unreachable!(),
                };
                for rule in g.rules_of(n) {
                    let mut next = form[..i].to_vec();
                    next.extend_from_slice(rule.right());
                    next.extend_from_slice(&form[i + 1..]);
                    pending.push(next);
                }
            }
            None => {
                language.insert(
                    form.iter()
                        .filter_map(|s| match s {
                            SymbolID::T(t) => Some(*t),
                            _ => None,
                        })
                        .collect(),
                );
            }
        }
    }
    language
}

/// Every sentence up to `max_len` is accepted, and every single insertion
/// or deletion is accepted exactly when it is a sentence itself.
fn check_language(g: &Grammar, max_len: usize, parse: impl Fn(&[TerminalID]) -> bool) {
    let language = sentences(g, max_len);
    assert!(!language.is_empty());
    let terminals: Vec<_> = g.user_terminals().map(|t| t.id()).collect();

    for sentence in &language {
        assert!(parse(sentence), "rejected {}", show(g, sentence));

        for i in 0..sentence.len() {
            let mut input = sentence.clone();
            input.remove(i);
            assert_eq!(
                parse(&input),
                language.contains(&input),
                "deletion {}",
                show(g, &input)
            );
        }

        if sentence.len() < max_len {
            for i in 0..=sentence.len() {
                for t in &terminals {
                    let mut input = sentence.clone();
                    input.insert(i, *t);
                    assert_eq!(
                        parse(&input),
                        language.contains(&input),
                        "insertion {}",
                        show(g, &input)
                    );
                }
            }
        }
    }
}

#[test]
fn first_and_follow_sets() {
    for name in GRAMMARS {
        let g = load(name);
        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);

        for t in g.user_terminals() {
            let set = first.first(SymbolID::T(t.id()));
            assert_eq!(set.terminals.iter().collect::<Vec<_>>(), [t.id()]);
            assert!(!set.nullable);
        }

        let epsilon = first.first(SymbolID::Epsilon);
        assert!(epsilon.terminals.is_empty());
        assert!(epsilon.contains(SymbolID::Epsilon));

        for n in g.user_nonterminals() {
            let has_epsilon_rule = g.rules_of(n.id()).any(|rule| rule.is_epsilon());
            assert_eq!(
                first.first(SymbolID::N(n.id())).contains(SymbolID::Epsilon),
                has_epsilon_rule,
                "{}: FIRST({})",
                name,
                n
            );
        }

        assert!(follow.follow(g.start_symbol).contains(TerminalID::EOI));
    }
}

#[test]
fn predictive_accepts_expression() {
    let g = load("expr");
    let parser = LL1Parser::new(&g).unwrap();
    assert!(parser.parse(&tokens(&g, "id + id * id")).unwrap());
}

#[test]
fn predictive_rejects_left_recursion() {
    let g = load("expr_left_recursive");
    match LL1Parser::new(&g) {
        Err(LL1Error::Unsuitable(Unsuitable::LeftRecursive { nonterminal })) => {
            assert_eq!(nonterminal, "E");
        }
        res => panic!("unexpected result: {:?}", res.map(|_| ())),
    }
}

#[test]
fn shift_reduce_accepts_nested() {
    let g = load("nested");
    let parser = LR0Parser::new(&g).unwrap();
    assert!(parser.parse(&tokens(&g, "a a c b b")).unwrap());
}

#[test]
fn start_symbol_follows_first_rule() {
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
    let lr0 = LR0Parser::new(&g).unwrap();
    let ll1 = LL1Parser::new(&g).unwrap();
    for input in ["a a c b b", "c"] {
        assert!(lr0.parse(&tokens(&g, input)).unwrap(), "{}", input);
        assert!(ll1.parse(&tokens(&g, input)).unwrap(), "{}", input);
    }
    assert!(!lr0.parse(&tokens(&g, "a")).unwrap());
}

#[test]
fn shift_reduce_rejects_unbalanced() {
    let g = load("nested");
    let parser = LR0Parser::new(&g).unwrap();
    let outcome = parser.parse_with_trace(&tokens(&g, "a a b")).unwrap();
    assert!(!outcome.is_accepted());
    assert_eq!(
        outcome.failure(),
        Some(&Rejection {
            state: StateID::from_raw(2),
            lookahead: g.terminal_by_name("b"),
        })
    );
}

#[test]
fn shift_reduce_reports_reduce_reduce_conflict() {
    let g = load("overlapping");
    match LR0Parser::new(&g) {
        Err(LR0Error::Conflict { kind, items, .. }) => {
            assert_eq!(kind, ConflictKind::ReduceReduce);
            assert_eq!(items, "S -> a .\nA -> a .");
        }
        res => panic!("unexpected result: {:?}", res.map(|_| ())),
    }
}

#[test]
fn shift_reduce_reports_dangling_else() {
    let g = load("dangling_else");
    match LR0Parser::new(&g) {
        Err(LR0Error::Conflict { kind, terminal, .. }) => {
            assert_eq!(kind, ConflictKind::ShiftReduce);
            assert_eq!(terminal, "e");
        }
        res => panic!("unexpected result: {:?}", res.map(|_| ())),
    }
}

#[test]
fn bounded_languages() {
    let g = load("expr");
    let parser = LL1Parser::new(&g).unwrap();
    check_language(&g, 5, |input| parser.parse(input).unwrap());

    let g = load("parens");
    let parser = LL1Parser::new(&g).unwrap();
    check_language(&g, 6, |input| parser.parse(input).unwrap());

    let g = load("lists");
    let parser = LL1Parser::new(&g).unwrap();
    check_language(&g, 7, |input| parser.parse(input).unwrap());

    let g = load("nested");
    let ll1 = LL1Parser::new(&g).unwrap();
    let lr0 = LR0Parser::new(&g).unwrap();
    check_language(&g, 7, |input| {
        let accepted = lr0.parse(input).unwrap();
        assert_eq!(accepted, ll1.parse(input).unwrap());
        accepted
    });
}
