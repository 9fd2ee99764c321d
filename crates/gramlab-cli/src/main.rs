use anyhow::{anyhow, Context as _};
use clap::{Parser, Subcommand, ValueEnum};
use gramlab::{
    first_sets::FirstSets,
    follow_sets::FollowSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    ll1::LL1Parser,
    lr0::LR0Parser,
};
use gramlab_runtime::{predictive::StackItem, Symbol};
use std::{path::PathBuf, process::ExitCode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    grammar: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dump the grammar with its FIRST and FOLLOW sets.
    Sets,

    /// Build a parse table and dump it.
    Table {
        #[arg(long, value_enum, default_value_t = Method::Ll1)]
        method: Method,
    },

    /// Decide whether a sequence of terminals belongs to the language.
    Parse {
        #[arg(long, value_enum, default_value_t = Method::Ll1)]
        method: Method,

        /// Treat every character of the arguments as a terminal name.
        #[arg(long)]
        chars: bool,

        /// The terminal names of the input.
        tokens: Vec<String>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Predictive parsing
    Ll1,
    /// Shift/reduce parsing
    Lr0,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let grammar = Grammar::from_file(&args.grammar)
        .with_context(|| anyhow!("failed to load the grammar from {}", args.grammar.display()))?;

    match args.command {
        Command::Sets => {
            let first_sets = FirstSets::new(&grammar);
            let follow_sets = FollowSets::new(&grammar, &first_sets);
            println!("{}", grammar);
            println!("## first sets:\n{}", first_sets.display(&grammar));
            print!("## follow sets:\n{}", follow_sets.display(&grammar));
        }

        Command::Table {
            method: Method::Ll1,
        } => {
            let parser = LL1Parser::new(&grammar)?;
            print!("{}", parser.table().display(&grammar));
        }

        Command::Table {
            method: Method::Lr0,
        } => {
            let parser = LR0Parser::new(&grammar)?;
            println!("{}", parser.automaton().display(&grammar));
            print!("{}", parser.table().display(&grammar));
        }

        Command::Parse {
            method,
            chars,
            tokens,
        } => {
            let names: Vec<String> = if chars {
                tokens
                    .iter()
                    .flat_map(|t| t.chars().map(String::from))
                    .collect()
            } else {
                tokens
            };
            let input = names
                .iter()
                .map(|name| {
                    grammar
                        .terminal_by_name(name)
                        .ok_or_else(|| anyhow!("unknown terminal: `{}'", name))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            let accepted = match method {
                Method::Ll1 => {
                    let parser = LL1Parser::new(&grammar)?;
                    let outcome = parser.parse_with_trace(&input)?;
                    print_trace(&grammar, outcome.trace());
                    if let Some(mismatch) = outcome.failure() {
                        let top = match mismatch.top {
                            StackItem::EOI => "$",
                            StackItem::Symbol(Symbol::T(t)) => grammar.symbol_name(SymbolID::T(t)),
                            StackItem::Symbol(Symbol::N(n)) => grammar.symbol_name(SymbolID::N(n)),
                        };
                        println!(
                            "rejected: no prediction for `{}' on `{}'",
                            top,
                            lookahead_name(&grammar, mismatch.lookahead)
                        );
                    }
                    outcome.is_accepted()
                }
                Method::Lr0 => {
                    let parser = LR0Parser::new(&grammar)?;
                    let outcome = parser.parse_with_trace(&input)?;
                    print_trace(&grammar, outcome.trace());
                    if let Some(rejection) = outcome.failure() {
                        println!(
                            "rejected: no action in state {:?} on `{}'",
                            rejection.state,
                            lookahead_name(&grammar, rejection.lookahead)
                        );
                    }
                    outcome.is_accepted()
                }
            };

            if !accepted {
                return Ok(ExitCode::from(1));
            }
            println!("accepted");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_trace(grammar: &Grammar, trace: &[RuleID]) {
    for rule in trace {
        println!("- {}", grammar.rule(*rule).display(grammar));
    }
}

fn lookahead_name(grammar: &Grammar, lookahead: Option<TerminalID>) -> &str {
    grammar.symbol_name(SymbolID::T(lookahead.unwrap_or(TerminalID::EOI)))
}
