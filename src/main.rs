use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use np_chunker::chunks::np_chunks;
use np_chunker::grammars::{self, Grammar};
use np_chunker::parse_tree::ParseTree;
use np_chunker::parsers::{ChartParser, ParseError};
use np_chunker::tokenize::tokenize;
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Box-drawn trees followed by their chunks
    Text,
    /// One JSON object per derivation
    Json,
}

#[derive(Parser)]
#[command(name = "np_chunker", version, about = "Parse a sentence and list its noun phrase chunks")]
struct Cli {
    /// File holding the sentence; prompts on stdin when omitted
    file: Option<PathBuf>,

    /// Grammar file (`.json`, or rule text); defaults to the built-in English grammar
    #[arg(short, long, value_name = "PATH")]
    grammar: Option<PathBuf>,

    /// Start symbol, overriding the grammar's first rule
    #[arg(short, long, value_name = "SYMBOL")]
    start: Option<String>,

    /// Stop after this many derivations
    #[arg(long, value_name = "N")]
    max_trees: Option<usize>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Derivation<'t> {
    tree: &'t ParseTree,
    chunks: Vec<String>,
}

fn load_grammar(cli: &Cli) -> Result<Grammar> {
    let grammar = match &cli.grammar {
        Some(path) => grammars::load_grammar_from_file(path)
            .with_context(|| format!("Error loading grammar {}", path.display()))?,
        None => grammars::english_grammar()?,
    };
    match &cli.start {
        Some(start) => Ok(grammar.with_start(start)?),
        None => Ok(grammar),
    }
}

/// Read the sentence from the file argument, or one line from stdin
fn read_sentence(cli: &Cli) -> Result<String> {
    if let Some(path) = &cli.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file '{}'", path.display()));
    }

    print!("Sentence: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn print_derivation(tree: &ParseTree, format: Format) -> Result<()> {
    let chunks = np_chunks(tree);
    match format {
        Format::Text => {
            println!("{}", tree.display());
            println!();
            println!("Noun Phrase Chunks");
            for chunk in chunks {
                println!("{}", chunk.text());
            }
            println!();
        }
        Format::Json => {
            let derivation = Derivation {
                tree,
                chunks: chunks.iter().map(|chunk| chunk.text()).collect(),
            };
            println!("{}", serde_json::to_string(&derivation)?);
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let grammar = load_grammar(cli)?;
    info!(
        grammar = %grammar.name,
        start = grammar.start_str().unwrap_or("?"),
        productions = grammar.production_count(),
        "grammar ready"
    );

    let sentence = read_sentence(cli)?;
    let tokens = tokenize(&sentence);
    info!(tokens = ?tokens, "tokenized input");

    let parser = ChartParser::new(&grammar);
    let chart = match parser.chart(&tokens) {
        Ok(chart) => chart,
        Err(e @ ParseError::UnknownWord { .. }) => {
            println!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let total = chart.count_derivations(grammar.start);
    info!(derivations = %total, "charted sentence");

    let trees = chart.derivations(grammar.start);
    if trees.is_empty() {
        println!("Could not parse sentence.");
        return Ok(());
    }

    let limit = cli.max_trees.unwrap_or(usize::MAX);
    for tree in trees.take(limit) {
        print_derivation(&tree, cli.format)?;
    }
    if (limit as u128) < total {
        info!(shown = limit, derivations = %total, "derivation output capped");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    run(&cli)
}
