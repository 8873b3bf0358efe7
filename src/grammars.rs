// Grammars module - loads context-free grammars from rule text or JSON and interns their symbols

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Errors
// ============================================================================

/// Failures detected while loading a grammar. All of them are fatal: a grammar
/// that fails validation is never handed to the parser.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("line {line}: {reason}")]
    MalformedRule { line: usize, reason: String },

    #[error("non-terminal '{name}' is used but never defined")]
    UndefinedNonterminal { name: String },

    #[error("alternative of '{lhs}' mixes terminal literals with other symbols")]
    MixedAlternative { lhs: String },

    #[error("unary rules form a cycle through '{name}'")]
    UnaryCycle { name: String },

    #[error("start symbol '{name}' is not defined")]
    UnknownStart { name: String },

    #[error("grammar has no rules")]
    Empty,

    #[error("invalid JSON grammar: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read grammar file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Symbol Table - maps between strings and numeric IDs
// ============================================================================

/// Bidirectional mapping between symbols (strings) and numeric IDs
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    str_to_id: HashMap<String, u32>,
    id_to_str: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create an ID for a symbol string
    pub fn get_or_insert(&mut self, symbol: &str) -> u32 {
        if let Some(&id) = self.str_to_id.get(symbol) {
            id
        } else {
            let id = self.id_to_str.len() as u32;
            self.str_to_id.insert(symbol.to_string(), id);
            self.id_to_str.push(symbol.to_string());
            id
        }
    }

    pub fn get_id(&self, symbol: &str) -> Option<u32> {
        self.str_to_id.get(symbol).copied()
    }

    pub fn get_str(&self, id: u32) -> Option<&str> {
        self.id_to_str.get(id as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_str.is_empty()
    }

    /// Iterate `(id, name)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.id_to_str
            .iter()
            .enumerate()
            .map(|(id, s)| (id as u32, s.as_str()))
    }
}

// ============================================================================
// Numeric Grammar Representation
// ============================================================================

/// A grammar symbol - either a terminal word or a non-terminal, identified by ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(u32),
    NonTerminal(u32),
}

impl Symbol {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_non_terminal(&self) -> bool {
        matches!(self, Symbol::NonTerminal(_))
    }

    pub fn id(&self) -> u32 {
        match self {
            Symbol::Terminal(id) | Symbol::NonTerminal(id) => *id,
        }
    }
}

/// One alternative right-hand side
pub type Production = Vec<Symbol>;

/// Symbols before interning, as read from rule text or JSON
#[derive(Debug, Clone, PartialEq, Eq)]
enum StrSymbol {
    Terminal(String),
    NonTerminal(String),
}

/// An immutable context-free grammar.
///
/// Alternatives are kept per non-terminal in the order they were written, so
/// that parse enumeration is deterministic. Every alternative is either a
/// single terminal (a lexical rule) or a non-empty sequence of non-terminals.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub name: String,
    pub start: u32,
    pub terminals: SymbolTable,
    pub non_terminals: SymbolTable,
    /// rules[nt] = ordered alternatives of `nt`
    rules: Vec<Vec<Production>>,
    /// terminal -> non-terminals with a lexical rule for it
    lexicon: FxHashMap<u32, Vec<u32>>,
}

impl Grammar {
    /// Load a grammar from line-oriented rule text (`LHS -> A B | "word"`).
    /// The first left-hand side becomes the start symbol.
    pub fn load(text: &str) -> Result<Self, GrammarError> {
        let rules = parse_rule_text(text)?;
        Self::from_str_rules("grammar", None, rules)
    }

    /// Load a grammar from a JSON document:
    /// `{"name": "...", "start": "S", "rules": {"S": [["NP", "VP"]], "N": [["\"door\""]]}}`
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let parsed: GrammarJson = serde_json::from_str(json)?;

        let mut rules = Vec::new();
        // BTreeMap keeps the non-terminal numbering independent of hashing
        for (lhs, alternatives) in parsed.rules {
            check_identifier(&lhs, 0)?;
            let mut str_alternatives = Vec::new();
            for alternative in alternatives {
                if alternative.is_empty() {
                    return Err(malformed(0, format!("empty alternative for '{}'", lhs)));
                }
                let symbols = alternative
                    .iter()
                    .map(|s| json_symbol(s))
                    .collect::<Result<Vec<_>, _>>()?;
                str_alternatives.push(symbols);
            }
            rules.push((lhs, str_alternatives));
        }

        let name = parsed.name.unwrap_or_else(|| "grammar".to_string());
        Self::from_str_rules(&name, parsed.start.as_deref(), rules)
    }

    /// Return a copy of this grammar with a different start symbol
    pub fn with_start(mut self, name: &str) -> Result<Self, GrammarError> {
        self.start = self.defined_non_terminal(name)?;
        Ok(self)
    }

    fn defined_non_terminal(&self, name: &str) -> Result<u32, GrammarError> {
        self.non_terminals
            .get_id(name)
            .filter(|&id| !self.rules[id as usize].is_empty())
            .ok_or_else(|| GrammarError::UnknownStart {
                name: name.to_string(),
            })
    }

    /// Intern and validate rules gathered as `(lhs, alternatives)`.
    fn from_str_rules(
        name: &str,
        start: Option<&str>,
        rules: Vec<(String, Vec<Vec<StrSymbol>>)>,
    ) -> Result<Self, GrammarError> {
        if rules.is_empty() {
            return Err(GrammarError::Empty);
        }

        let mut grammar = Grammar {
            name: name.to_string(),
            start: 0,
            terminals: SymbolTable::new(),
            non_terminals: SymbolTable::new(),
            rules: Vec::new(),
            lexicon: FxHashMap::default(),
        };

        // Left-hand sides are numbered first, in order of first appearance
        for (lhs, _) in &rules {
            grammar.non_terminals.get_or_insert(lhs);
        }
        grammar.rules = vec![Vec::new(); grammar.non_terminals.len()];

        for (lhs, alternatives) in &rules {
            let lhs_id = grammar.non_terminals.get_id(lhs).unwrap_or_default();
            for alternative in alternatives {
                let is_lexical = alternative.len() == 1
                    && matches!(alternative[0], StrSymbol::Terminal(_));
                let mut production = Vec::with_capacity(alternative.len());
                for sym in alternative {
                    match sym {
                        StrSymbol::Terminal(word) => {
                            if !is_lexical {
                                return Err(GrammarError::MixedAlternative { lhs: lhs.clone() });
                            }
                            let id = grammar.terminals.get_or_insert(word);
                            let categories = grammar.lexicon.entry(id).or_default();
                            if !categories.contains(&lhs_id) {
                                categories.push(lhs_id);
                            }
                            production.push(Symbol::Terminal(id));
                        }
                        StrSymbol::NonTerminal(nt) => {
                            let id = grammar.non_terminals.get_id(nt).ok_or_else(|| {
                                GrammarError::UndefinedNonterminal { name: nt.clone() }
                            })?;
                            production.push(Symbol::NonTerminal(id));
                        }
                    }
                }
                grammar.rules[lhs_id as usize].push(production);
            }
        }

        if let Some(start) = start {
            grammar.start = grammar.defined_non_terminal(start)?;
        }
        grammar.check_unary_cycles()?;

        debug!(
            grammar = %grammar.name,
            non_terminals = grammar.num_non_terminals(),
            terminals = grammar.num_terminals(),
            productions = grammar.production_count(),
            "loaded grammar"
        );
        Ok(grammar)
    }

    /// Reject `A -> B`, `B -> A` style chains: they admit infinitely many
    /// derivations of the same span.
    fn check_unary_cycles(&self) -> Result<(), GrammarError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(grammar: &Grammar, nt: u32, marks: &mut [Mark]) -> Option<u32> {
            match marks[nt as usize] {
                Mark::Done => return None,
                Mark::InProgress => return Some(nt),
                Mark::Unvisited => {}
            }
            marks[nt as usize] = Mark::InProgress;
            for target in grammar.unary_targets(nt) {
                if let Some(culprit) = visit(grammar, target, marks) {
                    return Some(culprit);
                }
            }
            marks[nt as usize] = Mark::Done;
            None
        }

        let mut marks = vec![Mark::Unvisited; self.rules.len()];
        for nt in 0..self.rules.len() as u32 {
            if let Some(culprit) = visit(self, nt, &mut marks) {
                return Err(GrammarError::UnaryCycle {
                    name: self.non_terminal_str(culprit).unwrap_or("?").to_string(),
                });
            }
        }
        Ok(())
    }

    fn unary_targets(&self, nt: u32) -> impl Iterator<Item = u32> + '_ {
        self.alternatives_for(nt).iter().filter_map(|alt| match alt[..] {
            [Symbol::NonTerminal(target)] => Some(target),
            _ => None,
        })
    }

    pub fn is_terminal_symbol(&self, sym: &Symbol) -> bool {
        sym.is_terminal()
    }

    /// Ordered alternatives of a non-terminal (empty for unknown IDs)
    pub fn alternatives_for(&self, nt: u32) -> &[Production] {
        self.rules.get(nt as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Words this non-terminal rewrites to directly, in rule order
    pub fn terminal_rules_for(&self, nt: u32) -> Vec<&str> {
        self.alternatives_for(nt)
            .iter()
            .filter_map(|alt| match alt[..] {
                [Symbol::Terminal(t)] => self.terminal_str(t),
                _ => None,
            })
            .collect()
    }

    /// Non-terminals with a lexical rule for `word`
    pub fn lexical_categories(&self, word: &str) -> &[u32] {
        self.terminals
            .get_id(word)
            .and_then(|id| self.lexicon.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn knows_word(&self, word: &str) -> bool {
        !self.lexical_categories(word).is_empty()
    }

    pub fn terminal_str(&self, id: u32) -> Option<&str> {
        self.terminals.get_str(id)
    }

    pub fn non_terminal_str(&self, id: u32) -> Option<&str> {
        self.non_terminals.get_str(id)
    }

    pub fn start_str(&self) -> Option<&str> {
        self.non_terminals.get_str(self.start)
    }

    pub fn num_terminals(&self) -> usize {
        self.terminals.len()
    }

    pub fn num_non_terminals(&self) -> usize {
        self.non_terminals.len()
    }

    pub fn production_count(&self) -> usize {
        self.rules.iter().map(Vec::len).sum()
    }

    fn symbol_text(&self, sym: &Symbol) -> String {
        match sym {
            Symbol::Terminal(id) => format!("\"{}\"", self.terminal_str(*id).unwrap_or("?")),
            Symbol::NonTerminal(id) => self.non_terminal_str(*id).unwrap_or("?").to_string(),
        }
    }
}

/// Renders the grammar back as rule text, one line per non-terminal
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Start symbol first so that reloading the text keeps it
        let order = std::iter::once(self.start)
            .chain((0..self.rules.len() as u32).filter(|&nt| nt != self.start));
        for nt in order {
            let alternatives: Vec<String> = self
                .alternatives_for(nt)
                .iter()
                .map(|alt| {
                    alt.iter()
                        .map(|s| self.symbol_text(s))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            writeln!(
                f,
                "{} -> {}",
                self.non_terminal_str(nt).unwrap_or("?"),
                alternatives.join(" | ")
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Rule text
// ============================================================================

fn malformed(line: usize, reason: impl Into<String>) -> GrammarError {
    GrammarError::MalformedRule {
        line,
        reason: reason.into(),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn check_identifier(s: &str, line: usize) -> Result<(), GrammarError> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(malformed(line, format!("'{}' is not a valid non-terminal name", s)))
    }
}

/// Split rule text into `(lhs, alternatives)` entries
fn parse_rule_text(text: &str) -> Result<Vec<(String, Vec<Vec<StrSymbol>>)>, GrammarError> {
    let mut rules = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (lhs, rhs) = trimmed
            .split_once("->")
            .ok_or_else(|| malformed(line, "expected 'LHS -> RHS'"))?;
        let lhs = lhs.trim();
        check_identifier(lhs, line)?;

        rules.push((lhs.to_string(), parse_alternatives(rhs, line)?));
    }
    Ok(rules)
}

/// Lex the right-hand side of one line: `|` separates alternatives, `"..."`
/// is a terminal literal, `#` outside a literal starts a comment.
fn parse_alternatives(rhs: &str, line: usize) -> Result<Vec<Vec<StrSymbol>>, GrammarError> {
    let mut alternatives = Vec::new();
    let mut current = Vec::new();
    let mut chars = rhs.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '#' => break,
            '|' => alternatives.push(std::mem::take(&mut current)),
            '"' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => literal.push(ch),
                        None => return Err(malformed(line, "unterminated terminal literal")),
                    }
                }
                if literal.is_empty() {
                    return Err(malformed(line, "empty terminal literal"));
                }
                current.push(StrSymbol::Terminal(literal));
            }
            c if c.is_whitespace() => {}
            c => {
                let mut ident = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '|' | '"' | '#') {
                        break;
                    }
                    ident.push(next);
                    chars.next();
                }
                check_identifier(&ident, line)?;
                current.push(StrSymbol::NonTerminal(ident));
            }
        }
    }
    alternatives.push(current);

    if alternatives.iter().any(Vec::is_empty) {
        return Err(malformed(line, "empty alternative"));
    }
    Ok(alternatives)
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Debug, Deserialize)]
struct GrammarJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    start: Option<String>,
    rules: BTreeMap<String, Vec<Vec<String>>>,
}

fn json_symbol(s: &str) -> Result<StrSymbol, GrammarError> {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        let word = &s[1..s.len() - 1];
        if word.is_empty() {
            return Err(malformed(0, "empty terminal literal"));
        }
        Ok(StrSymbol::Terminal(word.to_string()))
    } else {
        check_identifier(s, 0)?;
        Ok(StrSymbol::NonTerminal(s.to_string()))
    }
}

// ============================================================================
// Grammar loading functions
// ============================================================================

/// Load a grammar file; `.json` files are read as JSON, anything else as rule text
pub fn load_grammar_from_file<P: AsRef<Path>>(path: P) -> Result<Grammar, GrammarError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| GrammarError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut grammar = if path.extension().and_then(|s| s.to_str()) == Some("json") {
        Grammar::from_json(&content)?
    } else {
        Grammar::load(&content)?
    };
    if grammar.name == "grammar" {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            grammar.name = stem.to_string();
        }
    }
    Ok(grammar)
}

// ============================================================================
// Built-in grammar
// ============================================================================

/// Phrase structure of the built-in English grammar
pub const ENGLISH_NONTERMINALS: &str = r#"
S -> NP VP | NP VP Conj VP | NP VP Conj S | NP Adv VP
NP -> N | Det NP | N PP | Det NP PP | Adj NP
VP -> V | V Adv | V PP | V NP | V NP Adv | V NP PP
PP -> P NP | Conj S
"#;

/// Lexicon of the built-in English grammar
pub const ENGLISH_TERMINALS: &str = r#"
Adj -> "country" | "dreadful" | "enigmatical" | "little" | "moist" | "red"
Adv -> "down" | "here" | "never"
Conj -> "and" | "until"
Det -> "a" | "an" | "his" | "my" | "the"
N -> "armchair" | "companion" | "day" | "door" | "hand" | "he" | "himself"
N -> "holmes" | "home" | "i" | "mess" | "paint" | "palm" | "pipe" | "she"
N -> "smile" | "thursday" | "walk" | "we" | "word"
P -> "at" | "before" | "in" | "of" | "on" | "to"
V -> "arrived" | "came" | "chuckled" | "had" | "lit" | "said" | "sat"
V -> "smiled" | "tell" | "were"
"#;

/// The built-in English grammar, start symbol `S`
pub fn english_grammar() -> Result<Grammar, GrammarError> {
    let mut grammar = Grammar::load(&format!("{}{}", ENGLISH_NONTERMINALS, ENGLISH_TERMINALS))?;
    grammar.name = "english".to_string();
    Ok(grammar)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "grammars_tests.rs"]
mod tests;
