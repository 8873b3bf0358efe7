// Chart parser - CYK generalized to right-hand sides of any length, with lazy tree enumeration

use crate::grammars::{Grammar, Symbol};
use crate::parse_tree::ParseTree;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No lexical rule in the grammar produces this token
    #[error("grammar does not cover the word '{word}' (position {position})")]
    UnknownWord { word: String, position: usize },

    #[error("start symbol '{name}' is not defined")]
    UnknownStart { name: String },
}

/// Reference to table[start][end][nt]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub start: usize,
    pub end: usize,
    pub nt: u32,
}

/// One way of deriving a span as a non-terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Way {
    /// The span is a single token matching a lexical rule
    Word(u32),
    /// The span splits into one sub-span per symbol of the alternative
    Split {
        alternative: usize,
        children: Vec<CellRef>,
    },
}

/// Chart table: table[s][e] maps non-terminal -> every way of deriving tokens[s..e]
type ChartTable = Vec<Vec<FxHashMap<u32, Vec<Way>>>>;

pub struct ChartParser<'g> {
    grammar: &'g Grammar,
    /// (lhs, alternative index) for alternatives of two or more symbols
    branching: Vec<(u32, usize)>,
    /// (lhs, alternative index, child) for `A -> B` alternatives
    unary: Vec<(u32, usize, u32)>,
}

impl<'g> ChartParser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        let mut branching = Vec::new();
        let mut unary = Vec::new();

        // Classify productions once; lexical rules are reached through the grammar's lexicon
        for (lhs, _) in grammar.non_terminals.iter() {
            for (index, alternative) in grammar.alternatives_for(lhs).iter().enumerate() {
                match alternative[..] {
                    [Symbol::NonTerminal(child)] => unary.push((lhs, index, child)),
                    [Symbol::Terminal(_)] => {}
                    _ => branching.push((lhs, index)),
                }
            }
        }

        ChartParser {
            grammar,
            branching,
            unary,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Build the complete chart for `tokens`.
    /// Fails before any chart work if a token has no lexical rule.
    pub fn chart<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Chart<'g>, ParseError> {
        let text = tokens
            .iter()
            .enumerate()
            .map(|(position, token)| {
                let word = token.as_ref();
                // Terminals are only ever interned from lexical rules
                self.grammar
                    .terminals
                    .get_id(word)
                    .ok_or_else(|| ParseError::UnknownWord {
                        word: word.to_string(),
                        position,
                    })
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let length = text.len();
        let mut table: ChartTable = vec![vec![FxHashMap::default(); length + 1]; length + 1];

        self.parse_1(&text, &mut table);
        for n in 1..=length {
            if n > 1 {
                self.parse_n(n, length, &mut table);
            }
            self.close_unary(n, length, &mut table);
        }

        let chart = Chart {
            grammar: self.grammar,
            tokens: text,
            table,
        };
        debug!(
            tokens = length,
            cells = chart.num_cells(),
            ways = chart.num_ways(),
            "built chart"
        );
        Ok(chart)
    }

    /// Chart the tokens and enumerate derivations from the grammar's start symbol
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Derivations<'g>, ParseError> {
        Ok(self.chart(tokens)?.derivations(self.grammar.start))
    }

    /// Length-1 spans: every lexical category of each token
    fn parse_1(&self, text: &[u32], table: &mut ChartTable) {
        for (s, &terminal) in text.iter().enumerate() {
            let word = self.grammar.terminal_str(terminal).unwrap_or_default();
            for &nt in self.grammar.lexical_categories(word) {
                table[s][s + 1].entry(nt).or_default().push(Way::Word(terminal));
            }
        }
    }

    /// Spans of length n derived through alternatives of two or more symbols.
    /// Every sub-span is strictly shorter, hence already final.
    fn parse_n(&self, n: usize, length: usize, table: &mut ChartTable) {
        for s in 0..=length - n {
            let e = s + n;
            for &(lhs, index) in &self.branching {
                let symbols = &self.grammar.alternatives_for(lhs)[index];
                let mut found = Vec::new();
                split(table, symbols, s, e, &mut Vec::with_capacity(symbols.len()), &mut found);

                if found.is_empty() {
                    continue;
                }
                let ways = table[s][e].entry(lhs).or_default();
                ways.extend(found.into_iter().map(|children| Way::Split {
                    alternative: index,
                    children,
                }));
            }
        }
    }

    /// Apply `A -> B` rules within each span of length n until nothing changes.
    /// Terminates because the grammar has no unary cycles.
    fn close_unary(&self, n: usize, length: usize, table: &mut ChartTable) {
        for s in 0..=length - n {
            let e = s + n;
            let cell = &mut table[s][e];
            loop {
                let mut added = false;
                for &(lhs, index, child) in &self.unary {
                    if !cell.contains_key(&child) {
                        continue;
                    }
                    let ways = cell.entry(lhs).or_default();
                    let recorded = ways.iter().any(
                        |way| matches!(way, Way::Split { alternative, .. } if *alternative == index),
                    );
                    if !recorded {
                        ways.push(Way::Split {
                            alternative: index,
                            children: vec![CellRef { start: s, end: e, nt: child }],
                        });
                        added = true;
                    }
                }
                if !added {
                    break;
                }
            }
        }
    }
}

/// Collect every partition of tokens[pos..end] into consecutive non-empty
/// sub-spans, one per symbol, each already derivable as its symbol.
/// Split points are tried in increasing order.
fn split(
    table: &ChartTable,
    symbols: &[Symbol],
    pos: usize,
    end: usize,
    prefix: &mut Vec<CellRef>,
    found: &mut Vec<Vec<CellRef>>,
) {
    let Some((first, rest)) = symbols.split_first() else {
        if pos == end {
            found.push(prefix.clone());
        }
        return;
    };
    if end - pos < symbols.len() {
        return;
    }
    let Symbol::NonTerminal(nt) = *first else {
        return;
    };

    let lo = if rest.is_empty() { end } else { pos + 1 };
    for j in lo..=end - rest.len() {
        if table[pos][j].contains_key(&nt) {
            prefix.push(CellRef { start: pos, end: j, nt });
            split(table, rest, j, end, prefix, found);
            prefix.pop();
        }
    }
}

/// A fully built chart for one sentence. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct Chart<'g> {
    grammar: &'g Grammar,
    tokens: Vec<u32>,
    table: ChartTable,
}

impl<'g> Chart<'g> {
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Number of tokens charted
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Every recorded way of deriving tokens[start..end] as `nt`
    pub fn ways(&self, start: usize, end: usize, nt: u32) -> &[Way] {
        self.table
            .get(start)
            .and_then(|row| row.get(end))
            .and_then(|cell| cell.get(&nt))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn ways_at(&self, cell: CellRef) -> &[Way] {
        self.ways(cell.start, cell.end, cell.nt)
    }

    fn root(&self, start_symbol: u32) -> Option<CellRef> {
        let cell = CellRef {
            start: 0,
            end: self.len(),
            nt: start_symbol,
        };
        (!self.ways_at(cell).is_empty()).then_some(cell)
    }

    /// Whether the whole input derives from `start_symbol`
    pub fn is_parseable(&self, start_symbol: u32) -> bool {
        self.root(start_symbol).is_some()
    }

    /// Number of distinct derivation trees, saturating at `u128::MAX`
    pub fn count_derivations(&self, start_symbol: u32) -> u128 {
        match self.root(start_symbol) {
            Some(root) => self.count(root, &mut FxHashMap::default()),
            None => 0,
        }
    }

    fn count(&self, cell: CellRef, memo: &mut FxHashMap<CellRef, u128>) -> u128 {
        if let Some(&total) = memo.get(&cell) {
            return total;
        }
        let mut total: u128 = 0;
        for way in self.ways_at(cell) {
            let mut product: u128 = 1;
            if let Way::Split { children, .. } = way {
                for &child in children {
                    product = product.saturating_mul(self.count(child, memo));
                }
            }
            total = total.saturating_add(product);
        }
        memo.insert(cell, total);
        total
    }

    /// Non-empty (span, non-terminal) cells
    pub fn num_cells(&self) -> usize {
        self.table.iter().flatten().map(|cell| cell.len()).sum()
    }

    pub fn num_ways(&self) -> usize {
        self.table
            .iter()
            .flatten()
            .flat_map(|cell| cell.values())
            .map(Vec::len)
            .sum()
    }

    /// Lazily enumerate the derivation trees of the whole input
    pub fn derivations(self, start_symbol: u32) -> Derivations<'g> {
        let cursor = self
            .root(start_symbol)
            .map(|root| Cursor::first(&self, root));
        Derivations {
            chart: self,
            cursor,
            started: false,
        }
    }
}

/// Position in the derivation space of one cell: the chosen way plus one
/// cursor per child sub-span. Advancing works like an odometer, right-most
/// child first, then on to the next way.
#[derive(Debug, Clone)]
struct Cursor {
    cell: CellRef,
    way: usize,
    children: Vec<Cursor>,
}

impl Cursor {
    fn first(chart: &Chart<'_>, cell: CellRef) -> Self {
        Self::at_way(chart, cell, 0)
    }

    fn at_way(chart: &Chart<'_>, cell: CellRef, way: usize) -> Self {
        let children = match &chart.ways_at(cell)[way] {
            Way::Word(_) => Vec::new(),
            Way::Split { children, .. } => children
                .iter()
                .map(|&child| Cursor::first(chart, child))
                .collect(),
        };
        Cursor {
            cell,
            way,
            children,
        }
    }

    /// Move to the next tree; leaves the cursor untouched and returns false when exhausted
    fn advance(&mut self, chart: &Chart<'_>) -> bool {
        for i in (0..self.children.len()).rev() {
            if self.children[i].advance(chart) {
                for later in &mut self.children[i + 1..] {
                    *later = Cursor::first(chart, later.cell);
                }
                return true;
            }
        }
        if self.way + 1 < chart.ways_at(self.cell).len() {
            *self = Cursor::at_way(chart, self.cell, self.way + 1);
            return true;
        }
        false
    }

    fn build(&self, chart: &Chart<'_>) -> ParseTree {
        let grammar = chart.grammar;
        let label = grammar.non_terminal_str(self.cell.nt).unwrap_or("?");
        match &chart.ways_at(self.cell)[self.way] {
            Way::Word(terminal) => ParseTree::leaf(label, grammar.terminal_str(*terminal).unwrap_or("?")),
            Way::Split { .. } => ParseTree::node(
                label,
                self.children.iter().map(|child| child.build(chart)).collect(),
            ),
        }
    }
}

/// Pull-based sequence of derivation trees. Each tree is built fresh; the
/// only state kept between calls is the cursor into the chart.
#[derive(Debug, Clone)]
pub struct Derivations<'g> {
    chart: Chart<'g>,
    cursor: Option<Cursor>,
    started: bool,
}

impl<'g> Derivations<'g> {
    /// True when no (further) tree will be produced
    pub fn is_empty(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn chart(&self) -> &Chart<'g> {
        &self.chart
    }
}

impl Iterator for Derivations<'_> {
    type Item = ParseTree;

    fn next(&mut self) -> Option<ParseTree> {
        let cursor = self.cursor.as_mut()?;
        if self.started && !cursor.advance(&self.chart) {
            self.cursor = None;
            return None;
        }
        self.started = true;

        let tree = cursor.build(&self.chart);
        trace!(tree = %tree, "derivation");
        Some(tree)
    }
}

/// Parse `tokens` under `grammar` from the non-terminal named `start`
pub fn parse<'g, S: AsRef<str>>(
    tokens: &[S],
    grammar: &'g Grammar,
    start: &str,
) -> Result<Derivations<'g>, ParseError> {
    let start_symbol = grammar
        .non_terminals
        .get_id(start)
        .ok_or_else(|| ParseError::UnknownStart {
            name: start.to_string(),
        })?;
    Ok(ChartParser::new(grammar).chart(tokens)?.derivations(start_symbol))
}
