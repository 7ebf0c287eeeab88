use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::cnf::{CnfBody, CnfGrammar};
use crate::syntree::{build_tree, ParseTree};
use crate::utils::{fold_case, tokenize};

/// How a variable came to cover a span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backpointer {
  /// `A -> word`, only on single-word spans
  Terminal(String),
  /// `A -> left right`, where `left` covers the first `split + 1` words of the span
  Binary {
    left: String,
    right: String,
    split: usize,
  },
}

/// Variables that derive one span, each with the first derivation found for it
pub type Cell = BTreeMap<String, Backpointer>;

/// The triangular recognition table. `cell(i, j)` holds the variables deriving
/// `words[i..=i + j]`, so row `i` has `len() - i` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CykTable {
  start: String,
  words: Vec<String>,
  pub(crate) cells: Vec<Vec<Cell>>,
}

impl CykTable {
  fn new(start: String, words: Vec<String>) -> Self {
    let n = words.len();
    let cells = (0..n).map(|i| vec![Cell::new(); n - i]).collect();
    Self { start, words, cells }
  }

  pub fn words(&self) -> &[String] {
    &self.words
  }

  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn start(&self) -> &str {
    &self.start
  }

  /// Variables in cell `(i, j)`, sorted. Empty when out of range.
  pub fn cell(&self, i: usize, j: usize) -> impl Iterator<Item = &str> {
    self
      .cells
      .get(i)
      .and_then(|row| row.get(j))
      .into_iter()
      .flat_map(|cell| cell.keys().map(String::as_str))
  }

  pub fn contains(&self, i: usize, j: usize, symbol: &str) -> bool {
    self.backpointer(i, j, symbol).is_some()
  }

  pub fn backpointer(&self, i: usize, j: usize, symbol: &str) -> Option<&Backpointer> {
    self.cells.get(i)?.get(j)?.get(symbol)
  }

  /// True iff the start symbol derives the whole, non-empty sentence
  pub fn accepted(&self) -> bool {
    !self.is_empty() && self.contains(0, self.len() - 1, &self.start)
  }

  /// The words of span `(i, j)` joined by spaces
  pub fn span_text(&self, i: usize, j: usize) -> String {
    self.words[i..=i + j].join(" ")
  }

  fn cell_list(&self, i: usize, j: usize) -> String {
    self.cell(i, j).collect::<Vec<_>>().join(", ")
  }

  /// Walks the table bottom-up and says which spans each variable derives.
  pub fn explain(&self) -> String {
    if self.is_empty() {
      return "Empty sentence: nothing derives it, rejected.".to_string();
    }

    let n = self.len();
    let mut lines = Vec::new();

    lines.push("Step 1: single words".to_string());
    for i in 0..n {
      if self.cell(i, 0).next().is_some() {
        lines.push(format!("  '{}' can be: {}", self.words[i], self.cell_list(i, 0)));
      } else {
        lines.push(format!("  '{}' matches no variable", self.words[i]));
      }
    }

    for j in 1..n {
      lines.push(format!("Step {}: spans of length {}", j + 1, j + 1));
      for i in 0..n - j {
        if self.cell(i, j).next().is_some() {
          lines.push(format!("  '{}' can be: {}", self.span_text(i, j), self.cell_list(i, j)));
        }
      }
    }

    if self.accepted() {
      lines.push(format!("Result: accepted, '{}' derives the whole sentence", self.start));
    } else {
      let last = self.cell_list(0, n - 1);
      lines.push(format!(
        "Result: rejected, '{}' does not derive the whole sentence (full span: {{{}}})",
        self.start, last
      ));
    }

    lines.join("\n")
  }
}

/// Rows from the full span down to single words
impl fmt::Display for CykTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let n = self.len();
    writeln!(f, "Words: {}", self.words.join(" "))?;
    for j in (0..n).rev() {
      write!(f, "Length {}:", j + 1)?;
      for i in 0..n - j {
        write!(f, " {{{}}}", self.cell_list(i, j))?;
      }
      writeln!(f)?;
    }
    Ok(())
  }
}

/// Outcome of one parse call. The table is owned by this result alone.
#[derive(Debug, Clone)]
pub struct ParseResult {
  pub accepted: bool,
  pub elapsed: Duration,
  pub table: CykTable,
}

impl ParseResult {
  /// One parse tree if the sentence was accepted
  pub fn tree(&self) -> Option<ParseTree> {
    build_tree(&self.table)
  }
}

/// CYK recognizer over a grammar in normal form. Holds only read-only indexes
/// into the grammar; every parse call allocates its own table.
#[derive(Debug)]
pub struct CykParser<'g> {
  grammar: &'g CnfGrammar,
  /// case-folded word -> variables with a rule `A -> word`, in grammar order
  lexicon: HashMap<String, Vec<&'g str>>,
  /// (A, B, C) for every rule `A -> B C`, in grammar order
  binary: Vec<(&'g str, &'g str, &'g str)>,
}

impl<'g> CykParser<'g> {
  pub fn new(grammar: &'g CnfGrammar) -> Self {
    let mut lexicon: HashMap<String, Vec<&'g str>> = HashMap::new();
    let mut binary = Vec::new();

    for (symbol, bodies) in grammar.rules() {
      for body in bodies {
        match body {
          CnfBody::Terminal(t) => lexicon.entry(fold_case(t)).or_default().push(symbol.as_str()),
          CnfBody::Binary(l, r) => binary.push((symbol.as_str(), l.as_str(), r.as_str())),
        }
      }
    }

    Self {
      grammar,
      lexicon,
      binary,
    }
  }

  pub fn grammar(&self) -> &'g CnfGrammar {
    self.grammar
  }

  /// Splits on whitespace and case-folds before parsing
  pub fn parse_str(&self, sentence: &str) -> ParseResult {
    self.run(tokenize(sentence))
  }

  /// Parses pre-split words, case-folding each
  pub fn parse<S: AsRef<str>>(&self, words: &[S]) -> ParseResult {
    self.run(words.iter().map(|w| fold_case(w.as_ref())).collect())
  }

  fn run(&self, words: Vec<String>) -> ParseResult {
    let started = Instant::now();
    let table = self.fill(words);
    let accepted = table.accepted();
    let elapsed = started.elapsed();

    debug!(
      words = table.len(),
      accepted,
      elapsed_us = elapsed.as_micros() as u64,
      "parsed sentence"
    );

    ParseResult {
      accepted,
      elapsed,
      table,
    }
  }

  fn fill(&self, words: Vec<String>) -> CykTable {
    let mut table = CykTable::new(self.grammar.start.clone(), words);
    let n = table.len();

    // single words; unknown words just leave their cell empty
    for i in 0..n {
      let word = &table.words[i];
      let cell = &mut table.cells[i][0];
      for &symbol in self.lexicon.get(word.as_str()).into_iter().flatten() {
        cell
          .entry(symbol.to_string())
          .or_insert_with(|| Backpointer::Terminal(word.clone()));
      }
    }

    // span of j + 1 words starting at i, left part k + 1 words, right part j - k words
    for j in 1..n {
      for i in 0..n - j {
        for k in 0..j {
          for &(symbol, left, right) in self.binary.iter() {
            if table.cells[i][j].contains_key(symbol) {
              // first derivation wins
              continue;
            }
            let derives_left = table.cells[i][k].contains_key(left);
            if derives_left && table.cells[i + k + 1][j - k - 1].contains_key(right) {
              trace!(symbol, left, right, i, j, k, "derived span");
              table.cells[i][j].insert(
                symbol.to_string(),
                Backpointer::Binary {
                  left: left.to_string(),
                  right: right.to_string(),
                  split: k,
                },
              );
            }
          }
        }
      }
    }

    table
  }
}
