use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::rules::{Production, Rule};
use crate::Err;

const ENGLISH_SRC: &str = include_str!("../grammars/english.cfg");

/// A context-free grammar. Rules are grouped by their left-hand symbol and kept
/// in declaration order, so every walk over a grammar is deterministic.
///
/// The grammar is never validated beyond what its constructor derives: an
/// unreachable rule or a start symbol without rules is the caller's problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
  pub start: String,
  rules: BTreeMap<String, Vec<Rule>>,
  variables: BTreeSet<String>,
  terminals: BTreeSet<String>,
}

impl Grammar {
  /// Groups `rules` by symbol and collects the variable and terminal sets from them.
  pub fn new<I>(start: impl Into<String>, rules: I) -> Self
  where
    I: IntoIterator<Item = Rule>,
  {
    let start = start.into();

    let mut variables = BTreeSet::new();
    let mut terminals = BTreeSet::new();
    variables.insert(start.clone());

    let rules = rules
      .into_iter()
      .fold(BTreeMap::new(), |mut map: BTreeMap<String, Vec<Rule>>, rule| {
        variables.insert(rule.symbol.name.clone());
        for p in rule.productions.iter() {
          match p {
            Production::Terminal(t) => terminals.insert(t.clone()),
            Production::Nonterminal(s) => variables.insert(s.name.clone()),
          };
        }
        map.entry(rule.symbol.name.clone()).or_default().push(rule);
        map
      });

    Self {
      start,
      rules,
      variables,
      terminals,
    }
  }

  /// The fixed English-subset grammar bundled with the crate
  pub fn english() -> Self {
    ENGLISH_SRC
      .parse()
      .expect("bundled english grammar failed to parse")
  }

  pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Err> {
    fs::read_to_string(path)?.parse()
  }

  /// Alternatives grouped by left-hand symbol. Read-only, so the symbol sets stay in step.
  pub fn rules(&self) -> &BTreeMap<String, Vec<Rule>> {
    &self.rules
  }

  pub fn variables(&self) -> &BTreeSet<String> {
    &self.variables
  }

  pub fn terminals(&self) -> &BTreeSet<String> {
    &self.terminals
  }

  pub fn is_variable(&self, s: &str) -> bool {
    self.variables.contains(s)
  }

  pub fn is_terminal(&self, s: &str) -> bool {
    self.terminals.contains(s)
  }

  /// All alternatives for `symbol`, empty if it has none
  pub fn rules_for(&self, symbol: &str) -> &[Rule] {
    self.rules.get(symbol).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn iter_rules(&self) -> impl Iterator<Item = &Rule> {
    self.rules.values().flatten()
  }

  pub fn rule_count(&self) -> usize {
    self.iter_rules().count()
  }

  /// True if every body is a single terminal or exactly two variables
  pub fn is_cnf(&self) -> bool {
    self.iter_rules().all(|r| match r.productions.as_slice() {
      [Production::Terminal(_)] => true,
      [Production::Nonterminal(_), Production::Nonterminal(_)] => true,
      _ => false,
    })
  }

  /// Left-hand symbols in display order: start first, then alphabetical
  fn display_order(&self) -> impl Iterator<Item = (&String, &Vec<Rule>)> {
    let start = self.rules.get_key_value(&self.start);
    let rest = self.rules.iter().filter(move |(k, _)| **k != self.start);
    start.into_iter().chain(rest)
  }
}

/// Writes the grammar in the same textual format `parse()` accepts.
impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (symbol, rules) in self.display_order() {
      write!(f, "{} ->", symbol)?;
      for (idx, rule) in rules.iter().enumerate() {
        if idx > 0 {
          write!(f, " |")?;
        }
        for p in rule.productions.iter() {
          write!(f, " {}", p)?;
        }
      }
      writeln!(f, ";")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_english_grammar_shape() {
    let g = Grammar::english();

    assert_eq!(g.start, "S");
    assert_eq!(g.variables().len(), 8);
    assert_eq!(g.terminals().len(), 21);
    assert_eq!(g.rules_for("VP").len(), 6);
    assert!(g.rules_for("Missing").is_empty());
    assert!(g.is_terminal("knife"));
    assert!(g.is_variable("Det"));
    // already normal form: lexical rules plus binary rules over variables
    assert!(g.is_cnf());
  }

  #[test]
  fn test_is_cnf_rejects_mixed_and_long_bodies() {
    let g: Grammar = "S -> A b; A -> a;".parse().unwrap();
    assert!(!g.is_cnf());

    let g: Grammar = "S -> A A A; A -> a;".parse().unwrap();
    assert!(!g.is_cnf());

    let g: Grammar = "S -> A; A -> a;".parse().unwrap();
    assert!(!g.is_cnf());
  }

  #[test]
  fn test_read_from_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/grammars/english.cfg");
    let g = Grammar::read_from_file(path).unwrap();
    assert_eq!(g, Grammar::english());

    assert!(Grammar::read_from_file("grammars/no-such-grammar.cfg").is_err());
  }

  #[test]
  fn test_symbol_sets_follow_rules() {
    let g = Grammar::new(
      "S",
      vec![
        Rule::new("S", vec![Production::nonterminal("A"), Production::terminal("b")]),
        Rule::new("A", vec![Production::terminal("a")]),
      ],
    );

    for rule in g.iter_rules() {
      assert!(g.is_variable(rule.symbol_str()));
      for p in rule.productions.iter() {
        assert_eq!(g.is_terminal(p.symbol_str()), p.is_terminal());
      }
    }
    assert_eq!(g.rules().len(), 2);
    // every terminal in a body has a stand-in, so conversion succeeds
    assert!(g.to_cnf().to_grammar().is_cnf());
  }

  #[test]
  fn test_display_round_trips() {
    let g = Grammar::english();
    let printed = g.to_string();

    assert!(printed.starts_with("S -> NP VP;\n"));
    assert!(printed.contains("VP -> VP PP | V NP | cooks | drinks | eats | cuts;\n"));

    let reparsed: Grammar = printed.parse().unwrap();
    assert_eq!(reparsed, g);
  }
}
