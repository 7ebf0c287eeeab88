//! Conversion of epsilon-free grammars to Chomsky normal form.
//!
//! [`convert`] runs three passes over a copy of the input grammar:
//!
//! 1. unit rules `A -> B` are replaced by `B`'s alternatives, until a pass adds nothing
//! 2. every terminal `a` gets a variable `T_a -> a`, which replaces `a` inside longer bodies
//! 3. bodies longer than two symbols are split into a right-leaning chain of binary rules
//!
//! The input must not contain empty bodies. Nothing else is validated.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use tracing::debug;

use crate::grammar::Grammar;
use crate::rules::{Production, Rule};

pub const TERMINAL_PREFIX: &str = "T_";
pub const INTERMEDIATE_PREFIX: &str = "X";

/// Hands out variable names that collide neither with the grammar being
/// converted nor with each other. One allocator serves a whole conversion run.
#[derive(Debug, Default)]
pub struct NameAllocator {
  taken: HashSet<String>,
  counter: usize,
  issued: Vec<String>,
}

impl NameAllocator {
  pub fn new<'a, I>(taken: I) -> Self
  where
    I: IntoIterator<Item = &'a String>,
  {
    Self {
      taken: taken.into_iter().cloned().collect(),
      ..Default::default()
    }
  }

  /// `T_<terminal>`, or `T_<terminal>_<n>` if that is already a variable
  pub fn terminal_name(&mut self, terminal: &str) -> String {
    let base = format!("{}{}", TERMINAL_PREFIX, terminal);
    if self.claim(&base) {
      return base;
    }
    loop {
      let candidate = format!("{}_{}", base, self.next_index());
      if self.claim(&candidate) {
        return candidate;
      }
    }
  }

  /// `X<n>` for the next free `n`
  pub fn intermediate_name(&mut self) -> String {
    loop {
      let candidate = format!("{}{}", INTERMEDIATE_PREFIX, self.next_index());
      if self.claim(&candidate) {
        return candidate;
      }
    }
  }

  /// Every name handed out so far, in order
  pub fn issued(&self) -> &[String] {
    &self.issued
  }

  fn next_index(&mut self) -> usize {
    let n = self.counter;
    self.counter += 1;
    n
  }

  fn claim(&mut self, name: &str) -> bool {
    if self.taken.insert(name.to_string()) {
      self.issued.push(name.to_string());
      true
    } else {
      false
    }
  }
}

/// A body in normal form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CnfBody {
  Terminal(String),
  Binary(String, String),
}

impl fmt::Display for CnfBody {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Terminal(t) => write!(f, "{}", t),
      Self::Binary(l, r) => write!(f, "{} {}", l, r),
    }
  }
}

/// A grammar whose rules are all `A -> a` or `A -> B C`, by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CnfGrammar {
  pub start: String,
  rules: BTreeMap<String, Vec<CnfBody>>,
  variables: BTreeSet<String>,
  terminals: BTreeSet<String>,
  introduced: Vec<String>,
}

impl CnfGrammar {
  pub fn rules(&self) -> &BTreeMap<String, Vec<CnfBody>> {
    &self.rules
  }

  pub fn bodies(&self, symbol: &str) -> &[CnfBody] {
    self.rules.get(symbol).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn variables(&self) -> &BTreeSet<String> {
    &self.variables
  }

  pub fn terminals(&self) -> &BTreeSet<String> {
    &self.terminals
  }

  /// Variables created during conversion, in creation order
  pub fn introduced(&self) -> &[String] {
    &self.introduced
  }

  pub fn rule_count(&self) -> usize {
    self.rules.values().map(Vec::len).sum()
  }

  /// Lowers the typed bodies back into a general grammar
  pub fn to_grammar(&self) -> Grammar {
    let rules = self.rules.iter().flat_map(|(symbol, bodies)| {
      bodies.iter().map(move |body| {
        let productions = match body {
          CnfBody::Terminal(t) => vec![Production::terminal(t.clone())],
          CnfBody::Binary(l, r) => vec![
            Production::nonterminal(l.clone()),
            Production::nonterminal(r.clone()),
          ],
        };
        Rule::new(symbol.clone(), productions)
      })
    });
    Grammar::new(self.start.clone(), rules)
  }
}

impl fmt::Display for CnfGrammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_grammar())
  }
}

type Bodies = BTreeMap<String, Vec<Vec<Production>>>;

/// Converts `g` to an equivalent grammar in Chomsky normal form. `g` is left untouched.
pub fn convert(g: &Grammar) -> CnfGrammar {
  let mut names = NameAllocator::new(g.variables().iter().chain(g.terminals()));

  let mut bodies: Bodies = g
    .rules()
    .iter()
    .map(|(symbol, rules)| {
      let alternatives = rules.iter().map(|r| r.productions.clone()).collect();
      (symbol.clone(), alternatives)
    })
    .collect();

  let passes = eliminate_units(&mut bodies);
  debug!(passes, "eliminated unit rules");

  isolate_terminals(&mut bodies, g.terminals(), &mut names);
  let rules = shorten(bodies, &mut names);

  let mut variables = g.variables().clone();
  variables.extend(names.issued().iter().cloned());

  let cnf = CnfGrammar {
    start: g.start.clone(),
    rules,
    variables,
    terminals: g.terminals().clone(),
    introduced: names.issued().to_vec(),
  };
  debug!(
    rules = cnf.rule_count(),
    variables = cnf.variables.len(),
    introduced = cnf.introduced.len(),
    "converted grammar to cnf"
  );
  cnf
}

/// Repeats full passes until none adds a body. Each pass copies the alternatives
/// of every unit target into the unit's owner, so chains and cycles close over;
/// afterwards the unit bodies themselves are dropped. Returns the number of passes.
fn eliminate_units(bodies: &mut Bodies) -> usize {
  let symbols = bodies.keys().cloned().collect::<Vec<_>>();
  let mut passes = 0;

  loop {
    passes += 1;
    let mut changed = false;

    for symbol in symbols.iter() {
      let targets = bodies[symbol]
        .iter()
        .filter_map(|body| unit_target(body))
        .filter(|t| *t != symbol.as_str())
        .map(str::to_string)
        .collect::<Vec<_>>();

      for target in targets {
        let inherited = bodies.get(&target).cloned().unwrap_or_default();
        let own = bodies.get_mut(symbol).expect("symbol taken from bodies");
        for body in inherited {
          if !own.contains(&body) {
            own.push(body);
            changed = true;
          }
        }
      }
    }

    if !changed {
      break;
    }
  }

  for alternatives in bodies.values_mut() {
    alternatives.retain(|body| unit_target(body).is_none());
  }

  passes
}

/// The target of a unit body `B` in `A -> B`
fn unit_target(body: &[Production]) -> Option<&str> {
  match body {
    [Production::Nonterminal(s)] => Some(&s.name),
    _ => None,
  }
}

/// Gives every terminal its own variable and substitutes it inside bodies of two or
/// more symbols. Single terminal bodies stay as they are.
fn isolate_terminals(bodies: &mut Bodies, terminals: &BTreeSet<String>, names: &mut NameAllocator) {
  let stand_ins = terminals
    .iter()
    .map(|t| (t.clone(), names.terminal_name(t)))
    .collect::<BTreeMap<_, _>>();

  for alternatives in bodies.values_mut() {
    for body in alternatives.iter_mut().filter(|b| b.len() >= 2) {
      for p in body.iter_mut() {
        if let Production::Terminal(t) = p {
          *p = Production::nonterminal(stand_ins[t.as_str()].clone());
        }
      }
    }
  }

  for (terminal, variable) in stand_ins {
    bodies
      .entry(variable)
      .or_default()
      .push(vec![Production::Terminal(terminal)]);
  }
}

/// Splits `A -> s1 s2 ... sm` into `A -> s1 X0`, `X0 -> s2 X1`, ..., `Xk -> s(m-1) sm`
fn shorten(bodies: Bodies, names: &mut NameAllocator) -> BTreeMap<String, Vec<CnfBody>> {
  let mut out: BTreeMap<String, Vec<CnfBody>> = BTreeMap::new();

  for (symbol, alternatives) in bodies {
    for body in alternatives {
      match body.as_slice() {
        [Production::Terminal(t)] => {
          push_unique(&mut out, &symbol, CnfBody::Terminal(t.clone()));
        }
        [Production::Nonterminal(s)] => {
          unreachable!("unit rule {} -> {} survived elimination", symbol, s)
        }
        _ => {
          let mut owner = symbol.clone();
          let mut rest = body.iter().map(|p| p.symbol_str().to_string()).collect::<Vec<_>>();

          while rest.len() > 2 {
            let fresh = names.intermediate_name();
            let head = rest.remove(0);
            push_unique(&mut out, &owner, CnfBody::Binary(head, fresh.clone()));
            owner = fresh;
          }

          let right = rest.pop().expect("body has two symbols left");
          let left = rest.pop().expect("body has two symbols left");
          push_unique(&mut out, &owner, CnfBody::Binary(left, right));
        }
      }
    }
  }

  out
}

fn push_unique(rules: &mut BTreeMap<String, Vec<CnfBody>>, symbol: &str, body: CnfBody) {
  let bodies = rules.entry(symbol.to_string()).or_default();
  if !bodies.contains(&body) {
    bodies.push(body);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rules::Symbol;
  use std::collections::VecDeque;

  /// Every terminal string of length <= max_len the grammar derives, by
  /// breadth-first leftmost derivation. Only sound for epsilon-free grammars.
  fn derivable(g: &Grammar, max_len: usize) -> BTreeSet<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = BTreeSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(vec![Production::Nonterminal(Symbol::new(g.start.clone()))]);

    while let Some(form) = queue.pop_front() {
      if !seen.insert(form.clone()) {
        continue;
      }
      match form.iter().position(Production::is_nonterminal) {
        None => {
          out.insert(form.iter().map(|p| p.symbol_str().to_string()).collect());
        }
        Some(pos) => {
          for rule in g.rules_for(form[pos].symbol_str()) {
            let mut next = form[..pos].to_vec();
            next.extend(rule.productions.iter().cloned());
            next.extend_from_slice(&form[pos + 1..]);
            if next.len() <= max_len {
              queue.push_back(next);
            }
          }
        }
      }
    }

    out
  }

  /// All words over `alphabet` of length 1..=max_len
  fn all_words(alphabet: &[&str], max_len: usize) -> Vec<Vec<String>> {
    let mut words = Vec::new();
    let mut frontier = vec![Vec::<String>::new()];
    for _ in 0..max_len {
      frontier = frontier
        .into_iter()
        .flat_map(|w| {
          alphabet.iter().map(move |a| {
            let mut next = w.clone();
            next.push(a.to_string());
            next
          })
        })
        .collect();
      words.extend(frontier.iter().cloned());
    }
    words
  }

  const TANGLED: &str = r#"
    S -> A B c | B | S S D;
    A -> a | a A;
    B -> C | b S d;
    C -> B | c | A C;
    D -> d d d | a;
  "#;

  #[test]
  fn test_output_is_cnf() {
    for src in [TANGLED, "S -> NP VP; NP -> she | Det N; Det -> the; N -> dog; VP -> barks | V NP; V -> sees;"] {
      let g: Grammar = src.parse().unwrap();
      let cnf = convert(&g);
      let lowered = cnf.to_grammar();

      assert!(lowered.is_cnf(), "not in cnf:\n{}", lowered);
      for rule in lowered.iter_rules() {
        if let [Production::Terminal(t)] = rule.productions.as_slice() {
          assert!(cnf.terminals().contains(t));
        }
      }
    }
  }

  #[test]
  fn test_unit_target() {
    let unit = [Production::nonterminal("B")];
    let lexical = [Production::terminal("b")];
    let binary = [Production::nonterminal("B"), Production::nonterminal("C")];

    assert_eq!(unit_target(&unit), Some("B"));
    assert_eq!(unit_target(&lexical), None);
    assert_eq!(unit_target(&binary), None);
  }

  #[test]
  fn test_self_unit_is_dropped() {
    let g: Grammar = "S -> S | S S | x;".parse().unwrap();
    let cnf = convert(&g);

    assert_eq!(
      cnf.bodies("S"),
      &[
        CnfBody::Binary("S".into(), "S".into()),
        CnfBody::Terminal("x".into()),
      ]
    );
  }

  #[test]
  fn test_input_is_not_mutated() {
    let g: Grammar = TANGLED.parse().unwrap();
    let before = g.clone();
    let _ = convert(&g);
    assert_eq!(g, before);
  }

  #[test]
  fn test_unit_chain_and_cycle() {
    let g: Grammar = r#"
      S -> A;
      A -> B | a;
      B -> C | b;
      C -> A | c;
    "#
    .parse()
    .unwrap();
    let cnf = convert(&g);

    for symbol in ["S", "A", "B", "C"] {
      let mut bodies = cnf.bodies(symbol).to_vec();
      bodies.sort_by_key(|b| b.to_string());
      assert_eq!(
        bodies,
        vec![
          CnfBody::Terminal("a".into()),
          CnfBody::Terminal("b".into()),
          CnfBody::Terminal("c".into()),
        ],
        "bodies of {}",
        symbol
      );
    }
  }

  #[test]
  fn test_terminal_isolation() {
    let g: Grammar = "S -> a S b | a b; ".parse().unwrap();
    let cnf = convert(&g);

    assert_eq!(cnf.bodies("T_a"), &[CnfBody::Terminal("a".into())]);
    assert_eq!(cnf.bodies("T_b"), &[CnfBody::Terminal("b".into())]);
    assert_eq!(
      cnf.bodies("S"),
      &[
        CnfBody::Binary("T_a".into(), "X0".into()),
        CnfBody::Binary("T_a".into(), "T_b".into()),
      ]
    );
    assert_eq!(cnf.bodies("X0"), &[CnfBody::Binary("S".into(), "T_b".into())]);
  }

  #[test]
  fn test_long_body_chain() {
    let g: Grammar = "S -> A B C D E; A -> a; B -> b; C -> c; D -> d; E -> e;"
      .parse()
      .unwrap();
    let cnf = convert(&g);

    assert_eq!(cnf.bodies("S"), &[CnfBody::Binary("A".into(), "X0".into())]);
    assert_eq!(cnf.bodies("X0"), &[CnfBody::Binary("B".into(), "X1".into())]);
    assert_eq!(cnf.bodies("X1"), &[CnfBody::Binary("C".into(), "X2".into())]);
    assert_eq!(cnf.bodies("X2"), &[CnfBody::Binary("D".into(), "E".into())]);
  }

  #[test]
  fn test_fresh_names_avoid_existing_variables() {
    let g: Grammar = r#"
      S -> X0 T_a a b c;
      X0 -> x;
      T_a -> a;
      X1 -> y;
    "#
    .parse()
    .unwrap();
    let cnf = convert(&g);
    let introduced = cnf.introduced();

    let unique = introduced.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), introduced.len());
    for name in introduced {
      assert!(!g.variables().contains(name), "{} collides", name);
      assert!(cnf.variables().contains(name));
    }
    assert!(introduced.iter().any(|n| n.starts_with("T_a_")));
    assert!(!introduced.contains(&"X0".to_string()));
    assert!(!introduced.contains(&"X1".to_string()));
  }

  #[test]
  fn test_conversion_is_reproducible() {
    let g: Grammar = TANGLED.parse().unwrap();
    assert_eq!(convert(&g), convert(&g));
  }

  #[test]
  fn test_language_equivalence() {
    const MAX_LEN: usize = 5;

    let g: Grammar = TANGLED.parse().unwrap();
    let expected = derivable(&g, MAX_LEN);
    assert!(!expected.is_empty());

    let cnf = convert(&g);
    let parser = crate::cyk::CykParser::new(&cnf);

    for word in all_words(&["a", "b", "c", "d"], MAX_LEN) {
      let accepted = parser.parse(&word).accepted;
      assert_eq!(accepted, expected.contains(&word), "disagreement on {:?}", word);
    }
  }
}
