//! Simple recursive-descent parsing of grammar files

use regex::Regex;
use std::str::FromStr;

use crate::grammar::Grammar;
use crate::rules::{Production, Rule, Symbol};
use crate::Err;

/// Parses rules of the form `Lhs -> body | body ... ;`.
/// Errors if the grammar doesn't parse or has an empty alternative.
impl FromStr for Grammar {
  type Err = Err;

  /// Parses a grammar from a string. Assumes the first rule's symbol
  /// is the start symbol.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (rules, s) = parse_rules(s)?;
    assert!(s.is_empty());

    match rules.first() {
      None => Err("empty ruleset".into()),
      Some(first) => {
        let start = first.symbol.name.clone();
        Ok(Self::new(start, rules))
      }
    }
  }
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  match re.find(s) {
    Some(m) if m.start() == 0 => (Some(m.as_str()), &s[m.end()..]),
    _ => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", re, excerpt(s)).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Tries to skip whitespace and `//` comments
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"^(\s|//[^\n]*)*");
  optional_re(&*WHITESPACE_OR_COMMENT, s).1
}

/// Tries to parse a name made of word characters, -, and '
fn parse_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(NAME, r"^[\w\-']+");
  needed_re(&*NAME, s).map_err(|err| format!("name: {}", err).into())
}

/// First line of the remaining input, for error messages
fn excerpt(s: &str) -> &str {
  s.lines().next().unwrap_or("<end of input>")
}

/// Upper-case names are variables, everything else is a terminal
fn parse_production(s: &str) -> ParseResult<'_, Production> {
  let (name, s) = parse_name(s).map_err(|e| -> Err { format!("symbol: {}", e).into() })?;

  let is_variable = name.chars().next().is_some_and(char::is_uppercase);
  let production = if is_variable {
    Production::nonterminal(name)
  } else {
    Production::terminal(name)
  };

  Ok((production, s))
}

fn parse_symbol(s: &str) -> ParseResult<'_, Symbol> {
  match parse_production(s)? {
    (Production::Nonterminal(symbol), s) => Ok((symbol, s)),
    (Production::Terminal(w), s) => {
      Err(format!("expected symbol, got terminal {}: {}", w, excerpt(s)).into())
    }
  }
}

fn close_alternative(symbol: &Symbol, productions: Vec<Production>) -> Result<Rule, Err> {
  if productions.is_empty() {
    Err(format!("empty alternative for {}: epsilon rules are not supported", symbol).into())
  } else {
    Ok(Rule {
      symbol: symbol.clone(),
      productions,
    })
  }
}

/// Symbol, arrow, `|`-separated alternatives, terminated by `;`
fn parse_rule(s: &str) -> ParseResult<'_, Vec<Rule>> {
  #![allow(clippy::trivial_regex)]
  regex_static!(ARROW, "^->");

  let (symbol, s) = parse_symbol(s).map_err(|e| -> Err { format!("rule symbol: {}", e).into() })?;
  let s = skip_whitespace(s);
  let (_, s) = needed_re(&*ARROW, s).map_err(|e| -> Err { format!("rule arrow: {}", e).into() })?;

  let mut rules = Vec::new();
  let mut productions = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), s) = optional_char(';', rem) {
      rules.push(close_alternative(&symbol, productions)?);
      return Ok((rules, s));
    }
    if let (Some(_), s) = optional_char('|', rem) {
      rules.push(close_alternative(&symbol, std::mem::take(&mut productions))?);
      rem = s;
      continue;
    }
    if rem.is_empty() {
      return Err(format!("rule {}: missing ';'", symbol).into());
    }
    let (prod, s) =
      parse_production(rem).map_err(|e| -> Err { format!("rule production: {}", e).into() })?;
    productions.push(prod);
    rem = s;
  }
}

fn parse_rules(s: &str) -> ParseResult<'_, Vec<Rule>> {
  let mut rules = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok((rules, rem));
    }
    let (mut alternatives, s) = parse_rule(rem)?;
    rules.append(&mut alternatives);
    rem = s;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_alternatives_and_comments() {
    let g: Grammar = r#"// leading comment
      S -> A b C | c;   // trailing comment
      A -> a;
      C -> A A A;
    "#
    .parse()
    .unwrap();

    assert_eq!(g.start, "S");
    assert_eq!(g.rule_count(), 4);

    let s = g.rules_for("S");
    assert_eq!(
      s[0].productions,
      vec![
        Production::nonterminal("A"),
        Production::terminal("b"),
        Production::nonterminal("C"),
      ]
    );
    assert_eq!(s[1].productions, vec![Production::terminal("c")]);
    assert_eq!(g.terminals().iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
  }

  #[test]
  fn test_parse_errors() {
    assert!("".parse::<Grammar>().is_err());
    assert!("  // only a comment\n".parse::<Grammar>().is_err());
    assert!("S NP VP;".parse::<Grammar>().is_err());
    assert!("S -> NP VP".parse::<Grammar>().is_err());
    assert!("s -> a;".parse::<Grammar>().is_err());
    assert!("S -> a | ;".parse::<Grammar>().is_err());
    assert!("S -> ;".parse::<Grammar>().is_err());
  }

  #[test]
  fn test_epsilon_error_message() {
    let err = "S -> a || b;".parse::<Grammar>().unwrap_err();
    assert!(err.to_string().contains("epsilon"), "{}", err);
  }
}
