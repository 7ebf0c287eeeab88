#[macro_use]
extern crate lazy_static;

pub mod cnf;
pub mod cyk;
pub mod grammar;
pub mod parse_grammar;
pub mod rules;
pub mod syntree;
pub mod utils;

pub use crate::cnf::{convert, CnfGrammar};
pub use crate::cyk::{CykParser, CykTable, ParseResult};
pub use crate::grammar::Grammar;
pub use crate::syntree::{build_tree, ParseTree};
pub use crate::utils::Err;

impl Grammar {
  pub fn to_cnf(&self) -> CnfGrammar {
    convert(self)
  }
}
