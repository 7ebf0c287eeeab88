use cykparse::{CykParser, Err, Grammar};

const EXAMPLES: &[(&str, &[&str])] = &[
  ("grammatical", &["she eats a cake", "the dog drinks the beer"]),
  (
    "grammatical but semantically odd",
    &["the fork eats the oven", "he drinks a knife"],
  ),
  // "she eats" is accepted: the grammar has VP -> eats
  ("expected to fail", &["she eats", "eats she cake"]),
];

fn main() -> Result<(), Err> {
  let g = Grammar::english();
  let cnf = g.to_cnf();
  let parser = CykParser::new(&cnf);

  println!("Grammar:\n{}", g);
  println!("CNF ({} introduced variables):\n{}", cnf.introduced().len(), cnf);

  let mut total = 0;
  let mut accepted = 0;
  for (category, sentences) in EXAMPLES {
    println!("== {}", category);
    for sentence in sentences.iter() {
      let result = parser.parse_str(sentence);
      total += 1;
      if result.accepted {
        accepted += 1;
      }

      println!(
        "{} '{}' ({:.3} ms)",
        if result.accepted { "ACCEPTED" } else { "REJECTED" },
        sentence,
        result.elapsed.as_secs_f64() * 1000.0
      );
      if let Some(tree) = result.tree() {
        println!("{}\n{}", tree.to_bracket_notation(), tree.to_ascii());
      }
      println!();
    }
  }

  println!("{} of {} sentences accepted", accepted, total);
  Ok(())
}
