use std::env;
use std::io;
use std::io::Write;
use std::process;

use cykparse::{CykParser, Err, Grammar};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} [FILE] [options]

Reads sentences from stdin, one per line, and parses them with the grammar
in FILE (defaults to the bundled English grammar).

Options:
  -h, --help      Print this message
  -c, --chart     Print the CYK table (defaults to not printing)
  -e, --explain   Print a step-by-step explanation of the table
  -g, --grammar   Print the grammar and its normal form before reading input
  -t, --no-tree   Don't print parse trees (defaults to printing)",
    prog_name
  )
}

fn parse(parser: &CykParser, sentence: &str, opts: &Args) -> Result<(), Err> {
  let result = parser.parse_str(sentence);

  println!(
    "{} ({:.4} ms)",
    if result.accepted { "accepted" } else { "rejected" },
    result.elapsed.as_secs_f64() * 1000.0
  );

  if opts.print_chart {
    println!("chart:\n{}", result.table);
  }

  if opts.print_explanation {
    println!("{}\n", result.table.explain());
  }

  if opts.print_tree {
    if let Some(tree) = result.tree() {
      println!("{}\n\n{}", tree.to_ascii(), tree.to_bracket_notation());
    }
  }

  println!();
  Ok(())
}

struct Args {
  filename: Option<String>,
  print_chart: bool,
  print_explanation: bool,
  print_grammar: bool,
  print_tree: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let prog_name = match iter.next() {
      Some(name) => name,
      None => return Err(Self::make_error_message("bad argument vector", "cyk")),
    };

    let mut filename: Option<String> = None;
    let mut print_chart = false;
    let mut print_explanation = false;
    let mut print_grammar = false;
    let mut print_tree = true;

    for o in iter {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-e" || o == "--explain" {
        print_explanation = true;
      } else if o == "-g" || o == "--grammar" {
        print_grammar = true;
      } else if o == "-t" || o == "--no-tree" {
        print_tree = false;
      } else if o.starts_with('-') {
        return Err(Self::make_error_message(&format!("unknown option {}", o), prog_name));
      } else if filename.is_none() {
        filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    Ok(Self {
      filename,
      print_chart,
      print_explanation,
      print_grammar,
      print_tree,
    })
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let g = match &opts.filename {
    Some(filename) => Grammar::read_from_file(filename)?,
    None => Grammar::english(),
  };
  let cnf = g.to_cnf();
  info!(
    rules = g.rule_count(),
    cnf_rules = cnf.rule_count(),
    "grammar ready"
  );

  if opts.print_grammar {
    println!("grammar:\n{}\ncnf:\n{}", g, cnf);
  }

  let parser = CykParser::new(&cnf);

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        let sentence = input.trim();
        if !sentence.is_empty() {
          parse(&parser, sentence, &opts)?;
        }
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
