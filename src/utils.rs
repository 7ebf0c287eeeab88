use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Splits a sentence on whitespace and case-folds every word, so that
/// "She  EATS a cake" and "she eats a cake" produce the same tokens.
///
/// ```
/// assert_eq!(cykparse::utils::tokenize("She  EATS\ta cake"), vec!["she", "eats", "a", "cake"]);
/// assert!(cykparse::utils::tokenize("   ").is_empty());
/// ```
pub fn tokenize(sentence: &str) -> Vec<String> {
  sentence.split_whitespace().map(fold_case).collect()
}

/// Case-folds a single, already separated word
pub fn fold_case(word: &str) -> String {
  word.to_lowercase()
}
