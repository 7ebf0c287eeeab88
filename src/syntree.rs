use std::fmt;

use crate::cyk::{Backpointer, CykTable};

/// Index type for the node arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdx(pub u32);

/// A tree node: a variable with its children, or a word with none.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
  pub value: String,
  /// Half-open range of word positions covered by this node
  pub span: (usize, usize),
  pub children: Vec<NodeIdx>,
}

impl Node {
  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }
}

/// A parse tree stored as an arena. The root is always the first node and
/// parents are always allocated before their children.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
  nodes: Vec<Node>,
}

enum Visit {
  Enter(NodeIdx),
  Space,
  Close,
}

impl ParseTree {
  fn alloc(&mut self, value: String, span: (usize, usize)) -> NodeIdx {
    let idx = self.nodes.len() as u32;
    self.nodes.push(Node {
      value,
      span,
      children: Vec::new(),
    });
    NodeIdx(idx)
  }

  pub fn root(&self) -> NodeIdx {
    NodeIdx(0)
  }

  /// Get an idx. Assumes valid, panics on OOB
  pub fn get(&self, idx: NodeIdx) -> &Node {
    self.nodes.get(idx.0 as usize).expect("Invalid NodeIdx")
  }

  fn get_mut(&mut self, idx: NodeIdx) -> &mut Node {
    self.nodes.get_mut(idx.0 as usize).expect("Invalid NodeIdx")
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &Node)> {
    self
      .nodes
      .iter()
      .enumerate()
      .map(|(idx, node)| (NodeIdx(idx as u32), node))
  }

  /// The words under the tree, left to right
  pub fn leaves(&self) -> Vec<&str> {
    let mut out = Vec::new();
    let mut stack = vec![self.root()];
    while let Some(idx) = stack.pop() {
      let node = self.get(idx);
      if node.is_leaf() {
        out.push(node.value.as_str());
      }
      stack.extend(node.children.iter().rev());
    }
    out
  }

  /// `[S [NP she] [VP eats]]`: every inner node in brackets, words bare
  pub fn to_bracket_notation(&self) -> String {
    let mut out = String::new();
    let mut stack = vec![Visit::Enter(self.root())];

    while let Some(visit) = stack.pop() {
      match visit {
        Visit::Space => out.push(' '),
        Visit::Close => out.push(']'),
        Visit::Enter(idx) => {
          let node = self.get(idx);
          if node.is_leaf() {
            out.push_str(&node.value);
            continue;
          }
          out.push('[');
          out.push_str(&node.value);
          stack.push(Visit::Close);
          for &child in node.children.iter().rev() {
            stack.push(Visit::Enter(child));
            stack.push(Visit::Space);
          }
        }
      }
    }

    out
  }

  /// One node per line, with box-drawing branches:
  ///
  /// ```text
  /// S
  /// ├── NP
  /// │   └── she
  /// └── VP
  ///     └── eats
  /// ```
  pub fn to_ascii(&self) -> String {
    let mut lines = Vec::new();
    // (node, text before its label, prefix for its children's lines)
    let mut stack = vec![(self.root(), String::new(), String::new())];

    while let Some((idx, head, prefix)) = stack.pop() {
      let node = self.get(idx);
      lines.push(format!("{}{}", head, node.value));

      let last = node.children.len().saturating_sub(1);
      for (pos, &child) in node.children.iter().enumerate().rev() {
        let (connector, extension) = if pos == last {
          ("└── ", "    ")
        } else {
          ("├── ", "│   ")
        };
        stack.push((
          child,
          format!("{}{}", prefix, connector),
          format!("{}{}", prefix, extension),
        ));
      }
    }

    lines.join("\n")
  }
}

impl fmt::Display for ParseTree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_bracket_notation())
  }
}

/// Rebuilds the first derivation the recognizer recorded for the start symbol
/// over the whole sentence. Returns None if the sentence was rejected.
///
/// Panics if a variable the table claims for a span has no usable backpointer,
/// since that means the table itself is corrupt.
pub fn build_tree(table: &CykTable) -> Option<ParseTree> {
  if !table.accepted() {
    return None;
  }

  let n = table.len();
  let mut tree = ParseTree { nodes: Vec::new() };
  let root = tree.alloc(table.start().to_string(), (0, n));

  // explicit work stack instead of recursion, so depth is bounded by memory only
  let mut stack = vec![(root, 0, n - 1)];
  while let Some((idx, i, j)) = stack.pop() {
    match table.backpointer(i, j, &tree.get(idx).value) {
      Some(Backpointer::Terminal(word)) if j == 0 => {
        let leaf = tree.alloc(word.clone(), (i, i + 1));
        tree.get_mut(idx).children.push(leaf);
      }
      Some(Backpointer::Binary { left, right, split }) if *split < j => {
        let k = *split;
        let l = tree.alloc(left.clone(), (i, i + k + 1));
        let r = tree.alloc(right.clone(), (i + k + 1, i + j + 1));
        tree.get_mut(idx).children = vec![l, r];
        stack.push((r, i + k + 1, j - k - 1));
        stack.push((l, i, k));
      }
      other => panic!(
        "corrupt cyk table: {} over {}..{} has backpointer {:?}",
        tree.get(idx).value,
        i,
        i + j + 1,
        other
      ),
    }
  }

  Some(tree)
}
