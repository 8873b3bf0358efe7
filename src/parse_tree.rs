use serde::Serialize;
use std::fmt;

/// What sits beneath a node: a word for lexical rules, sub-trees otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Content {
    Word(String),
    Children(Vec<ParseTree>),
}

/// A derivation tree node: a non-terminal label over a word or over sub-trees.
/// Each node owns its sub-trees exclusively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseTree {
    pub label: String,
    pub content: Content,
}

impl ParseTree {
    /// A node rewriting directly to a word, e.g. `(N door)`
    pub fn leaf(label: &str, word: &str) -> Self {
        ParseTree {
            label: label.to_string(),
            content: Content::Word(word.to_string()),
        }
    }

    pub fn node(label: &str, children: Vec<ParseTree>) -> Self {
        ParseTree {
            label: label.to_string(),
            content: Content::Children(children),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, Content::Word(_))
    }

    /// Sub-trees in order; empty for leaves
    pub fn children(&self) -> &[ParseTree] {
        match &self.content {
            Content::Children(children) => children,
            Content::Word(_) => &[],
        }
    }

    pub fn word(&self) -> Option<&str> {
        match &self.content {
            Content::Word(word) => Some(word),
            Content::Children(_) => None,
        }
    }

    /// The words this tree spans, left to right
    pub fn words(&self) -> Vec<&str> {
        let mut words = Vec::new();
        self.collect_words(&mut words);
        words
    }

    fn collect_words<'t>(&'t self, words: &mut Vec<&'t str>) {
        match &self.content {
            Content::Word(word) => words.push(word),
            Content::Children(children) => {
                for child in children {
                    child.collect_words(words);
                }
            }
        }
    }

    /// Surface text: the spanned words joined by single spaces
    pub fn text(&self) -> String {
        self.words().join(" ")
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(ParseTree::depth).max().unwrap_or(0)
    }

    /// Bracketed one-line form: `(S (NP (N holmes)) (VP (V sat)))`
    pub fn pretty_print(&self) -> String {
        match &self.content {
            Content::Word(word) => format!("({} {})", self.label, word),
            Content::Children(children) => {
                let children_str: Vec<String> =
                    children.iter().map(ParseTree::pretty_print).collect();
                format!("({} {})", self.label, children_str.join(" "))
            }
        }
    }

    /// Display tree as ASCII art with box-drawing characters
    /// Output format:
    ///
    /// ```text
    /// S
    /// ├─ NP
    /// │   └─ N
    /// │       └─ holmes
    /// └─ VP
    ///     └─ V
    ///         └─ sat
    /// ```
    pub fn display(&self) -> String {
        let mut lines = Vec::new();
        self.build_display(&mut lines, String::new(), true, true);
        lines.join("\n")
    }

    fn build_display(&self, lines: &mut Vec<String>, prefix: String, is_last: bool, is_root: bool) {
        if is_root {
            lines.push(self.label.clone());
        } else {
            let connector = if is_last { "└─ " } else { "├─ " };
            lines.push(format!("{}{}{}", prefix, connector, self.label));
        }

        let child_prefix = if is_root {
            String::new()
        } else if is_last {
            format!("{}    ", prefix)
        } else {
            format!("{}│   ", prefix)
        };

        match &self.content {
            Content::Word(word) => lines.push(format!("{}└─ {}", child_prefix, word)),
            Content::Children(children) => {
                let num_children = children.len();
                for (i, child) in children.iter().enumerate() {
                    child.build_display(lines, child_prefix.clone(), i == num_children - 1, false);
                }
            }
        }
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_print())
    }
}

/// Macro for convenient tree construction
/// Usage: tree!("S", [tree!("NP", [tree!("N", "holmes")]), tree!("VP", [tree!("V", "sat")])])
#[macro_export]
macro_rules! tree {
    // Node with children
    ($label:expr, [$($child:expr),* $(,)?]) => {
        $crate::parse_tree::ParseTree::node($label, vec![$($child),*])
    };
    // Lexical leaf
    ($label:expr, $word:expr) => {
        $crate::parse_tree::ParseTree::leaf($label, $word)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holmes_sat() -> ParseTree {
        tree!(
            "S",
            [
                tree!("NP", [tree!("N", "holmes")]),
                tree!("VP", [tree!("V", "sat")])
            ]
        )
    }

    #[test]
    fn test_leaf() {
        let leaf = ParseTree::leaf("N", "door");
        assert!(leaf.is_leaf());
        assert_eq!(leaf.word(), Some("door"));
        assert!(leaf.children().is_empty());
        assert_eq!(leaf.depth(), 1);
    }

    #[test]
    fn test_tree() {
        let tree = holmes_sat();
        assert!(!tree.is_leaf());
        assert_eq!(tree.word(), None);
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.children()[0].label, "NP");
        assert_eq!(tree.children()[1].label, "VP");
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_words_and_text() {
        let tree = tree!(
            "NP",
            [tree!("Det", "the"), tree!("Adj", "red"), tree!("N", "door")]
        );
        assert_eq!(tree.words(), vec!["the", "red", "door"]);
        assert_eq!(tree.text(), "the red door");
    }

    #[test]
    fn test_pretty_print() {
        assert_eq!(
            holmes_sat().pretty_print(),
            "(S (NP (N holmes)) (VP (V sat)))"
        );
        assert_eq!(holmes_sat().to_string(), holmes_sat().pretty_print());
    }

    #[test]
    fn test_display() {
        let expected = [
            "S",
            "├─ NP",
            "│   └─ N",
            "│       └─ holmes",
            "└─ VP",
            "    └─ V",
            "        └─ sat",
        ]
        .join("\n");
        assert_eq!(holmes_sat().display(), expected);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(tree!("NP", [tree!("N", "door")])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "label": "NP",
                "content": { "children": [ { "label": "N", "content": { "word": "door" } } ] }
            })
        );
    }
}
