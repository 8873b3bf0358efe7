// Noun phrase chunking - minimal constituents of a given label in a derivation tree

use crate::parse_tree::ParseTree;

pub const NOUN_PHRASE: &str = "NP";

/// All minimal noun phrase chunks of `tree`, in surface order.
///
/// A chunk is an `NP` subtree with no `NP` anywhere beneath it.
pub fn np_chunks(tree: &ParseTree) -> Vec<&ParseTree> {
    minimal_chunks(tree, NOUN_PHRASE)
}

/// All subtrees labelled `label` that dominate no other `label` node, left to right
pub fn minimal_chunks<'t>(tree: &'t ParseTree, label: &str) -> Vec<&'t ParseTree> {
    let mut chunks = Vec::new();
    collect(tree, label, &mut chunks);
    chunks
}

/// Whether `tree` is, or has a descendant, labelled `label`
pub fn contains_label(tree: &ParseTree, label: &str) -> bool {
    tree.label == label || tree.children().iter().any(|child| contains_label(child, label))
}

/// Single bottom-up pass: pushes the minimal chunks under `node` and reports
/// whether `node`'s subtree holds any `label` node at all.
fn collect<'t>(node: &'t ParseTree, label: &str, chunks: &mut Vec<&'t ParseTree>) -> bool {
    let mut below = false;
    for child in node.children() {
        // `|` rather than `||`: later siblings must still be visited
        below |= collect(child, label, chunks);
    }
    if node.label == label && !below {
        chunks.push(node);
    }
    below || node.label == label
}
