pub mod chunks;
pub mod grammars;
pub mod parse_tree;
pub mod parsers;
pub mod tokenize;
