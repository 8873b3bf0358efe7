// Sentence tokenizer - splits raw text into lower-cased words for the parser

use once_cell::sync::Lazy;
use regex::Regex;

/// Words (hyphenated compounds stay whole), clitics such as `'s`, and runs of punctuation
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+(?:-\w+)*|'\w+|[^\w\s]+").expect("token pattern is valid")
});

/// Split `raw` on word boundaries, lower-case every token and drop tokens
/// without an alphabetic character (punctuation, bare numbers).
pub fn tokenize(raw: &str) -> Vec<String> {
    TOKEN
        .find_iter(raw)
        .map(|m| m.as_str().to_lowercase())
        .filter(|token| token.chars().any(char::is_alphabetic))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_and_punctuation() {
        assert_eq!(
            tokenize("Holmes sat in the red armchair."),
            vec!["holmes", "sat", "in", "the", "red", "armchair"]
        );
    }

    #[test]
    fn test_clitics_and_numbers() {
        assert_eq!(
            tokenize("Holmes's pipe, 221 times!"),
            vec!["holmes", "'s", "pipe", "times"]
        );
    }

    #[test]
    fn test_hyphenated_word() {
        assert_eq!(tokenize("A well-worn door"), vec!["a", "well-worn", "door"]);
    }

    #[test]
    fn test_blank_input() {
        assert!(tokenize("  ...  \n").is_empty());
    }
}
