//! Tests for the grammars module - rule text loading, validation and lookups

use super::*;

#[test]
fn test_load_rule_text() {
    let grammar = Grammar::load(
        r#"
        S -> NP VP
        NP -> Det N | N
        VP -> V
        Det -> "the"
        N -> "door" | "holmes"
        V -> "sat"
        "#,
    )
    .expect("Failed to load grammar");

    assert_eq!(grammar.start_str(), Some("S"));
    assert_eq!(grammar.num_non_terminals(), 6);
    assert_eq!(grammar.num_terminals(), 4);
    assert_eq!(grammar.production_count(), 8);

    let np = grammar.non_terminals.get_id("NP").unwrap();
    let det = grammar.non_terminals.get_id("Det").unwrap();
    let n = grammar.non_terminals.get_id("N").unwrap();
    assert_eq!(
        grammar.alternatives_for(np),
        &[
            vec![Symbol::NonTerminal(det), Symbol::NonTerminal(n)],
            vec![Symbol::NonTerminal(n)],
        ]
    );
    assert_eq!(grammar.terminal_rules_for(n), vec!["door", "holmes"]);
    assert!(grammar.terminal_rules_for(np).is_empty());
}

#[test]
fn test_repeated_lhs_accumulates_in_order() {
    let grammar = Grammar::load(
        r#"
        S -> N
        N -> "a" | "b"
        N -> "c"
        "#,
    )
    .unwrap();

    let n = grammar.non_terminals.get_id("N").unwrap();
    assert_eq!(grammar.terminal_rules_for(n), vec!["a", "b", "c"]);
}

#[test]
fn test_comments_and_quoted_hash() {
    let grammar = Grammar::load(
        r##"
        # a tiny grammar
        S -> Sym   # trailing comment
        Sym -> "#" | "|"
        "##,
    )
    .unwrap();

    let sym = grammar.non_terminals.get_id("Sym").unwrap();
    assert_eq!(grammar.terminal_rules_for(sym), vec!["#", "|"]);
    assert_eq!(grammar.production_count(), 3);
}

#[test]
fn test_undefined_nonterminal() {
    let err = Grammar::load("S -> NP VP\nNP -> \"it\"").unwrap_err();
    match err {
        GrammarError::UndefinedNonterminal { name } => assert_eq!(name, "VP"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_rules() {
    let cases = [
        ("S NP VP", 1),
        ("S -> A |\nA -> \"a\"", 1),
        ("S -> A\nA -> \"a", 2),
        ("S -> A\nA -> \"\"", 2),
        ("1S -> A", 1),
    ];
    for (text, expected_line) in cases {
        match Grammar::load(text) {
            Err(GrammarError::MalformedRule { line, .. }) => {
                assert_eq!(line, expected_line, "wrong line for {text:?}")
            }
            other => panic!("expected malformed rule for {text:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_mixed_alternative_rejected() {
    let err = Grammar::load("S -> A \"and\" A\nA -> \"a\"").unwrap_err();
    assert!(matches!(err, GrammarError::MixedAlternative { lhs } if lhs == "S"));
}

#[test]
fn test_unary_cycle_rejected() {
    let err = Grammar::load("S -> A\nA -> B | \"a\"\nB -> A").unwrap_err();
    assert!(matches!(err, GrammarError::UnaryCycle { .. }));
}

#[test]
fn test_empty_grammar() {
    assert!(matches!(
        Grammar::load("\n  \n# nothing\n"),
        Err(GrammarError::Empty)
    ));
}

#[test]
fn test_with_start() {
    let grammar = Grammar::load("S -> NP\nNP -> \"it\"").unwrap();
    let grammar = grammar.with_start("NP").unwrap();
    assert_eq!(grammar.start_str(), Some("NP"));
    assert!(matches!(
        grammar.with_start("VP"),
        Err(GrammarError::UnknownStart { .. })
    ));
}

#[test]
fn test_lexical_categories() {
    let grammar = Grammar::load(
        r#"
        S -> N V
        N -> "walk" | "dog"
        V -> "walk"
        "#,
    )
    .unwrap();

    let n = grammar.non_terminals.get_id("N").unwrap();
    let v = grammar.non_terminals.get_id("V").unwrap();
    assert_eq!(grammar.lexical_categories("walk"), &[n, v]);
    assert_eq!(grammar.lexical_categories("dog"), &[n]);
    assert!(grammar.lexical_categories("cat").is_empty());
    assert!(grammar.knows_word("dog"));
    assert!(!grammar.knows_word("cat"));
}

#[test]
fn test_json_grammar() {
    let json = r#"{
        "name": "tiny",
        "start": "S",
        "rules": {
            "S": [["NP", "VP"]],
            "NP": [["\"holmes\""]],
            "VP": [["\"sat\""], ["\"smiled\""]]
        }
    }"#;

    let grammar = Grammar::from_json(json).expect("Failed to load grammar");
    assert_eq!(grammar.name, "tiny");
    assert_eq!(grammar.start_str(), Some("S"));
    let vp = grammar.non_terminals.get_id("VP").unwrap();
    assert_eq!(grammar.terminal_rules_for(vp), vec!["sat", "smiled"]);
}

#[test]
fn test_json_grammar_validation() {
    let json = r#"{ "start": "S", "rules": { "S": [["NP"]] } }"#;
    assert!(matches!(
        Grammar::from_json(json),
        Err(GrammarError::UndefinedNonterminal { .. })
    ));
    assert!(matches!(
        Grammar::from_json("{ \"rules\": 3 }"),
        Err(GrammarError::Json(_))
    ));
}

#[test]
fn test_display_reloads_to_same_grammar() {
    let grammar = english_grammar().unwrap();
    let reloaded = Grammar::load(&grammar.to_string()).unwrap();

    assert_eq!(reloaded.start_str(), Some("S"));
    assert_eq!(reloaded.production_count(), grammar.production_count());
    assert_eq!(reloaded.num_terminals(), grammar.num_terminals());
    for (id, name) in grammar.non_terminals.iter() {
        let other = reloaded.non_terminals.get_id(name).unwrap();
        assert_eq!(
            reloaded.terminal_rules_for(other),
            grammar.terminal_rules_for(id)
        );
        assert_eq!(
            reloaded.alternatives_for(other).len(),
            grammar.alternatives_for(id).len()
        );
    }
}

#[test]
fn test_english_grammar() {
    let grammar = english_grammar().unwrap();
    assert_eq!(grammar.start_str(), Some("S"));
    assert_eq!(grammar.num_non_terminals(), 11);

    let n = grammar.non_terminals.get_id("N").unwrap();
    assert_eq!(grammar.terminal_rules_for(n).len(), 20);
    assert!(grammar.knows_word("holmes"));
    assert!(!grammar.knows_word("zzz"));
}

#[test]
fn test_load_grammar_from_missing_file() {
    let err = load_grammar_from_file("does/not/exist.cfg").unwrap_err();
    assert!(matches!(err, GrammarError::Io { .. }));
}
