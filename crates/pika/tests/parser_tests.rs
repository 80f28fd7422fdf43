//! End-to-end tests for the bottom-up fixpoint parser.

use pika::grammar::{CharSet, Expr, Grammar, GrammarBuilder};
use pika::memo::MemoKey;
use pika::parser::ParseDriver;

fn parse(grammar: &Grammar, input: &str) -> pika::parser::ParseResult {
    ParseDriver::new(grammar).parse(input)
}

#[test]
fn test_star_matches_whole_input() {
    // S <- 'a'*
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule("S", Expr::star(Expr::lit("a")))
        .build()
        .unwrap();
    assert!(grammar.clause(grammar.entry_clause()).can_match_zero_chars());

    let result = parse(&grammar, "aaa");
    let table = &result.memo_table;
    let matches = table.get_non_overlapping_matches(grammar.entry_clause());
    assert_eq!(matches.len(), 1);
    let m = table.get_match(matches[0]);
    assert_eq!(m.start(), 0);
    assert_eq!(m.len(), 3);
}

#[test]
fn test_ordered_choice_is_left_biased() {
    // S <- 'a' / 'ab'
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule("S", Expr::first([Expr::lit("a"), Expr::lit("ab")]))
        .build()
        .unwrap();

    let result = parse(&grammar, "ab");
    let table = &result.memo_table;
    let best = table
        .best_match(MemoKey::new(grammar.entry_clause(), 0))
        .expect("choice should match at 0");
    let m = table.get_match(best);
    assert_eq!(m.len(), 1);
    assert_eq!(m.matched_alt(), 0);
}

#[test]
fn test_longest_choice_prefers_longer_alternative() {
    // S <- 'a' | 'ab'
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule("S", Expr::longest([Expr::lit("a"), Expr::lit("ab")]))
        .build()
        .unwrap();

    let result = parse(&grammar, "ab");
    let table = &result.memo_table;
    let best = table
        .best_match(MemoKey::new(grammar.entry_clause(), 0))
        .expect("longest should match at 0");
    let m = table.get_match(best);
    assert_eq!(m.len(), 2);
    assert_eq!(m.matched_alt(), 1);
}

#[test]
fn test_left_recursion_terminates_and_spans_input() {
    // E <- E '+' E / [0-9]
    let grammar = GrammarBuilder::new()
        .entry_point("E")
        .rule(
            "E",
            Expr::first([
                Expr::seq([Expr::ref_("E"), Expr::lit("+"), Expr::ref_("E")]),
                Expr::char_set(CharSet::digits()),
            ]),
        )
        .build()
        .unwrap();

    let result = parse(&grammar, "1+2+3");
    let table = &result.memo_table;
    let best = table
        .best_match(MemoKey::new(grammar.entry_clause(), 0))
        .expect("left-recursive rule should match");
    let top = table.get_match(best);
    assert_eq!(top.len(), 5);
    assert_eq!(top.matched_alt(), 0);

    // The choice ordering makes shorter spans propagate first, so the stored
    // structure is left-associated: (1+2)+3.
    let seq = table.get_match(top.sub_matches()[0]);
    assert_eq!(seq.sub_matches().len(), 3);
    let left = table.get_match(seq.sub_matches()[0]);
    let right = table.get_match(seq.sub_matches()[2]);
    assert_eq!((left.start(), left.len()), (0, 3));
    assert_eq!((right.start(), right.len()), (4, 1));
    assert_eq!(table.matched_text(seq.sub_matches()[0]), "1+2");
}

#[test]
fn test_negative_lookahead() {
    // S <- !'x' .
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule(
            "S",
            Expr::seq([Expr::not_followed_by(Expr::lit("x")), Expr::any()]),
        )
        .build()
        .unwrap();
    let s = grammar.entry_clause();

    let accepted = parse(&grammar, "y");
    let m = accepted
        .memo_table
        .best_match(MemoKey::new(s, 0))
        .expect("'y' should match");
    assert_eq!(accepted.memo_table.get_match(m).len(), 1);

    let rejected = parse(&grammar, "x");
    assert!(rejected.memo_table.best_match(MemoKey::new(s, 0)).is_none());
    assert!(rejected.memo_table.get_non_match_positions(s).contains(&0));
}

#[test]
fn test_positive_lookahead_is_zero_width() {
    // S <- &'ab' .
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule("S", Expr::seq([Expr::followed_by(Expr::lit("ab")), Expr::any()]))
        .build()
        .unwrap();
    let s = grammar.entry_clause();

    let accepted = parse(&grammar, "ab");
    let m = accepted
        .memo_table
        .best_match(MemoKey::new(s, 0))
        .expect("lookahead should hold at 0");
    // The guarded any-char consumes one character; the lookahead none.
    assert_eq!(accepted.memo_table.get_match(m).len(), 1);

    let rejected = parse(&grammar, "ba");
    assert!(rejected.memo_table.best_match(MemoKey::new(s, 0)).is_none());
}

#[test]
fn test_optional_on_empty_input() {
    // S <- 'a'?
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule("S", Expr::opt(Expr::lit("a")))
        .build()
        .unwrap();
    let s = grammar.entry_clause();
    assert!(grammar.clause(s).can_match_zero_chars());

    let result = parse(&grammar, "");
    let best = result
        .memo_table
        .best_match(MemoKey::new(s, 0))
        .expect("nullable toplevel should match the empty input");
    assert_eq!(result.memo_table.get_match(best).len(), 0);
}

#[test]
fn test_right_recursion_through_back_refs() {
    // S <- 'a' S / 'b'
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule(
            "S",
            Expr::first([
                Expr::seq([Expr::lit("a"), Expr::ref_("S")]),
                Expr::lit("b"),
            ]),
        )
        .build()
        .unwrap();

    let result = parse(&grammar, "aab");
    let table = &result.memo_table;
    let best = table
        .best_match(MemoKey::new(grammar.entry_clause(), 0))
        .expect("right recursion should match");
    assert_eq!(table.get_match(best).len(), 3);
    assert_eq!(table.matched_text(best), "aab");
}

#[test]
fn test_terminal_non_match_positions() {
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule("S", Expr::star(Expr::lit("a")))
        .build()
        .unwrap();
    let a = grammar
        .terminal_clauses()
        .iter()
        .copied()
        .find(|&t| grammar.clause(t).is_terminal())
        .unwrap();

    let result = parse(&grammar, "aba");
    let table = &result.memo_table;
    let matched: Vec<usize> = table
        .get_all_matches(a)
        .into_iter()
        .map(|m| table.get_match(m).start())
        .collect();
    assert_eq!(matched, vec![0, 2]);
    assert_eq!(table.get_non_match_positions(a), vec![1]);
}

#[test]
fn test_non_ascii_input_positions_are_characters() {
    // S <- . .
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule("S", Expr::seq([Expr::any(), Expr::any()]))
        .build()
        .unwrap();

    let result = parse(&grammar, "héllo");
    let table = &result.memo_table;
    let best = table
        .best_match(MemoKey::new(grammar.entry_clause(), 0))
        .unwrap();
    assert_eq!(table.get_match(best).len(), 2);
    assert_eq!(table.matched_text(best), "hé");
}

#[test]
fn test_unmatched_input_produces_no_entry_point_match() {
    let grammar = GrammarBuilder::new()
        .entry_point("S")
        .rule("S", Expr::plus(Expr::char_set(CharSet::digits())))
        .build()
        .unwrap();
    let result = parse(&grammar, "abc");
    assert!(
        result
            .memo_table
            .get_all_matches(grammar.entry_clause())
            .is_empty()
    );
    assert!(!result.memo_table.has_full_match(grammar.entry_clause()));
}

#[test]
fn test_letters_and_digits_interleaved() {
    // Word <- [A-Za-z]+ / [0-9]+
    let grammar = GrammarBuilder::new()
        .entry_point("Word")
        .rule(
            "Word",
            Expr::first([
                Expr::plus(Expr::char_set(CharSet::letters())),
                Expr::plus(Expr::char_set(CharSet::digits())),
            ]),
        )
        .build()
        .unwrap();

    let result = parse(&grammar, "ab12cd");
    let table = &result.memo_table;
    let words: Vec<&str> = table
        .get_non_overlapping_matches(grammar.entry_clause())
        .into_iter()
        .map(|m| table.matched_text(m))
        .collect();
    assert_eq!(words, vec!["ab", "12", "cd"]);
}
