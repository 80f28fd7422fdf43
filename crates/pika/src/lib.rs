//! # Pika
//!
//! A bottom-up, memoizing PEG parser.
//!
//! ## Overview
//!
//! Conventional PEG parsers work top-down with backtracking. This crate
//! inverts that: clauses are evaluated **bottom-up** over a memo table, seeded
//! from terminal matches and propagated upward along precomputed grammar
//! edges until a fixpoint is reached. The inversion buys three things:
//!
//! - **Left recursion works natively**: cycles in the grammar graph are
//!   resolved by the monotonic fixpoint, not by traversal.
//! - **Every position is memoized exhaustively**, so after a parse the table
//!   can answer where each clause matched *and* where it was tried and
//!   failed.
//! - **Matching never fails as a whole**: parsing is a total function from
//!   (grammar, input) to a memo table.
//!
//! ## Quick Start
//!
//! ```rust
//! use pika::grammar::{CharSet, Expr, GrammarBuilder};
//! use pika::parser::ParseDriver;
//!
//! // Sum <- Digits ('+' Digits)*
//! // Digits <- [0-9]+
//! let grammar = GrammarBuilder::new()
//!     .entry_point("Sum")
//!     .rule(
//!         "Sum",
//!         Expr::seq([
//!             Expr::ref_("Digits"),
//!             Expr::star(Expr::seq([Expr::lit("+"), Expr::ref_("Digits")])),
//!         ]),
//!     )
//!     .rule("Digits", Expr::plus(Expr::char_set(CharSet::digits())))
//!     .build()
//!     .expect("grammar should build");
//!
//! let driver = ParseDriver::new(&grammar);
//! let result = driver.parse("1+23+4");
//!
//! let table = &result.memo_table;
//! let sums = table.get_non_overlapping_matches(grammar.entry_clause());
//! assert_eq!(sums.len(), 1);
//! assert_eq!(table.get_match(sums[0]).len(), 6);
//! assert_eq!(table.matched_text(sums[0]), "1+23+4");
//! ```
//!
//! ## Modules
//!
//! - [`grammar`] - Clause graph definition, expression builder, analysis
//! - [`memo`] - Memo table, keys, entries, matches, extraction queries
//! - [`parser`] - Fixpoint driver, metrics, events, batch parsing
//! - [`testing`] - Deterministic input generation for tests

pub mod grammar;
pub mod memo;
pub mod parser;
pub mod testing;

// Re-export commonly used types
pub use grammar::{
    CharSet, Clause, ClauseId, ClauseKind, Expr, Grammar, GrammarBuilder, GrammarError,
    MatchDirection, Rule, RuleId, Terminal,
};
pub use memo::{Match, MatchId, MemoEntry, MemoKey, MemoTable, UpdatedEntries};
pub use parser::{
    DriverConfig, NullEventHandler, ParseDriver, ParseEvent, ParseEventHandler, ParseMetrics,
    ParseResult,
};
