//! # Grammar Module
//!
//! Clause graph definition and construction.
//!
//! ## Overview
//!
//! A grammar is a frozen graph of [`Clause`]s, one node per PEG operator, with
//! named [`Rule`] bindings on toplevel clauses. Grammars are built from
//! [`Expr`] trees via [`GrammarBuilder`] and are immutable once built: the
//! builder runs the analysis passes (`can_match_zero_chars`, seed-parent
//! installation) that the bottom-up parser depends on, so a [`Grammar`] handed
//! to the parser is always fully analyzed.
//!
//! ## Usage
//!
//! ```rust
//! use pika::grammar::{CharSet, Expr, GrammarBuilder};
//!
//! let grammar = GrammarBuilder::new()
//!     .entry_point("Ident")
//!     .rule(
//!         "Ident",
//!         Expr::seq([
//!             Expr::char_set(CharSet::letters()),
//!             Expr::star(Expr::char_set(CharSet::letters())),
//!         ]),
//!     )
//!     .build()?;
//!
//! assert!(grammar.rule_clause("Ident").is_some());
//! # Ok::<(), pika::grammar::GrammarError>(())
//! ```
//!
//! Left recursion is permitted; cyclic rule references are resolved during
//! construction and handled by the parser's fixpoint, not rejected here.

mod analysis;
pub mod builder;
pub mod clause;
pub mod expr;

pub use builder::{Grammar, GrammarBuilder, GrammarError, Rule, RuleId};
pub use clause::{CharSet, Clause, ClauseId, ClauseKind, MatchDirection, Terminal};
pub use expr::Expr;
