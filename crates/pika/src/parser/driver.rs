//! # Bottom-Up Parse Driver
//!
//! Runs the pika fixpoint: seed the memo table from terminal matches, then
//! propagate dirtiness upward along seed-parent and back-reference edges until
//! no entry improves.
//!
//! The merge rule on memo entries is monotonic, so the fixpoint is reached in
//! finitely many rounds and its content does not depend on evaluation order.
//! The driver still evaluates each round in sorted key order so that the
//! *structure* of stored matches (which of two equal-quality candidates
//! arrived first) is reproducible run to run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::grammar::{Grammar, MatchDirection};
use crate::memo::{MemoKey, MemoTable, UpdatedEntries};

/// Configuration for the parse driver.
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    /// Stop after this many clause evaluations, leaving a partial fixpoint.
    pub max_evaluations: Option<usize>,
    /// Cooperative cancellation flag, checked between evaluations. A parse
    /// aborted this way still yields an internally consistent table: every
    /// stored match is a true match, absent matches are merely unproven.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Statistics collected while running the fixpoint.
#[derive(Debug, Clone, Default)]
pub struct ParseMetrics {
    /// Wall-clock time for the whole parse.
    pub parse_time: Duration,
    /// Number of propagation rounds until the fixpoint (or interruption).
    pub rounds: usize,
    /// Number of clause evaluations, seeding included.
    pub evaluations: usize,
    /// Match objects created, from the table's counter.
    pub match_objects_created: usize,
    /// Match objects installed as an entry's best match.
    pub match_objects_memoized: usize,
    /// Whether the parse stopped before reaching the fixpoint.
    pub interrupted: bool,
}

/// A completed (or interrupted) parse: the memo table plus metrics.
#[derive(Debug)]
pub struct ParseResult {
    pub memo_table: MemoTable,
    pub metrics: ParseMetrics,
}

/// A parsing event, for debugging and tracing.
#[derive(Debug, Clone, Copy)]
pub enum ParseEvent {
    /// Seeding finished; `updated` entries changed.
    SeedingComplete { updated: usize },
    /// A propagation round is about to evaluate `scheduled` parent keys.
    RoundStarted { round: usize, scheduled: usize },
    /// A clause was evaluated at a key.
    ClauseEvaluated { key: MemoKey, matched: bool },
    /// The fixpoint was reached.
    ParseComplete { rounds: usize, evaluations: usize },
    /// The parse stopped early (cancellation or evaluation budget).
    ParseInterrupted { evaluations: usize },
}

/// Trait for receiving parse events.
pub trait ParseEventHandler {
    fn handle(&mut self, event: ParseEvent);
}

/// A no-op event handler.
pub struct NullEventHandler;

impl ParseEventHandler for NullEventHandler {
    fn handle(&mut self, _event: ParseEvent) {}
}

/// Owns the fixpoint loop for one grammar.
///
/// The driver borrows a frozen [`Grammar`] and can be reused to parse any
/// number of inputs; each parse gets its own [`MemoTable`].
pub struct ParseDriver<'g> {
    grammar: &'g Grammar,
    config: DriverConfig,
}

impl<'g> ParseDriver<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            config: DriverConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(grammar: &'g Grammar, config: DriverConfig) -> Self {
        Self { grammar, config }
    }

    #[must_use]
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Parse `input`, running the fixpoint to completion.
    #[must_use]
    pub fn parse(&self, input: &str) -> ParseResult {
        self.parse_with_handler(input, &mut NullEventHandler)
    }

    /// Parse `input`, reporting progress to `handler`.
    #[must_use]
    pub fn parse_with_handler(
        &self,
        input: &str,
        handler: &mut dyn ParseEventHandler,
    ) -> ParseResult {
        let started = Instant::now();
        let grammar = self.grammar;
        let mut table = MemoTable::new(input);
        let mut updated = UpdatedEntries::new();
        let mut metrics = ParseMetrics::default();
        let input_len = table.input_len();

        // Seed: match every terminal at every character position. Probing
        // first records the position even when the terminal does not match.
        for &terminal in grammar.terminal_clauses() {
            for start in 0..input_len {
                let key = MemoKey::new(terminal, start);
                table.probe(key);
                let _ = grammar.clause(terminal).match_at(
                    MatchDirection::BottomUp,
                    grammar,
                    &mut table,
                    key,
                    &mut updated,
                );
                metrics.evaluations += 1;
            }
        }
        // Clauses that can match zero characters match wherever a character
        // could start, including position 0 of the empty input. Intermediate
        // zero-width results are monotonically improved by propagation.
        for &clause in grammar.zero_char_clauses() {
            for start in 0..input_len.max(1) {
                let key = MemoKey::new(clause, start);
                table.probe(key);
                let _ = grammar.clause(clause).match_at(
                    MatchDirection::BottomUp,
                    grammar,
                    &mut table,
                    key,
                    &mut updated,
                );
                metrics.evaluations += 1;
            }
        }
        handler.handle(ParseEvent::SeedingComplete {
            updated: updated.len(),
        });

        // Propagate: drain the frontier, re-evaluate every affected parent,
        // repeat until nothing improves.
        'fixpoint: while !updated.is_empty() {
            metrics.rounds += 1;
            let frontier = updated.drain_sorted();
            let mut scheduled: Vec<MemoKey> = Vec::new();
            for key in &frontier {
                let clause = grammar.clause(key.clause);
                for &parent in clause.seed_parent_clauses() {
                    scheduled.push(MemoKey::new(parent, key.start));
                }
                if let Some(entry) = table.entry(*key) {
                    scheduled.extend(entry.back_refs());
                }
            }
            scheduled.sort_unstable();
            scheduled.dedup();
            handler.handle(ParseEvent::RoundStarted {
                round: metrics.rounds,
                scheduled: scheduled.len(),
            });

            for key in scheduled {
                if self.should_stop(metrics.evaluations) {
                    metrics.interrupted = true;
                    handler.handle(ParseEvent::ParseInterrupted {
                        evaluations: metrics.evaluations,
                    });
                    break 'fixpoint;
                }
                table.probe(key);
                let matched = grammar
                    .clause(key.clause)
                    .match_at(
                        MatchDirection::BottomUp,
                        grammar,
                        &mut table,
                        key,
                        &mut updated,
                    )
                    .is_some();
                metrics.evaluations += 1;
                handler.handle(ParseEvent::ClauseEvaluated { key, matched });
            }
        }

        if !metrics.interrupted {
            handler.handle(ParseEvent::ParseComplete {
                rounds: metrics.rounds,
                evaluations: metrics.evaluations,
            });
        }
        metrics.match_objects_created = table.num_match_objects_created();
        metrics.match_objects_memoized = table.num_match_objects_memoized();
        metrics.parse_time = started.elapsed();
        ParseResult {
            memo_table: table,
            metrics,
        }
    }

    fn should_stop(&self, evaluations: usize) -> bool {
        if self
            .config
            .max_evaluations
            .is_some_and(|max| evaluations >= max)
        {
            return true;
        }
        self.config
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
