//! # Parallel Batch Parsing
//!
//! Parse many inputs against one shared grammar. Each input gets its own memo
//! table, so inputs are embarrassingly parallel; with the `parallel` feature
//! the batch is spread across rayon workers, otherwise it runs sequentially
//! with the same API.

use std::time::Duration;

use crate::parser::{ParseDriver, ParseResult};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A batch of inputs to parse: `(input id, text)` pairs.
#[derive(Debug, Clone, Default)]
pub struct ParseBatch {
    inputs: Vec<(String, String)>,
}

impl ParseBatch {
    #[must_use]
    pub fn new() -> Self {
        Self { inputs: Vec::new() }
    }

    pub fn add(&mut self, input_id: impl Into<String>, text: impl Into<String>) {
        self.inputs.push((input_id.into(), text.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Result of parsing a single batch input.
#[derive(Debug)]
pub struct BatchItemResult {
    /// The input identifier from the batch.
    pub input_id: String,
    /// Whether the entry-point clause matched the whole input.
    pub matched: bool,
    /// The full parse result, memo table included.
    pub result: ParseResult,
}

/// Summary of a parsed batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub total_inputs: usize,
    /// Inputs fully matched by the entry-point clause.
    pub matched: usize,
    pub unmatched: usize,
    pub total_parse_time: Duration,
    pub avg_parse_time: Duration,
}

impl BatchSummary {
    /// Fraction of inputs fully matched, as a percentage.
    #[must_use]
    pub fn match_rate(&self) -> f64 {
        if self.total_inputs == 0 {
            100.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                (self.matched as f64 / self.total_inputs as f64) * 100.0
            }
        }
    }
}

/// Aggregate per-input results into a [`BatchSummary`].
#[must_use]
pub fn summarize(results: &[BatchItemResult]) -> BatchSummary {
    let total_inputs = results.len();
    let matched = results.iter().filter(|r| r.matched).count();
    let total_parse_time: Duration = results.iter().map(|r| r.result.metrics.parse_time).sum();
    let avg_parse_time = if total_inputs > 0 {
        #[allow(clippy::cast_possible_truncation)]
        {
            total_parse_time / total_inputs as u32
        }
    } else {
        Duration::ZERO
    };
    BatchSummary {
        total_inputs,
        matched,
        unmatched: total_inputs - matched,
        total_parse_time,
        avg_parse_time,
    }
}

impl ParseDriver<'_> {
    /// Parse every input in the batch, in parallel.
    #[cfg(feature = "parallel")]
    #[must_use]
    pub fn parse_batch(&self, batch: &ParseBatch) -> Vec<BatchItemResult> {
        batch
            .inputs
            .par_iter()
            .map(|(input_id, text)| self.parse_batch_item(input_id, text))
            .collect()
    }

    /// Sequential fallback when the `parallel` feature is disabled.
    #[cfg(not(feature = "parallel"))]
    #[must_use]
    pub fn parse_batch(&self, batch: &ParseBatch) -> Vec<BatchItemResult> {
        batch
            .inputs
            .iter()
            .map(|(input_id, text)| self.parse_batch_item(input_id, text))
            .collect()
    }

    fn parse_batch_item(&self, input_id: &str, text: &str) -> BatchItemResult {
        let result = self.parse(text);
        let matched = result.memo_table.has_full_match(self.grammar().entry_clause());
        BatchItemResult {
            input_id: input_id.to_owned(),
            matched,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expr, GrammarBuilder};

    #[test]
    fn test_batch_add_and_len() {
        let mut batch = ParseBatch::new();
        assert!(batch.is_empty());
        batch.add("one", "aa");
        batch.add("two", "ab");
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_batch_parse_and_summary() {
        let grammar = GrammarBuilder::new()
            .entry_point("S")
            .rule("S", Expr::plus(Expr::lit("a")))
            .build()
            .unwrap();
        let driver = ParseDriver::new(&grammar);

        let mut batch = ParseBatch::new();
        batch.add("good", "aaa");
        batch.add("bad", "ab");
        let results = driver.parse_batch(&batch);

        assert_eq!(results.len(), 2);
        let good = results.iter().find(|r| r.input_id == "good").unwrap();
        let bad = results.iter().find(|r| r.input_id == "bad").unwrap();
        assert!(good.matched);
        assert!(!bad.matched);

        let summary = summarize(&results);
        assert_eq!(summary.total_inputs, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.unmatched, 1);
        assert!((summary.match_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_batch_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_inputs, 0);
        assert!((summary.match_rate() - 100.0).abs() < f64::EPSILON);
    }
}
