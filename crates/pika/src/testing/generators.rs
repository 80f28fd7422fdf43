//! # Input Generators
//!
//! Walk a grammar's clause graph to produce inputs that the grammar should
//! match. Generation is driven by a seeded xorshift RNG, so a fixed seed
//! reproduces the same input.
//!
//! Lookahead predicates emit nothing and recursion is depth-limited, so for
//! grammars using those features a generated input is not guaranteed to be
//! fully matched; property tests pair this generator with predicate-free,
//! depth-bounded grammars.

use crate::grammar::{ClauseId, ClauseKind, Grammar, Terminal};

/// Configuration for grammar-directed input generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum depth of recursive clause expansion.
    pub max_depth: usize,
    /// Maximum number of repetitions for one-or-more clauses.
    pub max_repetitions: usize,
    /// Probability of taking optional clauses (0.0 to 1.0).
    pub optional_probability: f64,
    /// Seed for reproducible generation.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_repetitions: 5,
            optional_probability: 0.5,
            seed: None,
        }
    }
}

/// Generator for inputs a grammar should match.
pub struct InputGenerator<'g> {
    grammar: &'g Grammar,
    config: GeneratorConfig,
}

impl<'g> InputGenerator<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar, config: GeneratorConfig) -> Self {
        Self { grammar, config }
    }

    /// Generate an input string starting from the given clause.
    #[must_use]
    pub fn generate(&self, start: ClauseId) -> String {
        let mut rng = match self.config.seed {
            Some(seed) => SimpleRng::with_seed(seed),
            None => SimpleRng::new(),
        };
        let mut out = String::new();
        self.generate_clause(start, 0, &mut out, &mut rng);
        out
    }

    fn generate_clause(&self, id: ClauseId, depth: usize, out: &mut String, rng: &mut SimpleRng) {
        if depth > self.config.max_depth {
            return;
        }
        let clause = self.grammar.clause(id);
        match clause.kind() {
            ClauseKind::Terminal(terminal) => self.generate_terminal(terminal, out, rng),
            ClauseKind::Seq => {
                for &sub in clause.sub_clauses() {
                    self.generate_clause(sub, depth + 1, out, rng);
                }
            }
            ClauseKind::First | ClauseKind::Longest => {
                let subs = clause.sub_clauses();
                let pick = rng.next_u64() as usize % subs.len();
                self.generate_clause(subs[pick], depth + 1, out, rng);
            }
            ClauseKind::Opt => {
                if rng.next_f64() < self.config.optional_probability {
                    self.generate_clause(clause.sub_clauses()[0], depth + 1, out, rng);
                }
            }
            ClauseKind::OneOrMore => {
                let reps = 1 + rng.next_u64() as usize % self.config.max_repetitions;
                for _ in 0..reps {
                    self.generate_clause(clause.sub_clauses()[0], depth + 1, out, rng);
                }
            }
            // Zero-width predicates consume nothing.
            ClauseKind::FollowedBy | ClauseKind::NotFollowedBy => {}
        }
    }

    fn generate_terminal(&self, terminal: &Terminal, out: &mut String, rng: &mut SimpleRng) {
        match terminal {
            Terminal::Literal(text) => out.push_str(text),
            Terminal::CharSet(set) => {
                if set.is_negated() || set.ranges().is_empty() {
                    // Scan a small alphabet for any matching character.
                    if let Some(c) = ('a'..='z').chain('0'..='9').find(|&c| set.matches(c)) {
                        out.push(c);
                    }
                } else {
                    let ranges = set.ranges();
                    let (start, end) = ranges[rng.next_u64() as usize % ranges.len()];
                    let span = end as u32 - start as u32 + 1;
                    let offset = (rng.next_u64() % u64::from(span)) as u32;
                    out.push(char::from_u32(start as u32 + offset).unwrap_or(start));
                }
            }
            Terminal::Any => {
                let offset = (rng.next_u64() % 26) as u32;
                out.push(char::from_u32('a' as u32 + offset).unwrap_or('a'));
            }
        }
    }
}

/// Simple RNG for deterministic testing.
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new() -> Self {
        Self {
            state: 0x853c_49e6_748f_ea9b,
        }
    }

    fn with_seed(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        // XorShift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    #[allow(clippy::cast_precision_loss)]
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{CharSet, Expr, GrammarBuilder};

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = SimpleRng::with_seed(12345);
        let mut rng2 = SimpleRng::with_seed(12345);
        assert_eq!(rng1.next_u64(), rng2.next_u64());
        assert_eq!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let grammar = GrammarBuilder::new()
            .entry_point("S")
            .rule("S", Expr::plus(Expr::char_set(CharSet::digits())))
            .build()
            .unwrap();
        let config = GeneratorConfig {
            seed: Some(7),
            ..GeneratorConfig::default()
        };
        let generator = InputGenerator::new(&grammar, config);
        let a = generator.generate(grammar.entry_clause());
        let b = generator.generate(grammar.entry_clause());
        assert_eq!(a, b);
        assert!(!a.is_empty());
        assert!(a.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generated_literal_sequence() {
        let grammar = GrammarBuilder::new()
            .entry_point("S")
            .rule("S", Expr::seq([Expr::lit("ab"), Expr::lit("c")]))
            .build()
            .unwrap();
        let generator = InputGenerator::new(&grammar, GeneratorConfig::default());
        assert_eq!(generator.generate(grammar.entry_clause()), "abc");
    }
}
