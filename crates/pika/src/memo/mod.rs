//! # Memoization Module
//!
//! The memo table and its constituents: keys, matches, and entries.
//!
//! ## Overview
//!
//! Bottom-up parsing is driven entirely through this module. A [`MemoTable`]
//! is bound to one immutable input string and stores, for each
//! `(clause, start position)` pair (a [`MemoKey`]), a mutable [`MemoEntry`]
//! whose best [`Match`] only ever improves under the left-biased PEG ordering.
//! Match objects live in an arena owned by the table and reference their
//! children by [`MatchId`], so replacing an entry's best match is a single
//! index write and match trees never form ownership cycles.
//!
//! The table is also the query surface once the fixpoint completes:
//! [`MemoTable::get_non_overlapping_matches`], [`MemoTable::get_all_matches`],
//! and [`MemoTable::get_non_match_positions`].

pub mod entry;
pub mod table;

pub use entry::{MemoEntry, UpdatedEntries};
pub use table::MemoTable;

use smallvec::SmallVec;

use crate::grammar::ClauseId;

/// The `(clause, start position)` pair identifying one memo cell.
///
/// `start` ranges over `0..=input_len` in characters. Keys are plain values;
/// they order by clause id first, then position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoKey {
    pub clause: ClauseId,
    pub start: usize,
}

impl MemoKey {
    #[must_use]
    pub const fn new(clause: ClauseId, start: usize) -> Self {
        Self { clause, start }
    }
}

/// Index of a [`Match`] in its table's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchId(u32);

impl MatchId {
    pub(crate) fn new(index: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(index as u32)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An immutable record of one successful match.
///
/// Constructed only by the table's insertion calls (and the transient
/// zero-width placeholder path in lookup); never mutated afterward.
#[derive(Debug, Clone)]
pub struct Match {
    pub(crate) key: MemoKey,
    pub(crate) matched_alt: u32,
    pub(crate) len: usize,
    pub(crate) sub_matches: SmallVec<[MatchId; 2]>,
}

impl Match {
    /// The memo key this match resolves.
    #[must_use]
    pub const fn key(&self) -> MemoKey {
        self.key
    }

    /// Start position, in characters.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.key.start
    }

    /// Characters consumed.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// For ordered-choice and longest-match clauses, the index of the
    /// alternative that produced this match; 0 for every other kind.
    #[must_use]
    pub const fn matched_alt(&self) -> u32 {
        self.matched_alt
    }

    /// Child matches, in subclause order. Empty for terminal and zero-width
    /// matches.
    #[must_use]
    pub fn sub_matches(&self) -> &[MatchId] {
        &self.sub_matches
    }

    /// The left-biased PEG ordering on matches resolving the same key:
    /// strictly longer wins; on equal length, the smaller alternative index
    /// wins; otherwise the incumbent is kept.
    #[must_use]
    pub(crate) fn is_better_than(&self, other: &Self) -> bool {
        debug_assert_eq!(self.key, other.key);
        self.len > other.len || (self.len == other.len && self.matched_alt < other.matched_alt)
    }
}
