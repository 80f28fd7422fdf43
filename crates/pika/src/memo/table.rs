use std::collections::BTreeMap;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::grammar::{ClauseId, ClauseKind, Grammar, MatchDirection};
use crate::memo::{Match, MatchId, MemoEntry, MemoKey, UpdatedEntries};

/// The memo table for one parse: a sparse map from clause to a
/// position-ordered sub-map of [`MemoEntry`]s, plus the arena owning every
/// [`Match`] created during the parse.
///
/// A table is bound to one immutable input string at construction. Positions
/// are character indices; `input_len` is the input length in characters.
#[derive(Debug)]
pub struct MemoTable {
    source: String,
    chars: Vec<char>,
    /// Byte offset of each character position, plus the final byte length.
    char_offsets: Vec<usize>,
    /// Clause -> (start position -> entry). The inner map is ordered so the
    /// extraction queries can iterate ascending and jump to "key or next
    /// higher key".
    entries: HashMap<ClauseId, BTreeMap<usize, MemoEntry>, ahash::RandomState>,
    matches: Vec<Match>,
    num_match_objects_created: usize,
    num_match_objects_memoized: usize,
}

impl MemoTable {
    /// Create an empty table bound to `input`.
    #[must_use]
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let mut char_offsets = Vec::with_capacity(chars.len() + 1);
        let mut offset = 0;
        for c in &chars {
            char_offsets.push(offset);
            offset += c.len_utf8();
        }
        char_offsets.push(offset);
        Self {
            source: input.to_owned(),
            chars,
            char_offsets,
            entries: HashMap::with_hasher(ahash::RandomState::new()),
            matches: Vec::new(),
            num_match_objects_created: 0,
            num_match_objects_memoized: 0,
        }
    }

    /// The input this table is bound to.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.source
    }

    /// Input length in characters.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.chars.len()
    }

    pub(crate) fn chars(&self) -> &[char] {
        &self.chars
    }

    /// The match object behind an id.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this table.
    #[must_use]
    pub fn get_match(&self, id: MatchId) -> &Match {
        &self.matches[id.index()]
    }

    /// The input slice a match consumed.
    #[must_use]
    pub fn matched_text(&self, id: MatchId) -> &str {
        let m = &self.matches[id.index()];
        let start = self.char_offsets[m.key.start];
        let end = self.char_offsets[m.key.start + m.len];
        &self.source[start..end]
    }

    /// Direct entry lookup; `None` if the key was never inspected.
    #[must_use]
    pub fn entry(&self, key: MemoKey) -> Option<&MemoEntry> {
        self.entries.get(&key.clause)?.get(&key.start)
    }

    /// The memoized best match for `key`, if one has been proven.
    #[must_use]
    pub fn best_match(&self, key: MemoKey) -> Option<MatchId> {
        self.entry(key)?.best_match()
    }

    /// Whether the given clause matches the entire input from position 0.
    #[must_use]
    pub fn has_full_match(&self, clause: ClauseId) -> bool {
        self.best_match(MemoKey::new(clause, 0))
            .is_some_and(|m| self.matches[m.index()].len == self.input_len())
    }

    /// Number of match objects created (including discarded candidates).
    #[must_use]
    pub const fn num_match_objects_created(&self) -> usize {
        self.num_match_objects_created
    }

    /// Number of match objects installed as an entry's best match. Some are
    /// later superseded by better matches.
    #[must_use]
    pub const fn num_match_objects_memoized(&self) -> usize {
        self.num_match_objects_memoized
    }

    fn get_or_create_entry(&mut self, key: MemoKey) -> &mut MemoEntry {
        self.entries
            .entry(key.clause)
            .or_default()
            .entry(key.start)
            .or_insert_with(|| MemoEntry::new(key))
    }

    /// Ensure the entry for `key` exists, recording that the key was probed.
    pub(crate) fn probe(&mut self, key: MemoKey) {
        let _ = self.get_or_create_entry(key);
    }

    /// Get the current best match for `key` without recursing into subclause
    /// matching, on behalf of the clause evaluation identified by `parent`.
    ///
    /// A lookup from a different start position records `parent` in the
    /// entry's back-references, so a later improvement of this entry
    /// re-evaluates the parent; the same-position case is already covered by
    /// the static seed-parent edges.
    ///
    /// If the entry has no best match yet, two fallbacks apply, in order:
    ///
    /// - A lookahead clause (followed-by / not-followed-by) is resolved on the
    ///   spot by matching it top-down, memoizing a success. A failed lookahead
    ///   subclause is never memoized, so the entry's emptiness cannot
    ///   distinguish "will never match" from "not proven yet".
    /// - A clause that can match zero characters yields a transient zero-width
    ///   placeholder match. The placeholder is not installed in the entry; it
    ///   stands in until the fixpoint reaches this key and memoizes the
    ///   equivalent real match.
    pub fn lookup_best_match(
        &mut self,
        grammar: &Grammar,
        key: MemoKey,
        parent: MemoKey,
        updated: &mut UpdatedEntries,
    ) -> Option<MatchId> {
        let entry = self.get_or_create_entry(key);
        if parent.start != key.start {
            entry.add_back_ref(parent);
        }
        if let Some(best) = entry.best_match() {
            return Some(best);
        }

        let clause = grammar.clause(key.clause);
        match clause.kind() {
            ClauseKind::FollowedBy => {
                let sub = clause.sub_clauses()[0];
                let probe = grammar.clause(sub).match_at(
                    MatchDirection::TopDown,
                    grammar,
                    self,
                    MemoKey::new(sub, key.start),
                    updated,
                );
                probe.map(|_| self.add_non_terminal_match(key, 0, SmallVec::new(), updated))
            }
            ClauseKind::NotFollowedBy => {
                let sub = clause.sub_clauses()[0];
                let probe = grammar.clause(sub).match_at(
                    MatchDirection::TopDown,
                    grammar,
                    self,
                    MemoKey::new(sub, key.start),
                    updated,
                );
                if probe.is_none() {
                    Some(self.add_non_terminal_match(key, 0, SmallVec::new(), updated))
                } else {
                    None
                }
            }
            _ if clause.can_match_zero_chars() => {
                #[allow(clippy::cast_possible_truncation)]
                let matched_alt = clause
                    .sub_clauses()
                    .iter()
                    .position(|&sub| grammar.clause(sub).can_match_zero_chars())
                    .unwrap_or(0) as u32;
                Some(self.alloc_placeholder(key, matched_alt))
            }
            _ => None,
        }
    }

    /// Record a terminal match of `len` characters at `key`.
    pub fn add_terminal_match(
        &mut self,
        key: MemoKey,
        len: usize,
        updated: &mut UpdatedEntries,
    ) -> MatchId {
        self.add_match(key, 0, len, SmallVec::new(), updated)
    }

    /// Record a non-terminal match at `key` whose length is the sum of its
    /// children's lengths.
    pub fn add_non_terminal_match(
        &mut self,
        key: MemoKey,
        matched_alt: u32,
        sub_matches: SmallVec<[MatchId; 2]>,
        updated: &mut UpdatedEntries,
    ) -> MatchId {
        let len = sub_matches
            .iter()
            .map(|&m| self.matches[m.index()].len)
            .sum();
        self.add_match(key, matched_alt, len, sub_matches, updated)
    }

    fn add_match(
        &mut self,
        key: MemoKey,
        matched_alt: u32,
        len: usize,
        sub_matches: SmallVec<[MatchId; 2]>,
        updated: &mut UpdatedEntries,
    ) -> MatchId {
        let id = self.alloc_match(key, matched_alt, len, sub_matches);
        let arena = &self.matches;
        let entry = self
            .entries
            .entry(key.clause)
            .or_default()
            .entry(key.start)
            .or_insert_with(|| MemoEntry::new(key));
        let memoized = entry.add_new_best_match(id, arena, updated);
        if memoized {
            self.num_match_objects_memoized += 1;
        }
        id
    }

    /// Allocate a match object without touching any entry. Used by the
    /// insertion path and by top-down (unmemoized) matching.
    pub(crate) fn alloc_match(
        &mut self,
        key: MemoKey,
        matched_alt: u32,
        len: usize,
        sub_matches: SmallVec<[MatchId; 2]>,
    ) -> MatchId {
        let id = MatchId::new(self.matches.len());
        self.matches.push(Match {
            key,
            matched_alt,
            len,
            sub_matches,
        });
        self.num_match_objects_created += 1;
        id
    }

    fn alloc_placeholder(&mut self, key: MemoKey, matched_alt: u32) -> MatchId {
        let id = MatchId::new(self.matches.len());
        self.matches.push(Match {
            key,
            matched_alt,
            len: 0,
            sub_matches: SmallVec::new(),
        });
        id
    }

    /// All best matches of `clause`, greedily selected from the lowest start
    /// position so that no two returned matches overlap.
    ///
    /// After emitting a match the cursor jumps to the first entry at or beyond
    /// `start + max(1, len)`; a zero-width match still advances the cursor by
    /// one position so iteration always terminates.
    #[must_use]
    pub fn get_non_overlapping_matches(&self, clause: ClauseId) -> Vec<MatchId> {
        let Some(sub_map) = self.entries.get(&clause) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut from = 0usize;
        while let Some((&start, entry)) = sub_map.range(from..).next() {
            if let Some(best) = entry.best_match() {
                out.push(best);
                from = start + self.matches[best.index()].len.max(1);
            } else {
                from = start + 1;
            }
        }
        out
    }

    /// All best matches of `clause`, in ascending start-position order.
    #[must_use]
    pub fn get_all_matches(&self, clause: ClauseId) -> Vec<MatchId> {
        self.entries.get(&clause).map_or_else(Vec::new, |sub_map| {
            sub_map
                .values()
                .filter_map(MemoEntry::best_match)
                .collect()
        })
    }

    /// All positions where `clause` was probed but has no match, in ascending
    /// order.
    #[must_use]
    pub fn get_non_match_positions(&self, clause: ClauseId) -> Vec<usize> {
        self.entries.get(&clause).map_or_else(Vec::new, |sub_map| {
            sub_map
                .iter()
                .filter(|(_, entry)| entry.best_match().is_none())
                .map(|(&start, _)| start)
                .collect()
        })
    }
}
