use smallvec::SmallVec;

use crate::grammar::{Grammar, RuleId};
use crate::memo::{MatchId, MemoKey, MemoTable, UpdatedEntries};

/// Identity of a clause within its grammar's clause arena.
///
/// Clause ids are assigned by [`GrammarBuilder::build`](crate::grammar::GrammarBuilder::build)
/// and are only meaningful together with the grammar that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClauseId(u32);

impl ClauseId {
    pub(crate) fn new(index: usize) -> Self {
        // Clause counts are extremely unlikely to exceed u32::MAX
        #[allow(clippy::cast_possible_truncation)]
        Self(index as u32)
    }

    /// Index of this clause in the grammar's clause arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A set of character ranges, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharSet {
    /// Inclusive character ranges (e.g. `[a-z]`, `[0-9]`).
    ranges: Vec<(char, char)>,
    negated: bool,
}

impl CharSet {
    /// Create a new character set with the given inclusive ranges.
    #[must_use]
    pub const fn new(ranges: Vec<(char, char)>) -> Self {
        Self {
            ranges,
            negated: false,
        }
    }

    /// Create a character set matching a single character.
    #[must_use]
    pub fn single(c: char) -> Self {
        Self::new(vec![(c, c)])
    }

    /// Create a character set for digits `[0-9]`.
    #[must_use]
    pub fn digits() -> Self {
        Self::new(vec![('0', '9')])
    }

    /// Create a character set for ASCII letters `[A-Za-z]`.
    #[must_use]
    pub fn letters() -> Self {
        Self::new(vec![('A', 'Z'), ('a', 'z')])
    }

    /// Create a character set for whitespace characters.
    #[must_use]
    pub fn whitespace() -> Self {
        Self::new(vec![(' ', ' '), ('\t', '\t'), ('\r', '\r'), ('\n', '\n')])
    }

    /// Invert this character set.
    #[must_use]
    pub const fn negated(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Check if a character matches this character set.
    #[must_use]
    pub fn matches(&self, c: char) -> bool {
        let in_ranges = self.ranges.iter().any(|(start, end)| c >= *start && c <= *end);
        in_ranges != self.negated
    }

    pub(crate) fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    pub(crate) const fn is_negated(&self) -> bool {
        self.negated
    }
}

/// Input predicate of a terminal clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// A fixed character sequence.
    Literal(compact_str::CompactString),
    /// Any single character from a character set.
    CharSet(CharSet),
    /// Any single character.
    Any,
}

impl Terminal {
    /// Number of characters this terminal consumes at `start`, or `None` if it
    /// does not match there.
    pub(crate) fn match_len(&self, chars: &[char], start: usize) -> Option<usize> {
        match self {
            Self::Literal(text) => {
                let mut end = start;
                for c in text.chars() {
                    if chars.get(end) != Some(&c) {
                        return None;
                    }
                    end += 1;
                }
                Some(end - start)
            }
            Self::CharSet(set) => {
                (start < chars.len() && set.matches(chars[start])).then_some(1)
            }
            Self::Any => (start < chars.len()).then_some(1),
        }
    }
}

/// Operator variant of a clause.
///
/// The shared [`Clause`] header carries the subclause list; the kind selects
/// the combination rule applied to subclause matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseKind {
    /// Matches an input predicate directly; has no subclauses.
    Terminal(Terminal),
    /// Matches every subclause in order.
    Seq,
    /// Ordered choice: matches the first subclause (by grammar order) that
    /// matches.
    First,
    /// Matches the longest-matching subclause; ties go to the smallest index.
    Longest,
    /// Matches its subclause, or the empty string.
    Opt,
    /// Matches its subclause one or more times at advancing positions.
    OneOrMore,
    /// Zero-width positive lookahead: succeeds iff the subclause matches.
    FollowedBy,
    /// Zero-width negative lookahead: succeeds iff the subclause does not
    /// match.
    NotFollowedBy,
}

/// Whether a clause is matched bottom-up against the memo table, or top-down
/// by direct recursive descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDirection {
    /// Canonical mode: subclause results are read from the memo table, and
    /// successes are recorded in it.
    BottomUp,
    /// Recursive-descent fallback. Subclause matches are computed directly and
    /// nothing is memoized.
    TopDown,
}

/// A node in the frozen grammar graph: one operator variant plus the shared
/// header (subclauses, rule bindings, analysis results).
#[derive(Debug, Clone)]
pub struct Clause {
    pub(crate) kind: ClauseKind,
    pub(crate) sub_clauses: SmallVec<[ClauseId; 2]>,
    /// AST label per subclause position, if any. Opaque to matching.
    pub(crate) sub_clause_labels: SmallVec<[Option<lasso::Spur>; 2]>,
    /// Rules this clause is the toplevel clause of.
    pub(crate) rules: SmallVec<[RuleId; 1]>,
    /// True iff this clause matches the empty string at any position.
    /// Computed once by grammar analysis.
    pub(crate) can_match_zero_chars: bool,
    /// Clauses to re-evaluate when this clause's memo at a position changes.
    /// The inverse of the seed-subclause relation, installed by analysis.
    pub(crate) seed_parents: SmallVec<[ClauseId; 4]>,
}

impl Clause {
    pub(crate) fn new(kind: ClauseKind, sub_clauses: SmallVec<[ClauseId; 2]>) -> Self {
        let n = sub_clauses.len();
        let mut sub_clause_labels = SmallVec::with_capacity(n);
        sub_clause_labels.extend(std::iter::repeat_n(None, n));
        Self {
            kind,
            sub_clauses,
            sub_clause_labels,
            rules: SmallVec::new(),
            can_match_zero_chars: false,
            seed_parents: SmallVec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &ClauseKind {
        &self.kind
    }

    #[must_use]
    pub fn sub_clauses(&self) -> &[ClauseId] {
        &self.sub_clauses
    }

    /// AST label attached to the subclause at position `idx`, if any.
    #[must_use]
    pub fn sub_clause_label(&self, idx: usize) -> Option<lasso::Spur> {
        self.sub_clause_labels.get(idx).copied().flatten()
    }

    /// Rules this clause is the toplevel clause of.
    #[must_use]
    pub fn rules(&self) -> &[RuleId] {
        &self.rules
    }

    /// True iff this clause matches the empty string at any position.
    #[must_use]
    pub const fn can_match_zero_chars(&self) -> bool {
        self.can_match_zero_chars
    }

    /// The clauses to re-evaluate when this clause gains a new memoized match.
    #[must_use]
    pub fn seed_parent_clauses(&self) -> &[ClauseId] {
        &self.seed_parents
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, ClauseKind::Terminal(_))
    }

    /// The subclauses that can produce the first match of this clause at its
    /// start position. A new memoized match of a seed subclause is what
    /// triggers re-evaluation of this clause at the same position.
    ///
    /// Ordered choice and longest-match seed from every alternative, since any
    /// one of them may supply the match. A sequence seeds from every subclause
    /// up to and including the first one that cannot match zero characters,
    /// since any of those may be the first to consume input.
    pub(crate) fn seed_sub_clauses(&self, clauses: &[Clause]) -> SmallVec<[ClauseId; 2]> {
        match self.kind {
            ClauseKind::Terminal(_) => SmallVec::new(),
            ClauseKind::First | ClauseKind::Longest => self.sub_clauses.clone(),
            ClauseKind::Seq => {
                let mut seeds = SmallVec::new();
                for &sub in &self.sub_clauses {
                    seeds.push(sub);
                    if !clauses[sub.index()].can_match_zero_chars {
                        break;
                    }
                }
                seeds
            }
            ClauseKind::Opt
            | ClauseKind::OneOrMore
            | ClauseKind::FollowedBy
            | ClauseKind::NotFollowedBy => self.sub_clauses.clone(),
        }
    }

    /// Match this clause at `key.start`.
    ///
    /// In [`MatchDirection::BottomUp`] mode, subclause results are read from
    /// the memo table via [`MemoTable::lookup_best_match`] and a success is
    /// recorded with the appropriate insertion call; this method never
    /// recurses into subclause matching. In [`MatchDirection::TopDown`] mode,
    /// subclauses are matched by direct recursion and nothing is memoized.
    pub fn match_at(
        &self,
        direction: MatchDirection,
        grammar: &Grammar,
        table: &mut MemoTable,
        key: MemoKey,
        updated: &mut UpdatedEntries,
    ) -> Option<MatchId> {
        match direction {
            MatchDirection::BottomUp => self.match_bottom_up(grammar, table, key, updated),
            MatchDirection::TopDown => self.match_top_down(grammar, table, key, updated),
        }
    }

    fn match_bottom_up(
        &self,
        grammar: &Grammar,
        table: &mut MemoTable,
        key: MemoKey,
        updated: &mut UpdatedEntries,
    ) -> Option<MatchId> {
        match &self.kind {
            ClauseKind::Terminal(terminal) => {
                let len = terminal.match_len(table.chars(), key.start)?;
                Some(table.add_terminal_match(key, len, updated))
            }
            ClauseKind::Seq => {
                let mut sub_matches: SmallVec<[MatchId; 2]> = SmallVec::new();
                let mut pos = key.start;
                for &sub in &self.sub_clauses {
                    let sub_key = MemoKey::new(sub, pos);
                    let m = table.lookup_best_match(grammar, sub_key, key, updated)?;
                    pos += table.get_match(m).len();
                    sub_matches.push(m);
                }
                Some(table.add_non_terminal_match(key, 0, sub_matches, updated))
            }
            ClauseKind::First => {
                for (idx, &sub) in self.sub_clauses.iter().enumerate() {
                    let sub_key = MemoKey::new(sub, key.start);
                    if let Some(m) = table.lookup_best_match(grammar, sub_key, key, updated) {
                        #[allow(clippy::cast_possible_truncation)]
                        let idx = idx as u32;
                        return Some(table.add_non_terminal_match(
                            key,
                            idx,
                            SmallVec::from_slice(&[m]),
                            updated,
                        ));
                    }
                }
                None
            }
            ClauseKind::Longest => {
                let mut best: Option<(u32, MatchId, usize)> = None;
                for (idx, &sub) in self.sub_clauses.iter().enumerate() {
                    let sub_key = MemoKey::new(sub, key.start);
                    if let Some(m) = table.lookup_best_match(grammar, sub_key, key, updated) {
                        let len = table.get_match(m).len();
                        if best.is_none_or(|(_, _, best_len)| len > best_len) {
                            #[allow(clippy::cast_possible_truncation)]
                            let idx = idx as u32;
                            best = Some((idx, m, len));
                        }
                    }
                }
                best.map(|(idx, m, _)| {
                    table.add_non_terminal_match(key, idx, SmallVec::from_slice(&[m]), updated)
                })
            }
            ClauseKind::Opt => {
                let sub = self.sub_clauses[0];
                let sub_key = MemoKey::new(sub, key.start);
                let sub_matches = match table.lookup_best_match(grammar, sub_key, key, updated) {
                    Some(m) => SmallVec::from_slice(&[m]),
                    None => SmallVec::new(),
                };
                Some(table.add_non_terminal_match(key, 0, sub_matches, updated))
            }
            ClauseKind::OneOrMore => {
                let sub = self.sub_clauses[0];
                let sub_key = MemoKey::new(sub, key.start);
                let head = table.lookup_best_match(grammar, sub_key, key, updated)?;
                let head_len = table.get_match(head).len();
                let mut sub_matches: SmallVec<[MatchId; 2]> = SmallVec::from_slice(&[head]);
                // A zero-width head would repeat at the same position forever,
                // so the tail is only consulted after real progress.
                if head_len > 0 {
                    let tail_key = MemoKey::new(key.clause, key.start + head_len);
                    if let Some(tail) = table.lookup_best_match(grammar, tail_key, key, updated) {
                        sub_matches.push(tail);
                    }
                }
                Some(table.add_non_terminal_match(key, 0, sub_matches, updated))
            }
            ClauseKind::FollowedBy => {
                let sub = self.sub_clauses[0];
                let sub_key = MemoKey::new(sub, key.start);
                table.lookup_best_match(grammar, sub_key, key, updated)?;
                Some(table.add_non_terminal_match(key, 0, SmallVec::new(), updated))
            }
            ClauseKind::NotFollowedBy => {
                // The subclause must be matched top-down: its *absence* from
                // the memo table cannot distinguish "will never match" from
                // "not proven yet" while the fixpoint is still running.
                let sub = self.sub_clauses[0];
                let sub_key = MemoKey::new(sub, key.start);
                let probe = grammar.clause(sub).match_at(
                    MatchDirection::TopDown,
                    grammar,
                    table,
                    sub_key,
                    updated,
                );
                if probe.is_none() {
                    Some(table.add_non_terminal_match(key, 0, SmallVec::new(), updated))
                } else {
                    None
                }
            }
        }
    }

    fn match_top_down(
        &self,
        grammar: &Grammar,
        table: &mut MemoTable,
        key: MemoKey,
        updated: &mut UpdatedEntries,
    ) -> Option<MatchId> {
        match &self.kind {
            ClauseKind::Terminal(terminal) => {
                let len = terminal.match_len(table.chars(), key.start)?;
                Some(table.alloc_match(key, 0, len, SmallVec::new()))
            }
            ClauseKind::Seq => {
                let mut sub_matches: SmallVec<[MatchId; 2]> = SmallVec::new();
                let mut pos = key.start;
                for &sub in &self.sub_clauses {
                    let m = grammar.clause(sub).match_at(
                        MatchDirection::TopDown,
                        grammar,
                        table,
                        MemoKey::new(sub, pos),
                        updated,
                    )?;
                    pos += table.get_match(m).len();
                    sub_matches.push(m);
                }
                Some(table.alloc_match(key, 0, pos - key.start, sub_matches))
            }
            ClauseKind::First => {
                for (idx, &sub) in self.sub_clauses.iter().enumerate() {
                    let m = grammar.clause(sub).match_at(
                        MatchDirection::TopDown,
                        grammar,
                        table,
                        MemoKey::new(sub, key.start),
                        updated,
                    );
                    if let Some(m) = m {
                        let len = table.get_match(m).len();
                        #[allow(clippy::cast_possible_truncation)]
                        let idx = idx as u32;
                        return Some(table.alloc_match(key, idx, len, SmallVec::from_slice(&[m])));
                    }
                }
                None
            }
            ClauseKind::Longest => {
                let mut best: Option<(u32, MatchId, usize)> = None;
                for (idx, &sub) in self.sub_clauses.iter().enumerate() {
                    let m = grammar.clause(sub).match_at(
                        MatchDirection::TopDown,
                        grammar,
                        table,
                        MemoKey::new(sub, key.start),
                        updated,
                    );
                    if let Some(m) = m {
                        let len = table.get_match(m).len();
                        if best.is_none_or(|(_, _, best_len)| len > best_len) {
                            #[allow(clippy::cast_possible_truncation)]
                            let idx = idx as u32;
                            best = Some((idx, m, len));
                        }
                    }
                }
                best.map(|(idx, m, len)| {
                    table.alloc_match(key, idx, len, SmallVec::from_slice(&[m]))
                })
            }
            ClauseKind::Opt => {
                let sub = self.sub_clauses[0];
                let m = grammar.clause(sub).match_at(
                    MatchDirection::TopDown,
                    grammar,
                    table,
                    MemoKey::new(sub, key.start),
                    updated,
                );
                let (len, sub_matches) = match m {
                    Some(m) => (table.get_match(m).len(), SmallVec::from_slice(&[m])),
                    None => (0, SmallVec::new()),
                };
                Some(table.alloc_match(key, 0, len, sub_matches))
            }
            ClauseKind::OneOrMore => {
                let sub = self.sub_clauses[0];
                let head = grammar.clause(sub).match_at(
                    MatchDirection::TopDown,
                    grammar,
                    table,
                    MemoKey::new(sub, key.start),
                    updated,
                )?;
                let head_len = table.get_match(head).len();
                let mut total = head_len;
                let mut sub_matches: SmallVec<[MatchId; 2]> = SmallVec::from_slice(&[head]);
                if head_len > 0 {
                    let tail = self.match_at(
                        MatchDirection::TopDown,
                        grammar,
                        table,
                        MemoKey::new(key.clause, key.start + head_len),
                        updated,
                    );
                    if let Some(tail) = tail {
                        total += table.get_match(tail).len();
                        sub_matches.push(tail);
                    }
                }
                Some(table.alloc_match(key, 0, total, sub_matches))
            }
            ClauseKind::FollowedBy => {
                let sub = self.sub_clauses[0];
                grammar.clause(sub).match_at(
                    MatchDirection::TopDown,
                    grammar,
                    table,
                    MemoKey::new(sub, key.start),
                    updated,
                )?;
                Some(table.alloc_match(key, 0, 0, SmallVec::new()))
            }
            ClauseKind::NotFollowedBy => {
                let sub = self.sub_clauses[0];
                let probe = grammar.clause(sub).match_at(
                    MatchDirection::TopDown,
                    grammar,
                    table,
                    MemoKey::new(sub, key.start),
                    updated,
                );
                if probe.is_none() {
                    Some(table.alloc_match(key, 0, 0, SmallVec::new()))
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_set_ranges() {
        let digits = CharSet::digits();
        assert!(digits.matches('0'));
        assert!(digits.matches('9'));
        assert!(!digits.matches('a'));
    }

    #[test]
    fn test_char_set_negated() {
        let not_x = CharSet::single('x').negated();
        assert!(!not_x.matches('x'));
        assert!(not_x.matches('y'));
    }

    #[test]
    fn test_literal_match_len() {
        let chars: Vec<char> = "abcd".chars().collect();
        let lit = Terminal::Literal("bc".into());
        assert_eq!(lit.match_len(&chars, 1), Some(2));
        assert_eq!(lit.match_len(&chars, 0), None);
        assert_eq!(lit.match_len(&chars, 3), None);
    }

    #[test]
    fn test_any_match_len() {
        let chars: Vec<char> = "a".chars().collect();
        assert_eq!(Terminal::Any.match_len(&chars, 0), Some(1));
        assert_eq!(Terminal::Any.match_len(&chars, 1), None);
    }
}
